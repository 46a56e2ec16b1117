//! Versioned (v0) message compilation and serialization
//!
//! Account table ordering is load-bearing: signatures are matched to the
//! signer prefix of the table by position.
//!
//! 1. fee payer
//! 2. signer + writable
//! 3. signer + readonly
//! 4. non-signer + writable
//! 5. non-signer + readonly
//!
//! Within each partition accounts keep the order in which they were first
//! referenced.

use serde_json::{json, Value};
use solana_sdk::{
    hash::Hash,
    instruction::{CompiledInstruction, Instruction},
    message::{
        v0::{self, MessageAddressTableLookup},
        MessageHeader, VersionedMessage,
    },
    pubkey::Pubkey,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::rpc_manager::RpcTransport;
use crate::tx_builder::errors::BuildError;
use crate::types::FreshnessAnchor;

/// Account indices are a single byte
pub const MAX_ACCOUNT_KEYS: usize = 256;

/// Compiled, unsigned v0 message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedMessage {
    inner: v0::Message,
}

impl UnsignedMessage {
    pub fn header(&self) -> &MessageHeader {
        &self.inner.header
    }

    pub fn account_keys(&self) -> &[Pubkey] {
        &self.inner.account_keys
    }

    pub fn recent_blockhash(&self) -> &Hash {
        &self.inner.recent_blockhash
    }

    pub fn instructions(&self) -> &[CompiledInstruction] {
        &self.inner.instructions
    }

    pub fn address_table_lookups(&self) -> &[MessageAddressTableLookup] {
        &self.inner.address_table_lookups
    }

    /// Fee payer is always the first account
    pub fn fee_payer(&self) -> &Pubkey {
        &self.inner.account_keys[0]
    }

    /// Accounts that must sign, in signature order
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.inner.account_keys[..self.inner.header.num_required_signatures as usize]
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.inner.header.num_required_signatures as usize
    }

    /// Writability as declared by the header partitions
    pub fn is_writable(&self, index: usize) -> bool {
        let header = &self.inner.header;
        let total = self.inner.account_keys.len();
        let num_signers = header.num_required_signatures as usize;
        if index >= total {
            return false;
        }
        if index < num_signers {
            index < num_signers - header.num_readonly_signed_accounts as usize
        } else {
            index - num_signers < total - num_signers - header.num_readonly_unsigned_accounts as usize
        }
    }

    /// Versioned form handed to the SDK's transaction types
    pub fn to_versioned(&self) -> VersionedMessage {
        VersionedMessage::V0(self.inner.clone())
    }

    /// Canonical wire bytes; this is what every signer signs
    pub fn serialize(&self) -> Vec<u8> {
        self.to_versioned().serialize()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyFlags {
    is_signer: bool,
    is_writable: bool,
}

/// Compile `instructions` against an already-fetched blockhash
///
/// Duplicate account references merge their flags; program ids enter the
/// table as readonly non-signers unless another reference promotes them.
pub fn compile_with_anchor(
    payer: &Pubkey,
    instructions: &[Instruction],
    recent_blockhash: Hash,
) -> Result<UnsignedMessage, BuildError> {
    let mut first_seen: Vec<Pubkey> = vec![*payer];
    let mut flags: HashMap<Pubkey, KeyFlags> = HashMap::new();
    flags.insert(
        *payer,
        KeyFlags {
            is_signer: true,
            is_writable: true,
        },
    );

    let mut touch = |key: &Pubkey, is_signer: bool, is_writable: bool| {
        let entry = flags.entry(*key).or_insert_with(|| {
            first_seen.push(*key);
            KeyFlags::default()
        });
        entry.is_signer |= is_signer;
        entry.is_writable |= is_writable;
    };

    for ix in instructions {
        for meta in &ix.accounts {
            touch(&meta.pubkey, meta.is_signer, meta.is_writable);
        }
        touch(&ix.program_id, false, false);
    }

    let partition = |signer: bool, writable: bool| {
        first_seen
            .iter()
            .filter(|key| {
                let f = flags[*key];
                f.is_signer == signer && f.is_writable == writable
            })
            .copied()
            .collect::<Vec<_>>()
    };
    let signer_writable = partition(true, true);
    let signer_readonly = partition(true, false);
    let unsigned_writable = partition(false, true);
    let unsigned_readonly = partition(false, false);

    let total = first_seen.len();
    if total > MAX_ACCOUNT_KEYS {
        return Err(BuildError::TooManyAccounts(total));
    }

    let count = |n: usize| u8::try_from(n).map_err(|_| BuildError::TooManyAccounts(total));
    let header = MessageHeader {
        num_required_signatures: count(signer_writable.len() + signer_readonly.len())?,
        num_readonly_signed_accounts: count(signer_readonly.len())?,
        num_readonly_unsigned_accounts: count(unsigned_readonly.len())?,
    };

    let account_keys: Vec<Pubkey> = signer_writable
        .into_iter()
        .chain(signer_readonly)
        .chain(unsigned_writable)
        .chain(unsigned_readonly)
        .collect();

    // Fits: total <= 256 was checked above
    let index_of: HashMap<Pubkey, u8> = account_keys
        .iter()
        .enumerate()
        .map(|(i, key)| (*key, i as u8))
        .collect();

    if instructions.len() > u16::MAX as usize {
        return Err(BuildError::Oversized(format!(
            "{} instructions",
            instructions.len()
        )));
    }

    let compiled = instructions
        .iter()
        .map(|ix| {
            if ix.accounts.len() > u16::MAX as usize {
                return Err(BuildError::Oversized(format!(
                    "{} account references for program {}",
                    ix.accounts.len(),
                    ix.program_id
                )));
            }
            if ix.data.len() > u16::MAX as usize {
                return Err(BuildError::Oversized(format!(
                    "instruction data of {} bytes for program {}",
                    ix.data.len(),
                    ix.program_id
                )));
            }
            Ok(CompiledInstruction {
                program_id_index: index_of[&ix.program_id],
                accounts: ix.accounts.iter().map(|m| index_of[&m.pubkey]).collect(),
                data: ix.data.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(UnsignedMessage {
        inner: v0::Message {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
            address_table_lookups: Vec::new(),
        },
    })
}

/// Fetch a fresh anchor via `getLatestBlockhash`
pub async fn fetch_anchor(
    transport: &dyn RpcTransport,
    commitment: &str,
) -> Result<FreshnessAnchor, BuildError> {
    let result = transport
        .call("getLatestBlockhash", vec![json!({ "commitment": commitment })])
        .await?;

    let blockhash = result
        .pointer("/value/blockhash")
        .and_then(Value::as_str)
        .ok_or_else(|| BuildError::NoAnchor(format!("missing value.blockhash in {}", result)))?;
    let blockhash = Hash::from_str(blockhash)
        .map_err(|e| BuildError::NoAnchor(format!("invalid blockhash `{}`: {}", blockhash, e)))?;

    Ok(FreshnessAnchor {
        blockhash,
        last_valid_block_height: result
            .pointer("/value/lastValidBlockHeight")
            .and_then(Value::as_u64),
    })
}

/// Compiles instructions into an [`UnsignedMessage`] bound to a fresh anchor
#[derive(Clone)]
pub struct MessageBuilder {
    transport: Arc<dyn RpcTransport>,
    commitment: String,
}

impl MessageBuilder {
    pub fn new(transport: Arc<dyn RpcTransport>, commitment: impl Into<String>) -> Self {
        Self {
            transport,
            commitment: commitment.into(),
        }
    }

    /// Fetch a new anchor and compile. Anchors are never reused across calls.
    pub async fn compile(
        &self,
        payer: &Pubkey,
        instructions: &[Instruction],
    ) -> Result<(UnsignedMessage, FreshnessAnchor), BuildError> {
        let anchor = fetch_anchor(self.transport.as_ref(), &self.commitment).await?;
        debug!(
            blockhash = %anchor.blockhash,
            last_valid_block_height = ?anchor.last_valid_block_height,
            "Fetched freshness anchor"
        );

        let message = compile_with_anchor(payer, instructions, anchor.blockhash)?;
        debug!(
            accounts = message.account_keys().len(),
            signers = message.header().num_required_signatures,
            instructions = message.instructions().len(),
            "Compiled v0 message"
        );
        Ok((message, anchor))
    }
}
