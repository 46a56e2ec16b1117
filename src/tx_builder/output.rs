//! Signed transaction and its wire encoding
//!
//! Wire bytes are the bincode form of the SDK's `VersionedTransaction`.

use solana_sdk::{signature::Signature, transaction::VersionedTransaction};

use crate::tx_builder::errors::SubmitError;
use crate::tx_builder::message::UnsignedMessage;
use crate::wallet::KeypairHandle;

/// Message plus one signature per signer-prefix entry, in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    message: UnsignedMessage,
    signatures: Vec<Signature>,
}

impl SignedTransaction {
    /// Sign `message` with `signers`
    ///
    /// Every supplied signer must be a declared signer of the message and
    /// every declared signer must be supplied. Signatures are placed by the
    /// position of the signer's key in the account table, not by the order
    /// of `signers`.
    pub fn sign(
        message: UnsignedMessage,
        signers: &[&dyn KeypairHandle],
    ) -> Result<Self, SubmitError> {
        let required = message.signer_keys();

        let addresses: Vec<_> = signers.iter().map(|s| s.address()).collect();
        if let Some(unknown) = addresses.iter().find(|a| !required.contains(*a)) {
            return Err(SubmitError::UnknownSigner(*unknown));
        }

        let bytes = message.serialize();
        let signatures = required
            .iter()
            .map(|key| {
                addresses
                    .iter()
                    .position(|a| a == key)
                    .map(|i| signers[i].sign(&bytes))
                    .ok_or(SubmitError::MissingSigner(*key))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            message,
            signatures,
        })
    }

    pub fn message(&self) -> &UnsignedMessage {
        &self.message
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// The fee payer's signature doubles as the transaction id
    pub fn signature(&self) -> &Signature {
        &self.signatures[0]
    }

    pub fn to_versioned(&self) -> VersionedTransaction {
        VersionedTransaction {
            signatures: self.signatures.clone(),
            message: self.message.to_versioned(),
        }
    }

    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, SubmitError> {
        bincode::serialize(&self.to_versioned()).map_err(|e| SubmitError::Encoding(e.to_string()))
    }

    /// Base-58 text accepted by `sendTransaction`
    pub fn encode_base58(&self) -> Result<String, SubmitError> {
        Ok(bs58::encode(self.to_wire_bytes()?).into_string())
    }
}
