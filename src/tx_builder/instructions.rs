//! Instruction construction helpers
//!
//! Builds the instructions handed to the message compiler. Only the system
//! transfer is needed by the wallet.

#[allow(deprecated)]
use solana_sdk::system_instruction;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::tx_builder::errors::BuildError;
use crate::types::parse_address;

/// Build a system-program transfer of `lamports` from `from` to `to`
///
/// Accounts: `from` (signer, writable), `to` (writable).
/// Data: `u32 LE 2` followed by `u64 LE lamports`.
#[allow(deprecated)]
pub fn transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::transfer(from, to, lamports)
}

/// Validate a textual recipient and build the transfer instruction
pub fn plan_transfer(
    payer: &Pubkey,
    recipient: &str,
    lamports: u64,
) -> Result<Instruction, BuildError> {
    let to = parse_address(recipient)?;
    Ok(transfer(payer, &to, lamports))
}
