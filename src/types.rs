//! Common types used throughout the application

use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 1 XNT/xSOL = 1 billion lamports
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Display name of the native unit on this cluster
pub const CURRENCY: &str = "xSOL";

/// Decimal places carried by a lamport amount
const LAMPORT_DECIMALS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount must be a finite, non-negative number: {0}")]
    Invalid(String),

    #[error("Amount has more than 9 decimal places: {0}")]
    TooPrecise(String),

    #[error("Amount overflows a lamport value: {0}")]
    Overflow(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid address `{input}`: {reason}")]
pub struct AddressError {
    pub input: String,
    pub reason: String,
}

/// Lossy conversion for display only
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Signed variant for balance deltas and rewards
pub fn signed_lamports_to_sol(lamports: i128) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert display units to lamports
///
/// Integral amounts are converted with integer arithmetic so the result is
/// exact; fractional amounts round to the nearest lamport.
pub fn sol_to_lamports(units: f64) -> Result<u64, AmountError> {
    if !units.is_finite() || units < 0.0 {
        return Err(AmountError::Invalid(units.to_string()));
    }

    if units.fract() == 0.0 {
        if units > u64::MAX as f64 {
            return Err(AmountError::Overflow(units.to_string()));
        }
        return (units as u64)
            .checked_mul(LAMPORTS_PER_SOL)
            .ok_or_else(|| AmountError::Overflow(units.to_string()));
    }

    let lamports = (units * LAMPORTS_PER_SOL as f64).round();
    if lamports >= u64::MAX as f64 {
        return Err(AmountError::Overflow(units.to_string()));
    }
    Ok(lamports as u64)
}

/// Parse a decimal amount string ("1.5", "0.000000001", "20") exactly
pub fn parse_sol_amount(input: &str) -> Result<u64, AmountError> {
    let trimmed = input.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
        return Err(AmountError::Invalid(input.to_string()));
    }
    if frac.len() > LAMPORT_DECIMALS {
        return Err(AmountError::TooPrecise(input.to_string()));
    }

    let overflow = || AmountError::Overflow(input.to_string());
    let whole_lamports = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|_| overflow())?
            .checked_mul(LAMPORTS_PER_SOL)
            .ok_or_else(overflow)?
    };
    let frac_lamports = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = LAMPORT_DECIMALS);
        padded.parse::<u64>().map_err(|_| overflow())?
    };

    whole_lamports.checked_add(frac_lamports).ok_or_else(overflow)
}

/// Parse a base-58 address that must decode to exactly 32 bytes
pub fn parse_address(input: &str) -> Result<Pubkey, AddressError> {
    let trimmed = input.trim();
    let bytes = bs58::decode(trimmed).into_vec().map_err(|e| AddressError {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    if bytes.len() != 32 {
        return Err(AddressError {
            input: input.to_string(),
            reason: format!("decodes to {} bytes, expected 32", bytes.len()),
        });
    }
    Pubkey::from_str(trimmed).map_err(|e| AddressError {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Recent blockhash bound into a transaction
///
/// Fetched for every transaction and never cached: the network rejects
/// anchors older than its block-height window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessAnchor {
    pub blockhash: Hash,
    pub last_valid_block_height: Option<u64>,
}

/// Signature returned by `sendTransaction`; says nothing about confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub signature: String,
}

impl fmt::Display for SubmissionReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}
