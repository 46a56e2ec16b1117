//! Error types for the transaction pipeline
//!
//! Build errors abort compilation before anything is signed; submit errors
//! abort a single submission attempt. Neither is retried automatically.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::rpc_manager::TransportError;
use crate::types::{AddressError, AmountError};

/// Errors raised while compiling an unsigned message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `getLatestBlockhash` returned no usable blockhash
    #[error("No usable freshness anchor: {0}")]
    NoAnchor(String),

    /// An address did not decode to a 32-byte public key
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    /// The requested amount cannot be expressed in lamports
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    /// Account indices are a single byte on the wire
    #[error("Message references {0} accounts, at most 256 are addressable")]
    TooManyAccounts(usize),

    /// A length prefix does not fit the wire's u16 length encoding
    #[error("Message component too large: {0}")]
    Oversized(String),

    /// RPC failure while fetching the anchor
    #[error("RPC error: {0}")]
    Transport(#[from] TransportError),
}

impl BuildError {
    /// Get the error category for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoAnchor(_) => "blockhash",
            Self::InvalidAddress(_) => "address",
            Self::InvalidAmount(_) => "amount",
            Self::TooManyAccounts(_) | Self::Oversized(_) => "message",
            Self::Transport(_) => "rpc",
        }
    }
}

/// Errors raised while signing or sending a compiled message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// A keypair was supplied that the message does not declare as a signer
    #[error("Signer {0} is not a required signer of this message")]
    UnknownSigner(Pubkey),

    /// The message declares a signer for which no keypair was supplied
    #[error("Missing keypair for required signer {0}")]
    MissingSigner(Pubkey),

    /// The signed transaction could not be serialized
    #[error("Failed to encode transaction: {0}")]
    Encoding(String),

    /// `sendTransaction` answered without a signature
    #[error("Transaction rejected by node: {0}")]
    Rejected(String),

    /// RPC failure while sending
    #[error("RPC error: {0}")]
    Transport(#[from] TransportError),
}

impl SubmitError {
    /// Get the error category for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownSigner(_) | Self::MissingSigner(_) => "signing",
            Self::Encoding(_) => "encoding",
            Self::Rejected(_) => "rejected",
            Self::Transport(_) => "rpc",
        }
    }
}
