//! Wallet management module
//!
//! Loads an existing keypair file and exposes it only through
//! [`KeypairHandle`]; private key bytes never leave this module.

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::path::Path;
use std::sync::Arc;

/// Opaque signing identity
pub trait KeypairHandle: Send + Sync {
    /// Public address of the key
    fn address(&self) -> Pubkey;

    /// Sign exactly `message` and return the detached signature
    fn sign(&self, message: &[u8]) -> Signature;
}

impl KeypairHandle for Keypair {
    fn address(&self) -> Pubkey {
        self.pubkey()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.sign_message(message)
    }
}

/// Wallet manager for handling the fee-payer keypair
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Create a new wallet manager from a keypair file
    ///
    /// Accepts the JSON byte-array format written by the cluster CLI as well
    /// as a raw 64-byte file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;

        let secret: Vec<u8> = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else {
            serde_json::from_slice(&keypair_bytes).context("Failed to parse keypair JSON")?
        };

        if secret.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", secret.len());
        }
        if secret.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }

        let keypair = Keypair::try_from(secret.as_slice()).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

impl KeypairHandle for WalletManager {
    fn address(&self) -> Pubkey {
        self.pubkey()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
