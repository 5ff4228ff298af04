//! Signing capability used to produce ADR-036 detached signatures.
//!
//! The envelope builder never holds the account's private key. It asks an
//! [`AminoSigner`] for its accounts and for a signature over a prepared
//! sign doc, the same two calls a browser or hardware wallet exposes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use sgw_crypto::adr036::{sign_doc, StdSignDoc, StdSignature};
use sgw_crypto::address::{pubkey_to_address, AddressError};
use sgw_crypto::keys::{KeyError, KeyPair};

use crate::errors::EnvelopeError;

/// Errors reported by a signing capability.
#[derive(Debug, Error, Clone)]
pub enum SignerError {
    #[error("signer does not hold address {0}")]
    UnknownAddress(String),

    #[error("signing request rejected: {0}")]
    Rejected(String),

    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid signer key: {0}")]
    Key(#[from] KeyError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// An account exposed by a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    pub address: String,
    pub algo: String,
    /// 33-byte compressed secp256k1 key
    pub pubkey: Vec<u8>,
}

/// External signing capability.
#[async_trait]
pub trait AminoSigner: Send + Sync {
    /// Accounts in signer order; the first is used for envelopes.
    async fn accounts(&self) -> Result<Vec<AccountData>, SignerError>;

    /// Sign `doc` with the key behind `address`.
    async fn sign_detached(&self, address: &str, doc: &StdSignDoc) -> Result<StdSignature, SignerError>;
}

/// Ask `signer` to sign `doc`, bounded by `limit`.
pub async fn request_signature(
    signer: &dyn AminoSigner,
    address: &str,
    doc: &StdSignDoc,
    limit: Duration,
) -> Result<StdSignature, EnvelopeError> {
    debug!(address, "requesting detached signature");
    match tokio::time::timeout(limit, signer.sign_detached(address, doc)).await {
        Ok(res) => Ok(res?),
        Err(_) => Err(EnvelopeError::Timeout {
            operation: "signature request",
            secs: limit.as_secs(),
        }),
    }
}

/// In-process secp256k1 signer holding a single account.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    key: KeyPair,
    address: String,
}

impl LocalWallet {
    /// Fresh random account under `hrp`.
    pub fn generate(hrp: &str) -> Result<Self, SignerError> {
        Self::from_key(KeyPair::generate(), hrp)
    }

    /// Restore from a 32-byte private scalar.
    pub fn from_secret_bytes(bytes: &[u8], hrp: &str) -> Result<Self, SignerError> {
        Self::from_key(KeyPair::from_secret_bytes(bytes)?, hrp)
    }

    fn from_key(key: KeyPair, hrp: &str) -> Result<Self, SignerError> {
        let address = pubkey_to_address(key.public_key(), hrp)?;
        Ok(Self { key, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key
    }

    pub fn account(&self) -> AccountData {
        AccountData {
            address: self.address.clone(),
            algo: "secp256k1".to_string(),
            pubkey: self.key.public_key().to_vec(),
        }
    }
}

#[async_trait]
impl AminoSigner for LocalWallet {
    async fn accounts(&self) -> Result<Vec<AccountData>, SignerError> {
        Ok(vec![self.account()])
    }

    async fn sign_detached(&self, address: &str, doc: &StdSignDoc) -> Result<StdSignature, SignerError> {
        if address != self.address {
            return Err(SignerError::UnknownAddress(address.to_owned()));
        }
        sign_doc(&self.key, doc).map_err(|e| SignerError::SigningFailed(e.to_string()))
    }
}
