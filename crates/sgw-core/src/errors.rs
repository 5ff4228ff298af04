//! Error types for envelope assembly, opening, and credentials.
//!
//! Each operation fails with exactly one typed error. Collaborator errors
//! ([`SignerError`], [`QueryError`]) are carried unchanged; timeouts around
//! collaborator calls surface as their own variant.

use thiserror::Error;

use sgw_crypto::adr036::{Adr036Error, PinViolation};
use sgw_crypto::aead::AeadError;
use sgw_crypto::address::AddressError;
use sgw_crypto::keys::KeyError;

use crate::query::QueryError;
use crate::signer::SignerError;

// ============================================================================
// Envelope assembly
// ============================================================================

/// Errors produced while building a sealed envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Recipient or signer key is malformed or off-curve
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// A base64 field could not be decoded
    #[error("invalid base64 in {0}")]
    Encoding(&'static str),

    #[error("signer exposes no accounts")]
    NoAccounts,

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("AEAD failure: {0}")]
    Aead(#[from] AeadError),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The signed detached document violates an ADR-036 pin
    #[error("malformed detached document: {0}")]
    MalformedDetachedDocument(PinViolation),

    #[error("detached signature error: {0}")]
    DetachedSignature(Adr036Error),

    /// Local re-verification of the freshly produced envelope failed
    #[error("envelope integrity check failed: {0}")]
    EnvelopeIntegrity(&'static str),

    /// An encrypted message cannot itself be wrapped again
    #[error("nested encryption is not allowed")]
    NestedEncryption,

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<Adr036Error> for EnvelopeError {
    fn from(e: Adr036Error) -> Self {
        match e {
            Adr036Error::MalformedDocument(pin) => EnvelopeError::MalformedDetachedDocument(pin),
            other => EnvelopeError::DetachedSignature(other),
        }
    }
}

// ============================================================================
// Recipient-side opening
// ============================================================================

/// Errors produced while opening an envelope at the recipient.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("invalid base64 in {0}")]
    Encoding(&'static str),

    #[error("invalid sender key: {0}")]
    InvalidKey(#[from] KeyError),

    /// `payload_hash` is not the sha256 of `payload`
    #[error("payload hash mismatch")]
    PayloadHashMismatch,

    #[error("decryption failed: {0}")]
    Decryption(#[from] AeadError),

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error(transparent)]
    Address(#[from] AddressError),

    /// `user_address` is not the address of `user_pubkey`
    #[error("signer mismatch: payload claims {claimed}, key derives {derived}")]
    SignerMismatch { claimed: String, derived: String },

    #[error("malformed detached document: {0}")]
    MalformedDetachedDocument(PinViolation),

    #[error("detached signature error: {0}")]
    DetachedSignature(Adr036Error),

    #[error("payload signature rejected")]
    SignatureRejected,

    #[error("nested encryption is not allowed")]
    NestedEncryption,
}

impl From<Adr036Error> for OpenError {
    fn from(e: Adr036Error) -> Self {
        match e {
            Adr036Error::MalformedDocument(pin) => OpenError::MalformedDetachedDocument(pin),
            other => OpenError::DetachedSignature(other),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Errors produced while creating or checking credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid base64 in {0}")]
    Encoding(&'static str),

    #[error("signer exposes no accounts")]
    NoAccounts,

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("detached signature error: {0}")]
    DetachedSignature(#[from] Adr036Error),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("auth data must carry between 1 and {max} credentials, got {got}")]
    CredentialCount { max: usize, got: usize },

    #[error("primary index {index} out of bounds for {len} credentials")]
    PrimaryIndexOutOfBounds { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_violation_maps_to_malformed_document() {
        let err: EnvelopeError = Adr036Error::MalformedDocument(PinViolation::NonEmptyMemo).into();
        assert!(matches!(
            err,
            EnvelopeError::MalformedDetachedDocument(PinViolation::NonEmptyMemo)
        ));

        let err: OpenError = Adr036Error::MalformedDocument(PinViolation::NoMessages).into();
        assert!(matches!(err, OpenError::MalformedDetachedDocument(PinViolation::NoMessages)));
    }

    #[test]
    fn test_encoding_errors_stay_distinct() {
        let err: EnvelopeError = Adr036Error::Encoding("signature").into();
        assert!(matches!(err, EnvelopeError::DetachedSignature(_)));
    }

    #[test]
    fn test_timeout_message() {
        let err = EnvelopeError::Timeout {
            operation: "recipient key query",
            secs: 30,
        };
        assert_eq!(err.to_string(), "recipient key query timed out after 30s");
    }
}
