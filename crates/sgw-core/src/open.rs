//! Recipient-side envelope opening.
//!
//! The AEAD binds no associated data, so a valid tag alone says nothing
//! about who sent the payload. An envelope is accepted only after the tag,
//! the payload hash, the claimed sender address, and the detached signature
//! all check out.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use sgw_crypto::adr036::{build_sign_doc, verify_signature};
use sgw_crypto::aead;
use sgw_crypto::address::pubkey_to_address;
use sgw_crypto::ecdh::derive_shared_secret;
use sgw_crypto::hash::sha256;
use sgw_crypto::keys::KeyPair;
use sgw_crypto::utils::constant_time_compare;

use crate::errors::OpenError;
use crate::types::{EncryptedPayload, GatewayExecuteMsg, SealedEnvelope};

/// A verified envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedEnvelope {
    pub payload: EncryptedPayload,
    /// Decoded inner message bytes
    pub message: Vec<u8>,
}

impl OpenedEnvelope {
    /// Address that signed the envelope.
    pub fn sender(&self) -> &str {
        &self.payload.user_address
    }

    pub fn message_json<T: DeserializeOwned>(&self) -> Result<T, OpenError> {
        Ok(serde_json::from_slice(&self.message)?)
    }
}

/// An execute message after unwrapping, with the verified sender if it
/// arrived encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedExecute {
    pub msg: GatewayExecuteMsg,
    pub sender: Option<String>,
}

/// Holds the recipient's encryption keypair.
#[derive(Debug, Clone)]
pub struct EnvelopeOpener {
    key: KeyPair,
}

impl EnvelopeOpener {
    pub fn new(key: KeyPair) -> Self {
        Self { key }
    }

    pub fn generate() -> Self {
        Self::new(KeyPair::generate())
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key
    }

    /// The encryption key the recipient publishes.
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.key.public_key())
    }

    pub fn open(&self, envelope: &SealedEnvelope) -> Result<OpenedEnvelope, OpenError> {
        let nonce = decode(&envelope.nonce, "nonce")?;
        let user_key = decode(&envelope.user_key, "user_key")?;
        let payload = decode(&envelope.payload, "payload")?;
        let payload_hash = decode(&envelope.payload_hash, "payload_hash")?;
        let signature = decode(&envelope.payload_signature, "payload_signature")?;

        if !constant_time_compare(&sha256(&payload), &payload_hash) {
            warn!("envelope payload hash mismatch");
            return Err(OpenError::PayloadHashMismatch);
        }

        let key = derive_shared_secret(self.key.secret_key(), &user_key)?;
        let plaintext = aead::open(&key, &nonce, &payload)?;
        let inner: EncryptedPayload = serde_json::from_slice(&plaintext)?;

        let user_pubkey = decode(&inner.user_pubkey, "user_pubkey")?;
        let derived = pubkey_to_address(&user_pubkey, &inner.hrp)?;
        if derived != inner.user_address {
            warn!(claimed = %inner.user_address, derived = %derived, "envelope sender mismatch");
            return Err(OpenError::SignerMismatch {
                claimed: inner.user_address,
                derived,
            });
        }

        let doc = build_sign_doc(&inner.user_address, &payload_hash);
        if !verify_signature(&doc, &user_pubkey, &signature)? {
            warn!(sender = %inner.user_address, "envelope signature rejected");
            return Err(OpenError::SignatureRejected);
        }

        let message = decode(&inner.msg, "msg")?;
        debug!(sender = %inner.user_address, len = message.len(), "envelope opened");
        Ok(OpenedEnvelope { payload: inner, message })
    }

    /// Unwrap an execute message. Plain messages pass through; encrypted
    /// ones are opened and must not contain another encrypted message.
    pub fn open_execute_msg(&self, msg: &GatewayExecuteMsg) -> Result<OpenedExecute, OpenError> {
        let GatewayExecuteMsg::Encrypted(envelope) = msg else {
            return Ok(OpenedExecute {
                msg: msg.clone(),
                sender: None,
            });
        };

        let opened = self.open(envelope)?;
        let inner: GatewayExecuteMsg = opened.message_json()?;
        if inner.is_encrypted() {
            return Err(OpenError::NestedEncryption);
        }
        Ok(OpenedExecute {
            msg: inner,
            sender: Some(opened.payload.user_address),
        })
    }
}

fn decode(value: &str, field: &'static str) -> Result<Vec<u8>, OpenError> {
    BASE64.decode(value).map_err(|_| OpenError::Encoding(field))
}
