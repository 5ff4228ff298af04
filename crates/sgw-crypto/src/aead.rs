//! ChaCha20Poly1305 sealing for envelope payloads.
//!
//! No associated data is bound here. Sender and recipient identity are
//! authenticated by the detached signature over `sha256(ciphertext || tag)`,
//! so an envelope must only be accepted once both the tag and that signature
//! verify.
//!
//! Nonces are 96-bit random values and each nonce gets its own ephemeral
//! keypair, so a (key, nonce) collision requires a repeated random nonce
//! under a repeated key. That risk is negligible but not excluded by
//! construction.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Key, Nonce, Tag,
};

use crate::ecdh::SharedSecret;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Error type for AEAD operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AeadError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("invalid nonce length: expected 12, got {0}")]
    InvalidNonceLength(usize),
    #[error("ciphertext shorter than authentication tag")]
    CiphertextTooShort,
    #[error("RNG failed")]
    RngError,
}

/// Output of [`seal`]: ciphertext and detached 16-byte tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl SealedBox {
    /// Wire form: ciphertext || tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.ciphertext.len() + TAG_LEN);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }
}

/// Fresh random 96-bit nonce.
pub fn random_nonce() -> Result<[u8; NONCE_LEN], AeadError> {
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce).map_err(|_| AeadError::RngError)?;
    Ok(nonce)
}

/// Encrypt `plaintext` under `key` and `nonce`.
///
/// The caller guarantees `nonce` is never reused with the same key.
pub fn seal(key: &SharedSecret, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<SealedBox, AeadError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let mut buf = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buf)
        .map_err(|_| AeadError::EncryptionFailed)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);
    Ok(SealedBox { ciphertext: buf, tag: tag_bytes })
}

/// Decrypt `ciphertext || tag`.
///
/// Any modification to the ciphertext, tag, key, or nonce yields
/// [`AeadError::DecryptionFailed`].
pub fn open(key: &SharedSecret, nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>, AeadError> {
    if nonce.len() != NONCE_LEN {
        return Err(AeadError::InvalidNonceLength(nonce.len()));
    }
    if sealed.len() < TAG_LEN {
        return Err(AeadError::CiphertextTooShort);
    }
    let (ct, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let mut buf = ct.to_vec();
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buf, Tag::from_slice(tag))
        .map_err(|_| AeadError::DecryptionFailed)?;
    Ok(buf)
}
