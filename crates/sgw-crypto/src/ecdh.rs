//! secp256k1 key agreement.
//!
//! `ecdh` follows the libsecp256k1 convention: the output is the SHA-256 of
//! the compressed shared point, not its bare x-coordinate. The AEAD key is a
//! second SHA-256 over that output, so raw Diffie-Hellman material never
//! reaches the cipher.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, PublicKey, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hash::sha256;
use crate::keys::{parse_public_key, KeyError};

/// 32-byte symmetric key derived from a key agreement.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        crate::utils::constant_time_compare_array(&self.0, &other.0)
    }
}

impl Eq for SharedSecret {}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// libsecp256k1-compatible ECDH: sha256(compressed(local * remote)).
pub fn ecdh(local: &SecretKey, remote: &PublicKey) -> [u8; 32] {
    let shared: AffinePoint = (remote.to_projective() * *local.to_nonzero_scalar()).into();
    let encoded = shared.to_encoded_point(true);
    sha256(encoded.as_bytes())
}

/// Derive the envelope key from a local private key and a remote
/// 33-byte compressed public key.
pub fn derive_shared_secret(local: &SecretKey, remote_public: &[u8]) -> Result<SharedSecret, KeyError> {
    let remote = parse_public_key(remote_public)?;
    let mut raw = ecdh(local, &remote);
    let key = SharedSecret(sha256(&raw));
    raw.zeroize();
    Ok(key)
}
