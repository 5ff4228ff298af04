//! secp256k1 keypairs used for envelope key agreement.
//!
//! Private key material lives in `k256::SecretKey`, which zeroizes itself on
//! drop. Public keys are always handled in their 33-byte SEC1 compressed form.

use std::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand_core::OsRng;
use zeroize::Zeroizing;

/// Length of a secp256k1 private scalar.
pub const SECRET_KEY_LEN: usize = 32;
/// Length of a SEC1 compressed secp256k1 point.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Error type for key parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("invalid public key: not a point on secp256k1")]
    InvalidPublicKey,
    #[error("invalid secret key: scalar out of range")]
    InvalidSecretKey,
}

/// A secp256k1 keypair with a cached compressed public key.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: [u8; PUBLIC_KEY_LEN],
}

impl KeyPair {
    /// Generate a new keypair from the OS random source.
    ///
    /// Panics only if the OS entropy source is unavailable.
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::random(&mut OsRng))
    }

    /// Restore a keypair from a 32-byte private scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(KeyError::InvalidKeyLength {
                expected: SECRET_KEY_LEN,
                got: bytes.len(),
            });
        }
        let secret = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let mut public = [0u8; PUBLIC_KEY_LEN];
        public.copy_from_slice(secret.public_key().to_encoded_point(true).as_bytes());
        Self { secret, public }
    }

    /// Compressed public key bytes.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Copy of the private scalar, wiped when the returned buffer is dropped.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_LEN]> {
        Zeroizing::new(self.secret.to_bytes().into())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &PublicKeyHex(&self.public))
            .finish_non_exhaustive()
    }
}

struct PublicKeyHex<'a>(&'a [u8]);

impl fmt::Debug for PublicKeyHex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Parse a 33-byte compressed secp256k1 public key.
///
/// Uncompressed (65-byte) encodings are rejected; the envelope protocol only
/// ever carries compressed points.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    if bytes.len() != PUBLIC_KEY_LEN {
        return Err(KeyError::InvalidKeyLength {
            expected: PUBLIC_KEY_LEN,
            got: bytes.len(),
        });
    }
    PublicKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_compressed_key() {
        let kp = KeyPair::generate();
        let prefix = kp.public_key()[0];
        assert!(prefix == 0x02 || prefix == 0x03);
        assert!(parse_public_key(kp.public_key()).is_ok());
    }

    #[test]
    fn test_from_secret_bytes_round_trip() {
        let original = KeyPair::generate();
        let restored = KeyPair::from_secret_bytes(&original.secret_bytes()[..]).unwrap();
        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_zero_scalar_rejected() {
        assert_eq!(
            KeyPair::from_secret_bytes(&[0u8; 32]).unwrap_err(),
            KeyError::InvalidSecretKey
        );
    }

    #[test]
    fn test_wrong_secret_length_rejected() {
        assert_eq!(
            KeyPair::from_secret_bytes(&[1u8; 31]).unwrap_err(),
            KeyError::InvalidKeyLength { expected: 32, got: 31 }
        );
    }

    #[test]
    fn test_parse_public_key_rejects_bad_prefix() {
        let mut bytes = *KeyPair::generate().public_key();
        bytes[0] = 0x05;
        assert_eq!(parse_public_key(&bytes).unwrap_err(), KeyError::InvalidPublicKey);
    }

    #[test]
    fn test_parse_public_key_rejects_uncompressed() {
        let kp = KeyPair::generate();
        let uncompressed = kp.secret_key().public_key().to_encoded_point(false);
        assert!(matches!(
            parse_public_key(uncompressed.as_bytes()),
            Err(KeyError::InvalidKeyLength { expected: 33, got: 65 })
        ));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let kp = KeyPair::generate();
        let rendered = format!("{kp:?}");
        let secret_hex: String = kp.secret_bytes().iter().map(|b| format!("{b:02x}")).collect();
        assert!(!rendered.contains(&secret_hex));
    }
}
