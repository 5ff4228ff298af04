//! Key files for local accounts and recipient keys
//!
//! A key file is JSON holding the hex private scalar together with the
//! derived public key and address. Files are written owner-readable only.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sgw_core::signer::{LocalWallet, SignerError};
use sgw_crypto::keys::KeyPair;

/// Key file errors
#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed key file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid secret key encoding")]
    Encoding,

    #[error("Invalid key: {0}")]
    Key(#[from] SignerError),

    #[error("Refusing to overwrite existing key file {0}")]
    Exists(String),
}

/// On-disk key material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    /// Private scalar, hex encoded
    pub secret_key: String,
    /// Compressed public key, base64
    pub public_key: String,
    pub address: String,
}

/// Public part of a key file, safe to print
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfo {
    pub public_key: String,
    pub address: String,
}

impl KeyFile {
    pub fn from_wallet(wallet: &LocalWallet) -> Self {
        Self {
            secret_key: hex::encode(&wallet.key_pair().secret_bytes()[..]),
            public_key: BASE64.encode(wallet.key_pair().public_key()),
            address: wallet.address().to_string(),
        }
    }

    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            public_key: self.public_key.clone(),
            address: self.address.clone(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, KeyFileError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), KeyFileError> {
        if path.exists() {
            return Err(KeyFileError::Exists(path.display().to_string()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    fn secret_bytes(&self) -> Result<zeroize::Zeroizing<Vec<u8>>, KeyFileError> {
        hex::decode(&self.secret_key)
            .map(zeroize::Zeroizing::new)
            .map_err(|_| KeyFileError::Encoding)
    }

    /// Signing wallet; the address is re-derived under the stored prefix.
    pub fn wallet(&self) -> Result<LocalWallet, KeyFileError> {
        let hrp = sgw_crypto::address::address_prefix(&self.address)
            .map_err(|e| KeyFileError::Key(SignerError::Address(e)))?;
        Ok(LocalWallet::from_secret_bytes(&self.secret_bytes()?, hrp)?)
    }

    /// Raw keypair, used as a recipient encryption key.
    pub fn key_pair(&self) -> Result<KeyPair, KeyFileError> {
        KeyPair::from_secret_bytes(&self.secret_bytes()?)
            .map_err(|e| KeyFileError::Key(SignerError::Key(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("wallet.json");
        let wallet = LocalWallet::generate("secret").unwrap();

        KeyFile::from_wallet(&wallet).save(&path).unwrap();
        let loaded = KeyFile::load(&path).unwrap();

        assert_eq!(loaded.address, wallet.address());
        assert_eq!(loaded.wallet().unwrap().account(), wallet.account());
        assert_eq!(loaded.key_pair().unwrap().public_key(), wallet.key_pair().public_key());
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let key = KeyFile::from_wallet(&LocalWallet::generate("secret").unwrap());

        key.save(&path).unwrap();
        assert!(matches!(key.save(&path), Err(KeyFileError::Exists(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        KeyFile::from_wallet(&LocalWallet::generate("secret").unwrap())
            .save(&path)
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_info_omits_secret() {
        let key = KeyFile::from_wallet(&LocalWallet::generate("secret").unwrap());
        let printed = serde_json::to_string(&key.info()).unwrap();
        assert!(!printed.contains(&key.secret_key));
    }

    #[test]
    fn test_bad_hex_rejected() {
        let mut key = KeyFile::from_wallet(&LocalWallet::generate("secret").unwrap());
        key.secret_key = "zz".to_string();
        assert!(matches!(key.wallet(), Err(KeyFileError::Encoding)));
    }
}
