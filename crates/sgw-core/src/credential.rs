//! ADR-036 credentials: proof that an account signed an exact byte string.
//!
//! A credential carries no address. The verifier derives it from the public
//! key and the credential's prefix, rebuilds the detached sign doc with that
//! address as signer, and checks the signature against it.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sgw_crypto::adr036::{build_sign_doc, verify_signature};
use sgw_crypto::address::{address_prefix, pubkey_to_address};

use crate::errors::CredentialError;
use crate::signer::AminoSigner;

/// Upper bound on credentials in one [`CosmosAuthData`].
pub const MAX_CREDENTIALS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosCredential {
    /// base64 of the 64-byte signature
    pub signature: String,
    /// base64 of the compressed public key
    pub pubkey: String,
    /// base64 of the signed bytes
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrp: Option<String>,
}

impl CosmosCredential {
    fn decoded_pubkey(&self) -> Result<Vec<u8>, CredentialError> {
        BASE64
            .decode(&self.pubkey)
            .map_err(|_| CredentialError::Encoding("pubkey"))
    }

    /// Signer address, using `default_hrp` when the credential has none.
    pub fn address(&self, default_hrp: &str) -> Result<String, CredentialError> {
        let hrp = self.hrp.as_deref().unwrap_or(default_hrp);
        Ok(pubkey_to_address(&self.decoded_pubkey()?, hrp)?)
    }

    /// `Ok(false)` if the signature does not cover `message` for the
    /// derived address.
    pub fn verify(&self, default_hrp: &str) -> Result<bool, CredentialError> {
        let pubkey = self.decoded_pubkey()?;
        let address = self.address(default_hrp)?;
        let message = BASE64
            .decode(&self.message)
            .map_err(|_| CredentialError::Encoding("message"))?;
        let signature = BASE64
            .decode(&self.signature)
            .map_err(|_| CredentialError::Encoding("signature"))?;

        let doc = build_sign_doc(&address, &message);
        let ok = verify_signature(&doc, &pubkey, &signature)?;
        if !ok {
            warn!(address = %address, "credential signature rejected");
        }
        Ok(ok)
    }
}

/// Sign `data` with the signer's first account.
pub async fn create_credential(
    signer: &dyn AminoSigner,
    data: &[u8],
    limit: Duration,
) -> Result<CosmosCredential, CredentialError> {
    let accounts = bounded("signer accounts", limit, signer.accounts()).await??;
    let account = accounts.into_iter().next().ok_or(CredentialError::NoAccounts)?;
    let hrp = address_prefix(&account.address)?.to_owned();

    let doc = build_sign_doc(&account.address, data);
    let signed = bounded("signature request", limit, signer.sign_detached(&account.address, &doc)).await??;
    debug!(address = %account.address, len = data.len(), "credential created");

    Ok(CosmosCredential {
        signature: signed.signature,
        pubkey: signed.pub_key.value,
        message: BASE64.encode(data),
        hrp: Some(hrp),
    })
}

async fn bounded<F: std::future::Future>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<F::Output, CredentialError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CredentialError::Timeout {
            operation,
            secs: limit.as_secs(),
        })
}

/// A set of credentials presented together, one of them primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosAuthData {
    pub credentials: Vec<CosmosCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_index: Option<u8>,
}

impl CosmosAuthData {
    pub fn validate(&self) -> Result<(), CredentialError> {
        let len = self.credentials.len();
        if len == 0 || len > MAX_CREDENTIALS {
            return Err(CredentialError::CredentialCount {
                max: MAX_CREDENTIALS,
                got: len,
            });
        }
        if let Some(index) = self.primary_index {
            if usize::from(index) >= len {
                return Err(CredentialError::PrimaryIndexOutOfBounds {
                    index: index.into(),
                    len,
                });
            }
        }
        Ok(())
    }

    /// `Ok(true)` only if the set is well-formed and every credential verifies.
    pub fn verify(&self, default_hrp: &str) -> Result<bool, CredentialError> {
        self.validate()?;
        for credential in &self.credentials {
            if !credential.verify(default_hrp)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn primary_position(&self) -> usize {
        self.primary_index.map(usize::from).unwrap_or(0)
    }

    pub fn primary(&self) -> Option<&CosmosCredential> {
        self.credentials.get(self.primary_position())
    }

    pub fn secondaries(&self) -> Vec<&CosmosCredential> {
        let primary = self.primary_position();
        self.credentials
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != primary)
            .map(|(_, c)| c)
            .collect()
    }
}
