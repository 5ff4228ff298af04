//! Envelope assembly.
//!
//! Building an envelope is a strictly ordered pipeline:
//!
//! 1. resolve the recipient key (queried if not supplied)
//! 2. take the signer's first account and its address prefix
//! 3. draw a random 12-byte nonce and fetch its session keypair
//! 4. derive the shared secret and seal the [`EncryptedPayload`]
//! 5. hash `ciphertext || tag` and have the account sign the hash
//! 6. verify the signature locally before releasing anything
//!
//! Suspension happens only at the recipient query and the two signer calls,
//! each bounded by the configured timeout. Nothing is cached except the
//! session keypair, and that insertion is atomic, so a cancelled build
//! leaves no partial state behind.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use tracing::{debug, warn};

use sgw_crypto::adr036::{build_sign_doc, make_std_tx, verify_std_tx, Adr036Error, StdTx};
use sgw_crypto::aead::{random_nonce, seal};
use sgw_crypto::address::{address_prefix, validate_address};
use sgw_crypto::ecdh::derive_shared_secret;
use sgw_crypto::hash::sha256;
use sgw_crypto::keys::parse_public_key;
use sgw_crypto::session_keys::SessionKeyCache;

use crate::config::EnvelopeConfig;
use crate::errors::EnvelopeError;
use crate::query::{QueryError, RecipientKeyQuery};
use crate::signer::{request_signature, AccountData, AminoSigner};
use crate::types::{EncryptedPayload, GatewayExecuteMsg, SealedEnvelope};

/// Produces sealed envelopes for a single recipient.
///
/// The session key cache is shared: clone the `Arc` into every builder that
/// must see the same nonce-to-key mapping.
pub struct EnvelopeBuilder {
    sessions: Arc<SessionKeyCache>,
    recipient: Option<Arc<dyn RecipientKeyQuery>>,
    config: EnvelopeConfig,
}

impl EnvelopeBuilder {
    pub fn new(sessions: Arc<SessionKeyCache>, config: EnvelopeConfig) -> Self {
        Self {
            sessions,
            recipient: None,
            config,
        }
    }

    /// Source for the recipient key when a build is not given one.
    pub fn with_recipient_query(mut self, query: Arc<dyn RecipientKeyQuery>) -> Self {
        self.recipient = Some(query);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionKeyCache> {
        &self.sessions
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Seal `msg` for the recipient and sign it with `signer`'s first account.
    ///
    /// `recipient_key` is the recipient's base64 compressed public key; when
    /// `None` it is fetched from the configured [`RecipientKeyQuery`].
    pub async fn build<M>(
        &self,
        signer: &dyn AminoSigner,
        msg: &M,
        recipient_key: Option<&str>,
    ) -> Result<SealedEnvelope, EnvelopeError>
    where
        M: Serialize + ?Sized,
    {
        let recipient = self.resolve_recipient(recipient_key).await?;

        let accounts = bounded("signer accounts", self.config.sign_timeout(), signer.accounts()).await??;
        let account = accounts.into_iter().next().ok_or(EnvelopeError::NoAccounts)?;
        let hrp = self.account_prefix(&account.address)?;

        let nonce = random_nonce()?;
        let nonce_id = BASE64.encode(nonce);
        let session = self.sessions.get_or_create(&nonce_id);
        let key = derive_shared_secret(session.secret_key(), &recipient)?;
        debug!(
            nonce = %nonce_id,
            session_key = %fingerprint(session.public_key()),
            recipient = %fingerprint(&recipient),
            "sealing envelope"
        );

        let payload = EncryptedPayload {
            user_address: account.address.clone(),
            user_pubkey: BASE64.encode(&account.pubkey),
            hrp,
            msg: BASE64.encode(serde_json::to_vec(msg)?),
        };
        let sealed = seal(&key, &nonce, &serde_json::to_vec(&payload)?)?.to_bytes();
        let payload_hash = sha256(&sealed);

        let doc = build_sign_doc(&account.address, &payload_hash);
        let signature = request_signature(signer, &account.address, &doc, self.config.sign_timeout()).await?;
        let tx = make_std_tx(&doc, signature);
        check_signed(&account, &tx)?;

        debug!(
            address = %account.address,
            payload_len = sealed.len(),
            hash = %fingerprint(&payload_hash),
            "envelope assembled"
        );

        let payload_signature = tx
            .signatures
            .into_iter()
            .next()
            .map(|s| s.signature)
            .ok_or(EnvelopeError::EnvelopeIntegrity("signature missing after verification"))?;

        Ok(SealedEnvelope {
            nonce: nonce_id,
            user_key: BASE64.encode(session.public_key()),
            payload: BASE64.encode(&sealed),
            payload_hash: BASE64.encode(payload_hash),
            payload_signature,
        })
    }

    /// Build an envelope around `msg` and wrap it as `{"encrypted":{...}}`.
    pub async fn build_execute_msg(
        &self,
        signer: &dyn AminoSigner,
        msg: &GatewayExecuteMsg,
        recipient_key: Option<&str>,
    ) -> Result<GatewayExecuteMsg, EnvelopeError> {
        if msg.is_encrypted() {
            return Err(EnvelopeError::NestedEncryption);
        }
        let envelope = self.build(signer, msg, recipient_key).await?;
        Ok(GatewayExecuteMsg::Encrypted(envelope))
    }

    async fn resolve_recipient(&self, supplied: Option<&str>) -> Result<Vec<u8>, EnvelopeError> {
        let encoded = match (supplied, &self.recipient) {
            (Some(key), _) => key.to_owned(),
            (None, Some(query)) => {
                bounded("recipient key query", self.config.query_timeout(), query.encryption_key()).await??
            }
            (None, None) => {
                return Err(EnvelopeError::Query(QueryError::Failed(
                    "no recipient key given and no key query configured".to_string(),
                )))
            }
        };
        let key = BASE64
            .decode(encoded.trim())
            .map_err(|_| EnvelopeError::Encoding("recipient key"))?;
        parse_public_key(&key)?;
        Ok(key)
    }

    fn account_prefix(&self, address: &str) -> Result<String, EnvelopeError> {
        if self.config.strict_addresses {
            Ok(validate_address(address)?)
        } else {
            Ok(address_prefix(address)?.to_owned())
        }
    }
}

/// Fail closed unless the returned signature verifies and was made by the
/// account's own key.
fn check_signed(account: &AccountData, tx: &StdTx) -> Result<(), EnvelopeError> {
    let verified = match verify_std_tx(tx) {
        Ok(verified) => verified,
        Err(Adr036Error::MalformedDocument(pin)) => return Err(EnvelopeError::MalformedDetachedDocument(pin)),
        Err(e) => {
            warn!(address = %account.address, error = %e, "signer returned an undecodable signature");
            return Err(EnvelopeError::EnvelopeIntegrity("detached signature does not decode"));
        }
    };
    if !verified {
        warn!(address = %account.address, "signer returned a signature that does not verify");
        return Err(EnvelopeError::EnvelopeIntegrity("detached signature does not verify"));
    }
    let returned = tx
        .signatures
        .first()
        .map(|s| BASE64.decode(&s.pub_key.value))
        .transpose()
        .map_err(|_| EnvelopeError::Encoding("signature public key"))?;
    if returned.as_deref() != Some(account.pubkey.as_slice()) {
        warn!(address = %account.address, "signer used a key other than the account key");
        return Err(EnvelopeError::EnvelopeIntegrity("signature key differs from account key"));
    }
    Ok(())
}

async fn bounded<F: Future>(operation: &'static str, limit: Duration, fut: F) -> Result<F::Output, EnvelopeError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| EnvelopeError::Timeout {
            operation,
            secs: limit.as_secs(),
        })
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(8)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgw_crypto::keys::KeyPair;

    use crate::query::StaticRecipientKey;
    use crate::signer::LocalWallet;

    fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::new(Arc::new(SessionKeyCache::new()), EnvelopeConfig::default())
    }

    #[tokio::test]
    async fn test_build_produces_decodable_fields() {
        let recipient = KeyPair::generate();
        let wallet = LocalWallet::generate("secret").unwrap();
        let key = BASE64.encode(recipient.public_key());

        let envelope = builder().build(&wallet, &serde_json::json!({"test": {}}), Some(&key)).await.unwrap();

        assert_eq!(BASE64.decode(&envelope.nonce).unwrap().len(), 12);
        assert_eq!(BASE64.decode(&envelope.user_key).unwrap().len(), 33);
        assert_eq!(BASE64.decode(&envelope.payload_signature).unwrap().len(), 64);
        let payload = BASE64.decode(&envelope.payload).unwrap();
        assert_eq!(BASE64.decode(&envelope.payload_hash).unwrap(), sha256(&payload).to_vec());
    }

    #[tokio::test]
    async fn test_user_key_is_session_key_for_nonce() {
        let recipient = KeyPair::generate();
        let wallet = LocalWallet::generate("secret").unwrap();
        let builder = builder();

        let envelope = builder
            .build(&wallet, "hello", Some(&BASE64.encode(recipient.public_key())))
            .await
            .unwrap();

        let session = builder.sessions().get(&envelope.nonce).unwrap();
        assert_eq!(envelope.user_key, BASE64.encode(session.public_key()));
    }

    #[tokio::test]
    async fn test_recipient_key_from_query() {
        let recipient = KeyPair::generate();
        let wallet = LocalWallet::generate("secret").unwrap();
        let builder =
            builder().with_recipient_query(Arc::new(StaticRecipientKey::from_bytes(recipient.public_key())));

        assert!(builder.build(&wallet, "hello", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_recipient_source_is_error() {
        let wallet = LocalWallet::generate("secret").unwrap();
        assert!(matches!(
            builder().build(&wallet, "hello", None).await,
            Err(EnvelopeError::Query(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_recipient_key() {
        let wallet = LocalWallet::generate("secret").unwrap();

        let short = BASE64.encode([2u8; 20]);
        assert!(matches!(
            builder().build(&wallet, "hello", Some(&short)).await,
            Err(EnvelopeError::InvalidKey(_))
        ));

        assert!(matches!(
            builder().build(&wallet, "hello", Some("not base64!")).await,
            Err(EnvelopeError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn test_nested_encryption_rejected() {
        let recipient = KeyPair::generate();
        let wallet = LocalWallet::generate("secret").unwrap();
        let key = BASE64.encode(recipient.public_key());
        let builder = builder();

        let wrapped = builder
            .build_execute_msg(&wallet, &GatewayExecuteMsg::ResetEncryptionKey {}, Some(&key))
            .await
            .unwrap();
        assert!(wrapped.is_encrypted());

        assert!(matches!(
            builder.build_execute_msg(&wallet, &wrapped, Some(&key)).await,
            Err(EnvelopeError::NestedEncryption)
        ));
    }

    #[test]
    fn test_fingerprint_is_short_hex() {
        assert_eq!(fingerprint(&[0xab; 33]), "abababababababab");
        assert_eq!(fingerprint(&[0x01, 0x02]), "0102");
    }
}
