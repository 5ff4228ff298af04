//! ADR-036 detached signatures.
//!
//! A transaction sign doc is repurposed as a generic signature over
//! arbitrary bytes. The doc carries a single `sign/MsgSignData` message and
//! pins every chain-context field to a neutral value:
//!
//! | field            | value          |
//! |------------------|----------------|
//! | `chain_id`       | `""`           |
//! | `account_number` | `"0"`          |
//! | `sequence`       | `"0"`          |
//! | `fee`            | `{gas: "0", amount: []}` |
//! | `memo`           | `""`           |
//!
//! No chain accepts that combination as a transaction, so the signature can
//! never be replayed on-chain. The pins are protocol constants: verification
//! re-checks every one of them and treats a violation as a malformed
//! document, never as a merely invalid signature.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hash::sha256;
use crate::keys::{KeyPair, PUBLIC_KEY_LEN};

pub const MSG_SIGN_DATA_TYPE: &str = "sign/MsgSignData";
pub const SECP256K1_PUBKEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// A pinned field of the detached sign doc that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinViolation {
    #[error("memo must be empty")]
    NonEmptyMemo,
    #[error("fee gas must be \"0\", got {0:?}")]
    NonZeroGas(String),
    #[error("fee amount must be an empty list")]
    NonEmptyFeeAmount,
    #[error("no message found; the signer address cannot be determined")]
    NoMessages,
    #[error("exactly one signature is supported, got {0}")]
    SignatureCount(usize),
    #[error("only secp256k1 signatures are supported, got {0:?}")]
    UnsupportedKeyType(String),
}

/// Error type for detached signature handling.
#[derive(Debug, thiserror::Error)]
pub enum Adr036Error {
    #[error("malformed detached document: {0}")]
    MalformedDocument(#[from] PinViolation),
    #[error("invalid {0} encoding")]
    Encoding(&'static str),
    #[error("sign doc serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("signing failed")]
    SigningFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

impl StdFee {
    /// The only fee a detached sign doc may carry.
    pub fn zero() -> Self {
        Self {
            amount: Vec::new(),
            gas: "0".to_string(),
        }
    }
}

/// Amino-JSON message: `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AminoMsg {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub value: Value,
}

/// Amino sign doc. Field names match the legacy JSON signing format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: StdFee,
    pub memo: String,
    pub msgs: Vec<AminoMsg>,
    pub sequence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    /// base64 of the 33-byte compressed key
    pub value: String,
}

impl PubKey {
    pub fn secp256k1(compressed: &[u8]) -> Self {
        Self {
            key_type: SECP256K1_PUBKEY_TYPE.to_string(),
            value: BASE64.encode(compressed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PubKey,
    /// base64 of the 64-byte `r || s` signature
    pub signature: String,
}

/// A sign doc together with its signatures, as submitted for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<AminoMsg>,
    pub fee: StdFee,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
}

/// `sign/MsgSignData` carrying `base64(data)` for `signer`.
pub fn sign_data_msg(signer: &str, data: &[u8]) -> AminoMsg {
    let mut value = Map::new();
    value.insert("signer".to_string(), Value::String(signer.to_string()));
    value.insert("data".to_string(), Value::String(BASE64.encode(data)));
    AminoMsg {
        msg_type: MSG_SIGN_DATA_TYPE.to_string(),
        value: Value::Object(value),
    }
}

/// Build the detached sign doc for `data` signed by `signer`.
pub fn build_sign_doc(signer: &str, data: &[u8]) -> StdSignDoc {
    neutral_sign_doc(vec![sign_data_msg(signer, data)], StdFee::zero(), String::new())
}

fn neutral_sign_doc(msgs: Vec<AminoMsg>, fee: StdFee, memo: String) -> StdSignDoc {
    StdSignDoc {
        account_number: "0".to_string(),
        chain_id: String::new(),
        fee,
        memo,
        msgs,
        sequence: "0".to_string(),
    }
}

impl StdSignDoc {
    /// Canonical Amino-JSON bytes: keys sorted at every level, no
    /// whitespace, HTML-sensitive characters written as `&`, `<`
    /// and `>`.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, Adr036Error> {
        let sorted = sort_json(serde_json::to_value(self)?);
        let json = serde_json::to_string(&sorted)?;
        Ok(escape_html_chars(&json).into_bytes())
    }

    /// sha256 of [`StdSignDoc::sign_bytes`]; this is what gets signed.
    pub fn digest(&self) -> Result<[u8; 32], Adr036Error> {
        Ok(sha256(&self.sign_bytes()?))
    }
}

fn sort_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_json(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json).collect()),
        other => other,
    }
}

fn escape_html_chars(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '&' => out.push_str("\\u0026"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            c => out.push(c),
        }
    }
    out
}

/// Attach a signature to a sign doc.
pub fn make_std_tx(doc: &StdSignDoc, signature: StdSignature) -> StdTx {
    StdTx {
        msg: doc.msgs.clone(),
        fee: doc.fee.clone(),
        signatures: vec![signature],
        memo: doc.memo.clone(),
    }
}

/// Sign `doc` with a local key. Produces a low-S signature.
pub fn sign_doc(key: &KeyPair, doc: &StdSignDoc) -> Result<StdSignature, Adr036Error> {
    let digest = doc.digest()?;
    let signing_key = SigningKey::from(key.secret_key());
    let sig: Signature = signing_key
        .sign_prehash(&digest)
        .map_err(|_| Adr036Error::SigningFailed)?;
    let sig = sig.normalize_s().unwrap_or(sig);
    Ok(StdSignature {
        pub_key: PubKey::secp256k1(key.public_key()),
        signature: BASE64.encode(sig.to_bytes()),
    })
}

/// Check every pin on a signed detached document.
pub fn check_pins(tx: &StdTx) -> Result<(), PinViolation> {
    if !tx.memo.is_empty() {
        return Err(PinViolation::NonEmptyMemo);
    }
    if tx.fee.gas != "0" {
        return Err(PinViolation::NonZeroGas(tx.fee.gas.clone()));
    }
    if !tx.fee.amount.is_empty() {
        return Err(PinViolation::NonEmptyFeeAmount);
    }
    if tx.msg.is_empty() {
        return Err(PinViolation::NoMessages);
    }
    if tx.signatures.len() != 1 {
        return Err(PinViolation::SignatureCount(tx.signatures.len()));
    }
    let key_type = &tx.signatures[0].pub_key.key_type;
    if key_type != SECP256K1_PUBKEY_TYPE {
        return Err(PinViolation::UnsupportedKeyType(key_type.clone()));
    }
    Ok(())
}

/// Verify a signed detached document.
///
/// Returns `Err` if any pin is violated or the key/signature bytes do not
/// decode. Returns `Ok(false)` if the document is well-formed but the
/// signature does not match the byte-exact reconstruction.
pub fn verify_std_tx(tx: &StdTx) -> Result<bool, Adr036Error> {
    check_pins(tx)?;
    let doc = neutral_sign_doc(tx.msg.clone(), tx.fee.clone(), tx.memo.clone());
    let sig = &tx.signatures[0];

    let pubkey = BASE64
        .decode(&sig.pub_key.value)
        .map_err(|_| Adr036Error::Encoding("pub_key"))?;
    let signature = BASE64
        .decode(&sig.signature)
        .map_err(|_| Adr036Error::Encoding("signature"))?;

    verify_signature(&doc, &pubkey, &signature)
}

/// Verify raw signature bytes over `doc` against a compressed secp256k1 key.
///
/// High-S signatures are malleated copies of a valid signature and are
/// reported as invalid.
pub fn verify_signature(doc: &StdSignDoc, pubkey: &[u8], signature: &[u8]) -> Result<bool, Adr036Error> {
    if pubkey.len() != PUBLIC_KEY_LEN {
        return Err(Adr036Error::Encoding("pub_key"));
    }
    let vk = VerifyingKey::from_sec1_bytes(pubkey).map_err(|_| Adr036Error::Encoding("pub_key"))?;
    let sig = Signature::from_slice(signature).map_err(|_| Adr036Error::Encoding("signature"))?;
    if sig.normalize_s().is_some() {
        return Ok(false);
    }

    let digest = doc.digest()?;
    Ok(vk.verify_prehash(&digest, &sig).is_ok())
}
