//! Wire types for the gateway contract.
//!
//! Messages are closed, externally tagged enums with snake_case tags, so
//! `GatewayExecuteMsg::Encrypted(..)` serializes as `{"encrypted":{...}}`.

use serde::{Deserialize, Serialize};

use sgw_crypto::adr036::StdSignature;

use crate::credential::CosmosAuthData;

/// Encrypted, signed execute message as it travels to the gateway.
///
/// All fields are base64. `payload` is `ciphertext || tag`, `payload_hash`
/// is its sha256, and `payload_signature` is the 64-byte ADR-036 signature
/// over that hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    pub nonce: String,
    pub user_key: String,
    pub payload: String,
    pub payload_hash: String,
    pub payload_signature: String,
}

/// Plaintext sealed inside an envelope. Field order is part of the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub user_address: String,
    /// base64 of the signer's compressed public key
    pub user_pubkey: String,
    pub hrp: String,
    /// base64 of the serialized inner message
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendedMethods {
    StoreSecret { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InnerQueries {
    GetSecret {},
    Test {},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayExecuteMsg {
    ResetEncryptionKey {},
    Extension { msg: ExtendedMethods },
    Encrypted(SealedEnvelope),
}

impl GatewayExecuteMsg {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, GatewayExecuteMsg::Encrypted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitParams {
    pub permit_name: String,
    pub allowed_tokens: Vec<String>,
    pub chain_id: String,
    pub permissions: Vec<String>,
}

/// Query permit signed by the querying account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    pub params: PermitParams,
    pub signature: StdSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayQueryMsg {
    EncryptionKey {},
    WithPermit {
        query: InnerQueries,
        permit: Permit,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hrp: Option<String>,
    },
    WithAuthData {
        query: InnerQueries,
        auth_data: CosmosAuthData,
    },
}
