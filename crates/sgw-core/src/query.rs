//! Recipient encryption key lookup.
//!
//! The gateway publishes its encryption public key through a contract
//! query. [`GatewayKeyQuery`] issues that query over any [`ContractQuery`]
//! client; [`StaticRecipientKey`] serves a key known in advance.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;
use thiserror::Error;

use crate::types::GatewayQueryMsg;

/// Errors reported by a query endpoint.
#[derive(Debug, Error, Clone)]
pub enum QueryError {
    #[error("query failed: {0}")]
    Failed(String),

    #[error("unexpected query response: {0}")]
    UnexpectedResponse(String),
}

/// Source of the recipient's base64 compressed public key.
#[async_trait]
pub trait RecipientKeyQuery: Send + Sync {
    async fn encryption_key(&self) -> Result<String, QueryError>;
}

/// Smart-query endpoint of a deployed contract.
#[async_trait]
pub trait ContractQuery: Send + Sync {
    async fn query(&self, msg: &Value) -> Result<Value, QueryError>;
}

/// Fixed recipient key.
#[derive(Debug, Clone)]
pub struct StaticRecipientKey {
    key: String,
}

impl StaticRecipientKey {
    pub fn new(key_base64: impl Into<String>) -> Self {
        Self { key: key_base64.into() }
    }

    pub fn from_bytes(key: &[u8]) -> Self {
        Self::new(BASE64.encode(key))
    }
}

#[async_trait]
impl RecipientKeyQuery for StaticRecipientKey {
    async fn encryption_key(&self) -> Result<String, QueryError> {
        Ok(self.key.clone())
    }
}

/// Resolves the key with an `{"encryption_key":{}}` contract query.
#[derive(Debug, Clone)]
pub struct GatewayKeyQuery<Q> {
    client: Q,
}

impl<Q: ContractQuery> GatewayKeyQuery<Q> {
    pub fn new(client: Q) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<Q: ContractQuery> RecipientKeyQuery for GatewayKeyQuery<Q> {
    async fn encryption_key(&self) -> Result<String, QueryError> {
        let msg = serde_json::to_value(GatewayQueryMsg::EncryptionKey {})
            .map_err(|e| QueryError::Failed(e.to_string()))?;
        match self.client.query(&msg).await? {
            Value::String(key) => Ok(key),
            other => Err(QueryError::UnexpectedResponse(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeGateway {
        response: Value,
    }

    #[async_trait]
    impl ContractQuery for FakeGateway {
        async fn query(&self, msg: &Value) -> Result<Value, QueryError> {
            if msg == &json!({"encryption_key": {}}) {
                Ok(self.response.clone())
            } else {
                Err(QueryError::Failed(format!("unknown query {msg}")))
            }
        }
    }

    #[tokio::test]
    async fn test_gateway_key_query() {
        let query = GatewayKeyQuery::new(FakeGateway {
            response: json!("A08EGB7ro1ORuFhjOnZcSgwYlpe0DSFjVNUIkNNQxwKQ"),
        });
        assert_eq!(
            query.encryption_key().await.unwrap(),
            "A08EGB7ro1ORuFhjOnZcSgwYlpe0DSFjVNUIkNNQxwKQ"
        );
    }

    #[tokio::test]
    async fn test_gateway_key_query_rejects_non_string() {
        let query = GatewayKeyQuery::new(FakeGateway { response: json!({"key": 1}) });
        assert!(matches!(
            query.encryption_key().await,
            Err(QueryError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_static_key() {
        let query = StaticRecipientKey::from_bytes(&[2u8; 33]);
        assert_eq!(BASE64.decode(query.encryption_key().await.unwrap()).unwrap(), vec![2u8; 33]);
    }
}
