//! Envelope builder configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Bounds and address policy for [`crate::envelope::EnvelopeBuilder`].
///
/// # Example TOML
///
/// ```toml
/// query_timeout_secs = 30
/// sign_timeout_secs = 120
/// strict_addresses = false
/// default_hrp = "secret"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Upper bound on the recipient key query
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Upper bound on each signer call; wallets may wait for user approval
    #[serde(default = "default_sign_timeout")]
    pub sign_timeout_secs: u64,

    /// Require a valid bech32 checksum on the signer address
    #[serde(default)]
    pub strict_addresses: bool,

    /// Prefix used when a credential carries no `hrp`
    #[serde(default = "default_hrp")]
    pub default_hrp: String,
}

fn default_query_timeout() -> u64 {
    30
}

fn default_sign_timeout() -> u64 {
    120
}

fn default_hrp() -> String {
    "secret".to_string()
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: default_query_timeout(),
            sign_timeout_secs: default_sign_timeout(),
            strict_addresses: false,
            default_hrp: default_hrp(),
        }
    }
}

impl EnvelopeConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn sign_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "query_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.sign_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sign_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.default_hrp.is_empty() || self.default_hrp.contains('1') {
            return Err(ConfigError::ValidationError(format!(
                "default_hrp {:?} must be non-empty and must not contain '1'",
                self.default_hrp
            )));
        }
        Ok(())
    }
}
