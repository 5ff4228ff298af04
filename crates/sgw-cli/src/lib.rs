//! sgw - command-line access to secret gateway envelopes
//!
//! This crate provides a command-line interface for:
//! - Generating local account and recipient key files
//! - Sealing messages into signed, encrypted envelopes
//! - Opening envelopes with a recipient key
//! - Creating and verifying ADR-036 credentials

pub mod cli;
pub mod config;
pub mod keyfile;

pub use cli::Cli;
pub use config::Config;

use sgw_core::errors::{CredentialError, EnvelopeError, OpenError};

/// Exit codes for CLI operations
///
/// - 0: Success
/// - 1: General error
/// - 2: Verification failed (signature, hash, or sender check)
/// - 3: Timeout waiting for a signer or query
/// - 5: Invalid input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    VerificationFailed = 2,
    Timeout = 3,
    InvalidInput = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::VerificationFailed => "VERIFICATION_FAILED",
            ExitCode::Timeout => "TIMEOUT",
            ExitCode::InvalidInput => "INVALID_INPUT",
        }
    }

    /// Classify a command failure.
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<EnvelopeError>() {
            return match e {
                EnvelopeError::Timeout { .. } => ExitCode::Timeout,
                EnvelopeError::EnvelopeIntegrity(_) => ExitCode::VerificationFailed,
                EnvelopeError::InvalidKey(_)
                | EnvelopeError::Encoding(_)
                | EnvelopeError::Address(_)
                | EnvelopeError::NestedEncryption => ExitCode::InvalidInput,
                _ => ExitCode::GeneralError,
            };
        }
        if let Some(e) = err.downcast_ref::<OpenError>() {
            return match e {
                OpenError::Encoding(_) | OpenError::MalformedPayload(_) => ExitCode::InvalidInput,
                _ => ExitCode::VerificationFailed,
            };
        }
        if let Some(e) = err.downcast_ref::<CredentialError>() {
            return match e {
                CredentialError::Timeout { .. } => ExitCode::Timeout,
                _ => ExitCode::InvalidInput,
            };
        }
        ExitCode::GeneralError
    }
}

#[cfg(test)]
mod exit_code_tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::GeneralError as i32, 1);
        assert_eq!(ExitCode::VerificationFailed as i32, 2);
        assert_eq!(ExitCode::Timeout as i32, 3);
        assert_eq!(ExitCode::InvalidInput as i32, 5);
        assert_eq!(i32::from(ExitCode::Timeout), 3);
    }

    #[test]
    fn test_exit_code_names() {
        assert_eq!(ExitCode::Success.name(), "SUCCESS");
        assert_eq!(ExitCode::VerificationFailed.name(), "VERIFICATION_FAILED");
    }

    #[test]
    fn test_error_classification() {
        let timeout = anyhow::Error::new(EnvelopeError::Timeout {
            operation: "signature request",
            secs: 120,
        });
        assert_eq!(ExitCode::from_error(&timeout), ExitCode::Timeout);

        let rejected = anyhow::Error::new(OpenError::SignatureRejected);
        assert_eq!(ExitCode::from_error(&rejected), ExitCode::VerificationFailed);

        let other = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_error(&other), ExitCode::GeneralError);
    }
}
