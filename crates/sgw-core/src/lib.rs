//! Secret gateway envelopes.
//!
//! This crate implements:
//! - Envelope assembly (recipient key, session key, seal, detached signature)
//! - Recipient-side opening and verification
//! - ADR-036 credentials and auth data
//! - Gateway contract message types
//! - Signer and key query abstractions

#![forbid(unsafe_code)]

// Protocol
pub mod envelope;
pub mod open;
pub mod credential;

// Collaborators
pub mod signer;
pub mod query;

// Supporting modules
pub mod config;
pub mod errors;
pub mod types;

#[cfg(test)]
mod proptests;
