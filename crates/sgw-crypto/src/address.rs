//! Bech32 account addresses.
//!
//! The human-readable prefix of a cosmos-style address is everything before
//! the first `1`. Prefix extraction does not validate the checksum; callers
//! that need a well-formed address use [`validate_address`].

use bech32::{Bech32, Hrp};

use crate::hash::account_id;

/// Error type for address handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address {0:?} has no '1' separator")]
    MissingSeparator(String),
    #[error("address {0:?} has an empty human-readable prefix")]
    EmptyPrefix(String),
    #[error("invalid bech32 address {address:?}: {reason}")]
    InvalidBech32 { address: String, reason: String },
    #[error("invalid human-readable prefix {0:?}")]
    InvalidPrefix(String),
    #[error("address prefix mismatch: expected {expected}, found {found}")]
    PrefixMismatch { expected: String, found: String },
}

/// Human-readable prefix: the substring before the first `1`.
///
/// `"cosmos1pkptre7..."` yields `"cosmos"`. An address with no `1`, or one
/// that starts with `1`, is an error rather than an empty prefix.
pub fn address_prefix(address: &str) -> Result<&str, AddressError> {
    match address.split_once('1') {
        None => Err(AddressError::MissingSeparator(address.to_owned())),
        Some(("", _)) => Err(AddressError::EmptyPrefix(address.to_owned())),
        Some((prefix, _)) => Ok(prefix),
    }
}

/// Fully decode `address` as bech32 and return its prefix.
///
/// The decoded prefix must agree with [`address_prefix`]; a prefix that
/// itself contains `1` would make the two disagree and is rejected.
pub fn validate_address(address: &str) -> Result<String, AddressError> {
    let split = address_prefix(address)?;
    let (hrp, _) = bech32::decode(address).map_err(|e| AddressError::InvalidBech32 {
        address: address.to_owned(),
        reason: e.to_string(),
    })?;
    let decoded = hrp.to_lowercase();
    if decoded != split.to_lowercase() {
        return Err(AddressError::PrefixMismatch {
            expected: decoded,
            found: split.to_owned(),
        });
    }
    Ok(decoded)
}

/// Bech32 address of a secp256k1 public key under `hrp`.
pub fn pubkey_to_address(pubkey: &[u8], hrp: &str) -> Result<String, AddressError> {
    let hrp = Hrp::parse(hrp).map_err(|_| AddressError::InvalidPrefix(hrp.to_owned()))?;
    bech32::encode::<Bech32>(hrp, &account_id(pubkey)).map_err(|e| AddressError::InvalidBech32 {
        address: String::new(),
        reason: e.to_string(),
    })
}
