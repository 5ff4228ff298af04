#![forbid(unsafe_code)]

pub mod hash;
pub mod keys;
pub mod ecdh;
pub mod session_keys;
pub mod aead;

pub mod address;
pub mod adr036;
pub mod utils;

#[cfg(test)]
mod proptests;
