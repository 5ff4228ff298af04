use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.finalize().into()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut h = Ripemd160::new();
    h.update(data);
    h.finalize().into()
}

/// Canonical account id for a secp256k1 public key: ripemd160(sha256(pubkey)).
pub fn account_id(pubkey_bytes: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(pubkey_bytes))
}
