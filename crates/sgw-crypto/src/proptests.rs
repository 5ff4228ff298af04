#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::adr036::{build_sign_doc, make_std_tx, sign_doc, verify_std_tx};
    use crate::aead::{open, seal, NONCE_LEN};
    use crate::ecdh::derive_shared_secret;
    use crate::keys::KeyPair;
    use crate::session_keys::SessionKeyCache;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_seal_open_round_trip(
            plaintext in any::<Vec<u8>>(),
            nonce in any::<[u8; NONCE_LEN]>()
        ) {
            let sender = KeyPair::generate();
            let recipient = KeyPair::generate();

            let tx_key = derive_shared_secret(sender.secret_key(), recipient.public_key()).unwrap();
            let rx_key = derive_shared_secret(recipient.secret_key(), sender.public_key()).unwrap();

            let blob = seal(&tx_key, &nonce, &plaintext).unwrap().to_bytes();
            prop_assert_eq!(open(&rx_key, &nonce, &blob).unwrap(), plaintext);
        }

        #[test]
        fn test_any_bit_flip_breaks_tag(
            plaintext in proptest::collection::vec(any::<u8>(), 1..256),
            flip in any::<prop::sample::Index>(),
            bit in 0u8..8
        ) {
            let a = KeyPair::generate();
            let b = KeyPair::generate();
            let key = derive_shared_secret(a.secret_key(), b.public_key()).unwrap();
            let nonce = [0x42u8; NONCE_LEN];

            let mut blob = seal(&key, &nonce, &plaintext).unwrap().to_bytes();
            let idx = flip.index(blob.len());
            blob[idx] ^= 1 << bit;

            prop_assert!(open(&key, &nonce, &blob).is_err());
        }

        #[test]
        fn test_cache_returns_same_key_per_nonce(nonce in "[A-Za-z0-9+/]{16}") {
            let cache = SessionKeyCache::new();
            let first = cache.get_or_create(&nonce);
            let second = cache.get_or_create(&nonce);
            prop_assert_eq!(first.public_key(), second.public_key());
            prop_assert_eq!(cache.len(), 1);
        }

        #[test]
        fn test_detached_signature_round_trip(data in any::<Vec<u8>>()) {
            let key = KeyPair::generate();
            let doc = build_sign_doc("secret1signer", &data);
            let sig = sign_doc(&key, &doc).unwrap();
            prop_assert!(verify_std_tx(&make_std_tx(&doc, sig)).unwrap());
        }
    }
}
