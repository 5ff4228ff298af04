#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use proptest::prelude::*;

    use sgw_crypto::session_keys::SessionKeyCache;

    use crate::config::EnvelopeConfig;
    use crate::envelope::EnvelopeBuilder;
    use crate::open::EnvelopeOpener;
    use crate::signer::LocalWallet;
    use crate::types::{ExtendedMethods, GatewayExecuteMsg, SealedEnvelope};

    fn seal_text(opener: &EnvelopeOpener, wallet: &LocalWallet, text: &str) -> SealedEnvelope {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let builder = EnvelopeBuilder::new(Arc::new(SessionKeyCache::new()), EnvelopeConfig::default());
        let msg = GatewayExecuteMsg::Extension {
            msg: ExtendedMethods::StoreSecret { text: text.to_string() },
        };
        rt.block_on(builder.build(wallet, &msg, Some(&opener.public_key_base64())))
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_envelope_round_trip(text in ".{0,200}", hrp in "[a-z]{1,10}") {
            let opener = EnvelopeOpener::generate();
            let wallet = LocalWallet::generate(&hrp).unwrap();

            let envelope = seal_text(&opener, &wallet, &text);
            let opened = opener.open(&envelope).unwrap();

            prop_assert_eq!(opened.sender(), wallet.address());
            prop_assert_eq!(&opened.payload.hrp, &hrp);
            let msg: GatewayExecuteMsg = opened.message_json().unwrap();
            prop_assert_eq!(msg, GatewayExecuteMsg::Extension {
                msg: ExtendedMethods::StoreSecret { text },
            });
        }

        #[test]
        fn test_tampered_payload_never_opens(
            flip in any::<prop::sample::Index>(),
            bit in 0u8..8,
            rehash in any::<bool>()
        ) {
            let opener = EnvelopeOpener::generate();
            let wallet = LocalWallet::generate("secret").unwrap();
            let mut envelope = seal_text(&opener, &wallet, "payload");

            let mut payload = BASE64.decode(&envelope.payload).unwrap();
            let idx = flip.index(payload.len());
            payload[idx] ^= 1 << bit;
            envelope.payload = BASE64.encode(&payload);
            if rehash {
                envelope.payload_hash = BASE64.encode(sgw_crypto::hash::sha256(&payload));
            }

            prop_assert!(opener.open(&envelope).is_err());
        }
    }
}
