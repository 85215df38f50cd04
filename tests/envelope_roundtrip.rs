use std::sync::OnceLock;

use keyseal::envelope::{self, Envelope, HEADER_LEN};
use keyseal::{KeyAlgorithm, KeyMaterial, KeysealError, Vault};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

fn recipient() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 1024).unwrap())
}

fn other_recipient() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 1024).unwrap())
}

fn vault() -> Vault {
    let material =
        KeyMaterial::from_private_key(KeyAlgorithm::Asymmetric, recipient().clone()).unwrap();
    Vault::from_material(material).unwrap()
}

#[test]
fn test_vault_envelope_roundtrip() {
    let vault = vault();
    for len in [1, 15, 16, 17, 4096] {
        let payload = vec![0xa5u8; len];
        let ciphertext = vault.encrypt(&payload).unwrap();
        assert_eq!(vault.decrypt(&ciphertext).unwrap(), payload, "length {len}");
    }
}

#[test]
fn test_empty_payload_rejected() {
    assert!(matches!(vault().encrypt(b""), Err(KeysealError::EmptyPayload)));
}

#[test]
fn test_multi_megabyte_payload() {
    let vault = vault();
    let payload: Vec<u8> = (0..3 * 1024 * 1024 + 7).map(|i| (i % 251) as u8).collect();
    let ciphertext = vault.encrypt(&payload).unwrap();
    assert!(ciphertext.len() > payload.len());
    assert_eq!(vault.decrypt(&ciphertext).unwrap(), payload);
}

#[test]
fn test_public_only_vault_seals_for_private_holder() {
    let public = KeyMaterial::from_public_key(
        KeyAlgorithm::Asymmetric,
        recipient().to_public_key(),
    )
    .unwrap();
    let sender = Vault::from_material(public).unwrap();
    let ciphertext = sender.encrypt(b"for your eyes only").unwrap();

    assert!(matches!(
        sender.decrypt(&ciphertext),
        Err(KeysealError::PrivateKeyRequired)
    ));
    assert_eq!(vault().decrypt(&ciphertext).unwrap(), b"for your eyes only");
}

#[test]
fn test_same_plaintext_seals_differently() {
    let public = recipient().to_public_key();
    let a = envelope::encode(&public, b"repeat").unwrap();
    let b = envelope::encode(&public, b"repeat").unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_wrong_recipient_is_key_mismatch() {
    let bytes = envelope::encode(&recipient().to_public_key(), b"payload").unwrap();
    assert!(matches!(
        envelope::decode(other_recipient(), &bytes),
        Err(KeysealError::KeyMismatch)
    ));
}

#[test]
fn test_header_matches_parts() {
    let bytes = envelope::encode(&recipient().to_public_key(), b"0123456789abcdef").unwrap();
    let parsed = Envelope::parse(&bytes).unwrap();

    let wrapped_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let iv_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    assert_eq!(wrapped_len, parsed.wrapped_key().len());
    assert_eq!(iv_len, parsed.iv().len());
    assert_eq!(iv_len, 16);
    // 16 bytes of plaintext pad to two blocks.
    assert_eq!(parsed.ciphertext().len(), 32);
    assert_eq!(bytes.len(), HEADER_LEN + wrapped_len + iv_len + 32);
    assert_eq!(parsed.to_bytes(), bytes);
}

#[test]
fn test_truncated_envelopes_are_corrupt() {
    let bytes = envelope::encode(&recipient().to_public_key(), b"payload").unwrap();
    for len in [0, 3, 7, HEADER_LEN + 10, bytes.len() - 1] {
        let result = envelope::decode(recipient(), &bytes[..len]);
        assert!(
            matches!(result, Err(KeysealError::EnvelopeCorrupt(_))),
            "length {len} gave {result:?}"
        );
    }
}

#[test]
fn test_flipped_ciphertext_never_returns_original() {
    let bytes = envelope::encode(&recipient().to_public_key(), b"integrity matters").unwrap();
    let mut tampered = bytes.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x80;
    match envelope::decode(recipient(), &tampered) {
        Ok(plaintext) => assert_ne!(plaintext, b"integrity matters"),
        Err(e) => assert!(matches!(e, KeysealError::EnvelopeCorrupt(_))),
    }
}
