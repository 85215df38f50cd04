use std::sync::OnceLock;

use keyseal::{KeyAlgorithm, KeyHalf, KeyKind, KeyMaterial, KeysealError, Vault};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
}

fn vault_of(kind: KeyKind) -> Vault {
    let key = rsa_key();
    let material = match kind {
        KeyKind::NotSet => KeyMaterial::None,
        KeyKind::SymmetricOnly => {
            return Vault::from_symmetric(&[7u8; 32], &[9u8; 16]).unwrap();
        }
        KeyKind::AsymmetricPrivate => {
            KeyMaterial::from_private_key(KeyAlgorithm::Asymmetric, key.clone()).unwrap()
        }
        KeyKind::AsymmetricPublicOnly => {
            KeyMaterial::from_public_key(KeyAlgorithm::Asymmetric, key.to_public_key()).unwrap()
        }
        KeyKind::SigningPrivate => {
            KeyMaterial::from_private_key(KeyAlgorithm::Signing, key.clone()).unwrap()
        }
        KeyKind::SigningPublicOnly => {
            KeyMaterial::from_public_key(KeyAlgorithm::Signing, key.to_public_key()).unwrap()
        }
    };
    Vault::from_material(material).unwrap()
}

const ALL_KINDS: [KeyKind; 6] = [
    KeyKind::NotSet,
    KeyKind::SymmetricOnly,
    KeyKind::AsymmetricPublicOnly,
    KeyKind::AsymmetricPrivate,
    KeyKind::SigningPrivate,
    KeyKind::SigningPublicOnly,
];

#[test]
fn test_classification_matches_construction() {
    for kind in ALL_KINDS {
        assert_eq!(vault_of(kind).kind(), kind);
    }
}

#[test]
fn test_predicates_agree_with_operations() {
    for kind in ALL_KINDS {
        let vault = vault_of(kind);
        assert_eq!(vault.encrypt(b"sample").is_ok(), vault.can_encrypt(), "{kind:?}");
        assert_eq!(vault.sign(b"sample").is_ok(), vault.can_sign(), "{kind:?}");
    }
}

#[test]
fn test_signing_keys_refuse_encryption() {
    for kind in [KeyKind::SigningPrivate, KeyKind::SigningPublicOnly] {
        let vault = vault_of(kind);
        assert!(matches!(
            vault.encrypt(b"data"),
            Err(KeysealError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            vault.decrypt(b"data"),
            Err(KeysealError::UnsupportedOperation(_))
        ));
    }
}

#[test]
fn test_encryption_keys_refuse_signatures() {
    for kind in [
        KeyKind::SymmetricOnly,
        KeyKind::AsymmetricPublicOnly,
        KeyKind::AsymmetricPrivate,
    ] {
        let vault = vault_of(kind);
        assert!(matches!(
            vault.sign(b"data"),
            Err(KeysealError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            vault.verify(b"data", &[0u8; 256]),
            Err(KeysealError::UnsupportedOperation(_))
        ));
    }
}

#[test]
fn test_public_halves_need_private_for_private_operations() {
    assert!(matches!(
        vault_of(KeyKind::AsymmetricPublicOnly).decrypt(b"data"),
        Err(KeysealError::PrivateKeyRequired)
    ));
    assert!(matches!(
        vault_of(KeyKind::SigningPublicOnly).sign(b"data"),
        Err(KeysealError::PrivateKeyRequired)
    ));
}

#[test]
fn test_symmetric_vault_refuses_private_export() {
    let vault = vault_of(KeyKind::SymmetricOnly);
    assert!(matches!(
        vault.export_key(KeyHalf::Private),
        Err(KeysealError::UnsupportedOperation(_))
    ));
}

#[test]
fn test_nothing_loaded() {
    let vault = Vault::empty();
    assert!(matches!(vault.encrypt(b"x"), Err(KeysealError::NoKeyLoaded)));
    assert!(matches!(vault.decrypt(b"x"), Err(KeysealError::NoKeyLoaded)));
    assert!(matches!(vault.sign(b"x"), Err(KeysealError::NoKeyLoaded)));
    assert!(matches!(vault.verify(b"x", b"y"), Err(KeysealError::NoKeyLoaded)));
    assert!(matches!(
        vault.export_key(KeyHalf::Private),
        Err(KeysealError::NoKeyLoaded)
    ));
}

#[test]
fn test_symmetric_key_cannot_come_from_rsa() {
    assert!(matches!(
        KeyMaterial::from_private_key(KeyAlgorithm::Symmetric, rsa_key().clone()),
        Err(KeysealError::InvalidOperation(_))
    ));
}

#[test]
fn test_vault_shared_across_threads() {
    let vault = std::sync::Arc::new(vault_of(KeyKind::AsymmetricPrivate));
    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let vault = vault.clone();
            std::thread::spawn(move || {
                let msg = vec![i; 100];
                let ct = vault.encrypt(&msg).unwrap();
                assert_eq!(vault.decrypt(&ct).unwrap(), msg);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
