//! Key material and classification.
//!
//! This module owns two responsibilities:
//! 1. Holding loaded key material as one explicit tagged variant.
//! 2. Classifying that variant into a [`KeyKind`], from which every
//!    capability check is a pure lookup.
//!
//! RSA keys come from the `rsa` crate. Symmetric keys are raw AES key and IV
//! bytes, zeroised on drop.
//!
//! ## Classification
//!
//! ```text
//! None              -> NotSet
//! Symmetric         -> SymmetricOnly
//! AsymmetricPublic  -> AsymmetricPublicOnly
//! AsymmetricPrivate -> AsymmetricPrivate      (public half derivable)
//! SigningPublic     -> SigningPublicOnly
//! SigningPrivate    -> SigningPrivate         (public half derivable)
//! ```

use std::fmt;

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{self, IV_LEN, SUPPORTED_KEY_LENS};
use crate::error::{KeysealError, Result};

/// Default RSA modulus size for asymmetric and signing keys.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Default AES key size for symmetric keys.
pub const DEFAULT_SYMMETRIC_BITS: usize = 256;

/// Accepted modulus range for encryption keys.
pub const ASYMMETRIC_BITS_RANGE: (usize, usize) = (1024, 4096);

/// Accepted modulus range for signing keys. Bounded by what `ring` will load.
pub const SIGNING_BITS_RANGE: (usize, usize) = (2048, 4096);

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The family of key a caller asks for when generating or importing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAlgorithm {
    /// AES key and IV, used directly.
    Symmetric,
    /// RSA key pair used to wrap envelope keys.
    Asymmetric,
    /// RSA key pair used for PKCS#1 v1.5 signatures.
    Signing,
}

impl KeyAlgorithm {
    /// Default key size in bits for this family.
    pub fn default_bits(&self) -> usize {
        match self {
            Self::Symmetric => DEFAULT_SYMMETRIC_BITS,
            Self::Asymmetric | Self::Signing => DEFAULT_RSA_BITS,
        }
    }

    fn check_bits(&self, bits: usize) -> Result<()> {
        let ok = match self {
            Self::Symmetric => SUPPORTED_KEY_LENS.iter().any(|len| len * 8 == bits),
            Self::Asymmetric => {
                (ASYMMETRIC_BITS_RANGE.0..=ASYMMETRIC_BITS_RANGE.1).contains(&bits)
            }
            Self::Signing => (SIGNING_BITS_RANGE.0..=SIGNING_BITS_RANGE.1).contains(&bits),
        };
        if ok {
            Ok(())
        } else {
            Err(KeysealError::InvalidKey(format!(
                "{} bits is not a supported {:?} key size",
                bits, self
            )))
        }
    }
}

/// Which half of a key pair an export or import refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyHalf {
    Private,
    Public,
}

/// The classified kind of loaded key material.
///
/// Computed once when a `Vault` is built. Capability predicates are pure
/// functions of the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    NotSet,
    SymmetricOnly,
    AsymmetricPublicOnly,
    AsymmetricPrivate,
    SigningPrivate,
    SigningPublicOnly,
}

impl KeyKind {
    pub fn can_encrypt(&self) -> bool {
        matches!(
            self,
            Self::SymmetricOnly | Self::AsymmetricPublicOnly | Self::AsymmetricPrivate
        )
    }

    pub fn can_decrypt(&self) -> bool {
        matches!(self, Self::SymmetricOnly | Self::AsymmetricPrivate)
    }

    pub fn can_sign(&self) -> bool {
        matches!(self, Self::SigningPrivate)
    }

    pub fn can_verify(&self) -> bool {
        matches!(self, Self::SigningPrivate | Self::SigningPublicOnly)
    }

    /// Whether a private component is present.
    pub fn has_private(&self) -> bool {
        matches!(
            self,
            Self::SymmetricOnly | Self::AsymmetricPrivate | Self::SigningPrivate
        )
    }

    /// The key family, or `None` when nothing is loaded.
    pub fn algorithm(&self) -> Option<KeyAlgorithm> {
        match self {
            Self::NotSet => None,
            Self::SymmetricOnly => Some(KeyAlgorithm::Symmetric),
            Self::AsymmetricPublicOnly | Self::AsymmetricPrivate => Some(KeyAlgorithm::Asymmetric),
            Self::SigningPrivate | Self::SigningPublicOnly => Some(KeyAlgorithm::Signing),
        }
    }
}

// ---------------------------------------------------------------------------
// Symmetric key
// ---------------------------------------------------------------------------

/// An AES key and the IV it is used with.
///
/// - Zeroised on drop.
/// - `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl SymmetricKey {
    /// Build a key from caller-provided bytes.
    ///
    /// The key must be 16, 24 or 32 bytes and the IV 16 bytes.
    pub fn new(key: Vec<u8>, iv: Vec<u8>) -> Result<Self> {
        if !SUPPORTED_KEY_LENS.contains(&key.len()) {
            return Err(KeysealError::InvalidKey(format!(
                "symmetric key must be 16, 24 or 32 bytes, got {}",
                key.len()
            )));
        }
        if iv.len() != IV_LEN {
            return Err(KeysealError::InvalidKey(format!(
                "iv must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            )));
        }
        Ok(Self { key, iv })
    }

    /// Generate a random key of `bits` bits and a random IV.
    pub fn generate(bits: usize) -> Result<Self> {
        KeyAlgorithm::Symmetric.check_bits(bits)?;
        Ok(Self {
            key: crypto::random_bytes(bits / 8)?,
            iv: crypto::random_bytes(IV_LEN)?,
        })
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn bits(&self) -> usize {
        self.key.len() * 8
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// Loaded key material. Exactly one variant; immutable once built.
pub enum KeyMaterial {
    None,
    Symmetric(SymmetricKey),
    AsymmetricPrivate(RsaPrivateKey),
    AsymmetricPublic(RsaPublicKey),
    SigningPrivate(RsaPrivateKey),
    SigningPublic(RsaPublicKey),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("kind", &self.classify())
            .field("bits", &self.bits())
            .finish()
    }
}

impl KeyMaterial {
    /// Generate fresh material of the requested family.
    ///
    /// `bits` defaults to [`KeyAlgorithm::default_bits`].
    pub fn generate(algorithm: KeyAlgorithm, bits: Option<usize>) -> Result<Self> {
        let bits = bits.unwrap_or_else(|| algorithm.default_bits());
        algorithm.check_bits(bits)?;
        tracing::debug!(?algorithm, bits, "generating key material");

        match algorithm {
            KeyAlgorithm::Symmetric => Ok(Self::Symmetric(SymmetricKey::generate(bits)?)),
            KeyAlgorithm::Asymmetric => Ok(Self::AsymmetricPrivate(generate_rsa(bits)?)),
            KeyAlgorithm::Signing => Ok(Self::SigningPrivate(generate_rsa(bits)?)),
        }
    }

    /// Wrap an RSA private key for the given family.
    pub fn from_private_key(algorithm: KeyAlgorithm, key: RsaPrivateKey) -> Result<Self> {
        if algorithm == KeyAlgorithm::Symmetric {
            return Err(KeysealError::InvalidOperation(
                "an RSA key cannot back a symmetric vault".into(),
            ));
        }
        algorithm.check_bits(key.size() * 8)?;
        if algorithm == KeyAlgorithm::Signing {
            Ok(Self::SigningPrivate(key))
        } else {
            Ok(Self::AsymmetricPrivate(key))
        }
    }

    /// Wrap an RSA public key for the given family.
    pub fn from_public_key(algorithm: KeyAlgorithm, key: RsaPublicKey) -> Result<Self> {
        if algorithm == KeyAlgorithm::Symmetric {
            return Err(KeysealError::InvalidOperation(
                "an RSA key cannot back a symmetric vault".into(),
            ));
        }
        algorithm.check_bits(key.size() * 8)?;
        if algorithm == KeyAlgorithm::Signing {
            Ok(Self::SigningPublic(key))
        } else {
            Ok(Self::AsymmetricPublic(key))
        }
    }

    /// Classify the material. Never fails.
    pub fn classify(&self) -> KeyKind {
        match self {
            Self::None => KeyKind::NotSet,
            Self::Symmetric(_) => KeyKind::SymmetricOnly,
            Self::AsymmetricPrivate(_) => KeyKind::AsymmetricPrivate,
            Self::AsymmetricPublic(_) => KeyKind::AsymmetricPublicOnly,
            Self::SigningPrivate(_) => KeyKind::SigningPrivate,
            Self::SigningPublic(_) => KeyKind::SigningPublicOnly,
        }
    }

    /// Key size in bits: AES key length or RSA modulus length.
    pub fn bits(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Symmetric(key) => Some(key.bits()),
            Self::AsymmetricPrivate(key) | Self::SigningPrivate(key) => Some(key.size() * 8),
            Self::AsymmetricPublic(key) | Self::SigningPublic(key) => Some(key.size() * 8),
        }
    }

    /// The RSA public half, derived from the private key when needed.
    pub fn public_key(&self) -> Option<RsaPublicKey> {
        match self {
            Self::AsymmetricPrivate(key) | Self::SigningPrivate(key) => Some(key.to_public_key()),
            Self::AsymmetricPublic(key) | Self::SigningPublic(key) => Some(key.clone()),
            Self::None | Self::Symmetric(_) => None,
        }
    }

    /// The RSA private key, if one is loaded.
    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        match self {
            Self::AsymmetricPrivate(key) | Self::SigningPrivate(key) => Some(key),
            _ => None,
        }
    }

    pub fn symmetric_key(&self) -> Option<&SymmetricKey> {
        match self {
            Self::Symmetric(key) => Some(key),
            _ => None,
        }
    }
}

fn generate_rsa(bits: usize) -> Result<RsaPrivateKey> {
    RsaPrivateKey::new(&mut OsRng, bits).map_err(|_| KeysealError::KeyGenerationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_follow_kind() {
        assert!(!KeyKind::NotSet.can_encrypt());
        assert!(!KeyKind::NotSet.can_verify());

        assert!(KeyKind::SymmetricOnly.can_encrypt());
        assert!(KeyKind::SymmetricOnly.can_decrypt());
        assert!(!KeyKind::SymmetricOnly.can_sign());

        assert!(KeyKind::AsymmetricPublicOnly.can_encrypt());
        assert!(!KeyKind::AsymmetricPublicOnly.can_decrypt());

        assert!(KeyKind::SigningPrivate.can_sign());
        assert!(KeyKind::SigningPrivate.can_verify());
        assert!(!KeyKind::SigningPrivate.can_encrypt());

        assert!(!KeyKind::SigningPublicOnly.can_sign());
        assert!(KeyKind::SigningPublicOnly.can_verify());
    }

    #[test]
    fn test_symmetric_generation_sizes() {
        for bits in [128, 192, 256] {
            let material = KeyMaterial::generate(KeyAlgorithm::Symmetric, Some(bits)).unwrap();
            assert_eq!(material.classify(), KeyKind::SymmetricOnly);
            assert_eq!(material.bits(), Some(bits));
        }
        assert!(KeyMaterial::generate(KeyAlgorithm::Symmetric, Some(100)).is_err());
    }

    #[test]
    fn test_symmetric_key_rejects_bad_lengths() {
        assert!(SymmetricKey::new(vec![0u8; 31], vec![0u8; 16]).is_err());
        assert!(SymmetricKey::new(vec![0u8; 32], vec![0u8; 12]).is_err());
        assert!(SymmetricKey::new(vec![0u8; 32], vec![0u8; 16]).is_ok());
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = SymmetricKey::new(vec![0xAB; 32], vec![0xCD; 16]).unwrap();
        let printed = format!("{:?}", key);
        assert!(!printed.contains("171"));
        assert!(printed.contains("256"));
    }

    #[test]
    fn test_rsa_classification_and_public_half() {
        let material = KeyMaterial::generate(KeyAlgorithm::Asymmetric, Some(1024)).unwrap();
        assert_eq!(material.classify(), KeyKind::AsymmetricPrivate);
        assert_eq!(material.bits(), Some(1024));

        let public = material.public_key().unwrap();
        let public_only = KeyMaterial::from_public_key(KeyAlgorithm::Asymmetric, public).unwrap();
        assert_eq!(public_only.classify(), KeyKind::AsymmetricPublicOnly);
        assert!(public_only.private_key().is_none());
    }

    #[test]
    fn test_signing_size_bounds() {
        assert!(KeyMaterial::generate(KeyAlgorithm::Signing, Some(1024)).is_err());
        assert!(KeyMaterial::generate(KeyAlgorithm::Asymmetric, Some(512)).is_err());
    }

    #[test]
    fn test_none_classifies_as_not_set() {
        assert_eq!(KeyMaterial::None.classify(), KeyKind::NotSet);
        assert_eq!(KeyMaterial::None.bits(), None);
        assert!(KeyMaterial::None.public_key().is_none());
    }
}
