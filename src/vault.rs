//! The capability-checked key facade.
//!
//! A `Vault` owns one piece of key material and exposes the same five
//! operations whatever that material is: `encrypt`, `decrypt`, `sign`,
//! `verify` and `export_key`. The material is classified once, at
//! construction; each call routes on the cached [`KeyKind`]:
//!
//! | kind                 | encrypt  | decrypt    | sign       | verify |
//! |----------------------|----------|------------|------------|--------|
//! | SymmetricOnly        | AES-CBC  | AES-CBC    | -          | -      |
//! | AsymmetricPublicOnly | envelope | needs priv | -          | -      |
//! | AsymmetricPrivate    | envelope | envelope   | -          | -      |
//! | SigningPrivate       | -        | -          | yes        | yes    |
//! | SigningPublicOnly    | -        | -          | needs priv | yes    |
//!
//! A vault never mutates after construction and keeps no scratch buffers, so
//! `&Vault` can be shared across threads.

use rsa::RsaPublicKey;
use serde::Serialize;

use crate::certificate::{self, CertificateSource};
use crate::config::Config;
use crate::crypto;
use crate::envelope;
use crate::error::{KeysealError, Result};
use crate::export;
use crate::keys::{KeyAlgorithm, KeyHalf, KeyKind, KeyMaterial, SymmetricKey};
use crate::signature::{Signer, Verifier};
use crate::store::KeyStore;

/// A snapshot of what a vault holds, safe to log or display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub kind: KeyKind,
    pub algorithm: Option<KeyAlgorithm>,
    pub bits: Option<usize>,
    pub public_key_pem: Option<String>,
}

/// One loaded key and the operations it allows.
#[derive(Debug)]
pub struct Vault {
    material: KeyMaterial,
    kind: KeyKind,
    public_key: Option<RsaPublicKey>,
    public_key_pem: Option<String>,
    signer: Option<Signer>,
    verifier: Option<Verifier>,
}

impl Vault {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// A vault with no key. Every operation fails with `NoKeyLoaded`.
    pub fn empty() -> Self {
        Self {
            material: KeyMaterial::None,
            kind: KeyKind::NotSet,
            public_key: None,
            public_key_pem: None,
            signer: None,
            verifier: None,
        }
    }

    /// Classify `material` and prepare whatever the kind needs.
    pub fn from_material(material: KeyMaterial) -> Result<Self> {
        let kind = material.classify();
        let public_key = material.public_key();
        let public_key_pem = match &public_key {
            Some(public) => Some(export::public_pem(public)?),
            None => None,
        };

        let signer = match &material {
            KeyMaterial::SigningPrivate(key) => Some(Signer::new(key)?),
            _ => None,
        };
        let verifier = match (&material, &public_key) {
            (KeyMaterial::SigningPrivate(_) | KeyMaterial::SigningPublic(_), Some(public)) => {
                Some(Verifier::new(public)?)
            }
            _ => None,
        };

        tracing::debug!(?kind, bits = ?material.bits(), "vault loaded");
        Ok(Self {
            material,
            kind,
            public_key,
            public_key_pem,
            signer,
            verifier,
        })
    }

    /// Like [`from_material`](Self::from_material) for keys that came from
    /// outside. A key the signature backend refuses is reported as malformed.
    fn from_imported(material: KeyMaterial) -> Result<Self> {
        Self::from_material(material).map_err(|e| match e {
            KeysealError::InvalidKey(reason) => KeysealError::MalformedKey(reason),
            other => other,
        })
    }

    /// Generate a fresh key of the default size for `algorithm`.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        Self::from_material(KeyMaterial::generate(algorithm, None)?)
    }

    /// Generate a fresh key of `bits` bits.
    pub fn generate_with_bits(algorithm: KeyAlgorithm, bits: usize) -> Result<Self> {
        Self::from_material(KeyMaterial::generate(algorithm, Some(bits))?)
    }

    /// Generate a fresh key using the sizes in `config`.
    pub fn generate_with_config(algorithm: KeyAlgorithm, config: &Config) -> Result<Self> {
        Self::generate_with_bits(algorithm, config.key_bits(algorithm))
    }

    /// A symmetric vault over caller-provided key and IV bytes.
    pub fn from_symmetric(key: &[u8], iv: &[u8]) -> Result<Self> {
        let key = SymmetricKey::new(key.to_vec(), iv.to_vec())?;
        Self::from_material(KeyMaterial::Symmetric(key))
    }

    /// Import key text produced by [`export_key`](Self::export_key).
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_imported(export::import_from_text(text)?)
    }

    /// Import an RSA key from PEM.
    pub fn from_pem(algorithm: KeyAlgorithm, pem: &str) -> Result<Self> {
        Self::from_imported(export::import_pem(algorithm, pem)?)
    }

    /// Import a password-protected PKCS#8 private key.
    pub fn from_encrypted_private_key(
        algorithm: KeyAlgorithm,
        der: &[u8],
        password: &[u8],
    ) -> Result<Self> {
        Self::from_imported(export::import_encrypted_private_key(algorithm, der, password)?)
    }

    /// Import one half of the key carried by a certificate source.
    pub fn from_certificate<S: CertificateSource + ?Sized>(
        source: &S,
        half: KeyHalf,
        algorithm: KeyAlgorithm,
    ) -> Result<Self> {
        Self::from_imported(certificate::import_from_external_source(source, half, algorithm)?)
    }

    /// Load key text from a key file.
    pub fn from_key_file(store: &KeyStore, name: &str) -> Result<Self> {
        Self::from_imported(store.load(name)?)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn can_encrypt(&self) -> bool {
        self.kind.can_encrypt()
    }

    pub fn can_decrypt(&self) -> bool {
        self.kind.can_decrypt()
    }

    pub fn can_sign(&self) -> bool {
        self.kind.can_sign()
    }

    pub fn can_verify(&self) -> bool {
        self.kind.can_verify()
    }

    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            kind: self.kind,
            algorithm: self.kind.algorithm(),
            bits: self.material.bits(),
            public_key_pem: self.public_key_pem.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Encrypt `plaintext`.
    ///
    /// Symmetric keys produce bare AES-CBC ciphertext. Asymmetric keys produce
    /// an envelope sealed to the public half.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self.kind {
            KeyKind::NotSet => Err(KeysealError::NoKeyLoaded),
            KeyKind::SymmetricOnly => {
                if plaintext.is_empty() {
                    return Err(KeysealError::EmptyPayload);
                }
                let key = self.symmetric()?;
                crypto::encrypt(key.key(), key.iv(), plaintext)
            }
            KeyKind::AsymmetricPublicOnly | KeyKind::AsymmetricPrivate => {
                let public = self.public_key.as_ref().ok_or(KeysealError::NoKeyLoaded)?;
                envelope::encode(public, plaintext)
            }
            KeyKind::SigningPrivate | KeyKind::SigningPublicOnly => {
                Err(KeysealError::UnsupportedOperation("encrypt"))
            }
        }
    }

    /// Decrypt what [`encrypt`](Self::encrypt) produced.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self.kind {
            KeyKind::NotSet => Err(KeysealError::NoKeyLoaded),
            KeyKind::SymmetricOnly => {
                let key = self.symmetric()?;
                crypto::decrypt(key.key(), key.iv(), ciphertext)
            }
            KeyKind::AsymmetricPublicOnly => Err(KeysealError::PrivateKeyRequired),
            KeyKind::AsymmetricPrivate => {
                let private = self
                    .material
                    .private_key()
                    .ok_or(KeysealError::PrivateKeyRequired)?;
                envelope::decode(private, ciphertext)
            }
            KeyKind::SigningPrivate | KeyKind::SigningPublicOnly => {
                Err(KeysealError::UnsupportedOperation("decrypt"))
            }
        }
    }

    /// Encrypt the UTF-8 bytes of `content`.
    pub fn encrypt_str(&self, content: &str) -> Result<Vec<u8>> {
        self.encrypt(content.as_bytes())
    }

    /// Decrypt and interpret the plaintext as UTF-8.
    pub fn decrypt_to_string(&self, ciphertext: &[u8]) -> Result<String> {
        let plaintext = self.decrypt(ciphertext)?;
        String::from_utf8(plaintext)
            .map_err(|_| KeysealError::InvalidOperation("plaintext is not valid UTF-8".into()))
    }

    /// Sign `content` with the private signing key.
    pub fn sign(&self, content: &[u8]) -> Result<Vec<u8>> {
        match self.kind {
            KeyKind::NotSet => Err(KeysealError::NoKeyLoaded),
            KeyKind::SigningPrivate => self
                .signer
                .as_ref()
                .ok_or(KeysealError::PrivateKeyRequired)?
                .sign(content),
            KeyKind::SigningPublicOnly => Err(KeysealError::PrivateKeyRequired),
            KeyKind::SymmetricOnly | KeyKind::AsymmetricPublicOnly | KeyKind::AsymmetricPrivate => {
                Err(KeysealError::UnsupportedOperation("sign"))
            }
        }
    }

    /// Check `signature` over `content`. Mismatches are `Ok(false)`.
    pub fn verify(&self, content: &[u8], signature: &[u8]) -> Result<bool> {
        match self.kind {
            KeyKind::NotSet => Err(KeysealError::NoKeyLoaded),
            KeyKind::SigningPrivate | KeyKind::SigningPublicOnly => self
                .verifier
                .as_ref()
                .ok_or(KeysealError::NoKeyLoaded)?
                .verify(content, signature),
            KeyKind::SymmetricOnly | KeyKind::AsymmetricPublicOnly | KeyKind::AsymmetricPrivate => {
                Err(KeysealError::UnsupportedOperation("verify"))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Export `half` as key text, importable with [`from_text`](Self::from_text).
    ///
    /// A symmetric vault only exports through the public request; asking it
    /// for a private half is `UnsupportedOperation`.
    pub fn export_key(&self, half: KeyHalf) -> Result<String> {
        if self.kind == KeyKind::SymmetricOnly && half == KeyHalf::Private {
            return Err(KeysealError::UnsupportedOperation("export private"));
        }
        export::export_as_text(&self.material, half)
    }

    /// Export `half` of an RSA key as PEM.
    pub fn export_pem(&self, half: KeyHalf) -> Result<String> {
        export::export_pem(&self.material, half)
    }

    /// Export the private key as password-protected PKCS#8 DER.
    pub fn export_encrypted_private_key(
        &self,
        password: &[u8],
        iterations: u32,
    ) -> Result<Vec<u8>> {
        export::export_encrypted_private_key(&self.material, password, iterations)
    }

    /// Export `half` as key text into `store` under `name`.
    pub fn save_key(&self, store: &KeyStore, name: &str, half: KeyHalf) -> Result<()> {
        store.write_text(name, &self.export_key(half)?)
    }

    fn symmetric(&self) -> Result<&SymmetricKey> {
        self.material
            .symmetric_key()
            .ok_or(KeysealError::NoKeyLoaded)
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_vault_is_shareable() {
        assert_send_sync::<Vault>();
    }

    #[test]
    fn test_empty_vault_rejects_everything() {
        let vault = Vault::empty();
        assert_eq!(vault.kind(), KeyKind::NotSet);
        assert!(matches!(vault.encrypt(b"x"), Err(KeysealError::NoKeyLoaded)));
        assert!(matches!(vault.decrypt(b"x"), Err(KeysealError::NoKeyLoaded)));
        assert!(matches!(vault.sign(b"x"), Err(KeysealError::NoKeyLoaded)));
        assert!(matches!(vault.verify(b"x", b"y"), Err(KeysealError::NoKeyLoaded)));
        assert!(matches!(
            vault.export_key(KeyHalf::Public),
            Err(KeysealError::NoKeyLoaded)
        ));
    }

    #[test]
    fn test_symmetric_info() {
        let vault = Vault::generate(KeyAlgorithm::Symmetric).unwrap();
        let info = vault.info();
        assert_eq!(info.kind, KeyKind::SymmetricOnly);
        assert_eq!(info.algorithm, Some(KeyAlgorithm::Symmetric));
        assert_eq!(info.bits, Some(256));
        assert!(info.public_key_pem.is_none());
    }

    #[test]
    fn test_symmetric_empty_payload() {
        let vault = Vault::generate(KeyAlgorithm::Symmetric).unwrap();
        assert!(matches!(vault.encrypt(b""), Err(KeysealError::EmptyPayload)));
    }

    #[test]
    fn test_symmetric_private_export_unsupported() {
        let vault = Vault::from_symmetric(&[1u8; 32], &[2u8; 16]).unwrap();
        assert!(matches!(
            vault.export_key(KeyHalf::Private),
            Err(KeysealError::UnsupportedOperation(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            vault.save_key(&KeyStore::new(dir.path()), "aes", KeyHalf::Private),
            Err(KeysealError::UnsupportedOperation(_))
        ));
        assert!(vault.export_key(KeyHalf::Public).is_ok());
    }

    #[test]
    fn test_info_pem_computed_at_load() {
        let material = KeyMaterial::generate(KeyAlgorithm::Asymmetric, Some(1024)).unwrap();
        let expected = export::export_pem(&material, KeyHalf::Public).unwrap();
        let vault = Vault::from_material(material).unwrap();
        assert_eq!(vault.public_key_pem.as_deref(), Some(expected.as_str()));
        assert_eq!(vault.info().public_key_pem, Some(expected));
    }
}
