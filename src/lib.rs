//! # keyseal
//!
//! One key, five operations.
//!
//! A [`Vault`] holds a single piece of key material: a symmetric AES key, an
//! RSA key pair for hybrid encryption, or an RSA key pair for signatures
//! (either one may hold only the public half). Callers use the same
//! `encrypt`, `decrypt`, `sign`, `verify` and `export_key` calls for all of
//! them. Which calls succeed depends on what was loaded.
//!
//! Asymmetric encryption produces a self-describing envelope: a fresh
//! AES-256 key and IV encrypt the payload, and the key is wrapped with
//! RSA-OAEP for the recipient. See [`envelope`] for the byte layout.
//!
//! ## Public API
//!
//! - [`Vault`] and [`KeyInfo`]: the facade.
//! - [`KeyMaterial`], [`KeyKind`], [`KeyAlgorithm`], [`KeyHalf`],
//!   [`SymmetricKey`]: key model and classification.
//! - [`envelope`]: the hybrid envelope codec on its own.
//! - [`export`]: key text, PEM, and password-protected PKCS#8.
//! - [`CertificateSource`], [`Certificate`], [`CertificateStore`]: keys
//!   carried by certificates.
//! - [`KeyStore`] and [`Config`]: key files and settings.

pub(crate) mod crypto;
pub mod certificate;
pub mod config;
pub mod envelope;
pub mod error;
pub mod export;
pub mod keys;
pub mod signature;
pub mod store;
pub mod vault;

pub use certificate::{
    import_from_external_source, Certificate, CertificateSource, CertificateStore,
};
pub use config::Config;
pub use envelope::Envelope;
pub use error::{KeysealError, Result};
pub use export::{export_as_text, import_from_text};
pub use keys::{KeyAlgorithm, KeyHalf, KeyKind, KeyMaterial, SymmetricKey};
pub use store::KeyStore;
pub use vault::{KeyInfo, Vault};

/// Generate a fresh key of the default size and load it into a vault.
///
/// Defaults are 2048-bit RSA for `Asymmetric` and `Signing`, and AES-256
/// with a random IV for `Symmetric`.
pub fn generate(algorithm: KeyAlgorithm) -> Result<Vault> {
    Vault::generate(algorithm)
}
