//! Certificate-backed key sources.
//!
//! The core never depends on a platform certificate type. Anything that can
//! hand out an SPKI public key and, optionally, a PKCS#8 private key can act
//! as a [`CertificateSource`].
//!
//! [`Certificate`] and [`CertificateStore`] are a small in-memory
//! implementation: a subject name, a validity window, and the key DER.

use chrono::{DateTime, Duration, Utc};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};
use zeroize::Zeroizing;

use crate::error::{KeysealError, Result};
use crate::export;
use crate::keys::{KeyAlgorithm, KeyHalf, KeyMaterial};

/// An external object that carries an RSA key pair, or only its public half.
pub trait CertificateSource {
    /// The SubjectPublicKeyInfo DER of the public key.
    fn public_key_der(&self) -> Vec<u8>;

    /// The PKCS#8 DER of the private key.
    ///
    /// Returns `KeyUnavailable` when the source holds no private key.
    fn private_key_der(&self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Extract the requested half of a key from `source`.
pub fn import_from_external_source<S: CertificateSource + ?Sized>(
    source: &S,
    half: KeyHalf,
    algorithm: KeyAlgorithm,
) -> Result<KeyMaterial> {
    let material = match half {
        KeyHalf::Private => {
            let der = source.private_key_der()?;
            KeyMaterial::from_private_key(algorithm, export::private_from_der(&der)?)?
        }
        KeyHalf::Public => {
            let der = source.public_key_der();
            if der.is_empty() {
                return Err(KeysealError::KeyUnavailable);
            }
            KeyMaterial::from_public_key(algorithm, export::public_from_der(&der)?)?
        }
    };
    tracing::debug!(kind = ?material.classify(), "imported key from certificate source");
    Ok(material)
}

/// An in-memory certificate: subject, validity window, and key DER.
#[derive(Clone)]
pub struct Certificate {
    subject: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    public_key_der: Vec<u8>,
    private_key_der: Option<Zeroizing<Vec<u8>>>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("has_private_key", &self.private_key_der.is_some())
            .finish()
    }
}

impl Certificate {
    /// A public-only certificate.
    pub fn new(
        subject: impl Into<String>,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
        public_key_der: Vec<u8>,
    ) -> Self {
        Self {
            subject: subject.into(),
            not_before,
            not_after,
            public_key_der,
            private_key_der: None,
        }
    }

    /// Attach a PKCS#8 private key.
    pub fn with_private_key(mut self, private_key_der: Vec<u8>) -> Self {
        self.private_key_der = Some(Zeroizing::new(private_key_der));
        self
    }

    /// Build a certificate around already loaded RSA material, valid from now
    /// for `validity`. Private material yields a certificate with both halves.
    pub fn from_key_material(
        subject: impl Into<String>,
        material: &KeyMaterial,
        validity: Duration,
    ) -> Result<Self> {
        let public = material.public_key().ok_or_else(|| {
            KeysealError::InvalidOperation("certificates need an RSA key".into())
        })?;
        let public_der = public
            .to_public_key_der()
            .map_err(|e| KeysealError::InvalidOperation(e.to_string()))?;

        let now = Utc::now();
        let mut cert = Self::new(subject, now, now + validity, public_der.as_bytes().to_vec());
        if let Some(private) = material.private_key() {
            let der = private
                .to_pkcs8_der()
                .map_err(|e| KeysealError::InvalidOperation(e.to_string()))?;
            cert = cert.with_private_key(der.as_bytes().to_vec());
        }
        Ok(cert)
    }

    /// A copy of this certificate without its private key.
    pub fn public_only(&self) -> Self {
        Self {
            private_key_der: None,
            ..self.clone()
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key_der.is_some()
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

impl CertificateSource for Certificate {
    fn public_key_der(&self) -> Vec<u8> {
        self.public_key_der.clone()
    }

    fn private_key_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.private_key_der
            .clone()
            .ok_or(KeysealError::KeyUnavailable)
    }
}

/// A searchable set of certificates.
#[derive(Debug, Default, Clone)]
pub struct CertificateStore {
    certificates: Vec<Certificate>,
}

impl CertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, certificate: Certificate) {
        self.certificates.push(certificate);
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// The first certificate whose subject equals `subject` and that is valid
    /// at `at`.
    pub fn find_by_subject(&self, subject: &str, at: DateTime<Utc>) -> Option<&Certificate> {
        self.certificates
            .iter()
            .find(|c| c.subject == subject && c.is_valid_at(at))
    }

    /// [`find_by_subject`](Self::find_by_subject) at the current time.
    pub fn find_current(&self, subject: &str) -> Option<&Certificate> {
        self.find_by_subject(subject, Utc::now())
    }
}
