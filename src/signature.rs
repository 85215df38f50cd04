//! RSA signatures.
//!
//! Signing and verification run on `ring` (RSASSA-PKCS1-v1_5 with SHA-256,
//! deterministic per key and content). Keys are generated and stored with the
//! `rsa` crate and handed to `ring` as DER once, when a [`Signer`] or
//! [`Verifier`] is built.

use ring::rand::SystemRandom;
use ring::signature::{self, RsaKeyPair, UnparsedPublicKey};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{KeysealError, Result};

/// A private signing key loaded into `ring`.
pub struct Signer {
    pair: RsaKeyPair,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("modulus_len", &self.pair.public().modulus_len())
            .finish()
    }
}

impl Signer {
    pub fn new(key: &RsaPrivateKey) -> Result<Self> {
        let der = key
            .to_pkcs8_der()
            .map_err(|e| KeysealError::InvalidKey(e.to_string()))?;
        let pair = RsaKeyPair::from_pkcs8(der.as_bytes())
            .map_err(|e| KeysealError::InvalidKey(e.to_string()))?;
        Ok(Self { pair })
    }

    /// Sign `content`. The signature is as long as the modulus.
    pub fn sign(&self, content: &[u8]) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        let mut sig = vec![0u8; self.pair.public().modulus_len()];
        self.pair
            .sign(&signature::RSA_PKCS1_SHA256, &rng, content, &mut sig)
            .map_err(|_| KeysealError::EncryptionFailure)?;
        Ok(sig)
    }
}

/// A public verification key in the PKCS#1 form `ring` expects.
#[derive(Debug, Clone)]
pub struct Verifier {
    public_der: Vec<u8>,
    modulus_len: usize,
}

impl Verifier {
    pub fn new(key: &RsaPublicKey) -> Result<Self> {
        let der = key
            .to_pkcs1_der()
            .map_err(|e| KeysealError::InvalidKey(e.to_string()))?;
        Ok(Self {
            public_der: der.as_bytes().to_vec(),
            modulus_len: key.size(),
        })
    }

    /// Check `sig` over `content`.
    ///
    /// Any mismatch (content, signature, or key) is `Ok(false)`. Only a
    /// signature whose length is not the modulus length is an error.
    pub fn verify(&self, content: &[u8], sig: &[u8]) -> Result<bool> {
        if sig.len() != self.modulus_len {
            return Err(KeysealError::MalformedSignature);
        }
        let key = UnparsedPublicKey::new(&signature::RSA_PKCS1_2048_8192_SHA256, &self.public_der);
        Ok(key.verify(content, sig).is_ok())
    }
}

/// One-shot signing helper.
pub fn sign(key: &RsaPrivateKey, content: &[u8]) -> Result<Vec<u8>> {
    Signer::new(key)?.sign(content)
}

/// One-shot verification helper.
pub fn verify(key: &RsaPublicKey, content: &[u8], sig: &[u8]) -> Result<bool> {
    Verifier::new(key)?.verify(content, sig)
}
