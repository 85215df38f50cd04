//! Hybrid encryption envelope.
//!
//! An envelope carries a payload that only the holder of one RSA private key
//! can read:
//!
//! 1. A fresh AES-256 key and IV are generated for the call.
//! 2. The payload is encrypted with AES-256-CBC (PKCS#7 padding).
//! 3. The AES key is wrapped with the recipient's RSA public key (OAEP,
//!    SHA-1 digest and MGF1).
//! 4. Everything is framed into one self-describing byte string.
//!
//! # Wire layout
//! ```text
//! [ wrapped_key_len: u32 LE ][ iv_len: u32 LE ][ wrapped_key ][ iv ][ ciphertext ... ]
//!   0..4                       4..8               8..             ..   ..end
//! ```
//!
//! Field order is fixed. Both lengths are full 4-byte little-endian integers
//! and are bounds-checked against the buffer before any slicing.

use std::fmt;

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::crypto::{self, EphemeralKey, BLOCK_LEN, IV_LEN, KEY_LEN};
use crate::error::{KeysealError, Result};

/// Size of the fixed header in bytes: two `u32` lengths.
pub const HEADER_LEN: usize = 8;

/// A parsed envelope. Holds no key material in the clear.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    wrapped_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("wrapped_key_len", &self.wrapped_key.len())
            .field("iv_len", &self.iv.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

fn read_len(bytes: &[u8], offset: usize) -> Result<usize> {
    let field: [u8; 4] = bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or(KeysealError::EnvelopeCorrupt("truncated header"))?;
    usize::try_from(u32::from_le_bytes(field))
        .map_err(|_| KeysealError::EnvelopeCorrupt("length does not fit in memory"))
}

impl Envelope {
    /// Seal `plaintext` to `recipient`.
    ///
    /// Empty payloads are rejected. The ephemeral key lives only for the
    /// duration of this call.
    pub fn seal(recipient: &RsaPublicKey, plaintext: &[u8]) -> Result<Self> {
        if plaintext.is_empty() {
            return Err(KeysealError::EmptyPayload);
        }

        let ephemeral = EphemeralKey::generate()?;
        let ciphertext = crypto::encrypt(ephemeral.key(), ephemeral.iv(), plaintext)?;
        let wrapped_key = recipient
            .encrypt(&mut OsRng, Oaep::new::<Sha1>(), ephemeral.key())
            .map_err(|_| KeysealError::EncryptionFailure)?;

        tracing::debug!(
            payload_len = plaintext.len(),
            wrapped_key_len = wrapped_key.len(),
            "sealed envelope"
        );

        Ok(Self {
            wrapped_key,
            iv: ephemeral.iv().to_vec(),
            ciphertext,
        })
    }

    /// Parse the wire form without touching any key.
    ///
    /// Fails with `EnvelopeCorrupt` when the header is truncated, when the
    /// declared lengths run past the end of `bytes`, or when the ciphertext is
    /// not a positive multiple of the block size.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let wrapped_key_len = read_len(bytes, 0)?;
        let iv_len = read_len(bytes, 4)?;

        let iv_start = HEADER_LEN
            .checked_add(wrapped_key_len)
            .ok_or(KeysealError::EnvelopeCorrupt("declared lengths overflow"))?;
        let body_start = iv_start
            .checked_add(iv_len)
            .ok_or(KeysealError::EnvelopeCorrupt("declared lengths overflow"))?;
        if body_start > bytes.len() {
            tracing::warn!(
                wrapped_key_len,
                iv_len,
                envelope_len = bytes.len(),
                "rejected envelope with out-of-range header"
            );
            return Err(KeysealError::EnvelopeCorrupt(
                "declared lengths exceed envelope",
            ));
        }

        let ciphertext = &bytes[body_start..];
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(KeysealError::EnvelopeCorrupt(
                "ciphertext is not a positive multiple of the block size",
            ));
        }

        Ok(Self {
            wrapped_key: bytes[HEADER_LEN..iv_start].to_vec(),
            iv: bytes[iv_start..body_start].to_vec(),
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Serialize to the wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            HEADER_LEN + self.wrapped_key.len() + self.iv.len() + self.ciphertext.len(),
        );
        out.extend_from_slice(&(self.wrapped_key.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.iv.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.wrapped_key);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Unwrap the payload key with `recipient` and decrypt.
    ///
    /// A wrapped key of the wrong size for `recipient`, an unwrapped key or IV
    /// of the wrong size, and a padding failure are all `EnvelopeCorrupt`. An
    /// OAEP failure on a correctly sized wrapped key is `KeyMismatch`.
    pub fn open(&self, recipient: &RsaPrivateKey) -> Result<Vec<u8>> {
        if self.wrapped_key.len() != recipient.size() {
            return Err(KeysealError::EnvelopeCorrupt(
                "wrapped key length does not match the private key",
            ));
        }

        let key = Zeroizing::new(
            recipient
                .decrypt(Oaep::new::<Sha1>(), &self.wrapped_key)
                .map_err(|_| {
                    tracing::warn!("envelope key unwrap failed");
                    KeysealError::KeyMismatch
                })?,
        );

        if key.len() != KEY_LEN {
            return Err(KeysealError::EnvelopeCorrupt("unwrapped key has wrong length"));
        }
        if self.iv.len() != IV_LEN {
            return Err(KeysealError::EnvelopeCorrupt("iv has wrong length"));
        }

        let plaintext = crypto::decrypt(&key, &self.iv, &self.ciphertext)?;
        tracing::debug!(payload_len = plaintext.len(), "opened envelope");
        Ok(plaintext)
    }

    pub fn wrapped_key(&self) -> &[u8] {
        &self.wrapped_key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Seal `plaintext` to `recipient` and return the wire bytes.
pub fn encode(recipient: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    Ok(Envelope::seal(recipient, plaintext)?.to_bytes())
}

/// Parse and open an envelope produced by [`encode`].
pub fn decode(recipient: &RsaPrivateKey, bytes: &[u8]) -> Result<Vec<u8>> {
    Envelope::parse(bytes)?.open(recipient)
}
