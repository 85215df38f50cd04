//! Low-level symmetric operations and randomness.
//!
//! Every symmetric encryption in the crate goes through this module, whether
//! it is the direct path of a symmetric `Vault` or the bulk layer of an
//! envelope.
//!
//! Primitive choices:
//! - **Cipher**: AES in CBC mode with PKCS#7 padding
//! - **Key size**: 128, 192 or 256 bits (envelopes always use 256)
//! - **IV**: 128 bits, generated fresh per envelope via `SystemRandom`

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{KeysealError, Result};

/// Size of an envelope key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Size of the CBC initialisation vector in bytes (128 bits).
pub const IV_LEN: usize = 16;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// AES key lengths accepted on the direct symmetric path.
pub const SUPPORTED_KEY_LENS: [usize; 3] = [16, 24, 32];

/// Fill a fresh buffer of `len` bytes from the system CSPRNG.
pub(crate) fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf).map_err(|_| KeysealError::RandomnessFailure)?;
    Ok(buf)
}

fn random_array<const N: usize>() -> Result<[u8; N]> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; N];
    rng.fill(&mut buf).map_err(|_| KeysealError::RandomnessFailure)?;
    Ok(buf)
}

/// A one-shot AES-256 key and IV used for a single envelope.
///
/// Not `Clone`, zeroised on drop. Generated inside `envelope::encode` and
/// dropped before that call returns.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct EphemeralKey {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl EphemeralKey {
    pub(crate) fn generate() -> Result<Self> {
        Ok(Self {
            key: random_array()?,
            iv: random_array()?,
        })
    }

    pub(crate) fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub(crate) fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

macro_rules! cbc_encrypt {
    ($cipher:ty, $key:expr, $iv:expr, $plaintext:expr) => {
        cbc::Encryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|_| KeysealError::InvalidKey("key or iv length".into()))?
            .encrypt_padded_vec_mut::<Pkcs7>($plaintext)
    };
}

macro_rules! cbc_decrypt {
    ($cipher:ty, $key:expr, $iv:expr, $ciphertext:expr) => {
        cbc::Decryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|_| KeysealError::InvalidKey("key or iv length".into()))?
            .decrypt_padded_vec_mut::<Pkcs7>($ciphertext)
            .map_err(|_| KeysealError::EnvelopeCorrupt("padding check failed"))?
    };
}

fn check_iv(iv: &[u8]) -> Result<()> {
    if iv.len() != IV_LEN {
        return Err(KeysealError::InvalidKey(format!(
            "iv must be {} bytes, got {}",
            IV_LEN,
            iv.len()
        )));
    }
    Ok(())
}

/// Encrypt `plaintext` with AES-CBC and PKCS#7 padding.
///
/// The AES variant is picked from the key length. The output is always a
/// non-empty multiple of [`BLOCK_LEN`]; an exact-multiple input gains one full
/// padding block.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    check_iv(iv)?;
    let ciphertext = match key.len() {
        16 => cbc_encrypt!(Aes128, key, iv, plaintext),
        24 => cbc_encrypt!(Aes192, key, iv, plaintext),
        32 => cbc_encrypt!(Aes256, key, iv, plaintext),
        n => {
            return Err(KeysealError::InvalidKey(format!(
                "unsupported AES key length {}",
                n
            )))
        }
    };
    Ok(ciphertext)
}

/// Decrypt an AES-CBC ciphertext produced by [`encrypt`].
///
/// A ciphertext that is empty, not block aligned, or fails the padding check
/// is reported as `EnvelopeCorrupt`. With a wrong key or IV the padding check
/// usually fails; when it happens to pass, the output is garbage.
pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    check_iv(iv)?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(KeysealError::EnvelopeCorrupt(
            "ciphertext is not a positive multiple of the block size",
        ));
    }
    let plaintext = match key.len() {
        16 => cbc_decrypt!(Aes128, key, iv, ciphertext),
        24 => cbc_decrypt!(Aes192, key, iv, ciphertext),
        32 => cbc_decrypt!(Aes256, key, iv, ciphertext),
        n => {
            return Err(KeysealError::InvalidKey(format!(
                "unsupported AES key length {}",
                n
            )))
        }
    };
    Ok(plaintext)
}
