//! Runtime configuration.
//!
//! Everything has a default, so an empty JSON object is a valid config.
//!
//! ```text
//! {
//!   "key_dir": "/var/lib/keyseal",
//!   "asymmetric_key_bits": 2048,
//!   "signing_key_bits": 2048,
//!   "symmetric_key_bits": 256,
//!   "pbkdf2_iterations": 100000
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KeysealError, Result};
use crate::export::DEFAULT_PBKDF2_ITERATIONS;
use crate::keys::{
    KeyAlgorithm, ASYMMETRIC_BITS_RANGE, DEFAULT_RSA_BITS, DEFAULT_SYMMETRIC_BITS,
    SIGNING_BITS_RANGE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory key files are read from and written to.
    pub key_dir: PathBuf,
    /// Modulus size for generated envelope keys.
    pub asymmetric_key_bits: usize,
    /// Modulus size for generated signing keys.
    pub signing_key_bits: usize,
    /// AES key size for generated symmetric keys.
    pub symmetric_key_bits: usize,
    /// PBKDF2 rounds for password-protected exports.
    pub pbkdf2_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("keys"),
            asymmetric_key_bits: DEFAULT_RSA_BITS,
            signing_key_bits: DEFAULT_RSA_BITS,
            symmetric_key_bits: DEFAULT_SYMMETRIC_BITS,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Config {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| KeysealError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Key size to generate for `algorithm`.
    pub fn key_bits(&self, algorithm: KeyAlgorithm) -> usize {
        match algorithm {
            KeyAlgorithm::Symmetric => self.symmetric_key_bits,
            KeyAlgorithm::Asymmetric => self.asymmetric_key_bits,
            KeyAlgorithm::Signing => self.signing_key_bits,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.symmetric_key_bits, 128 | 192 | 256) {
            return Err(KeysealError::Config(format!(
                "symmetric_key_bits must be 128, 192 or 256, got {}",
                self.symmetric_key_bits
            )));
        }
        let (min, max) = ASYMMETRIC_BITS_RANGE;
        if self.asymmetric_key_bits < min || self.asymmetric_key_bits > max {
            return Err(KeysealError::Config(format!(
                "asymmetric_key_bits out of range: {}",
                self.asymmetric_key_bits
            )));
        }
        let (min, max) = SIGNING_BITS_RANGE;
        if self.signing_key_bits < min || self.signing_key_bits > max {
            return Err(KeysealError::Config(format!(
                "signing_key_bits out of range: {}",
                self.signing_key_bits
            )));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(KeysealError::Config("pbkdf2_iterations must be positive".into()));
        }
        Ok(())
    }
}
