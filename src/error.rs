//! Error types for keyseal.
//!
//! Every variant names a distinct reason an operation could not proceed:
//! no key, the wrong capability, bad key input, or corrupt data. Messages are
//! intentionally minimal and never carry key bytes.

use std::fmt;

/// The single error type for all keyseal operations.
#[derive(Debug)]
pub enum KeysealError {
    /// The vault was constructed without any key material.
    NoKeyLoaded,

    /// The loaded key kind does not offer the requested capability.
    UnsupportedOperation(&'static str),

    /// The operation needs the private half, but only the public half is loaded.
    PrivateKeyRequired,

    /// An exported key (text, PEM, or encrypted PKCS#8) could not be parsed.
    MalformedKey(String),

    /// The requested key half is not present in the external source.
    KeyUnavailable,

    /// The private key does not match the public key the envelope was sealed to.
    KeyMismatch,

    /// The envelope or ciphertext is structurally invalid: truncated header,
    /// out-of-range lengths, or a padding failure.
    EnvelopeCorrupt(&'static str),

    /// Encryption was asked to protect zero bytes.
    EmptyPayload,

    /// Raw key parameters were rejected (wrong length, unsupported size).
    InvalidKey(String),

    /// The request is not valid for the loaded material, e.g. exporting a
    /// private half from public-only material.
    InvalidOperation(String),

    /// A signature does not have the encoding the scheme expects.
    MalformedSignature,

    /// The system's random number generator failed to produce bytes.
    RandomnessFailure,

    /// Key pair generation failed.
    KeyGenerationFailure,

    /// The underlying primitive refused to encrypt or sign.
    EncryptionFailure,

    /// Reading or writing a key file failed.
    Io(std::io::Error),

    /// A configuration value was missing or out of range.
    Config(String),
}

impl fmt::Display for KeysealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoKeyLoaded => write!(f, "no key loaded"),
            Self::UnsupportedOperation(op) => {
                write!(f, "operation not supported by this key: {}", op)
            }
            Self::PrivateKeyRequired => write!(f, "private key required"),
            Self::MalformedKey(reason) => write!(f, "malformed key: {}", reason),
            Self::KeyUnavailable => write!(f, "requested key half is unavailable"),
            Self::KeyMismatch => write!(f, "key does not match envelope"),
            Self::EnvelopeCorrupt(reason) => write!(f, "envelope corrupt: {}", reason),
            Self::EmptyPayload => write!(f, "payload is empty"),
            Self::InvalidKey(reason) => write!(f, "invalid key: {}", reason),
            Self::InvalidOperation(reason) => write!(f, "invalid operation: {}", reason),
            Self::MalformedSignature => write!(f, "malformed signature"),
            Self::RandomnessFailure => write!(f, "randomness source failed"),
            Self::KeyGenerationFailure => write!(f, "key generation failed"),
            Self::EncryptionFailure => write!(f, "encryption failed"),
            Self::Io(err) => write!(f, "key file i/o failed: {}", err),
            Self::Config(reason) => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for KeysealError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KeysealError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// A specialized `Result` type for keyseal.
pub type Result<T> = std::result::Result<T, KeysealError>;
