use thiserror::Error;

/// Errors that can occur while handling keys, addresses and signatures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid hexadecimal string format
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// Hash has invalid length
    #[error("Invalid hash length: {len} bytes, expected: {expected} bytes")]
    InvalidHashLength { len: usize, expected: usize },

    /// Private key bytes are not a valid secp256k1 scalar
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Address string is malformed or invalid
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Base58 decoding failed
    #[error("Base58 error: {0}")]
    Base58(String),

    /// Base64 decoding failed
    #[error("Base64 error: {0}")]
    Base64(String),

    /// Signing failed
    #[error("Signature error: {0}")]
    Signature(String),

    /// Reading or writing a key file failed
    #[error("Key file error at {path}: {reason}")]
    KeyFile { path: String, reason: String },
}
