// Encodings used by the node RPC: binary fields travel as base64, callers see base58 or hex
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::crypto::CryptoError;

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(value: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(value)
        .map_err(|e| CryptoError::Base64(e.to_string()))
}

pub fn base64_to_base58(value: &str) -> Result<String, CryptoError> {
    Ok(bs58::encode(decode_base64(value)?).into_string())
}

pub fn base58_to_base64(value: &str) -> Result<String, CryptoError> {
    let bytes = bs58::decode(value)
        .into_vec()
        .map_err(|e| CryptoError::Base58(e.to_string()))?;
    Ok(encode_base64(&bytes))
}

pub fn base64_to_hex(value: &str) -> Result<String, CryptoError> {
    Ok(hex::encode(decode_base64(value)?))
}

pub fn hex_to_base64(value: &str) -> Result<String, CryptoError> {
    let bytes = hex::decode(value).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    Ok(encode_base64(&bytes))
}
