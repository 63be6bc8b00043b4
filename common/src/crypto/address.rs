use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use super::CryptoError;

/// Raw address length: RIPEMD-160 output
pub const ADDRESS_SIZE: usize = 20;

/// Account address as exchanged with the node: Base58 of the 20 raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Derive the address of an uncompressed (65 bytes) secp256k1 public key
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let sha = Sha256::digest(public_key);
        let ripe = Ripemd160::digest(sha);
        Address(bs58::encode(ripe).into_string())
    }

    pub fn from_bytes(bytes: &[u8; ADDRESS_SIZE]) -> Self {
        Address(bs58::encode(bytes).into_string())
    }

    /// Target of contract creation transactions
    pub fn null() -> Self {
        Self::from_bytes(&[0u8; ADDRESS_SIZE])
    }

    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> Result<[u8; ADDRESS_SIZE], CryptoError> {
        let raw = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::Base58(e.to_string()))?;
        raw.try_into()
            .map_err(|raw: Vec<u8>| CryptoError::InvalidAddress(format!("{} decodes to {} bytes", self.0, raw.len())))
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let address = Address(s.trim().to_owned());
        address.to_bytes()?;
        Ok(address)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_address_roundtrips_to_zero_bytes() {
        let null = Address::null();
        assert_eq!(null.to_bytes().unwrap(), [0u8; ADDRESS_SIZE]);
        assert!(null.is_null());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let short = bs58::encode([1u8; 8]).into_string();
        assert!(matches!(
            Address::from_str(&short),
            Err(CryptoError::InvalidAddress(_))
        ));
        assert!(matches!(
            Address::from_str("0OIl"),
            Err(CryptoError::Base58(_))
        ));
    }
}
