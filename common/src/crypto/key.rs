use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::{
    fmt::{Debug, Formatter},
    fs,
    path::{Path, PathBuf},
};

use super::{Address, CryptoError};

/// Name of the file holding the hex encoded private key inside a keys directory
pub const KEY_FILE_NAME: &str = "lkkey";

/// Recoverable signature layout: r (32) || s (32) || recovery id (1)
pub const SIGNATURE_SIZE: usize = 65;

/// secp256k1 key pair of an account
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes =
            hex::decode(value.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn key_file(dir: &Path) -> PathBuf {
        dir.join(KEY_FILE_NAME)
    }

    /// Load the private key stored in `<dir>/lkkey`
    pub fn load(dir: &Path) -> Result<Self, CryptoError> {
        let path = Self::key_file(dir);
        let content = fs::read_to_string(&path).map_err(|e| CryptoError::KeyFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_hex(&content)
    }

    /// Store the private key in `<dir>/lkkey`, creating `dir` if needed
    pub fn save(&self, dir: &Path) -> Result<PathBuf, CryptoError> {
        let path = Self::key_file(dir);
        let to_error = |e: std::io::Error| CryptoError::KeyFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        fs::create_dir_all(dir).map_err(to_error)?;
        fs::write(&path, self.private_key_hex()).map_err(to_error)?;
        Ok(path)
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// SEC1 uncompressed public key (0x04 || X || Y)
    pub fn public_key_uncompressed(&self) -> Vec<u8> {
        self.verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key_uncompressed())
    }

    /// Recoverable ECDSA signature over SHA-256(`message`)
    pub fn sign_recoverable(&self, message: &[u8]) -> Result<[u8; SIGNATURE_SIZE], CryptoError> {
        let (signature, recovery_id): (Signature, RecoveryId) = self
            .signing_key
            .sign_recoverable(message)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;

        let mut out = [0u8; SIGNATURE_SIZE];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }

    /// Recover the signer's address from a signature produced by [`KeyPair::sign_recoverable`]
    pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<Address, CryptoError> {
        if signature.len() != SIGNATURE_SIZE {
            return Err(CryptoError::Signature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_SIZE,
                signature.len()
            )));
        }
        let sig = Signature::from_slice(&signature[..64])
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(signature[64])
            .ok_or_else(|| CryptoError::Signature("invalid recovery id".to_owned()))?;
        let key = VerifyingKey::recover_from_msg(message, &sig, recovery_id)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        Ok(Address::from_public_key(
            key.to_encoded_point(false).as_bytes(),
        ))
    }
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_address_is_stable_for_same_key() {
        let first = KeyPair::from_hex(PRIVATE_KEY).unwrap().address();
        let second = KeyPair::from_hex(PRIVATE_KEY).unwrap().address();
        assert_eq!(first, second);
        assert_eq!(first.to_bytes().unwrap().len(), 20);
    }

    #[test]
    fn test_public_key_is_uncompressed() {
        let key = KeyPair::from_hex(PRIVATE_KEY).unwrap();
        let public = key.public_key_uncompressed();
        assert_eq!(public.len(), 65);
        assert_eq!(public[0], 0x04);
    }

    #[test]
    fn test_save_and_load_keeps_address() {
        let dir = tempfile::tempdir().unwrap();
        let key = KeyPair::generate();
        let path = key.save(&dir.path().join("keys")).unwrap();
        assert!(path.ends_with(KEY_FILE_NAME));

        let loaded = KeyPair::load(&dir.path().join("keys")).unwrap();
        assert_eq!(loaded.address(), key.address());
    }

    #[test]
    fn test_load_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            KeyPair::load(dir.path()),
            Err(CryptoError::KeyFile { .. })
        ));
    }

    #[test]
    fn test_signature_recovers_signer() {
        let key = KeyPair::generate();
        let message = b"transaction hash bytes";
        let signature = key.sign_recoverable(message).unwrap();
        let recovered = KeyPair::recover_address(message, &signature).unwrap();
        assert_eq!(recovered, key.address());

        let other = KeyPair::recover_address(b"other message", &signature);
        assert!(other.map(|a| a != key.address()).unwrap_or(true));
    }

    #[test]
    fn test_rejects_bad_private_key() {
        assert!(matches!(
            KeyPair::from_hex("not hex"),
            Err(CryptoError::InvalidHex(_))
        ));
        assert!(matches!(
            KeyPair::from_hex(&"00".repeat(32)),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }
}
