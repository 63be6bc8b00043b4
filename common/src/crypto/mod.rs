mod address;
mod error;
mod hash;
mod key;

pub use address::{Address, ADDRESS_SIZE};
pub use error::CryptoError;
pub use hash::{hash, Hash, HASH_SIZE};
pub use key::{KeyPair, KEY_FILE_NAME, SIGNATURE_SIZE};
