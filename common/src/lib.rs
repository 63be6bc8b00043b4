#![allow(clippy::module_inception)]

pub mod account;
pub mod api;
pub mod block;
pub mod crypto;
pub mod transaction;

pub use crypto::{Address, CryptoError, Hash, KeyPair};
