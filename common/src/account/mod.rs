use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::Display;

use crate::crypto::Address;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum AccountType {
    Client,
    Contract,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_type: AccountType,
    pub address: Address,
    pub balance: u128,
    pub nonce: u64,
    pub transaction_hashes: Vec<String>,
}

/// Location of a stored private key and the address derived from it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Keys {
    pub keys_path: PathBuf,
    pub address: Address,
}

impl Keys {
    pub fn new(keys_path: PathBuf, address: Address) -> Self {
        Self { keys_path, address }
    }
}
