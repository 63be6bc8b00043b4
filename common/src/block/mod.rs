use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub depth: u64,
    pub nonce: u64,
    pub timestamp: u64,
    pub coinbase: String,
    pub previous_block_hash: String,
    pub transactions: Vec<Transaction>,
}

/// Chain tip as reported by a node
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub top_block_hash: String,
    pub top_block_number: u64,
}
