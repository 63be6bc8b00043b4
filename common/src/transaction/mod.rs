use serde::{Deserialize, Serialize};
use strum::Display;

use crate::crypto::{hash, Address, Hash};


/// Kind of action a transaction performs, as classified by the node
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    NotClassified,
    Transfer,
    ContractCall,
    ContractCreation,
}

impl TransactionType {
    /// Numeric `action_type` used by the node RPC
    pub fn action_type(&self) -> u8 {
        match self {
            Self::NotClassified => 0,
            Self::Transfer => 1,
            Self::ContractCall => 2,
            Self::ContractCreation => 3,
        }
    }
}

impl TryFrom<u8> for TransactionType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::NotClassified,
            1 => Self::Transfer,
            2 => Self::ContractCall,
            3 => Self::ContractCreation,
            other => return Err(other),
        })
    }
}

/// Execution status of a submitted transaction
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatusCode {
    Success,
    Pending,
    BadQueryForm,
    BadSign,
    NotEnoughBalance,
    Revert,
    Failed,
}

impl TransactionStatusCode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Pending => 1,
            Self::BadQueryForm => 2,
            Self::BadSign => 3,
            Self::NotEnoughBalance => 4,
            Self::Revert => 5,
            Self::Failed => 6,
        }
    }

    // Pending is the only status a node may still move away from
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl TryFrom<u8> for TransactionStatusCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Success,
            1 => Self::Pending,
            2 => Self::BadQueryForm,
            3 => Self::BadSign,
            4 => Self::NotEnoughBalance,
            5 => Self::Revert,
            6 => Self::Failed,
            other => return Err(other),
        })
    }
}

/// Result of submitting or re-querying a transaction
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionStatus {
    pub action_type: TransactionType,
    pub status_code: TransactionStatusCode,
    pub tx_hash: Hash,
    pub fee_left: u128,
    // Contract address for creations, hex encoded output otherwise
    pub message: String,
}

impl TransactionStatus {
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    pub fn is_pending(&self) -> bool {
        !self.status_code.is_terminal()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub tx_type: TransactionType,
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub fee: u128,
    pub timestamp: u64,
    pub data: String,
    pub verified: bool,
}

impl Transaction {
    pub fn new(
        tx_type: TransactionType,
        from: Address,
        to: Address,
        value: u128,
        fee: u128,
        timestamp: u64,
        data: String,
    ) -> Self {
        Self {
            tx_type,
            from,
            to,
            value,
            fee,
            timestamp,
            data,
            verified: false,
        }
    }

    /// SHA-256 over `from || to || value || fee || timestamp || data`, numbers in decimal
    pub fn hash(&self) -> Hash {
        hash_transaction_fields(
            &self.from,
            &self.to,
            self.value,
            self.fee,
            self.timestamp,
            &self.data,
        )
    }
}

pub fn hash_transaction_fields(
    from: &Address,
    to: &Address,
    value: u128,
    fee: u128,
    timestamp: u64,
    data: &str,
) -> Hash {
    let preimage = format!("{}{}{}{}{}{}", from, to, value, fee, timestamp, data);
    hash(preimage.as_bytes())
}

/// Hash signed by the caller of a read-only contract call
pub fn hash_view_call(from: &Address, to: &Address, timestamp: u64, data: &str) -> Hash {
    let preimage = format!("{}{}{}{}", from, to, timestamp, data);
    hash(preimage.as_bytes())
}
