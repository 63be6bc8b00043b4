pub mod codec;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    account::{AccountInfo, AccountType},
    block::{Block, NodeInfo},
    crypto::{Address, CryptoError, Hash},
    transaction::{Transaction, TransactionStatus, TransactionStatusCode, TransactionType},
};

/// Routes served by the node HTTP endpoint
pub mod routes {
    pub const GET_NODE_INFO: &str = "/get_node_info";
    pub const GET_ACCOUNT: &str = "/get_account";
    pub const PUSH_TRANSACTION: &str = "/push_transaction";
    pub const CALL_CONTRACT_VIEW: &str = "/call_contract_view";
    pub const GET_TRANSACTION: &str = "/get_transaction";
    pub const GET_TRANSACTION_STATUS: &str = "/get_transaction_status";
    pub const GET_BLOCK: &str = "/get_block";
}

pub const STATUS_OK: &str = "ok";
pub const SUPPORTED_API_VERSION: u32 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("node returned status '{status}': {message}")]
    Status { status: String, message: String },

    #[error("response is not a node message: {0}")]
    MissingResult(String),

    #[error("invalid value for field '{field}': {value}")]
    InvalidField { field: &'static str, value: String },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// `{"status": "ok" | <error>, "result": <payload>}`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl Envelope {
    /// Extract the payload, rejecting non-ok statuses and missing results
    pub fn into_result(self) -> Result<Value, ApiError> {
        if let Some(status) = self.status {
            if status != STATUS_OK {
                let message = match self.result {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                return Err(ApiError::Status { status, message });
            }
        }

        match self.result {
            Some(Value::Null) | None => Err(ApiError::MissingResult(
                "no 'result' field in response".to_owned(),
            )),
            Some(value) => Ok(value),
        }
    }
}

// Amounts may be sent as decimal strings or JSON numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Text(String),
    Number(u64),
}

pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    match AmountRepr::deserialize(deserializer)? {
        AmountRepr::Number(n) => Ok(n as u128),
        AmountRepr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn serialize_amount<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&value.to_string())
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AddressRequest {
    pub address: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HashRequest {
    pub hash: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum BlockRequest {
    Hash { hash: String },
    Number { number: u64 },
}

/// Body of `/push_transaction`; `D` is a plain base64 string or a data object depending on the wire version
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PushTransactionRequest<D> {
    pub from: Address,
    pub to: Address,
    #[serde(serialize_with = "serialize_amount", deserialize_with = "deserialize_amount")]
    pub amount: u128,
    #[serde(serialize_with = "serialize_amount", deserialize_with = "deserialize_amount")]
    pub fee: u128,
    pub timestamp: u64,
    pub data: D,
    pub sign: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ViewCallRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<u64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sign: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NodeInfoResult {
    pub top_block_hash: String,
    pub top_block_number: u64,
    #[serde(default)]
    pub api_version: Option<u32>,
}

impl NodeInfoResult {
    pub fn into_node_info(self) -> Result<NodeInfo, ApiError> {
        Ok(NodeInfo {
            top_block_hash: codec::base64_to_base58(&self.top_block_hash)?,
            top_block_number: self.top_block_number,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AccountResult {
    pub address: Address,
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance: u128,
    #[serde(default)]
    pub nonce: u64,
    #[serde(rename = "type", default)]
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub transaction_hashes: Vec<String>,
}

impl AccountResult {
    pub fn into_account_info(self) -> Result<AccountInfo, ApiError> {
        let account_type = self.account_type.ok_or(ApiError::InvalidField {
            field: "type",
            value: "missing".to_owned(),
        })?;
        let transaction_hashes = self
            .transaction_hashes
            .iter()
            .map(|h| codec::base64_to_base58(h))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AccountInfo {
            account_type,
            address: self.address,
            balance: self.balance,
            nonce: self.nonce,
            transaction_hashes,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StatusResult {
    pub action_type: u8,
    pub status_code: u8,
    #[serde(alias = "gas_left", deserialize_with = "deserialize_amount")]
    pub fee_left: u128,
    #[serde(default)]
    pub message: String,
}

impl StatusResult {
    pub fn into_status(self, tx_hash: Hash) -> Result<TransactionStatus, ApiError> {
        let action_type =
            TransactionType::try_from(self.action_type).map_err(|v| ApiError::InvalidField {
                field: "action_type",
                value: v.to_string(),
            })?;
        let status_code = TransactionStatusCode::try_from(self.status_code).map_err(|v| {
            ApiError::InvalidField {
                field: "status_code",
                value: v.to_string(),
            }
        })?;

        // Creation reports the new contract address verbatim
        let message = if action_type == TransactionType::ContractCreation {
            self.message
        } else {
            codec::base64_to_hex(&self.message)?
        };

        Ok(TransactionStatus {
            action_type,
            status_code,
            tx_hash,
            fee_left: self.fee_left,
            message,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransactionResult {
    pub from: Address,
    pub to: Address,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: u128,
    #[serde(deserialize_with = "deserialize_amount")]
    pub fee: u128,
    pub timestamp: u64,
    #[serde(default)]
    pub data: String,
}

impl TransactionResult {
    pub fn into_transaction(self) -> Result<Transaction, ApiError> {
        let data = codec::base64_to_base58(&self.data)?;
        let tx_type = if self.to.is_null() {
            TransactionType::ContractCreation
        } else if data.is_empty() {
            TransactionType::Transfer
        } else {
            TransactionType::ContractCall
        };

        Ok(Transaction::new(
            tx_type,
            self.from,
            self.to,
            self.amount,
            self.fee,
            self.timestamp,
            data,
        ))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BlockResult {
    pub depth: u64,
    pub nonce: u64,
    pub timestamp: u64,
    pub coinbase: String,
    pub previous_block_hash: String,
    #[serde(default)]
    pub transactions: Vec<TransactionResult>,
}

impl BlockResult {
    pub fn into_block(self) -> Result<Block, ApiError> {
        let transactions = self
            .transactions
            .into_iter()
            .map(TransactionResult::into_transaction)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Block {
            depth: self.depth,
            nonce: self.nonce,
            timestamp: self.timestamp,
            coinbase: self.coinbase,
            previous_block_hash: codec::base64_to_base58(&self.previous_block_hash)?,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_ok() {
        let result = envelope(json!({"status": "ok", "result": {"balance": "10"}}))
            .into_result()
            .unwrap();
        assert_eq!(result["balance"], "10");
    }

    #[test]
    fn test_envelope_error_status_carries_message() {
        let err = envelope(json!({"status": "error", "result": "bad address"}))
            .into_result()
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: "error".to_owned(),
                message: "bad address".to_owned()
            }
        );
    }

    #[test]
    fn test_envelope_without_result() {
        assert!(matches!(
            envelope(json!({"status": "ok"})).into_result(),
            Err(ApiError::MissingResult(_))
        ));
        assert!(matches!(
            envelope(json!({"status": "ok", "result": null})).into_result(),
            Err(ApiError::MissingResult(_))
        ));
    }

    #[test]
    fn test_status_result_decodes_message() {
        let raw: StatusResult = serde_json::from_value(json!({
            "action_type": 2,
            "status_code": 0,
            "fee_left": "17",
            "message": "AP8Q"
        }))
        .unwrap();
        let status = raw.into_status(Hash::zero()).unwrap();
        assert_eq!(status.action_type, TransactionType::ContractCall);
        assert_eq!(status.status_code, TransactionStatusCode::Success);
        assert_eq!(status.fee_left, 17);
        assert_eq!(status.message, "00ff10");
    }

    #[test]
    fn test_status_result_creation_keeps_address_and_accepts_gas_left() {
        let raw: StatusResult = serde_json::from_value(json!({
            "action_type": 3,
            "status_code": 1,
            "gas_left": 5,
            "message": "ContractAddr"
        }))
        .unwrap();
        let status = raw.into_status(Hash::zero()).unwrap();
        assert_eq!(status.message, "ContractAddr");
        assert!(status.is_pending());
    }

    #[test]
    fn test_status_result_rejects_unknown_codes() {
        let raw: StatusResult = serde_json::from_value(json!({
            "action_type": 1,
            "status_code": 9,
            "fee_left": 0,
            "message": ""
        }))
        .unwrap();
        assert!(matches!(
            raw.into_status(Hash::zero()),
            Err(ApiError::InvalidField { field: "status_code", .. })
        ));
    }

    #[test]
    fn test_transaction_classification() {
        let from = Address::from_bytes(&[1u8; 20]);
        let null = Address::null();

        let creation: TransactionResult = serde_json::from_value(json!({
            "from": from, "to": null, "amount": "0", "fee": "1", "timestamp": 5, "data": "AAE="
        }))
        .unwrap();
        assert_eq!(
            creation.into_transaction().unwrap().tx_type,
            TransactionType::ContractCreation
        );

        let transfer: TransactionResult = serde_json::from_value(json!({
            "from": from, "to": from, "amount": 333, "fee": "0", "timestamp": 5, "data": ""
        }))
        .unwrap();
        let tx = transfer.into_transaction().unwrap();
        assert_eq!(tx.tx_type, TransactionType::Transfer);
        assert_eq!(tx.value, 333);
        assert!(!tx.verified);
    }

    #[test]
    fn test_push_request_amounts_are_strings() {
        let request = PushTransactionRequest {
            from: Address::from_bytes(&[1u8; 20]),
            to: Address::null(),
            amount: 333,
            fee: 0,
            timestamp: 1,
            data: "".to_owned(),
            sign: "c2ln".to_owned(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["amount"], "333");
        assert_eq!(value["fee"], "0");
        assert_eq!(value["timestamp"], 1);
    }

    #[test]
    fn test_block_request_shapes() {
        assert_eq!(
            serde_json::to_value(BlockRequest::Number { number: 4 }).unwrap(),
            json!({"number": 4})
        );
        assert_eq!(
            serde_json::to_value(BlockRequest::Hash { hash: "AA==".into() }).unwrap(),
            json!({"hash": "AA=="})
        );
    }
}
