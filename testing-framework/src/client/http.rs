// File: testing-framework/src/client/http.rs
//
// JSON over HTTP adapter, wire version 1: transaction payloads are data
// objects (`{"message": ...}`) and view calls are not signed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lk_common::{
    account::{AccountInfo, Keys},
    api::{codec, deserialize_amount, routes, PushTransactionRequest, ViewCallRequest},
    block::{Block, NodeInfo},
    transaction::{
        hash_transaction_fields, Transaction, TransactionStatus, TransactionStatusCode,
        TransactionType,
    },
    Address, Hash,
};
use serde::{Deserialize, Serialize};

use super::{
    contract::{self, CompiledContract},
    rpc::{self, RpcTransport},
    unix_timestamp, BaseClient, BlockQuery, ClientContext, ClientType, Timing,
};
use crate::error::{Result, TestError};

/// Data object of a v1 transaction
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
}

/// v1 push result; `message` is returned as the node printed it
#[derive(Deserialize, Debug, Clone)]
struct PushResult {
    #[serde(default)]
    action_type: Option<u8>,
    status_code: u8,
    #[serde(default)]
    message: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    gas_left: u128,
}

impl PushResult {
    fn into_status(self, default_type: TransactionType, tx_hash: Hash) -> Result<TransactionStatus> {
        let action_type = match self.action_type {
            Some(code) => TransactionType::try_from(code)
                .map_err(|v| TestError::BadResult(format!("unknown action type {}", v)))?,
            None => default_type,
        };
        let status_code = TransactionStatusCode::try_from(self.status_code)
            .map_err(|v| TestError::BadResult(format!("unknown status code {}", v)))?;

        Ok(TransactionStatus {
            action_type,
            status_code,
            tx_hash,
            fee_left: self.gas_left,
            message: self.message,
        })
    }
}

/// Creation payload: `len(message) || message || len(code) || code`, lengths as 8 byte big endian
pub fn creation_payload(message: &[u8], code: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(16 + message.len() + code.len());
    data.extend_from_slice(&(message.len() as u64).to_be_bytes());
    data.extend_from_slice(message);
    data.extend_from_slice(&(code.len() as u64).to_be_bytes());
    data.extend_from_slice(code);
    data
}

pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim())
        .map_err(|e| TestError::InvalidArguments(format!("message is not hex: {}", e)))
}

pub struct HttpClient {
    context: ClientContext,
    transport: RpcTransport,
}

impl HttpClient {
    pub fn new(context: ClientContext) -> Result<Self> {
        let transport = RpcTransport::new(&context.name, &context.node_address, context.logger.clone())?;
        Ok(Self { context, transport })
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    #[allow(clippy::too_many_arguments)]
    async fn push(
        &self,
        from: &Keys,
        to: &Address,
        amount: u128,
        fee: u128,
        hashed_data: &str,
        data: MessageData,
        default_type: TransactionType,
        timing: Timing,
    ) -> Result<TransactionStatus> {
        let (key, _) = rpc::load_local_keys(&from.keys_path)?;
        let from_address = key.address();
        let timestamp = unix_timestamp();
        let tx_hash = hash_transaction_fields(&from_address, to, amount, fee, timestamp, hashed_data);

        let request = PushTransactionRequest {
            from: from_address,
            to: to.clone(),
            amount,
            fee,
            timestamp,
            data,
            sign: rpc::sign_hash(&key, &tx_hash)?,
        };
        let result: PushResult = self
            .transport
            .call(routes::PUSH_TRANSACTION, &request, timing)
            .await?;
        result.into_status(default_type, tx_hash)
    }
}

#[async_trait]
impl BaseClient for HttpClient {
    fn name(&self) -> &str {
        &self.context.name
    }

    fn client_type(&self) -> ClientType {
        ClientType::Http
    }

    async fn connection_test(&self, timing: Timing) -> Result<bool> {
        self.transport.node_info_result(timing).await?;
        Ok(true)
    }

    async fn node_info(&self, timing: Timing) -> Result<NodeInfo> {
        self.transport.node_info(timing).await
    }

    async fn generate_keys(&self, keys_path: &Path, _timing: Timing) -> Result<Keys> {
        rpc::generate_local_keys(keys_path)
    }

    async fn load_address(&self, keys_path: &Path, _timing: Timing) -> Result<Keys> {
        Ok(rpc::load_local_keys(keys_path)?.1)
    }

    async fn get_balance(&self, address: &Address, timing: Timing) -> Result<u128> {
        Ok(self.transport.account(address, timing).await?.balance)
    }

    async fn get_account_info(&self, address: &Address, timing: Timing) -> Result<AccountInfo> {
        self.transport.account_info(address, timing).await
    }

    async fn transfer(
        &self,
        to: &Address,
        amount: u128,
        from: &Keys,
        fee: u128,
        timing: Timing,
    ) -> Result<TransactionStatus> {
        let data = MessageData {
            message: String::new(),
            abi: None,
        };
        self.push(from, to, amount, fee, "", data, TransactionType::Transfer, timing)
            .await
    }

    async fn get_transaction_status(&self, tx_hash: &Hash, timing: Timing) -> Result<TransactionStatus> {
        self.transport.transaction_status(tx_hash, timing).await
    }

    async fn get_transaction(&self, tx_hash: &Hash, timing: Timing) -> Result<Transaction> {
        self.transport.transaction(tx_hash, timing).await
    }

    async fn get_block(&self, query: BlockQuery, timing: Timing) -> Result<Block> {
        self.transport.block(query, timing).await
    }

    async fn compile_file(&self, code: &Path, timing: Timing) -> Result<Vec<PathBuf>> {
        contract::compile_file(
            &self.context.name,
            &self.context.solc_binary,
            &self.context.work_dir,
            code,
            timing,
            &self.context.logger,
        )
        .await
    }

    async fn encode_message(&self, code: &Path, message: &str, _timing: Timing) -> Result<String> {
        contract::encode_message(&CompiledContract::load(code)?, message)
    }

    async fn decode_message(
        &self,
        code: &Path,
        method: &str,
        message: &str,
        _timing: Timing,
    ) -> Result<serde_json::Value> {
        contract::decode_message(&CompiledContract::load(code)?, method, message)
    }

    async fn push_contract(
        &self,
        from: &Keys,
        code: &Path,
        fee: u128,
        amount: u128,
        init_message: &str,
        timing: Timing,
    ) -> Result<TransactionStatus> {
        let compiled = CompiledContract::load(code)?;
        let message = decode_hex(init_message)?;
        let payload = creation_payload(&message, compiled.bytecode.as_bytes());

        let data = MessageData {
            message: codec::encode_base64(&message),
            abi: Some(compiled.abi_json()?),
        };
        self.push(
            from,
            &Address::null(),
            amount,
            fee,
            &codec::encode_base64(&payload),
            data,
            TransactionType::ContractCreation,
            timing,
        )
        .await
    }

    async fn message_call(
        &self,
        from: &Keys,
        to: &Address,
        fee: u128,
        amount: u128,
        message: &str,
        timing: Timing,
    ) -> Result<TransactionStatus> {
        let encoded = codec::encode_base64(&decode_hex(message)?);
        let data = MessageData {
            message: encoded.clone(),
            abi: None,
        };
        self.push(from, to, amount, fee, &encoded, data, TransactionType::ContractCall, timing)
            .await
    }

    async fn call_view(&self, from: &Keys, to: &Address, message: &str, timing: Timing) -> Result<String> {
        let request = ViewCallRequest {
            from: from.address.clone(),
            to: to.clone(),
            timestamp: None,
            message: codec::encode_base64(&decode_hex(message)?),
            sign: None,
        };
        self.transport
            .call(routes::CALL_CONTRACT_VIEW, &request, timing)
            .await
    }
}
