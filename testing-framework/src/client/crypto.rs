// File: testing-framework/src/client/crypto.rs
//
// JSON over HTTP adapter, wire version 2: every payload is a base64 string,
// transactions and view calls are signed locally with the sender's key.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use lk_common::{
    account::{AccountInfo, Keys},
    api::{codec, routes, PushTransactionRequest, StatusResult, ViewCallRequest, SUPPORTED_API_VERSION},
    block::{Block, NodeInfo},
    transaction::{hash_transaction_fields, hash_view_call, Transaction, TransactionStatus},
    Address, Hash,
};

use super::{
    contract::{self, CompiledContract},
    http::decode_hex,
    rpc::{self, RpcTransport},
    unix_timestamp, BaseClient, BlockQuery, ClientContext, ClientType, Timing,
};
use crate::{
    error::Result,
    orchestrator::{Clock, SystemClock},
    tracker::TransactionTracker,
};

pub struct CryptoClient {
    context: ClientContext,
    transport: RpcTransport,
}

impl CryptoClient {
    pub fn new(context: ClientContext) -> Result<Self> {
        let transport = RpcTransport::new(&context.name, &context.node_address, context.logger.clone())?;
        Ok(Self { context, transport })
    }

    async fn push(
        &self,
        from: &Keys,
        to: &Address,
        amount: u128,
        fee: u128,
        data: String,
        timing: Timing,
    ) -> Result<TransactionStatus> {
        let (key, _) = rpc::load_local_keys(&from.keys_path)?;
        let from_address = key.address();
        let timestamp = unix_timestamp();
        let tx_hash = hash_transaction_fields(&from_address, to, amount, fee, timestamp, &data);

        let request = PushTransactionRequest {
            from: from_address,
            to: to.clone(),
            amount,
            fee,
            timestamp,
            data,
            sign: rpc::sign_hash(&key, &tx_hash)?,
        };
        let result: StatusResult = self
            .transport
            .call(routes::PUSH_TRANSACTION, &request, timing)
            .await?;
        Ok(result.into_status(tx_hash)?)
    }

    /// Poll the status of `transaction` until it succeeds or the poll budget runs out
    pub async fn transaction_success_wait(&self, transaction: &TransactionStatus) -> Result<bool> {
        self.transaction_success_wait_with(transaction, Arc::new(SystemClock)).await
    }

    pub async fn transaction_success_wait_with(
        &self,
        transaction: &TransactionStatus,
        clock: Arc<dyn Clock>,
    ) -> Result<bool> {
        let profile = self.profile();
        self.context.logger.info(format!(
            "Wait transaction {} (transaction_update_time = {:?}, max_update_request = {})",
            transaction.tx_hash, profile.status_poll_interval, profile.status_poll_budget
        ));

        let success = TransactionTracker::new(clock)
            .wait_for_terminal(
                self,
                &transaction.tx_hash,
                profile.status_poll_interval,
                profile.status_poll_budget,
                profile.call,
            )
            .await?;
        if success {
            self.context
                .logger
                .info(format!("Transaction {} success.", transaction.tx_hash));
        }
        Ok(success)
    }
}

#[async_trait]
impl BaseClient for CryptoClient {
    fn name(&self) -> &str {
        &self.context.name
    }

    fn client_type(&self) -> ClientType {
        ClientType::Crypto
    }

    async fn connection_test(&self, timing: Timing) -> Result<bool> {
        let info = self.transport.node_info_result(timing).await?;
        Ok(info.api_version == Some(SUPPORTED_API_VERSION))
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
        self.push(from, to, amount, fee, String::new(), timing).await
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
        // An empty init message deploys the bare bytecode
        let message = if init_message.trim().is_empty() {
            decode_hex(&CompiledContract::load(code)?.bytecode)?
        } else {
            decode_hex(init_message)?
        };
        self.push(from, &Address::null(), amount, fee, codec::encode_base64(&message), timing)
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
        let data = codec::encode_base64(&decode_hex(message)?);
        self.push(from, to, amount, fee, data, timing).await
    }

    async fn call_view(&self, from: &Keys, to: &Address, message: &str, timing: Timing) -> Result<String> {
        let (key, _) = rpc::load_local_keys(&from.keys_path)?;
        let from_address = key.address();
        let data = codec::encode_base64(&decode_hex(message)?);
        let timestamp = unix_timestamp();
        let call_hash = hash_view_call(&from_address, to, timestamp, &data);

        let request = ViewCallRequest {
            from: from_address,
            to: to.clone(),
            timestamp: Some(timestamp),
            message: data,
            sign: Some(rpc::sign_hash(&key, &call_hash)?),
        };
        let result: String = self
            .transport
            .call(routes::CALL_CONTRACT_VIEW, &request, timing)
            .await?;
        Ok(codec::base64_to_hex(&result)?)
    }
}
