// File: testing-framework/src/client/legacy/mod.rs
//
// Adapter driving the CLI client binary and scraping its stdout.

pub mod parsers;

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use lk_common::{
    account::Keys,
    block::{Block, NodeInfo},
    transaction::{Transaction, TransactionStatus, TransactionStatusCode, TransactionType},
    Address, Hash,
};

use super::{command::run_command, BaseClient, BlockQuery, ClientContext, ClientType, Timing};
use crate::error::{Result, TestError};

pub struct LegacyClient {
    context: ClientContext,
    connect_params: Vec<OsString>,
    is_http: bool,
}

impl LegacyClient {
    pub fn new(context: ClientContext, is_http: bool) -> Result<Self> {
        if !context.client_binary.exists() {
            return Err(TestError::InvalidArguments(format!(
                "client binary not found: {}",
                context.client_binary.display()
            )));
        }

        let mut connect_params = vec![OsString::from("--host"), OsString::from(&context.node_address)];
        if is_http {
            connect_params.push(OsString::from("--http"));
        }

        Ok(Self {
            context,
            connect_params,
            is_http,
        })
    }

    async fn run_standalone(&self, command: &str, parameters: Vec<OsString>, timing: Timing) -> Result<String> {
        let args = std::iter::once(OsString::from(command)).chain(parameters);
        run_command(
            &self.context.name,
            &self.context.client_binary,
            args,
            &self.context.work_dir,
            timing.timeout,
            &self.context.logger,
        )
        .await
    }

    async fn run_client(&self, command: &str, parameters: Vec<OsString>, timing: Timing) -> Result<String> {
        let args = std::iter::once(OsString::from(command))
            .chain(self.connect_params.iter().cloned())
            .chain(parameters);
        let output = run_command(
            &self.context.name,
            &self.context.client_binary,
            args,
            &self.context.work_dir,
            timing.timeout,
            &self.context.logger,
        )
        .await?;

        if !timing.wait.is_zero() {
            tokio::time::sleep(timing.wait).await;
        }
        Ok(output)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.context.work_dir.join(path)
        }
    }
}

fn arg(value: impl ToString) -> OsString {
    OsString::from(value.to_string())
}

#[async_trait]
impl BaseClient for LegacyClient {
    fn name(&self) -> &str {
        &self.context.name
    }

    fn client_type(&self) -> ClientType {
        if self.is_http {
            ClientType::LegacyHttp
        } else {
            ClientType::Legacy
        }
    }

    async fn connection_test(&self, timing: Timing) -> Result<bool> {
        let output = self.run_client("connection_test", Vec::new(), timing).await?;
        Ok(parsers::connection_test(&output))
    }

    async fn node_info(&self, timing: Timing) -> Result<NodeInfo> {
        let output = self.run_client("node_info", Vec::new(), timing).await?;
        parsers::node_info(&output)
    }

    async fn generate_keys(&self, keys_path: &Path, timing: Timing) -> Result<Keys> {
        let path = self.absolute(keys_path);
        fs::create_dir_all(&path)?;
        let output = self
            .run_standalone("generate_keys", vec![OsString::from("--keys"), path.into_os_string()], timing)
            .await?;
        parsers::generate_keys(&output)
    }

    async fn load_address(&self, keys_path: &Path, timing: Timing) -> Result<Keys> {
        let output = self
            .run_standalone("keys_info", vec![OsString::from("--keys"), keys_path.into()], timing)
            .await?;
        Ok(Keys::new(keys_path.to_path_buf(), parsers::keys_info(&output)?))
    }

    async fn get_balance(&self, address: &Address, timing: Timing) -> Result<u128> {
        let output = self
            .run_client("get_balance", vec![arg("--address"), arg(address)], timing)
            .await?;
        parsers::balance(&output)
    }

    async fn transfer(
        &self,
        to: &Address,
        amount: u128,
        from: &Keys,
        fee: u128,
        timing: Timing,
    ) -> Result<TransactionStatus> {
        let parameters = vec![
            arg("--to"),
            arg(to),
            arg("--amount"),
            arg(amount),
            arg("--keys"),
            from.keys_path.clone().into_os_string(),
            arg("--fee"),
            arg(fee),
        ];
        let output = self.run_client("transfer", parameters, timing).await?;
        let outcome = parsers::transfer(&output)?;

        Ok(TransactionStatus {
            action_type: TransactionType::Transfer,
            status_code: if outcome.success {
                TransactionStatusCode::Success
            } else {
                TransactionStatusCode::Failed
            },
            tx_hash: outcome.tx_hash,
            fee_left: 0,
            message: outcome.fail_message,
        })
    }

    async fn get_transaction(&self, tx_hash: &Hash, timing: Timing) -> Result<Transaction> {
        let output = self
            .run_client("get_transaction", vec![arg("--hash"), arg(tx_hash.to_hex())], timing)
            .await?;
        parsers::transaction(&output)
    }

    async fn get_block(&self, query: BlockQuery, timing: Timing) -> Result<Block> {
        let parameters = match query {
            BlockQuery::Hash(hash) => vec![arg("--hash"), arg(hash)],
            BlockQuery::Number(number) => vec![arg("--number"), arg(number)],
        };
        let output = self.run_client("get_block", parameters, timing).await?;
        parsers::block(&output)
    }

    async fn compile_file(&self, code: &Path, timing: Timing) -> Result<Vec<PathBuf>> {
        let output = self
            .run_standalone("compile", vec![arg("--code"), code.into()], timing)
            .await?;
        Ok(parsers::compiled_contracts(&output)?
            .into_iter()
            .map(|folder| self.absolute(&folder))
            .collect())
    }

    async fn encode_message(&self, code: &Path, message: &str, timing: Timing) -> Result<String> {
        let output = self
            .run_standalone("encode", vec![arg("--code"), code.into(), arg("--data"), arg(message)], timing)
            .await?;
        Ok(parsers::encoded_message(&output))
    }

    async fn decode_message(
        &self,
        code: &Path,
        method: &str,
        message: &str,
        timing: Timing,
    ) -> Result<serde_json::Value> {
        let parameters = vec![
            arg("--code"),
            code.into(),
            arg("--method"),
            arg(method),
            arg("--data"),
            arg(message),
        ];
        let output = self.run_standalone("decode", parameters, timing).await?;
        parsers::decoded_message(&output)
    }
}
