// File: testing-framework/src/client/mod.rs
//
// Client abstraction over the node: one trait, one explicit tag selecting the
// adapter, and the timing presets each adapter was tuned with.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use clap::ValueEnum;
use lk_common::{
    account::{AccountInfo, Keys},
    block::{Block, NodeInfo},
    transaction::{Transaction, TransactionStatus},
    Address, Hash,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TestError},
    logger::Logger,
};

mod command;
pub mod contract;
pub mod crypto;
pub mod http;
pub mod legacy;
mod rpc;

pub use crypto::CryptoClient;
pub use http::HttpClient;
pub use legacy::LegacyClient;

/// Deadline of one call and the settle delay applied after it succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub timeout: Duration,
    pub wait: Duration,
}

impl Timing {
    pub const fn new(timeout: Duration, wait: Duration) -> Self {
        Self { timeout, wait }
    }

    pub const fn from_secs(timeout: u64, wait: u64) -> Self {
        Self::new(Duration::from_secs(timeout), Duration::from_secs(wait))
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Timing presets of one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    /// Simple queries (node info, balance, status)
    pub call: Timing,
    /// Local operations (keys, compilation, encoding)
    pub standalone: Timing,
    /// Transfers
    pub transaction: Timing,
    /// Contract deployment and calls
    pub contract: Timing,
    /// Delay between two transaction status polls
    pub status_poll_interval: Duration,
    /// Maximum number of status polls
    pub status_poll_budget: usize,
}

/// Explicit adapter selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ClientType {
    /// CLI client talking to the legacy RPC port
    Legacy,
    /// CLI client talking to the HTTP port (`--http`)
    LegacyHttp,
    /// JSON over HTTP, unsigned view calls
    Http,
    /// JSON over HTTP, every payload signed locally
    Crypto,
}

impl ClientType {
    pub fn timing_profile(&self) -> TimingProfile {
        match self {
            ClientType::Legacy | ClientType::LegacyHttp => TimingProfile {
                call: Timing::from_secs(2, 0),
                standalone: Timing::from_secs(2, 0),
                transaction: Timing::from_secs(5, 3),
                contract: Timing::from_secs(5, 3),
                status_poll_interval: Duration::from_secs(3),
                status_poll_budget: 5,
            },
            ClientType::Http => TimingProfile {
                call: Timing::from_secs(7, 0),
                standalone: Timing::from_secs(5, 0),
                transaction: Timing::from_secs(10, 3),
                contract: Timing::from_secs(15, 3),
                status_poll_interval: Duration::from_secs(3),
                status_poll_budget: 5,
            },
            ClientType::Crypto => TimingProfile {
                call: Timing::from_secs(20, 0),
                standalone: Timing::from_secs(10, 0),
                transaction: Timing::from_secs(20, 4),
                contract: Timing::from_secs(20, 4),
                status_poll_interval: Duration::from_secs(4),
                status_poll_budget: 5,
            },
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ClientType::Legacy | ClientType::LegacyHttp)
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ClientType::Legacy => "legacy",
            ClientType::LegacyHttp => "legacy-http",
            ClientType::Http => "http",
            ClientType::Crypto => "crypto",
        })
    }
}

/// Block lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockQuery {
    /// Hex encoded block hash
    Hash(String),
    Number(u64),
}

/// Everything an adapter needs to reach one node
#[derive(Clone)]
pub struct ClientContext {
    pub name: String,
    pub work_dir: PathBuf,
    /// `host:port` of the node endpoint
    pub node_address: String,
    pub client_binary: PathBuf,
    pub solc_binary: PathBuf,
    pub logger: Logger,
}

/// Operations every adapter exposes
///
/// Operations a given adapter cannot perform return [`TestError::Logic`].
#[async_trait]
pub trait BaseClient: Send + Sync {
    fn name(&self) -> &str;

    fn client_type(&self) -> ClientType;

    fn profile(&self) -> TimingProfile {
        self.client_type().timing_profile()
    }

    async fn connection_test(&self, timing: Timing) -> Result<bool>;

    async fn node_info(&self, timing: Timing) -> Result<NodeInfo>;

    /// Generate a key pair stored under `keys_path`
    async fn generate_keys(&self, keys_path: &Path, timing: Timing) -> Result<Keys>;

    /// Read the address of the key stored under `keys_path`
    async fn load_address(&self, keys_path: &Path, timing: Timing) -> Result<Keys>;

    async fn get_balance(&self, address: &Address, timing: Timing) -> Result<u128>;

    async fn get_account_info(&self, _address: &Address, _timing: Timing) -> Result<AccountInfo> {
        Err(not_implemented(self.name(), "get_account_info"))
    }

    async fn transfer(
        &self,
        to: &Address,
        amount: u128,
        from: &Keys,
        fee: u128,
        timing: Timing,
    ) -> Result<TransactionStatus>;

    async fn get_transaction_status(
        &self,
        _tx_hash: &Hash,
        _timing: Timing,
    ) -> Result<TransactionStatus> {
        Err(not_implemented(self.name(), "get_transaction_status"))
    }

    async fn get_transaction(&self, tx_hash: &Hash, timing: Timing) -> Result<Transaction>;

    async fn get_block(&self, query: BlockQuery, timing: Timing) -> Result<Block>;

    /// Compile a Solidity file, returning one folder per contract
    async fn compile_file(&self, code: &Path, timing: Timing) -> Result<Vec<PathBuf>>;

    /// ABI encode `method(args)` against a compiled contract folder
    async fn encode_message(&self, code: &Path, message: &str, timing: Timing) -> Result<String>;

    /// ABI decode the hex output of `method`
    async fn decode_message(
        &self,
        code: &Path,
        method: &str,
        message: &str,
        timing: Timing,
    ) -> Result<serde_json::Value>;

    /// Deploy the contract compiled into the folder `code`
    #[allow(clippy::too_many_arguments)]
    async fn push_contract(
        &self,
        _from: &Keys,
        _code: &Path,
        _fee: u128,
        _amount: u128,
        _init_message: &str,
        _timing: Timing,
    ) -> Result<TransactionStatus> {
        Err(not_implemented(self.name(), "push_contract"))
    }

    #[allow(clippy::too_many_arguments)]
    async fn message_call(
        &self,
        _from: &Keys,
        _to: &Address,
        _fee: u128,
        _amount: u128,
        _message: &str,
        _timing: Timing,
    ) -> Result<TransactionStatus> {
        Err(not_implemented(self.name(), "message_call"))
    }

    async fn call_view(
        &self,
        _from: &Keys,
        _to: &Address,
        _message: &str,
        _timing: Timing,
    ) -> Result<String> {
        Err(not_implemented(self.name(), "call_view"))
    }
}

pub(crate) fn not_implemented(name: &str, method: &str) -> TestError {
    TestError::Logic(format!("{} - method {} is not implemented", name, method))
}

/// Build the adapter selected by `client_type`
///
/// New adapters are added here and to [`ClientType`].
pub fn create_client(client_type: ClientType, context: ClientContext) -> Result<Box<dyn BaseClient>> {
    Ok(match client_type {
        ClientType::Legacy => Box::new(LegacyClient::new(context, false)?),
        ClientType::LegacyHttp => Box::new(LegacyClient::new(context, true)?),
        ClientType::Http => Box::new(HttpClient::new(context)?),
        ClientType::Crypto => Box::new(CryptoClient::new(context)?),
    })
}

/// Seconds since the Unix epoch, used as transaction timestamp
pub(crate) fn unix_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_type_parses_from_cli_names() {
        assert_eq!(
            ClientType::from_str("legacy-http", true).unwrap(),
            ClientType::LegacyHttp
        );
        assert_eq!(ClientType::from_str("crypto", true).unwrap(), ClientType::Crypto);
        assert!(ClientType::from_str("websocket", true).is_err());
        assert_eq!(ClientType::LegacyHttp.to_string(), "legacy-http");
    }

    #[test]
    fn test_client_type_serde_names() {
        let value: ClientType = serde_json::from_str("\"legacy-http\"").unwrap();
        assert_eq!(value, ClientType::LegacyHttp);
    }

    #[test]
    fn test_profiles() {
        let crypto = ClientType::Crypto.timing_profile();
        assert_eq!(crypto.call.timeout, Duration::from_secs(20));
        assert_eq!(crypto.status_poll_interval, Duration::from_secs(4));

        let http = ClientType::Http.timing_profile();
        assert_eq!(http.contract.timeout, Duration::from_secs(15));
        assert_eq!(http.transaction.wait, Duration::from_secs(3));
    }
}
