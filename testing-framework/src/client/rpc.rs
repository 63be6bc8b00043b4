// File: testing-framework/src/client/rpc.rs
//
// POST-with-envelope transport shared by the HTTP and crypto adapters.

use std::path::Path;

use log::{debug, log_enabled, Level};
use lk_common::{
    account::{AccountInfo, Keys},
    api::{
        codec, routes, AccountResult, AddressRequest, BlockRequest, BlockResult, Envelope,
        HashRequest, NodeInfoResult, StatusResult, TransactionResult,
    },
    block::{Block, NodeInfo},
    transaction::{Transaction, TransactionStatus},
    Address, Hash, KeyPair,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use super::{BlockQuery, Timing};
use crate::{
    error::{Result, TestError},
    logger::Logger,
};

pub(crate) struct RpcTransport {
    name: String,
    base_url: String,
    client: Client,
    logger: Logger,
}

impl RpcTransport {
    pub fn new(name: &str, node_address: &str, logger: Logger) -> Result<Self> {
        let base_url = if node_address.starts_with("http://") || node_address.starts_with("https://")
        {
            node_address.trim_end_matches('/').to_owned()
        } else {
            format!("http://{}", node_address)
        };

        let client = Client::builder()
            .build()
            .map_err(|e| TestError::InvalidArguments(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.to_owned(),
            base_url,
            client,
            logger,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `route`, unwrap the envelope and decode its result
    pub async fn call<B, R>(&self, route: &str, body: &B, timing: Timing) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, route);
        if log_enabled!(Level::Debug) {
            debug!(
                "{} - POST {} {}",
                self.name,
                url,
                serde_json::to_string(body).unwrap_or_default()
            );
        }

        let response = self
            .client
            .post(&url)
            .timeout(timing.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TestError::BadResult(format!(
                "not success command execution {}[{}]: {}",
                url, status, text
            )));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_error(&url, e)
            } else {
                TestError::BadResult(format!(
                    "could not decode command response of {} as json: {}",
                    url, e
                ))
            }
        })?;

        let result = envelope.into_result().map_err(|e| {
            TestError::BadResult(format!("exception at command execution to {}: {}", url, e))
        })?;

        let decoded = serde_json::from_value(result).map_err(|e| {
            TestError::BadResult(format!("unexpected result of {}: {}", url, e))
        })?;

        if !timing.wait.is_zero() {
            tokio::time::sleep(timing.wait).await;
        }
        Ok(decoded)
    }

    pub async fn node_info_result(&self, timing: Timing) -> Result<NodeInfoResult> {
        self.call(routes::GET_NODE_INFO, &json!({}), timing).await
    }

    pub async fn node_info(&self, timing: Timing) -> Result<NodeInfo> {
        Ok(self.node_info_result(timing).await?.into_node_info()?)
    }

    pub async fn account(&self, address: &Address, timing: Timing) -> Result<AccountResult> {
        let request = AddressRequest {
            address: address.to_string(),
        };
        self.call(routes::GET_ACCOUNT, &request, timing).await
    }

    pub async fn account_info(&self, address: &Address, timing: Timing) -> Result<AccountInfo> {
        Ok(self.account(address, timing).await?.into_account_info()?)
    }

    pub async fn transaction_status(&self, tx_hash: &Hash, timing: Timing) -> Result<TransactionStatus> {
        let request = hash_request(tx_hash);
        let result: StatusResult = self
            .call(routes::GET_TRANSACTION_STATUS, &request, timing)
            .await?;
        Ok(result.into_status(tx_hash.clone())?)
    }

    pub async fn transaction(&self, tx_hash: &Hash, timing: Timing) -> Result<Transaction> {
        let request = hash_request(tx_hash);
        let result: TransactionResult = self.call(routes::GET_TRANSACTION, &request, timing).await?;
        Ok(result.into_transaction()?)
    }

    pub async fn block(&self, query: BlockQuery, timing: Timing) -> Result<Block> {
        let request = match query {
            BlockQuery::Hash(hash) => BlockRequest::Hash {
                hash: codec::hex_to_base64(&hash)?,
            },
            BlockQuery::Number(number) => BlockRequest::Number { number },
        };
        let result: BlockResult = self.call(routes::GET_BLOCK, &request, timing).await?;
        Ok(result.into_block()?)
    }

    fn map_error(&self, url: &str, err: reqwest::Error) -> TestError {
        if err.is_timeout() {
            let message = format!("client slow command execution {}", url);
            self.logger.info(format!("{} - {}", self.name, message));
            TestError::TimeOut(message)
        } else if err.is_connect() {
            TestError::BadResult(format!("could not connect to node with {}: {}", url, err))
        } else {
            TestError::BadResult(format!("exception at command execution to {}: {}", url, err))
        }
    }
}

/// Hashes travel base64 encoded
pub(crate) fn hash_request(tx_hash: &Hash) -> HashRequest {
    HashRequest {
        hash: codec::encode_base64(tx_hash.as_bytes()),
    }
}

/// Generate a key locally and store it under `keys_path`
pub(crate) fn generate_local_keys(keys_path: &Path) -> Result<Keys> {
    let key = KeyPair::generate();
    key.save(keys_path)?;
    Ok(Keys::new(keys_path.to_path_buf(), key.address()))
}

pub(crate) fn load_local_keys(keys_path: &Path) -> Result<(KeyPair, Keys)> {
    let key = KeyPair::load(keys_path)?;
    let keys = Keys::new(keys_path.to_path_buf(), key.address());
    Ok((key, keys))
}

/// Base64 recoverable signature over the transaction hash
pub(crate) fn sign_hash(key: &KeyPair, tx_hash: &Hash) -> Result<String> {
    Ok(codec::encode_base64(&key.sign_recoverable(tx_hash.as_bytes())?))
}
