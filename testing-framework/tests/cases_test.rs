// Scenario helpers against an in-memory ledger standing in for the node
// Time is paused: status polls and balance retries cost no real time.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use lk_common::{
    account::Keys,
    block::{Block, NodeInfo},
    transaction::{Transaction, TransactionStatus, TransactionStatusCode, TransactionType},
    Address, Hash,
};
use lk_testing_framework::{
    cases::{
        converged_balance, generate_accounts, transfer_and_wait, wait_until_final,
        BALANCE_POLL_BUDGET,
    },
    client::{BaseClient, BlockQuery, ClientType, Timing},
    Clock, Environment, EnvironmentSettings, Logger, PausedClock, Result, TestError,
};

struct PendingTransfer {
    from: Address,
    to: Address,
    amount: u128,
    fee: u128,
    polls: usize,
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<Address, u128>,
    pending: HashMap<Hash, PendingTransfer>,
    confirmed: Vec<Hash>,
    // address -> (value still reported, reads left before the new value shows)
    lagging: HashMap<Address, (u128, usize)>,
    next_tx: u8,
    next_key: u8,
    status_polls: usize,
    balance_reads: usize,
}

/// Node double: transfers stay pending for `pending_polls` status queries,
/// then balances on the touched accounts lag for `balance_lag` reads
struct LedgerClient {
    ledger: Mutex<Ledger>,
    pending_polls: usize,
    balance_lag: usize,
}

impl LedgerClient {
    fn new(pending_polls: usize, balance_lag: usize) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                next_key: 10,
                ..Ledger::default()
            }),
            pending_polls,
            balance_lag,
        }
    }

    fn fund(&self, address: &Address, amount: u128) {
        self.ledger.lock().unwrap().balances.insert(address.clone(), amount);
    }

    fn status_polls(&self) -> usize {
        self.ledger.lock().unwrap().status_polls
    }

    fn balance_reads(&self) -> usize {
        self.ledger.lock().unwrap().balance_reads
    }

    fn status(code: TransactionStatusCode, tx_hash: Hash, message: &str) -> TransactionStatus {
        TransactionStatus {
            action_type: TransactionType::Transfer,
            status_code: code,
            tx_hash,
            fee_left: 0,
            message: message.to_owned(),
        }
    }
}

impl Ledger {
    fn apply(&mut self, transfer: PendingTransfer, lag: usize) {
        for address in [&transfer.from, &transfer.to] {
            let current = self.balances.get(address).copied().unwrap_or(0);
            if lag > 0 {
                self.lagging.insert(address.clone(), (current, lag));
            }
        }
        *self.balances.entry(transfer.from).or_default() -= transfer.amount + transfer.fee;
        *self.balances.entry(transfer.to).or_default() += transfer.amount;
    }
}

fn unused(method: &str) -> TestError {
    TestError::Logic(format!("{} is not part of the ledger", method))
}

#[async_trait]
impl BaseClient for LedgerClient {
    fn name(&self) -> &str {
        "ledger"
    }

    fn client_type(&self) -> ClientType {
        ClientType::Http
    }

    async fn connection_test(&self, _timing: Timing) -> Result<bool> {
        Ok(true)
    }

    async fn node_info(&self, _timing: Timing) -> Result<NodeInfo> {
        Err(unused("node_info"))
    }

    async fn generate_keys(&self, keys_path: &Path, _timing: Timing) -> Result<Keys> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.next_key += 1;
        Ok(Keys::new(
            keys_path.to_path_buf(),
            Address::from_bytes(&[ledger.next_key; 20]),
        ))
    }

    async fn load_address(&self, _keys_path: &Path, _timing: Timing) -> Result<Keys> {
        Err(unused("load_address"))
    }

    async fn get_balance(&self, address: &Address, _timing: Timing) -> Result<u128> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.balance_reads += 1;
        if let Some((stale, reads_left)) = ledger.lagging.get_mut(address) {
            if *reads_left > 0 {
                *reads_left -= 1;
                return Ok(*stale);
            }
        }
        Ok(ledger.balances.get(address).copied().unwrap_or(0))
    }

    async fn transfer(
        &self,
        to: &Address,
        amount: u128,
        from: &Keys,
        fee: u128,
        _timing: Timing,
    ) -> Result<TransactionStatus> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.next_tx += 1;
        let tx_hash = Hash::new([ledger.next_tx; 32]);

        let available = ledger.balances.get(&from.address).copied().unwrap_or(0);
        if available < amount + fee {
            return Ok(Self::status(
                TransactionStatusCode::NotEnoughBalance,
                tx_hash,
                "not enough balance",
            ));
        }

        ledger.pending.insert(
            tx_hash.clone(),
            PendingTransfer {
                from: from.address.clone(),
                to: to.clone(),
                amount,
                fee,
                polls: 0,
            },
        );
        Ok(Self::status(TransactionStatusCode::Pending, tx_hash, ""))
    }

    async fn get_transaction_status(&self, tx_hash: &Hash, _timing: Timing) -> Result<TransactionStatus> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.status_polls += 1;
        if ledger.confirmed.contains(tx_hash) {
            return Ok(Self::status(TransactionStatusCode::Success, tx_hash.clone(), ""));
        }

        let transfer = ledger
            .pending
            .get_mut(tx_hash)
            .ok_or_else(|| TestError::BadResult(format!("unknown transaction {}", tx_hash)))?;
        transfer.polls += 1;
        if transfer.polls < self.pending_polls {
            return Ok(Self::status(TransactionStatusCode::Pending, tx_hash.clone(), ""));
        }

        if let Some(transfer) = ledger.pending.remove(tx_hash) {
            ledger.apply(transfer, self.balance_lag);
        }
        ledger.confirmed.push(tx_hash.clone());
        Ok(Self::status(TransactionStatusCode::Success, tx_hash.clone(), ""))
    }

    async fn get_transaction(&self, _tx_hash: &Hash, _timing: Timing) -> Result<Transaction> {
        Err(unused("get_transaction"))
    }

    async fn get_block(&self, _query: BlockQuery, _timing: Timing) -> Result<Block> {
        Err(unused("get_block"))
    }

    async fn compile_file(&self, _code: &Path, _timing: Timing) -> Result<Vec<PathBuf>> {
        Err(unused("compile_file"))
    }

    async fn encode_message(&self, _code: &Path, _message: &str, _timing: Timing) -> Result<String> {
        Err(unused("encode_message"))
    }

    async fn decode_message(
        &self,
        _code: &Path,
        _method: &str,
        _message: &str,
        _timing: Timing,
    ) -> Result<serde_json::Value> {
        Err(unused("decode_message"))
    }
}

fn environment(dir: &Path) -> Environment {
    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::write(bin.join("node"), "").unwrap();
    std::fs::write(bin.join("client"), "").unwrap();

    let settings = EnvironmentSettings {
        node_binary: bin.join("node"),
        client_binary: bin.join("client"),
        solc_binary: "solc".into(),
        run_dir: dir.join("run"),
        distributor_keys: dir.join("keys"),
        client_type: ClientType::Http,
        shutdown_timeout: Duration::from_secs(1),
        pool_size: 2,
    };
    Environment::with_clock(settings, "cases", Logger::discard(), Arc::new(PausedClock::new())).unwrap()
}

fn distributor() -> Keys {
    Keys::new(PathBuf::from("distributor"), Address::from_bytes(&[1u8; 20]))
}

#[tokio::test]
async fn test_transfer_moves_amount_and_fee() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    let client = LedgerClient::new(3, 2);
    let sender = distributor();
    client.fund(&sender.address, 10_000);

    let recipient = generate_accounts(&env, &client, 1).await.unwrap().remove(0);
    let status = transfer_and_wait(&env, &client, &sender, &recipient.address, 333, 5)
        .await
        .unwrap();
    assert_eq!(status.status_code, TransactionStatusCode::Success);
    assert_eq!(client.status_polls(), 3);

    let received = converged_balance(&env, &client, &recipient.address, 333).await.unwrap();
    assert_eq!(received, 333);
    let remaining = converged_balance(&env, &client, &sender.address, 10_000 - 333 - 5)
        .await
        .unwrap();
    assert_eq!(remaining, 10_000 - 338);
}

#[tokio::test]
async fn test_rejected_transfer_is_not_polled() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    let client = LedgerClient::new(1, 0);
    let sender = distributor();
    client.fund(&sender.address, 100);

    let status = transfer_and_wait(&env, &client, &sender, &Address::from_bytes(&[2u8; 20]), 333, 0)
        .await
        .unwrap();
    assert_eq!(status.status_code, TransactionStatusCode::NotEnoughBalance);
    assert_eq!(status.message, "not enough balance");
    assert_eq!(client.status_polls(), 0);
}

#[tokio::test]
async fn test_wait_stops_at_poll_budget() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    // Stays pending past the HTTP profile budget of 5 polls
    let client = LedgerClient::new(100, 0);
    let sender = distributor();
    client.fund(&sender.address, 1_000);

    let submitted = client
        .transfer(&Address::from_bytes(&[2u8; 20]), 10, &sender, 0, Timing::from_secs(1, 0))
        .await
        .unwrap();
    let start = env.clock().now();
    let status = wait_until_final(&env, &client, submitted).await.unwrap();

    assert!(status.is_pending());
    assert_eq!(client.status_polls(), 5);
    assert_eq!(env.clock().now() - start, Duration::from_secs(3) * 4);
}

#[tokio::test]
async fn test_balance_converges_after_lagging_reads() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    let client = LedgerClient::new(1, 3);
    let sender = distributor();
    client.fund(&sender.address, 1_000);
    let recipient = Address::from_bytes(&[2u8; 20]);

    transfer_and_wait(&env, &client, &sender, &recipient, 50, 0).await.unwrap();
    let balance = converged_balance(&env, &client, &recipient, 50).await.unwrap();

    assert_eq!(balance, 50);
    // Three stale reads, then the new value
    assert_eq!(client.balance_reads(), 4);
}

#[tokio::test]
async fn test_balance_budget_returns_last_value() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    let client = LedgerClient::new(1, 0);
    let address = Address::from_bytes(&[2u8; 20]);
    client.fund(&address, 7);

    let start = env.clock().now();
    let balance = converged_balance(&env, &client, &address, 8).await.unwrap();

    assert_eq!(balance, 7);
    assert_eq!(client.balance_reads(), BALANCE_POLL_BUDGET);
    // No sleep after the last read
    assert_eq!(
        env.clock().now() - start,
        Duration::from_secs(3) * (BALANCE_POLL_BUDGET as u32 - 1)
    );
}

#[tokio::test]
async fn test_generated_accounts_live_in_test_directory() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    let client = LedgerClient::new(1, 0);

    let accounts = generate_accounts(&env, &client, 3).await.unwrap();
    let paths: Vec<_> = accounts.iter().map(|k| k.keys_path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            env.work_dir().join("keys1"),
            env.work_dir().join("keys2"),
            env.work_dir().join("keys3"),
        ]
    );
    assert_ne!(accounts[0].address, accounts[1].address);
}
