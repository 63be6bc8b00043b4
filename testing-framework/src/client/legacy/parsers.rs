// File: testing-framework/src/client/legacy/parsers.rs
//
// Output templates of the legacy CLI client. Every pattern here is a contract
// with the exact sentences the binary prints; change them together.

use std::{collections::HashMap, path::PathBuf, str::FromStr, sync::LazyLock};

use lk_common::{
    account::Keys,
    block::{Block, NodeInfo},
    transaction::{Transaction, TransactionType},
    Address, Hash,
};
use regex::Regex;

use crate::error::{Result, TestError};

const CONNECTION_PASSED: &str = "Connection test passed\n";
const TRANSFER_SUCCESS: &str = "Transaction successfully performed";
const EMPTY_DATA: &str = "<empty>";
const SIGNATURE_VERIFIED: &str = "verified";
const COMPILED_HEADER: &str = "Compiled contracts:";

fn re(pattern: &str) -> Regex {
    // Patterns are literals of this module
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid template {}: {}", pattern, e))
}

static NODE_INFO: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("top_block_hash", re(r"Top block hash: (?P<top_block_hash>.*)")),
        ("top_block_number", re(r"Top block number: (?P<top_block_number>\d+)")),
    ]
});

static GENERATE_KEYS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("keys_path", re(r#"Generating key pair at "(?P<keys_path>.*)""#)),
        ("address", re(r"Address: (?P<address>.*)")),
    ]
});

static KEYS_INFO: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| vec![("address", re(r"Address: (?P<address>.*)"))]);

static BALANCE: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![("balance", re(r"Balance of (?P<address>.*) is (?P<balance>\d+)"))]
});

static TRANSFER_HASH: LazyLock<Regex> = LazyLock::new(|| {
    re(r"Created transaction with hash\[hex\]: (?P<transaction_hash>.*) Transaction")
});

static TRANSFER_FAIL: LazyLock<Regex> =
    LazyLock::new(|| re(r"Transaction failed with message: (?P<fail_message>.*)"));

static TRANSACTION: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("tx_type", re(r"Type: (?P<tx_type>.*)")),
        ("from_address", re(r"From: (?P<from_address>.*)")),
        ("to_address", re(r"To: (?P<to_address>.*)")),
        ("value", re(r"Value: (?P<value>\d+)")),
        ("fee", re(r"Fee: (?P<fee>\d+)")),
        ("timestamp", re(r"Timestamp: (?P<timestamp>\d+)")),
        ("data", re(r"Data: (?P<data>.*)")),
        ("signature", re(r"Signature: (?P<signature>.*)")),
    ]
});

static BLOCK: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("block_hash", re(r"Block hash (?P<block_hash>.*)")),
        ("depth", re(r"Depth: (?P<depth>\d+)")),
        ("timestamp", re(r"Timestamp: (?P<timestamp>\d+)")),
        ("coinbase", re(r"Coinbase: (?P<coinbase>.*)")),
        ("previous_block_hash", re(r"Previous block hash: (?P<previous_block_hash>.*)")),
        ("number_of_transactions", re(r"Number of transactions: (?P<number_of_transactions>\d+)")),
    ]
});

static BLOCK_TRANSACTION: LazyLock<Regex> = LazyLock::new(|| re(r"^\s*Transaction #(?P<number>\d+)"));

/// Search every line for every field; all fields must be found
fn extract<'a, I>(lines: I, table: &[(&'static str, Regex)]) -> Result<HashMap<&'static str, String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = HashMap::with_capacity(table.len());
    for line in lines {
        for (key, rx) in table {
            if let Some(value) = rx.captures(line).and_then(|c| c.name(key)) {
                result.insert(*key, value.as_str().to_owned());
            }
        }
    }

    if result.len() != table.len() {
        return Err(TestError::InvalidArguments("Not full message".to_owned()));
    }
    Ok(result)
}

fn field<T: FromStr>(fields: &HashMap<&'static str, String>, key: &str) -> Result<T> {
    let raw = fields
        .get(key)
        .ok_or_else(|| TestError::InvalidArguments("Not full message".to_owned()))?;
    raw.trim()
        .parse()
        .map_err(|_| TestError::InvalidArguments(format!("bad value of {}: {}", key, raw)))
}

fn transaction_type(name: &str) -> TransactionType {
    match name.trim() {
        "transfer" => TransactionType::Transfer,
        "contract_call" | "call" => TransactionType::ContractCall,
        "contract_creation" | "creation" => TransactionType::ContractCreation,
        _ => TransactionType::NotClassified,
    }
}

pub fn connection_test(text: &str) -> bool {
    text == CONNECTION_PASSED
}

pub fn node_info(text: &str) -> Result<NodeInfo> {
    let fields = extract(text.split('\n'), &NODE_INFO)?;
    Ok(NodeInfo {
        top_block_hash: fields["top_block_hash"].clone(),
        top_block_number: field(&fields, "top_block_number")?,
    })
}

pub fn generate_keys(text: &str) -> Result<Keys> {
    let fields = extract(text.split('\n'), &GENERATE_KEYS)?;
    Ok(Keys::new(
        PathBuf::from(&fields["keys_path"]),
        field(&fields, "address")?,
    ))
}

pub fn keys_info(text: &str) -> Result<Address> {
    let fields = extract(text.split('\n'), &KEYS_INFO)?;
    field(&fields, "address")
}

pub fn balance(text: &str) -> Result<u128> {
    let fields = extract(text.split('\n'), &BALANCE)?;
    field(&fields, "balance")
}

/// Outcome printed by `transfer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub tx_hash: Hash,
    pub success: bool,
    pub fail_message: String,
}

pub fn transfer(text: &str) -> Result<TransferOutcome> {
    let joined = text.replace('\n', " ");
    let tx_hash = TRANSFER_HASH
        .captures(&joined)
        .and_then(|c| c.name("transaction_hash"))
        .ok_or_else(|| TestError::InvalidArguments("No tx hash result".to_owned()))?
        .as_str()
        .trim()
        .parse::<Hash>()?;

    if joined.contains(TRANSFER_SUCCESS) {
        return Ok(TransferOutcome {
            tx_hash,
            success: true,
            fail_message: String::new(),
        });
    }

    let fail_message = TRANSFER_FAIL
        .captures(&joined)
        .and_then(|c| c.name("fail_message"))
        .ok_or_else(|| TestError::InvalidArguments("No any fail message".to_owned()))?;
    Ok(TransferOutcome {
        tx_hash,
        success: false,
        fail_message: fail_message.as_str().trim().to_owned(),
    })
}

fn transaction_from_lines<'a, I>(lines: I) -> Result<Transaction>
where
    I: IntoIterator<Item = &'a str>,
{
    let fields = extract(lines, &TRANSACTION)?;
    let data = match fields["data"].trim() {
        EMPTY_DATA => String::new(),
        other => other.to_owned(),
    };
    let mut tx = Transaction::new(
        transaction_type(&fields["tx_type"]),
        field(&fields, "from_address")?,
        field(&fields, "to_address")?,
        field(&fields, "value")?,
        field(&fields, "fee")?,
        field(&fields, "timestamp")?,
        data,
    );
    tx.verified = fields["signature"].trim() == SIGNATURE_VERIFIED;
    Ok(tx)
}

pub fn transaction(text: &str) -> Result<Transaction> {
    transaction_from_lines(text.split('\n'))
}

pub fn block(text: &str) -> Result<Block> {
    let lines: Vec<&str> = text.split('\n').collect();
    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| BLOCK_TRANSACTION.is_match(line))
        .map(|(i, _)| i)
        .collect();

    let header_end = starts.first().copied().unwrap_or(lines.len());
    let fields = extract(lines[..header_end].iter().copied(), &BLOCK)?;
    let expected: usize = field(&fields, "number_of_transactions")?;
    if expected != starts.len() {
        return Err(TestError::InvalidArguments(format!(
            "block lists {} transactions, {} printed",
            expected,
            starts.len()
        )));
    }

    let transactions = starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            transaction_from_lines(lines[start + 1..end].iter().copied())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Block {
        depth: field(&fields, "depth")?,
        nonce: 0,
        timestamp: field(&fields, "timestamp")?,
        coinbase: fields["coinbase"].trim().to_owned(),
        previous_block_hash: fields["previous_block_hash"].trim().to_owned(),
        transactions,
    })
}

pub fn compiled_contracts(text: &str) -> Result<Vec<PathBuf>> {
    let mut lines = text.split('\n');
    if !lines.any(|line| line.trim() == COMPILED_HEADER) {
        return Err(TestError::InvalidArguments("Not full message".to_owned()));
    }
    Ok(lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

pub fn encoded_message(text: &str) -> String {
    text.strip_suffix('\n').unwrap_or(text).to_owned()
}

pub fn decoded_message(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text.trim())
        .map_err(|e| TestError::InvalidArguments(format!("decode output is not json: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> String {
        Address::from_bytes(&[9u8; 20]).to_string()
    }

    #[test]
    fn test_connection() {
        assert!(connection_test("Connection test passed\n"));
        assert!(!connection_test("Connection test passed"));
        assert!(!connection_test("Connection test failed\n"));
    }

    #[test]
    fn test_node_info() {
        let info = node_info("Top block hash: abc\nTop block number: 12\n").unwrap();
        assert_eq!(info.top_block_hash, "abc");
        assert_eq!(info.top_block_number, 12);

        assert!(matches!(
            node_info("Top block hash: abc\n"),
            Err(TestError::InvalidArguments(ref m)) if m == "Not full message"
        ));
    }

    #[test]
    fn test_generate_keys() {
        let keys = generate_keys(&format!(
            "Generating key pair at \"/tmp/keys\"\nAddress: {}\n",
            address()
        ))
        .unwrap();
        assert_eq!(keys.keys_path, PathBuf::from("/tmp/keys"));
        assert_eq!(keys.address.to_string(), address());
    }

    #[test]
    fn test_balance() {
        assert_eq!(balance(&format!("Balance of {} is 1000\n", address())).unwrap(), 1000);
        assert!(balance("Balance unknown\n").is_err());
    }

    #[test]
    fn test_transfer_success_and_failure() {
        let hash = "ab".repeat(32);
        let ok = transfer(&format!(
            "Created transaction with hash[hex]: {}\nTransaction successfully performed\n",
            hash
        ))
        .unwrap();
        assert!(ok.success);
        assert_eq!(ok.tx_hash.to_hex(), hash);

        let failed = transfer(&format!(
            "Created transaction with hash[hex]: {}\nTransaction failed with message: not enough balance\n",
            hash
        ))
        .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.fail_message, "not enough balance");

        assert!(matches!(
            transfer(&format!("Created transaction with hash[hex]: {}\nTransaction lost\n", hash)),
            Err(TestError::InvalidArguments(_))
        ));
        assert!(transfer("Transaction successfully performed\n").is_err());
    }

    fn tx_lines(value: u64, data: &str) -> String {
        format!(
            "Type: transfer\nFrom: {a}\nTo: {a}\nValue: {}\nFee: 0\nTimestamp: 77\nData: {}\nSignature: verified\n",
            value,
            data,
            a = address()
        )
    }

    #[test]
    fn test_transaction() {
        let tx = transaction(&tx_lines(333, "<empty>")).unwrap();
        assert_eq!(tx.tx_type, TransactionType::Transfer);
        assert_eq!(tx.value, 333);
        assert_eq!(tx.timestamp, 77);
        assert_eq!(tx.data, "");
        assert!(tx.verified);
    }

    #[test]
    fn test_block_with_transactions() {
        let text = format!(
            "Block hash abc\nDepth: 3\nTimestamp: 90\nCoinbase: {}\nPrevious block hash: prev\nNumber of transactions: 2\n\tTransaction #1\n{}\tTransaction #2\n{}",
            address(),
            tx_lines(1, "<empty>"),
            tx_lines(2, "xyz")
        );
        let block = block(&text).unwrap();
        assert_eq!(block.depth, 3);
        assert_eq!(block.timestamp, 90);
        assert_eq!(block.previous_block_hash, "prev");
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[1].data, "xyz");
    }

    #[test]
    fn test_block_count_mismatch() {
        let text = format!(
            "Block hash abc\nDepth: 3\nTimestamp: 90\nCoinbase: {}\nPrevious block hash: prev\nNumber of transactions: 1\n",
            address()
        );
        assert!(block(&text).is_err());
    }

    #[test]
    fn test_compiled_contracts() {
        let folders = compiled_contracts("solc output\nCompiled contracts:\n\tA\n\tB\n\n").unwrap();
        assert_eq!(folders, vec![PathBuf::from("A"), PathBuf::from("B")]);
        assert!(compiled_contracts("nothing\n").is_err());
        assert_eq!(encoded_message("00ff\n"), "00ff");
    }
}
