// File: testing-framework/src/environment/config.rs
//
// Node identities and the JSON configuration file handed to each node.

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

use crate::error::{Result, TestError};

/// Address nodes bind to
pub const LISTEN_HOST: &str = "0.0.0.0";
/// Address used to reach a node from the tester and from its peers
pub const CONNECT_HOST: &str = "127.0.0.1";

/// Defaults applied to every node configuration
pub mod defaults {
    use std::time::Duration;

    pub const STARTUP_TIME: Duration = Duration::from_secs(2);
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);
    pub const MINING_THREADS: u32 = 2;
    pub const DATABASE_PATH: &str = "likelib/database";
    pub const CLEAN_DATABASE: bool = true;
    pub const KEYS_DIR: &str = ".";
    pub const CONFIG_FILE_NAME: &str = "config.json";
}

/// Kind of port a node exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortKind {
    Sync,
    Rpc,
    Http,
    Websocket,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortKind::Sync => "sync",
            PortKind::Rpc => "rpc",
            PortKind::Http => "http",
            PortKind::Websocket => "ws",
        })
    }
}

/// Network identity of one node: a sync port plus optional protocol ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity {
    listen_host: String,
    connect_host: String,
    sync_port: u16,
    rpc_port: Option<u16>,
    http_port: Option<u16>,
    websocket_port: Option<u16>,
}

impl NodeIdentity {
    pub fn new(sync_port: u16) -> Self {
        Self {
            listen_host: LISTEN_HOST.to_owned(),
            connect_host: CONNECT_HOST.to_owned(),
            sync_port,
            rpc_port: None,
            http_port: None,
            websocket_port: None,
        }
    }

    pub fn with_rpc_port(mut self, port: u16) -> Self {
        self.rpc_port = Some(port);
        self
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = Some(port);
        self
    }

    pub fn with_websocket_port(mut self, port: u16) -> Self {
        self.websocket_port = Some(port);
        self
    }

    pub fn with_hosts(mut self, listen_host: &str, connect_host: &str) -> Self {
        self.listen_host = listen_host.to_owned();
        self.connect_host = connect_host.to_owned();
        self
    }

    pub fn sync_port(&self) -> u16 {
        self.sync_port
    }

    pub fn port(&self, kind: PortKind) -> Option<u16> {
        match kind {
            PortKind::Sync => Some(self.sync_port),
            PortKind::Rpc => self.rpc_port,
            PortKind::Http => self.http_port,
            PortKind::Websocket => self.websocket_port,
        }
    }

    /// Every port this identity claims, sync first
    pub fn claimed_ports(&self) -> Vec<(PortKind, u16)> {
        [
            PortKind::Sync,
            PortKind::Rpc,
            PortKind::Http,
            PortKind::Websocket,
        ]
        .into_iter()
        .filter_map(|kind| self.port(kind).map(|port| (kind, port)))
        .collect()
    }

    fn required_port(&self, kind: PortKind) -> Result<u16> {
        self.port(kind)
            .ok_or_else(|| TestError::InvalidArguments(format!("{} mode is off", kind)))
    }

    pub fn listen_address(&self, kind: PortKind) -> Result<String> {
        Ok(format!("{}:{}", self.listen_host, self.required_port(kind)?))
    }

    pub fn connect_address(&self, kind: PortKind) -> Result<String> {
        Ok(format!("{}:{}", self.connect_host, self.required_port(kind)?))
    }

    pub fn listen_sync_address(&self) -> String {
        format!("{}:{}", self.listen_host, self.sync_port)
    }

    pub fn connect_sync_address(&self) -> String {
        format!("{}:{}", self.connect_host, self.sync_port)
    }

    pub fn listen_rpc_address(&self) -> Result<String> {
        self.listen_address(PortKind::Rpc)
    }

    pub fn connect_rpc_address(&self) -> Result<String> {
        self.connect_address(PortKind::Rpc)
    }

    pub fn listen_http_address(&self) -> Result<String> {
        self.listen_address(PortKind::Http)
    }

    pub fn connect_http_address(&self) -> Result<String> {
        self.connect_address(PortKind::Http)
    }

    pub fn listen_websocket_address(&self) -> Result<String> {
        self.listen_address(PortKind::Websocket)
    }

    pub fn connect_websocket_address(&self) -> Result<String> {
        self.connect_address(PortKind::Websocket)
    }

    /// Directory name of the node: named after its first client-facing port
    pub fn name(&self) -> String {
        let (kind, port) = [PortKind::Rpc, PortKind::Http, PortKind::Websocket]
            .into_iter()
            .find_map(|kind| self.port(kind).map(|port| (kind, port)))
            .unwrap_or((PortKind::Sync, self.sync_port));
        format!("Node_{}_{}", kind, port)
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything needed to start one node
///
/// Cloning yields an independent copy; the environment never mutates a
/// configuration after `start_node` receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub identity: NodeIdentity,
    pub startup_time: Duration,
    pub peers: Vec<NodeIdentity>,
    pub mining_threads: u32,
    pub database_path: String,
    pub clean_database: bool,
    pub keys_dir: String,
}

impl NodeConfig {
    pub fn new(identity: NodeIdentity) -> Self {
        Self {
            identity,
            startup_time: defaults::STARTUP_TIME,
            peers: Vec::new(),
            mining_threads: defaults::MINING_THREADS,
            database_path: defaults::DATABASE_PATH.to_owned(),
            clean_database: defaults::CLEAN_DATABASE,
            keys_dir: defaults::KEYS_DIR.to_owned(),
        }
    }

    pub fn with_peers(mut self, peers: Vec<NodeIdentity>) -> Self {
        self.peers = peers;
        self
    }

    pub fn with_startup_time(mut self, startup_time: Duration) -> Self {
        self.startup_time = startup_time;
        self
    }

    pub fn with_mining_threads(mut self, threads: u32) -> Self {
        self.mining_threads = threads;
        self
    }

    pub fn with_database(mut self, path: &str, clean: bool) -> Self {
        self.database_path = path.to_owned();
        self.clean_database = clean;
        self
    }

    pub fn to_file_config(&self) -> NodeFileConfig {
        NodeFileConfig {
            net: NetSection {
                listen_addr: self.identity.listen_sync_address(),
                public_port: self.identity.sync_port,
            },
            rpc: RpcSection {
                grpc_address: self.identity.listen_rpc_address().ok(),
                http_address: self.identity.listen_http_address().ok(),
            },
            websocket: self
                .identity
                .listen_websocket_address()
                .ok()
                .map(|listening_addr| WebsocketSection { listening_addr }),
            miner: MinerSection {
                threads: self.mining_threads,
            },
            nodes: self
                .peers
                .iter()
                .map(NodeIdentity::connect_sync_address)
                .collect(),
            keys_dir: self.keys_dir.clone(),
            database: DatabaseSection {
                path: self.database_path.clone(),
                clean: self.clean_database,
            },
        }
    }
}

/// Layout of the `config.json` read by the node binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFileConfig {
    pub net: NetSection,
    pub rpc: RpcSection,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub websocket: Option<WebsocketSection>,
    pub miner: MinerSection,
    pub nodes: Vec<String>,
    pub keys_dir: String,
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetSection {
    pub listen_addr: String,
    pub public_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcSection {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub grpc_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub http_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsocketSection {
    pub listening_addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerSection {
    pub threads: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: String,
    pub clean: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_addresses() {
        let id = NodeIdentity::new(20101).with_http_port(50101);
        assert_eq!(id.listen_sync_address(), "0.0.0.0:20101");
        assert_eq!(id.connect_sync_address(), "127.0.0.1:20101");
        assert_eq!(id.connect_http_address().unwrap(), "127.0.0.1:50101");
        assert!(matches!(
            id.connect_rpc_address(),
            Err(TestError::InvalidArguments(ref m)) if m == "rpc mode is off"
        ));
        assert!(id.listen_websocket_address().is_err());
    }

    #[test]
    fn test_names_prefer_client_ports() {
        assert_eq!(NodeIdentity::new(1).name(), "Node_sync_1");
        assert_eq!(NodeIdentity::new(1).with_http_port(2).name(), "Node_http_2");
        assert_eq!(
            NodeIdentity::new(1).with_http_port(2).with_rpc_port(3).name(),
            "Node_rpc_3"
        );
        assert_eq!(NodeIdentity::new(1).with_websocket_port(4).name(), "Node_ws_4");
    }

    #[test]
    fn test_claimed_ports() {
        let id = NodeIdentity::new(20101).with_rpc_port(50051).with_http_port(50101);
        assert_eq!(
            id.claimed_ports(),
            vec![
                (PortKind::Sync, 20101),
                (PortKind::Rpc, 50051),
                (PortKind::Http, 50101)
            ]
        );
    }

    #[test]
    fn test_file_config_layout() {
        let a = NodeIdentity::new(20101).with_http_port(50101);
        let b = NodeIdentity::new(20102).with_rpc_port(50052).with_websocket_port(50202);
        let config = NodeConfig::new(b).with_peers(vec![a]);

        let value = serde_json::to_value(config.to_file_config()).unwrap();
        assert_eq!(
            value,
            json!({
                "net": {"listen_addr": "0.0.0.0:20102", "public_port": 20102},
                "rpc": {"grpc_address": "0.0.0.0:50052"},
                "websocket": {"listening_addr": "0.0.0.0:50202"},
                "miner": {"threads": 2},
                "nodes": ["127.0.0.1:20101"],
                "keys_dir": ".",
                "database": {"path": "likelib/database", "clean": true}
            })
        );
    }

    #[test]
    fn test_config_copies_are_independent() {
        let original = NodeConfig::new(NodeIdentity::new(1));
        let mut copy = original.clone();
        copy.peers.push(NodeIdentity::new(2));
        copy.mining_threads = 8;
        assert!(original.peers.is_empty());
        assert_eq!(original.mining_threads, defaults::MINING_THREADS);
    }
}
