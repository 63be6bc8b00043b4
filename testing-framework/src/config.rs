// File: testing-framework/src/config.rs
//
// Runner configuration: command line flags, optionally replaced by a JSON
// file holding the same keys.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::{
    client::ClientType,
    environment::{config::defaults, EnvironmentSettings},
    error::{Result, TestError},
};

pub const DEFAULT_TESTS_PATTERN: &str = ".*";
pub const DEFAULT_NODE_BINARY_NAME: &str = "node";
pub const DEFAULT_CLIENT_BINARY_NAME: &str = "client";
pub const DEFAULT_SOLC_BINARY: &str = "solc";
/// Distributor keys relative to the binaries directory
pub const DEFAULT_DISTRIBUTOR_KEYS: &str = "../doc/base-account-keys";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_tests() -> String {
    DEFAULT_TESTS_PATTERN.to_owned()
}

fn default_run_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_client_type() -> ClientType {
    ClientType::Http
}

fn default_node_binary_name() -> String {
    DEFAULT_NODE_BINARY_NAME.to_owned()
}

fn default_client_binary_name() -> String {
    DEFAULT_CLIENT_BINARY_NAME.to_owned()
}

fn default_solc() -> PathBuf {
    PathBuf::from(DEFAULT_SOLC_BINARY)
}

fn default_shutdown_timeout() -> u64 {
    defaults::SHUTDOWN_TIMEOUT.as_secs()
}

fn default_pool_size() -> usize {
    4
}

#[derive(Parser, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[clap(
    name = "lk-tester",
    version,
    about = "Runs the multi-node integration tests against the node and client binaries"
)]
pub struct Config {
    /// Directory containing the node and client binaries
    #[clap(short = 'b', long = "bin")]
    #[serde(default)]
    pub bin: Option<PathBuf>,
    /// Regular expression selecting the tests to run (full match)
    #[clap(short = 't', long = "tests", default_value_t = default_tests())]
    #[serde(default = "default_tests")]
    pub tests: String,
    /// Directory in which test directories are created
    #[clap(short = 'd', long = "dir", default_value_os_t = default_run_dir())]
    #[serde(default = "default_run_dir")]
    pub dir: PathBuf,
    /// Client adapter used by the tests
    #[clap(long, value_enum, default_value_t = default_client_type())]
    #[serde(default = "default_client_type")]
    pub client: ClientType,
    #[clap(long, default_value_t = default_node_binary_name())]
    #[serde(default = "default_node_binary_name")]
    pub node_binary_name: String,
    #[clap(long, default_value_t = default_client_binary_name())]
    #[serde(default = "default_client_binary_name")]
    pub client_binary_name: String,
    /// Solidity compiler used by the HTTP adapters
    #[clap(long, default_value_os_t = default_solc())]
    #[serde(default = "default_solc")]
    pub solc: PathBuf,
    /// Key folder of the pre-funded account [default: <bin>/../doc/base-account-keys]
    #[clap(long)]
    #[serde(default)]
    pub distributor_keys: Option<PathBuf>,
    /// Seconds a node gets to exit after the interrupt before it is killed
    #[clap(long, default_value_t = default_shutdown_timeout())]
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
    /// Concurrent node starts and client sequences within a test
    #[clap(long, default_value_t = default_pool_size())]
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub log_level: LogLevel,
    /// JSON file with the same keys as the flags; it replaces them
    #[clap(long)]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
    /// Write the current flags as a template to --config-file and exit
    #[clap(long)]
    #[serde(skip)]
    pub generate_config_template: bool,
    /// Print the registered tests and exit
    #[clap(long)]
    #[serde(skip)]
    pub list: bool,
}

impl Config {
    /// Replace the flags with the content of `--config-file` when one is given
    pub fn load_file(self) -> Result<Self> {
        let Some(path) = self.config_file.clone() else {
            return Ok(self);
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            TestError::InvalidArguments(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.config_file = Some(path);
        config.list = self.list;
        Ok(config)
    }

    /// Write the flags as a JSON template, refusing to overwrite
    pub fn write_template(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(TestError::InvalidArguments(format!(
                "Config file already exists at {}",
                path.display()
            )));
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn environment_settings(&self) -> Result<EnvironmentSettings> {
        let bin = self.bin.as_ref().ok_or_else(|| {
            TestError::InvalidArguments("binaries directory is required (--bin)".to_owned())
        })?;

        Ok(EnvironmentSettings {
            node_binary: bin.join(&self.node_binary_name),
            client_binary: bin.join(&self.client_binary_name),
            solc_binary: self.solc.clone(),
            run_dir: self.dir.clone(),
            distributor_keys: self
                .distributor_keys
                .clone()
                .unwrap_or_else(|| bin.join(DEFAULT_DISTRIBUTOR_KEYS)),
            client_type: self.client,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout),
            pool_size: self.pool_size.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["lk-tester", "-b", "/opt/lk/bin"]);
        assert_eq!(config.tests, ".*");
        assert_eq!(config.client, ClientType::Http);
        assert_eq!(config.log_level, LogLevel::Info);

        let settings = config.environment_settings().unwrap();
        assert_eq!(settings.node_binary, PathBuf::from("/opt/lk/bin/node"));
        assert_eq!(settings.client_binary, PathBuf::from("/opt/lk/bin/client"));
        assert_eq!(
            settings.distributor_keys,
            PathBuf::from("/opt/lk/bin/../doc/base-account-keys")
        );
        assert_eq!(settings.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_flags() {
        let config = Config::parse_from([
            "lk-tester",
            "--bin",
            "/b",
            "-t",
            "transfer_.*",
            "--client",
            "legacy-http",
            "--distributor-keys",
            "/keys",
        ]);
        assert_eq!(config.tests, "transfer_.*");
        assert_eq!(config.client, ClientType::LegacyHttp);
        assert_eq!(config.environment_settings().unwrap().distributor_keys, PathBuf::from("/keys"));
    }

    #[test]
    fn test_bin_is_required() {
        let config = Config::parse_from(["lk-tester"]);
        assert!(matches!(
            config.environment_settings(),
            Err(TestError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tester.json");

        let template = Config::parse_from(["lk-tester", "-b", "/b", "--client", "crypto"]);
        template.write_template(&path).unwrap();
        assert!(template.write_template(&path).is_err());

        let loaded = Config::parse_from(["lk-tester", "--config-file", path.to_str().unwrap(), "--list"])
            .load_file()
            .unwrap();
        assert_eq!(loaded.client, ClientType::Crypto);
        assert_eq!(loaded.bin, Some(PathBuf::from("/b")));
        assert!(loaded.list);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tester.json");
        fs::write(&path, r#"{"bin": "/b", "tests": "two_nodes"}"#).unwrap();

        let loaded = Config::parse_from(["lk-tester", "--config-file", path.to_str().unwrap()])
            .load_file()
            .unwrap();
        assert_eq!(loaded.tests, "two_nodes");
        assert_eq!(loaded.node_binary_name, "node");
        assert_eq!(loaded.pool_size, 4);
    }
}
