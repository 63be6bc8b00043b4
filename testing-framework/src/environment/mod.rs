// File: testing-framework/src/environment/mod.rs
//
// Per-test resource owner: the nodes started by a test case, the ports they
// claimed and the client working directories handed out against them.

pub mod config;
pub mod node;
pub mod topology;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use indexmap::IndexMap;
use lk_common::account::Keys;
use log::debug;
use tokio::sync::Mutex;

pub use config::{NodeConfig, NodeIdentity, PortKind};
pub use node::{Node, NodeHandle};
pub use topology::Topology;

use crate::{
    client::{create_client, BaseClient, ClientContext, ClientType},
    error::{Result, TestError},
    logger::Logger,
    orchestrator::{try_run_bounded, Clock, SystemClock},
};

/// Process-wide settings shared by every test environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSettings {
    pub node_binary: PathBuf,
    pub client_binary: PathBuf,
    pub solc_binary: PathBuf,
    /// Directory in which every test gets its own subdirectory
    pub run_dir: PathBuf,
    /// Key folder of the pre-funded account
    pub distributor_keys: PathBuf,
    pub client_type: ClientType,
    pub shutdown_timeout: Duration,
    /// Concurrent node starts and client sequences within a test
    pub pool_size: usize,
}

impl EnvironmentSettings {
    pub fn validate(&self) -> Result<()> {
        for (what, path) in [("node", &self.node_binary), ("client", &self.client_binary)] {
            if !path.is_file() {
                return Err(TestError::InvalidArguments(format!(
                    "{} binary not found: {}",
                    what,
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// The same settings with relative paths resolved against the current
    /// directory; a bare compiler name is left for the `PATH` lookup
    pub fn to_absolute(&self) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                cwd.join(path)
            }
        };

        let solc_binary = if self.solc_binary.components().count() > 1 {
            resolve(&self.solc_binary)
        } else {
            self.solc_binary.clone()
        };
        Ok(Self {
            node_binary: resolve(&self.node_binary),
            client_binary: resolve(&self.client_binary),
            solc_binary,
            run_dir: resolve(&self.run_dir),
            distributor_keys: resolve(&self.distributor_keys),
            ..self.clone()
        })
    }
}

#[derive(Default)]
struct State {
    nodes: IndexMap<String, Node>,
    // port -> owning node name, covering starting and running nodes
    ports: HashMap<u16, String>,
}

impl State {
    fn release(&mut self, name: &str) {
        self.ports.retain(|_, owner| owner != name);
    }
}

struct Inner {
    settings: EnvironmentSettings,
    test_name: String,
    work_dir: PathBuf,
    logger: Logger,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    client_counter: AtomicUsize,
}

/// Resources of one test case
///
/// Clones share the same nodes, so concurrent tasks of a test may each hold one.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<Inner>,
}

impl Environment {
    /// Environment rooted at `<run_dir>/<test_name>`
    pub fn new(settings: EnvironmentSettings, test_name: &str, logger: Logger) -> Result<Self> {
        Self::with_clock(settings, test_name, logger, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: EnvironmentSettings,
        test_name: &str,
        logger: Logger,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        settings.validate()?;
        let work_dir = settings.run_dir.join(test_name);
        std::fs::create_dir_all(&work_dir)?;

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                test_name: test_name.to_owned(),
                work_dir,
                logger,
                clock,
                state: Mutex::new(State::default()),
                client_counter: AtomicUsize::new(0),
            }),
        })
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.inner.settings
    }

    pub fn test_name(&self) -> &str {
        &self.inner.test_name
    }

    pub fn work_dir(&self) -> &Path {
        &self.inner.work_dir
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.inner.clock.clone()
    }

    /// Adapter selected for this run
    pub fn client_type(&self) -> ClientType {
        self.inner.settings.client_type
    }

    pub async fn node_count(&self) -> usize {
        self.inner.state.lock().await.nodes.len()
    }

    pub async fn running_nodes(&self) -> Vec<NodeHandle> {
        self.inner.state.lock().await.nodes.values().map(Node::handle).collect()
    }

    /// Start a node and wait for its warm-up
    ///
    /// # Errors
    ///
    /// - `InvalidArguments` if any port of the identity is already claimed
    /// - `BadResult` if the process dies during start or warm-up
    pub async fn start_node(&self, config: NodeConfig) -> Result<NodeHandle> {
        let name = config.identity.name();
        {
            let mut state = self.inner.state.lock().await;
            let claimed = config.identity.claimed_ports();
            if let Some((kind, port)) = claimed.iter().find(|(_, port)| state.ports.contains_key(port)) {
                return Err(TestError::InvalidArguments(format!(
                    "node already exists: {} port {} is used by {}",
                    kind, port, state.ports[port]
                )));
            }

            for peer in &config.peers {
                let sync_port = peer.sync_port();
                if !state.ports.contains_key(&sync_port) {
                    self.inner.logger.debug(format!(
                        "{} - peer {} is not started",
                        name,
                        peer.connect_sync_address()
                    ));
                }
            }

            for (_, port) in claimed {
                state.ports.insert(port, name.clone());
            }
        }

        match self.spawn_node(config).await {
            Ok(node) => {
                let handle = node.handle();
                self.inner.state.lock().await.nodes.insert(name, node);
                Ok(handle)
            }
            Err(e) => {
                self.inner.state.lock().await.release(&name);
                self.inner
                    .logger
                    .error(format!("{} - failed to start: {}", name, e));
                Err(e)
            }
        }
    }

    async fn spawn_node(&self, config: NodeConfig) -> Result<Node> {
        let mut node = Node::prepare(
            &self.inner.settings.node_binary,
            &self.inner.work_dir,
            config,
            self.inner.logger.clone(),
            self.inner.clock.clone(),
        )?
        .with_shutdown_timeout(self.inner.settings.shutdown_timeout);
        node.start().await?;
        Ok(node)
    }

    /// Start several nodes with at most `pool_size` warm-ups in flight
    ///
    /// Handles are returned in the order of `configs`. On error the nodes
    /// that did start stay registered until [`Environment::close`].
    pub async fn start_nodes(&self, configs: Vec<NodeConfig>, pool_size: usize) -> Result<Vec<NodeHandle>> {
        try_run_bounded(configs, pool_size, |config| self.start_node(config)).await
    }

    /// Stop the node owning `identity`; stopping an unknown node is a no-op
    pub async fn stop_node(&self, identity: &NodeIdentity) -> Result<()> {
        let name = identity.name();
        let node = self.inner.state.lock().await.nodes.shift_remove(&name);
        let Some(mut node) = node else {
            debug!("{} - stop requested for a node that is not running", name);
            return Ok(());
        };

        let result = node.stop().await;
        self.inner.state.lock().await.release(&name);
        result.map(|_| ())
    }

    /// Stop every node; the environment must end up empty
    pub async fn close(&self) -> Result<()> {
        let nodes: Vec<Node> = {
            let mut state = self.inner.state.lock().await;
            state.nodes.drain(..).map(|(_, node)| node).collect()
        };

        let mut first_error = None;
        for mut node in nodes {
            let name = node.name().to_owned();
            if let Err(e) = node.stop().await {
                self.inner
                    .logger
                    .error(format!("{} - failed to stop: {}", name, e));
                first_error.get_or_insert(e);
            }
            self.inner.state.lock().await.release(&name);
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let state = self.inner.state.lock().await;
        if !state.nodes.is_empty() || !state.ports.is_empty() {
            return Err(TestError::Logic(
                "control registers are not empty after cleaning".to_owned(),
            ));
        }
        Ok(())
    }

    /// Client of type `client_type` connected to the node of `identity`
    ///
    /// Every call gets a fresh working directory `Client_<n>_to_<node>`.
    pub async fn get_client(
        &self,
        client_type: ClientType,
        identity: &NodeIdentity,
    ) -> Result<Arc<dyn BaseClient>> {
        let node_address = match client_type {
            ClientType::Legacy => identity.connect_rpc_address()?,
            ClientType::LegacyHttp | ClientType::Http | ClientType::Crypto => {
                identity.connect_http_address()?
            }
        };

        let number = self.inner.client_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("Client_{}_to_{}", number, identity.name());
        let work_dir = self.inner.work_dir.join(&name);
        std::fs::create_dir_all(&work_dir)?;
        self.inner.logger.debug(format!(
            "{} - {} client to {} in {}",
            name,
            client_type,
            node_address,
            work_dir.display()
        ));

        let context = ClientContext {
            name,
            work_dir,
            node_address,
            client_binary: self.inner.settings.client_binary.clone(),
            solc_binary: self.inner.settings.solc_binary.clone(),
            logger: self.inner.logger.clone(),
        };
        Ok(Arc::from(create_client(client_type, context)?))
    }

    /// Client of the run's configured type
    pub async fn client(&self, identity: &NodeIdentity) -> Result<Arc<dyn BaseClient>> {
        self.get_client(self.client_type(), identity).await
    }

    /// Keys of the pre-funded account, read through `client`
    pub async fn distributor_keys(&self, client: &dyn BaseClient) -> Result<Keys> {
        client
            .load_address(&self.inner.settings.distributor_keys, client.profile().standalone)
            .await
    }
}
