// File: testing-framework/src/environment/node.rs
//
// One external node process: config file, spawn, warm-up and the
// interrupt-then-kill shutdown.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};

use log::{debug, warn};
use tokio::process::{Child, Command};

use super::config::{defaults, NodeConfig, NodeIdentity};
use crate::{
    error::{Result, TestError},
    logger::Logger,
    orchestrator::Clock,
};

/// Lightweight description of a started node, handed back to test bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    pub identity: NodeIdentity,
    pub name: String,
    pub work_dir: PathBuf,
    pub config_file: PathBuf,
    pub pid: Option<u32>,
}

/// Owner of a node process
///
/// Dropping a `Node` kills the process if it is still running.
pub struct Node {
    name: String,
    config: NodeConfig,
    binary: PathBuf,
    work_dir: PathBuf,
    config_file: PathBuf,
    shutdown_timeout: Duration,
    logger: Logger,
    clock: Arc<dyn Clock>,
    child: Option<Child>,
}

impl Node {
    /// Create the node working directory under `parent_dir`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` if the directory already exists.
    pub fn prepare(
        binary: &Path,
        parent_dir: &Path,
        config: NodeConfig,
        logger: Logger,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let name = config.identity.name();
        let work_dir = parent_dir.join(&name);
        if work_dir.exists() {
            return Err(TestError::InvalidArguments(format!(
                "{} - work directory already exists: {}",
                name,
                work_dir.display()
            )));
        }
        std::fs::create_dir_all(&work_dir)?;
        logger.debug(format!("{} - work directory[{}]", name, work_dir.display()));

        Ok(Self {
            config_file: work_dir.join(defaults::CONFIG_FILE_NAME),
            name,
            config,
            binary: binary.to_path_buf(),
            work_dir,
            shutdown_timeout: defaults::SHUTDOWN_TIMEOUT,
            logger,
            clock,
            child: None,
        })
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            identity: self.config.identity.clone(),
            name: self.name.clone(),
            work_dir: self.work_dir.clone(),
            config_file: self.config_file.clone(),
            pid: self.child.as_ref().and_then(Child::id),
        }
    }

    fn write_config(&self) -> Result<()> {
        let content = serde_json::to_string(&self.config.to_file_config())?;
        std::fs::write(&self.config_file, &content)?;
        self.logger.debug(format!(
            "{} - config saved by path[{}] with content[{}]",
            self.name,
            self.config_file.display(),
            content
        ));
        Ok(())
    }

    /// Write the config, spawn `<binary> --config <file>` and wait for the warm-up
    ///
    /// # Errors
    ///
    /// - `Logic` if the process is already running
    /// - `BadResult` if the binary cannot be spawned or exits immediately
    pub async fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(TestError::Logic(format!(
                "{} - process already started",
                self.name
            )));
        }

        self.write_config()?;

        let mut child = Command::new(&self.binary)
            .arg("--config")
            .arg(&self.config_file)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TestError::BadResult(format!("{} - failed to spawn node: {}", self.name, e))
            })?;

        if let Some(status) = child.try_wait()? {
            self.logger.info(format!(
                "{} - failed running node with work directory:{}",
                self.name,
                self.work_dir.display()
            ));
            return Err(TestError::BadResult(format!(
                "{} - process failed to start: {}",
                self.name, status
            )));
        }

        self.logger.info(format!(
            "{} - running node with work directory {}",
            self.name,
            self.work_dir.display()
        ));

        self.clock.sleep(self.config.startup_time).await;

        if let Some(status) = child.try_wait()? {
            return Err(TestError::BadResult(format!(
                "{} - process exited during warm-up: {}",
                self.name, status
            )));
        }
        self.child = Some(child);
        Ok(())
    }

    /// Interrupt the process and wait for it, killing it after the grace period
    ///
    /// Stopping a node that is not running is a no-op returning `None`.
    pub async fn stop(&mut self) -> Result<Option<ExitStatus>> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };

        interrupt(&mut child)?;

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = self.clock.sleep(self.shutdown_timeout) => {
                warn!("{} did not stop within {:?}, killing it", self.name, self.shutdown_timeout);
                self.logger.warning(format!("{} - process killed after shutdown timeout", self.name));
                child.kill().await?;
                child.wait().await?
            }
        };

        self.logger.info(format!(
            "{} - process exited with code {:?}",
            self.name,
            status.code()
        ));
        Ok(Some(status))
    }
}

#[cfg(unix)]
fn interrupt(child: &mut Child) -> Result<()> {
    use nix::{
        errno::Errno,
        sys::signal::{kill, Signal},
        unistd::Pid,
    };

    // Already reaped
    let Some(pid) = child.id() else {
        return Ok(());
    };

    debug!("sending SIGINT to {}", pid);
    match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(TestError::Io(std::io::Error::from(e))),
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) -> Result<()> {
    debug!("no interrupt signal on this platform, killing {:?}", child.id());
    child.start_kill()?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::environment::config::NodeIdentity;
    use crate::orchestrator::SystemClock;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn node(dir: &Path, binary: &Path, port: u16) -> Node {
        let config = NodeConfig::new(NodeIdentity::new(port).with_http_port(port + 1))
            .with_startup_time(Duration::from_millis(50));
        Node::prepare(binary, dir, config, Logger::discard(), Arc::new(SystemClock))
            .unwrap()
            .with_shutdown_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_start_writes_config_and_stop_interrupts() {
        let dir = tempfile::tempdir().unwrap();
        let binary = script(dir.path(), "node", "trap 'exit 0' INT\nwhile true; do sleep 0.05; done");
        let mut node = node(dir.path(), &binary, 20101);

        node.start().await.unwrap();
        assert!(node.is_running());
        assert!(node.handle().pid.is_some());

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&node.handle().config_file).unwrap())
                .unwrap();
        assert_eq!(config["net"]["public_port"], 20101);
        assert_eq!(config["rpc"]["http_address"], "0.0.0.0:20102");

        let status = node.stop().await.unwrap().unwrap();
        assert_eq!(status.code(), Some(0));
        assert!(!node.is_running());

        // Second stop is a no-op
        assert!(node.stop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stop_kills_process_ignoring_interrupt() {
        let dir = tempfile::tempdir().unwrap();
        let binary = script(dir.path(), "node", "trap '' INT\nwhile true; do sleep 0.05; done");
        let mut node = node(dir.path(), &binary, 20201);

        node.start().await.unwrap();
        let status = node.stop().await.unwrap().unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_missing_binary_is_bad_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut node = node(dir.path(), &dir.path().join("missing"), 20301);
        assert!(matches!(node.start().await, Err(TestError::BadResult(_))));
        assert!(!node.is_running());
    }

    #[tokio::test]
    async fn test_exit_during_warm_up_is_bad_result() {
        let dir = tempfile::tempdir().unwrap();
        let binary = script(dir.path(), "node", "exit 3");
        let config = NodeConfig::new(NodeIdentity::new(20351))
            .with_startup_time(Duration::from_millis(500));
        let mut node = Node::prepare(
            &binary,
            dir.path(),
            config,
            Logger::discard(),
            Arc::new(SystemClock),
        )
        .unwrap();
        assert!(matches!(node.start().await, Err(TestError::BadResult(_))));
        assert!(!node.is_running());
    }

    #[tokio::test]
    async fn test_existing_work_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let binary = script(dir.path(), "node", "exit 0");
        let _first = node(dir.path(), &binary, 20401);

        let config = NodeConfig::new(NodeIdentity::new(20401).with_http_port(20402));
        let second = Node::prepare(
            &binary,
            dir.path(),
            config,
            Logger::discard(),
            Arc::new(SystemClock),
        );
        assert!(matches!(second, Err(TestError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_double_start_is_logic_error() {
        let dir = tempfile::tempdir().unwrap();
        let binary = script(dir.path(), "node", "trap 'exit 0' INT\nwhile true; do sleep 0.05; done");
        let mut node = node(dir.path(), &binary, 20501);

        node.start().await.unwrap();
        assert!(matches!(node.start().await, Err(TestError::Logic(_))));
        node.stop().await.unwrap();
    }
}
