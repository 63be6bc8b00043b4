// File: testing-framework/src/registry/mod.rs
//
// Named test cases and the sequential runner. Each test gets a fresh
// directory, which is also the process working directory while it runs, its
// own log file and its own environment; whatever happens in the body (error,
// failed check, panic) becomes a failed result and the run continues with the
// next test.

pub mod checks;

use std::{
    env, fs,
    future::Future,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
    time::{Duration, Instant},
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use log::{debug, info, warn};
use regex::Regex;
use tokio::sync::Mutex;

use crate::{
    environment::{Environment, EnvironmentSettings},
    error::{Result, TestError},
    logger::{Logger, LOG_FILE_NAME},
};

/// Body of a registered test case
pub type TestFn = Arc<dyn Fn(Environment) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Return code of a passed test
pub const RETURN_SUCCESS: i32 = 0;
/// Return code of a test whose check failed
pub const RETURN_CHECK_FAILED: i32 = 1;
/// Return code of a test that raised any other error or panicked
pub const RETURN_ERROR: i32 = 2;

// The working directory is process-wide, so runs never overlap
static WORKING_DIR_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Keeps the process inside a test directory until dropped
struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    fn enter(dir: &Path) -> std::io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            warn!("cannot return to {}: {}", self.previous.display(), e);
        }
    }
}

/// Outcome of one executed test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub name: String,
    pub return_code: i32,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.return_code == RETURN_SUCCESS
    }
}

/// Totals of a registry run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub results: Vec<RunResult>,
    pub skipped: usize,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.skipped
    }

    /// Process exit code: the number of failed tests
    pub fn exit_code(&self) -> i32 {
        self.failed() as i32
    }

    pub fn result(&self, name: &str) -> Option<&RunResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// Ordered collection of enabled and disabled test cases
#[derive(Default)]
pub struct TestRegistry {
    enabled: IndexMap<String, TestFn>,
    disabled: IndexMap<String, TestFn>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` under `name`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` if the name is already registered,
    /// enabled or not.
    pub fn register<F, Fut>(&mut self, name: &str, disabled: bool, body: F) -> Result<()>
    where
        F: Fn(Environment) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.enabled.contains_key(name) || self.disabled.contains_key(name) {
            return Err(TestError::InvalidArguments(format!(
                "Test with this name[{}] is exists",
                name
            )));
        }

        let body: TestFn = Arc::new(move |env| -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(body(env))
        });
        if disabled {
            debug!("Registered test case [{}] is disabled", name);
            self.disabled.insert(name.to_owned(), body);
        } else {
            debug!("Registered test case [{}] is enabled", name);
            self.enabled.insert(name.to_owned(), body);
        }
        Ok(())
    }

    pub fn register_enabled<F, Fut>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: Fn(Environment) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(name, false, body)
    }

    pub fn register_disabled<F, Fut>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: Fn(Environment) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(name, true, body)
    }

    pub fn enabled_names(&self) -> impl Iterator<Item = &str> {
        self.enabled.keys().map(String::as_str)
    }

    pub fn disabled_names(&self) -> impl Iterator<Item = &str> {
        self.disabled.keys().map(String::as_str)
    }

    /// Run every enabled test whose full name matches `pattern`, in registration order
    ///
    /// # Errors
    ///
    /// Only an invalid pattern or an unknown working directory aborts the
    /// run; test failures are reported in the summary.
    pub async fn run(&self, pattern: &str, settings: &EnvironmentSettings) -> Result<RunSummary> {
        let matcher = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| TestError::InvalidArguments(format!("Invalid pattern: {}", e)))?;

        let _working_dir = WORKING_DIR_LOCK.lock().await;
        // Relative paths must survive the moves between test directories
        let absolute = settings.to_absolute()?;
        let settings = &absolute;

        info!(
            "Enabled tests: {}. Disabled tests: {}.",
            self.enabled.len(),
            self.disabled.len()
        );

        let mut summary = RunSummary::default();
        for (name, body) in &self.enabled {
            if !matcher.is_match(name) {
                summary.skipped += 1;
                continue;
            }

            info!("Test case [{}] started.", name);
            let start = Instant::now();
            let (return_code, error) = match run_case(name, body.clone(), settings).await {
                Ok(()) => (RETURN_SUCCESS, None),
                Err((code, message)) => (code, Some(message)),
            };
            let elapsed = start.elapsed();

            if let Some(message) = &error {
                info!("{}", message);
            }
            let status = if return_code == RETURN_SUCCESS {
                "success"
            } else {
                "failed"
            };
            info!(
                "Test case [{}] {}. Execute time: {:.3}s.",
                name,
                status,
                elapsed.as_secs_f64()
            );

            summary.results.push(RunResult {
                name: name.clone(),
                return_code,
                elapsed,
                error,
            });
        }

        info!(
            "All test cases: {}. Passed tests: {}. Failed tests: {}. Skipped tests: {}.",
            summary.total(),
            summary.passed(),
            summary.failed(),
            summary.skipped
        );
        Ok(summary)
    }
}

/// Prepare the test directory, run the body and always close the environment
async fn run_case(
    name: &str,
    body: TestFn,
    settings: &EnvironmentSettings,
) -> std::result::Result<(), (i32, String)> {
    let setup_error = |e: TestError| (RETURN_ERROR, e.to_string());

    let test_dir = settings.run_dir.join(name);
    if test_dir.exists() {
        fs::remove_dir_all(&test_dir).map_err(|e| setup_error(e.into()))?;
    }
    fs::create_dir_all(&test_dir).map_err(|e| setup_error(e.into()))?;

    let logger = Logger::new(&test_dir.join(LOG_FILE_NAME)).map_err(setup_error)?;
    // Restored on every return path, after the environment is closed
    let _inside = WorkingDirGuard::enter(&test_dir).map_err(|e| {
        logger.error(format!("cannot enter {}: {}", test_dir.display(), e));
        setup_error(e.into())
    })?;
    let env = Environment::new(settings.clone(), name, logger.clone()).map_err(|e| {
        logger.error(format!("environment setup failed: {}", e));
        setup_error(e)
    })?;

    logger.info(format!("Test case [{}] started.", name));
    let outcome = tokio::spawn(body(env.clone())).await;
    let closed = env.close().await;

    let result = match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            let code = match e.downcast_ref::<TestError>() {
                Some(TestError::CheckFailed(_)) => RETURN_CHECK_FAILED,
                _ => RETURN_ERROR,
            };
            Err((code, format!("{:#}", e)))
        }
        Err(join) if join.is_panic() => Err((RETURN_ERROR, format!("test body panicked: {}", join))),
        Err(join) => Err((RETURN_ERROR, format!("test body was cancelled: {}", join))),
    };

    let result = match (result, closed) {
        (Ok(()), Err(e)) => Err((RETURN_ERROR, format!("environment close failed: {}", e))),
        (result, Err(e)) => {
            logger.error(format!("environment close failed: {}", e));
            result
        }
        (result, Ok(())) => result,
    };

    match &result {
        Ok(()) => logger.info(format!("Test case [{}] success.", name)),
        Err((_, message)) => logger.error(format!("Test case [{}] failed: {}", name, message)),
    }
    result
}
