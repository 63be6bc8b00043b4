// File: testing-framework/src/client/command.rs
//
// One-shot subprocess execution with a deadline, shared by the legacy
// adapter and the Solidity compiler wrapper.

use std::{ffi::OsStr, path::Path, process::Stdio, time::Duration};

use log::debug;
use tokio::process::Command;

use crate::{
    error::{Result, TestError},
    logger::Logger,
};

/// Run `program args...` in `cwd` and return its stdout
///
/// # Errors
///
/// - `TimeOut` if the process does not finish within `timeout` (it is killed)
/// - `BadResult` if it cannot be spawned or exits with a nonzero code
pub(crate) async fn run_command<I, S>(
    name: &str,
    program: &Path,
    args: I,
    cwd: &Path,
    timeout: Duration,
    logger: &Logger,
) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let rendered = format!("{} {:?}", program.display(), args);
    debug!("{} - running {}", name, rendered);

    let child = Command::new(program)
        .args(&args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| TestError::BadResult(format!("exception at command execution {}: {}", rendered, e)))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            let message = format!("{} - client slow command execution {}", name, rendered);
            logger.info(&message);
            return Err(TestError::TimeOut(message));
        }
    };

    if !output.status.success() {
        return Err(TestError::BadResult(format!(
            "not success command execution {}: {}",
            rendered,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| TestError::BadResult(format!("{} printed non utf-8 output: {}", rendered, e)))
}
