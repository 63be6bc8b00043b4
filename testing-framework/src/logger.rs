// File: testing-framework/src/logger.rs
//
// Per-test log sink: an independent fern dispatcher chained to one file,
// flushed after every record so a crashing node cannot lose test output.

use std::{
    fmt::{Arguments, Display},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{Level, LevelFilter, Log, Record};

use crate::error::Result;

/// Target attached to records produced through a [`Logger`]
pub const LOG_TARGET: &str = "lk_tester";

/// Name of the log file created inside every test directory
pub const LOG_FILE_NAME: &str = "test.log";

struct Sink {
    log: Box<dyn Log>,
    path: Option<PathBuf>,
}

/// Append-only logger owned by one test case
///
/// Cloning is cheap; every clone writes to the same file.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Sink>,
}

impl Logger {
    /// Open (or create) `path` and append records to it
    pub fn new(path: &Path) -> Result<Self> {
        let (_, log) = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} - {} - {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                    record.level(),
                    message
                ))
            })
            .level(LevelFilter::Trace)
            .chain(fern::log_file(path)?)
            .into_log();

        Ok(Self {
            sink: Arc::new(Sink {
                log,
                path: Some(path.to_path_buf()),
            }),
        })
    }

    /// Logger that drops everything, for components used outside a test run
    pub fn discard() -> Self {
        let (_, log) = fern::Dispatch::new().into_log();
        Self {
            sink: Arc::new(Sink { log, path: None }),
        }
    }

    /// File this logger writes to, if any
    pub fn path(&self) -> Option<&Path> {
        self.sink.path.as_deref()
    }

    pub fn debug(&self, message: impl Display) {
        self.write(Level::Debug, format_args!("{}", message));
    }

    pub fn info(&self, message: impl Display) {
        self.write(Level::Info, format_args!("{}", message));
    }

    pub fn warning(&self, message: impl Display) {
        self.write(Level::Warn, format_args!("{}", message));
    }

    pub fn error(&self, message: impl Display) {
        self.write(Level::Error, format_args!("{}", message));
    }

    fn write(&self, level: Level, args: Arguments<'_>) {
        self.sink.log.log(
            &Record::builder()
                .args(args)
                .level(level)
                .target(LOG_TARGET)
                .build(),
        );
        self.sink.log.flush();

        log::log!(target: LOG_TARGET, level, "{}", args);
    }
}
