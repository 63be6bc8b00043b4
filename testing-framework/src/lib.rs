//! # Likelib integration tester
//!
//! Starts node processes with generated configurations, wires them into peer
//! topologies, drives them through interchangeable clients and runs a
//! registry of named multi-node test cases.
//!
//! ## Layout
//!
//! - [`environment`]: nodes, node configuration and topologies of one test
//! - [`client`]: the [`client::BaseClient`] trait and its adapters (legacy
//!   CLI, HTTP JSON, crypto-signing HTTP)
//! - [`tracker`]: bounded transaction status polling
//! - [`registry`]: registration, selection and execution of test cases
//! - [`cases`]: the built-in scenarios
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lk_testing_framework::{
//!     environment::{NodeConfig, NodeIdentity},
//!     registry::TestRegistry,
//!     test_check,
//! };
//!
//! let mut registry = TestRegistry::new();
//! registry.register_enabled("single_node", |env| async move {
//!     let id = NodeIdentity::new(20101).with_http_port(50101);
//!     env.start_node(NodeConfig::new(id.clone())).await?;
//!     let client = env.client(&id).await?;
//!     test_check!(client.connection_test(client.profile().call).await?);
//!     Ok(())
//! })?;
//! let summary = registry.run(".*", &settings).await?;
//! std::process::exit(summary.exit_code());
//! ```

#![warn(clippy::all)]

pub mod cases;
pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod logger;

/// Clock and bounded worker pool
pub mod orchestrator;

pub mod registry;
pub mod tracker;

pub use client::{BaseClient, ClientType, Timing};
pub use environment::{Environment, EnvironmentSettings};
pub use error::{Result, TestError};
pub use logger::Logger;
pub use orchestrator::{Clock, PausedClock, SystemClock};
pub use registry::{RunSummary, TestRegistry};
pub use tracker::TransactionTracker;

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
