// File: testing-framework/src/tracker.rs
//
// Bounded status polling of submitted transactions.

use std::{sync::Arc, time::Duration};

use log::debug;
use lk_common::{transaction::TransactionStatus, Hash};

use crate::{
    client::{BaseClient, Timing},
    error::Result,
    orchestrator::{Clock, SystemClock},
};

/// Last status observed by a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    pub status: TransactionStatus,
    /// Number of `get_transaction_status` calls made
    pub polls: usize,
}

impl TrackOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Polls a client until a transaction leaves the pending state
///
/// Only transport errors are raised; a terminal failure status simply ends
/// the wait and is reported through [`TrackOutcome::status`].
pub struct TransactionTracker {
    clock: Arc<dyn Clock>,
}

impl Default for TransactionTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TransactionTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Poll at most `max_polls` times, sleeping `poll_interval` between polls
    ///
    /// The outcome always carries a status read from the node, so a budget
    /// of 0 still performs one poll.
    pub async fn wait_for_status(
        &self,
        client: &dyn BaseClient,
        tx_hash: &Hash,
        poll_interval: Duration,
        max_polls: usize,
        timing: Timing,
    ) -> Result<TrackOutcome> {
        let max_polls = max_polls.max(1);
        let mut polls = 0;
        loop {
            let status = client.get_transaction_status(tx_hash, timing).await?;
            polls += 1;
            debug!(
                "{} - transaction {} is {} after {} poll(s)",
                client.name(),
                tx_hash,
                status.status_code,
                polls
            );

            if status.status_code.is_terminal() || polls >= max_polls {
                return Ok(TrackOutcome { status, polls });
            }
            self.clock.sleep(poll_interval).await;
        }
    }

    /// `true` once the transaction succeeded, `false` on failure or an exhausted budget
    pub async fn wait_for_terminal(
        &self,
        client: &dyn BaseClient,
        tx_hash: &Hash,
        poll_interval: Duration,
        max_polls: usize,
        timing: Timing,
    ) -> Result<bool> {
        let outcome = self
            .wait_for_status(client, tx_hash, poll_interval, max_polls, timing)
            .await?;
        Ok(outcome.is_success())
    }
}
