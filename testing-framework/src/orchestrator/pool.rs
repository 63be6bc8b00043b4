// File: testing-framework/src/orchestrator/pool.rs
//
// Bounded worker pool. At most `limit` futures run at once and results come
// back in input order, so callers can zip them with their inputs.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `task` over every item with at most `limit` in flight
pub async fn run_bounded<I, F, Fut, T>(items: I, limit: usize, task: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(task)
        .buffered(limit.max(1))
        .collect()
        .await
}

/// Like [`run_bounded`] but fails with the first error in input order
///
/// Every task still runs to completion; nodes already started by successful
/// tasks stay registered and are cleaned up by the environment.
pub async fn try_run_bounded<I, F, Fut, T, E>(items: I, limit: usize, task: F) -> Result<Vec<T>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run_bounded(items, limit, task).await.into_iter().collect()
}
