//! Sharded worker pool
//!
//! An id list is cut into contiguous shards of `ceil(len / workers)` ids.
//! Each shard runs as its own tokio task and results come back in shard
//! order, so the output never depends on scheduling.

use anyhow::{Context, Result};
use futures::future::join_all;
use std::future::Future;
use tracing::debug;

/// Split `items` into at most `workers` contiguous shards of equal size
/// (the last may be shorter). Empty input gives no shards.
pub fn partition<T: Clone>(items: &[T], workers: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = items.len().div_ceil(workers.max(1));
    items.chunks(size).map(<[T]>::to_vec).collect()
}

/// Run `task` once per shard and collect the results in shard order
///
/// The first failing shard's error is returned after every shard finishes.
pub async fn run_sharded<T, R, F, Fut>(items: &[T], workers: usize, task: F) -> Result<Vec<R>>
where
    T: Clone,
    F: Fn(usize, Vec<T>) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let shards = partition(items, workers);
    debug!(items = items.len(), shards = shards.len(), "Dispatching shards");

    let handles: Vec<_> = shards
        .into_iter()
        .enumerate()
        .map(|(index, shard)| tokio::spawn(task(index, shard)))
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| {
            joined
                .with_context(|| format!("Worker for shard {} panicked", index))?
                .with_context(|| format!("Shard {} failed", index))
        })
        .collect()
}
