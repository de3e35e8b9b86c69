//! # Bounded Dispatch
//!
//! The two fan-out shapes every batch operation is built from:
//!
//! - [`process_in_chunks`]: one remote call per item, at most `chunk_size` in flight.
//!   Items run through `buffer_unordered`, so a slow item holds one slot instead of
//!   stalling a whole chunk.
//! - [`process_grouped`]: one remote call per chunk, chunks strictly in sequence. The
//!   call reports a status per item, or fails and takes the whole chunk with it.
//!
//! Pre-grouped work (adjustments keyed by warehouse) goes through `dispatch_groups`:
//! one call per group, at most `limit` groups in flight.
//!
//! Both account for every item exactly once, whatever order the calls complete in.

use super::result::{BatchAccumulator, BatchResult};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::pin::pin;
use tracing::{debug, warn};

/// Message for a per-item failure the remote side reported without a reason.
pub const OPERATION_FAILED: &str = "Operation failed";

/// Status of one item inside a grouped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    /// Failed, with the remote message if it gave one.
    Failed(Option<String>),
}

impl ItemOutcome {
    fn into_result(self) -> Result<(), String> {
        match self {
            ItemOutcome::Succeeded => Ok(()),
            ItemOutcome::Failed(message) => Err(message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| OPERATION_FAILED.to_string())),
        }
    }
}

/// Resolves the chunk size for a call: the explicit value, else the default, never below 1.
pub fn effective_chunk_size(requested: Option<usize>, default: usize) -> usize {
    match requested {
        Some(0) => {
            warn!(default, "Chunk size 0 clamped to 1");
            1
        }
        Some(size) => size,
        None => default.max(1),
    }
}

/// Runs `op` once per item with at most `chunk_size` calls in flight.
///
/// `op` receives a clone of the item; the original is what lands in the result.
pub async fn process_in_chunks<T, F, Fut>(items: Vec<T>, chunk_size: usize, op: F) -> BatchResult<T>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let mut acc = BatchAccumulator::new();
    dispatch_each(items, chunk_size, op, &mut acc).await;
    acc.finish()
}

pub(crate) async fn dispatch_each<T, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    op: F,
    acc: &mut BatchAccumulator<T>,
) where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    if items.is_empty() {
        return;
    }
    let limit = chunk_size.max(1);
    debug!(count = items.len(), limit, "Dispatching items");

    let op = &op;
    let mut outcomes = pin!(stream::iter(items)
        .map(|item| async move {
            let outcome = op(item.clone()).await;
            (item, outcome)
        })
        .buffer_unordered(limit));

    while let Some((item, outcome)) = outcomes.next().await {
        if let Err(error) = &outcome {
            debug!(%error, "Item failed");
        }
        acc.record(item, outcome);
    }
}

/// Runs `op` once per chunk of at most `chunk_size` items, one chunk at a time.
///
/// `op` returns one [`ItemOutcome`] per item in chunk order. Items without a status
/// fail with [`OPERATION_FAILED`]; an `Err` from `op` fails the whole chunk.
pub async fn process_grouped<T, F, Fut>(items: Vec<T>, chunk_size: usize, op: F) -> BatchResult<T>
where
    T: Clone,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<ItemOutcome>, String>>,
{
    let mut acc = BatchAccumulator::new();
    dispatch_grouped(items, chunk_size, op, &mut acc).await;
    acc.finish()
}

pub(crate) async fn dispatch_grouped<T, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    op: F,
    acc: &mut BatchAccumulator<T>,
) where
    T: Clone,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<ItemOutcome>, String>>,
{
    let limit = chunk_size.max(1);
    let mut remaining = items.into_iter().peekable();
    let mut chunk_index = 0usize;

    while remaining.peek().is_some() {
        let chunk: Vec<T> = remaining.by_ref().take(limit).collect();
        debug!(chunk_index, size = chunk.len(), "Dispatching chunk");
        let outcome = op(chunk.clone()).await;
        record_group(chunk_index, chunk, outcome, acc);
        chunk_index += 1;
    }
}

/// Runs `op` once per group, with at most `limit` groups in flight.
///
/// Groups are never split: each one is a single call whatever its size. Outcomes
/// are accounted for as in [`process_grouped`].
pub(crate) async fn dispatch_groups<T, F, Fut>(
    groups: Vec<Vec<T>>,
    limit: usize,
    op: F,
    acc: &mut BatchAccumulator<T>,
) where
    T: Clone,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<ItemOutcome>, String>>,
{
    if groups.is_empty() {
        return;
    }
    let limit = limit.max(1);
    debug!(groups = groups.len(), limit, "Dispatching groups");

    let op = &op;
    let mut outcomes = pin!(stream::iter(groups.into_iter().enumerate())
        .map(|(index, group)| async move {
            let outcome = op(group.clone()).await;
            (index, group, outcome)
        })
        .buffer_unordered(limit));

    while let Some((index, group, outcome)) = outcomes.next().await {
        record_group(index, group, outcome, acc);
    }
}

fn record_group<T>(
    index: usize,
    group: Vec<T>,
    outcome: Result<Vec<ItemOutcome>, String>,
    acc: &mut BatchAccumulator<T>,
) {
    match outcome {
        Ok(outcomes) => {
            if outcomes.len() != group.len() {
                warn!(
                    index,
                    expected = group.len(),
                    received = outcomes.len(),
                    "Status count mismatch"
                );
            }
            let mut outcomes = outcomes.into_iter();
            for item in group {
                let outcome = outcomes
                    .next()
                    .unwrap_or(ItemOutcome::Failed(None))
                    .into_result();
                acc.record(item, outcome);
            }
        }
        Err(error) => {
            warn!(index, %error, "Group failed");
            for item in group {
                acc.fail(item, error.clone());
            }
        }
    }
}
