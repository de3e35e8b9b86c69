use serde::{Deserialize, Serialize};

/// An item that could not be processed, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem<T> {
    pub item: T,
    pub error: String,
}

/// Outcome of one batch call.
///
/// Every submitted item appears exactly once, in either `successful` or `failed`.
/// Order within each list follows completion, not submission.
///
/// Serializes with camelCase keys (`totalProcessed`, `totalSuccess`, `totalFailed`)
/// so request handlers can return it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T> {
    pub successful: Vec<T>,
    pub failed: Vec<FailedItem<T>>,
    pub total_processed: usize,
    pub total_success: usize,
    pub total_failed: usize,
}

impl<T> BatchResult<T> {
    pub fn empty() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
            total_processed: 0,
            total_success: 0,
            total_failed: 0,
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.total_failed == 0
    }

    pub fn has_failures(&self) -> bool {
        self.total_failed > 0
    }

    /// Share of processed items that succeeded, in `0.0..=1.0`. An empty batch counts as `1.0`.
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            1.0
        } else {
            self.total_success as f64 / self.total_processed as f64
        }
    }

    /// Consumes the result and returns the items worth resubmitting.
    pub fn into_failed_items(self) -> Vec<T> {
        self.failed.into_iter().map(|failed| failed.item).collect()
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Mutable tally that exists for the duration of one batch call.
///
/// Only [`finish`](Self::finish) produces a [`BatchResult`], so counts and lists can't drift apart.
#[derive(Debug)]
pub(crate) struct BatchAccumulator<T> {
    result: BatchResult<T>,
}

impl<T> BatchAccumulator<T> {
    pub(crate) fn new() -> Self {
        Self {
            result: BatchResult::empty(),
        }
    }

    pub(crate) fn succeed(&mut self, item: T) {
        self.result.successful.push(item);
        self.result.total_success += 1;
        self.result.total_processed += 1;
    }

    pub(crate) fn fail(&mut self, item: T, error: impl Into<String>) {
        self.result.failed.push(FailedItem {
            item,
            error: error.into(),
        });
        self.result.total_failed += 1;
        self.result.total_processed += 1;
    }

    pub(crate) fn record(&mut self, item: T, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.succeed(item),
            Err(error) => self.fail(item, error),
        }
    }

    pub(crate) fn finish(self) -> BatchResult<T> {
        self.result
    }
}
