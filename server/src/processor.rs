//! Batch processors.
//!
//! [`SequentialProcessor`] sorts every sub-array on the calling task, in input order.
//! [`ParallelProcessor`] fans each sub-array out to its own blocking worker and fans the results
//! back in through the workers' join handles. Workers never touch shared mutable state: the
//! coordinator owns the [`OutputSlots`] and fills slot `i` from the result tagged with index `i`.
//! The slots are only read once every worker has been joined.

use std::{fmt, num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{model::Batch, sort::sort_sequence};

type Sorter = fn(&[i64]) -> Vec<i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Execution strategy of a processor.
pub enum Strategy {
    Sequential,
    Parallel,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
/// Failures of the parallel fan-in. The sequential path cannot fail.
pub enum ProcessError {
    #[error("sort worker failed: {0}")]
    WorkerFailed(String),

    #[error("output slot {index} written twice")]
    DuplicateSlot { index: usize },

    #[error("output slot {index} out of range for {len} slots")]
    SlotOutOfRange { index: usize, len: usize },

    #[error("output slot {index} missing after all workers completed")]
    MissingSlot { index: usize },

    #[error("worker limiter closed")]
    LimiterClosed,
}

#[async_trait]
/// Sorts every sub-array of a batch, returning results in input order.
pub trait BatchProcessor: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn process(&self, batch: Arc<Batch>) -> Result<Batch, ProcessError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Sorts sub-arrays one after another on the caller's task.
pub struct SequentialProcessor;

#[async_trait]
impl BatchProcessor for SequentialProcessor {
    fn strategy(&self) -> Strategy {
        Strategy::Sequential
    }

    async fn process(&self, batch: Arc<Batch>) -> Result<Batch, ProcessError> {
        Ok(batch.iter().map(|sub| sort_sequence(sub)).collect())
    }
}

#[derive(Debug, Clone)]
/// Sorts each sub-array on its own blocking worker.
pub struct ParallelProcessor {
    max_workers: Option<NonZeroUsize>,
    sorter: Sorter,
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ParallelProcessor {
    /// `max_workers` caps how many workers of one batch sort at the same time.
    pub fn new(max_workers: Option<NonZeroUsize>) -> Self {
        Self {
            max_workers,
            sorter: sort_sequence,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_sorter(mut self, sorter: Sorter) -> Self {
        self.sorter = sorter;
        self
    }
}

#[async_trait]
impl BatchProcessor for ParallelProcessor {
    fn strategy(&self) -> Strategy {
        Strategy::Parallel
    }

    async fn process(&self, batch: Arc<Batch>) -> Result<Batch, ProcessError> {
        let len = batch.len();
        let limiter = self
            .max_workers
            .map(|n| Arc::new(Semaphore::new(n.get())));

        tracing::trace!(
            event = "fan_out",
            workers = len,
            max_workers = ?self.max_workers,
            "dispatching sort workers"
        );

        let mut workers = JoinSet::new();
        for index in 0..len {
            let permit = match &limiter {
                Some(limiter) => Some(
                    Arc::clone(limiter)
                        .acquire_owned()
                        .await
                        .map_err(|_| ProcessError::LimiterClosed)?,
                ),
                None => None,
            };
            let batch = Arc::clone(&batch);
            let sorter = self.sorter;
            workers.spawn_blocking(move || {
                let _permit = permit;
                (index, sorter(&batch[index]))
            });
        }

        // Drain every worker before touching the slots, even after a failure.
        let mut slots = OutputSlots::new(len);
        let mut first_err = None;
        while let Some(joined) = workers.join_next().await {
            let filled = match joined {
                Ok((index, sorted)) => slots.fill(index, sorted),
                Err(err) => Err(ProcessError::WorkerFailed(err.to_string())),
            };
            if let Err(err) = filled {
                tracing::warn!(event = "worker_failed", error = %err, "sort worker failed");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => slots.into_sorted(),
        }
    }
}

#[derive(Debug)]
/// Pre-sized, index-addressed result collection owned by the fan-in coordinator.
pub struct OutputSlots {
    slots: Vec<Option<Vec<i64>>>,
}

impl OutputSlots {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Store the result for slot `index`. Each slot accepts exactly one write.
    pub fn fill(&mut self, index: usize, values: Vec<i64>) -> Result<(), ProcessError> {
        let len = self.slots.len();
        match self.slots.get_mut(index) {
            None => Err(ProcessError::SlotOutOfRange { index, len }),
            Some(Some(_)) => Err(ProcessError::DuplicateSlot { index }),
            Some(slot) => {
                *slot = Some(values);
                Ok(())
            }
        }
    }

    /// Consume the slots, failing if any was never written.
    pub fn into_sorted(self) -> Result<Batch, ProcessError> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(ProcessError::MissingSlot { index }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Arc<Batch> {
        Arc::new(vec![vec![3, 1, 2], vec![9, -1, 0], vec![]])
    }

    fn varied_batch() -> Batch {
        (0..64i64)
            .map(|i| (0..(i * 37 % 211)).map(|v| (v * 7919 + i) % 1009 - 500).collect())
            .collect()
    }

    #[tokio::test]
    async fn sequential_sorts_each_sub_array_in_place() {
        let out = SequentialProcessor.process(scenario()).await.unwrap();
        assert_eq!(out, vec![vec![1, 2, 3], vec![-1, 0, 9], vec![]]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_matches_scenario() {
        let out = ParallelProcessor::default()
            .process(scenario())
            .await
            .unwrap();
        assert_eq!(out, vec![vec![1, 2, 3], vec![-1, 0, 9], vec![]]);
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_output_for_both() {
        let empty = Arc::new(Batch::new());
        assert!(SequentialProcessor.process(empty.clone()).await.unwrap().is_empty());
        assert!(ParallelProcessor::default()
            .process(empty)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn strategies_agree_on_varied_batch() {
        let batch = Arc::new(varied_batch());
        let seq = SequentialProcessor.process(batch.clone()).await.unwrap();
        let par = ParallelProcessor::default().process(batch).await.unwrap();
        assert_eq!(seq, par);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn repeated_parallel_runs_are_stable() {
        let batch = Arc::new(varied_batch());
        let expected = SequentialProcessor.process(batch.clone()).await.unwrap();
        let processor = ParallelProcessor::default();
        for _ in 0..50 {
            assert_eq!(processor.process(batch.clone()).await.unwrap(), expected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn capped_workers_still_fill_every_slot() {
        let batch = Arc::new(varied_batch());
        let expected = SequentialProcessor.process(batch.clone()).await.unwrap();
        let processor = ParallelProcessor::new(NonZeroUsize::new(1));
        assert_eq!(processor.process(batch).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn input_is_left_untouched() {
        let batch = scenario();
        ParallelProcessor::default()
            .process(batch.clone())
            .await
            .unwrap();
        assert_eq!(*batch, vec![vec![3, 1, 2], vec![9, -1, 0], vec![]]);
    }

    fn panic_on_empty(values: &[i64]) -> Vec<i64> {
        assert!(!values.is_empty(), "refusing empty sub-array");
        sort_sequence(values)
    }

    #[tokio::test]
    async fn worker_panic_surfaces_as_error() {
        let processor = ParallelProcessor::default().with_sorter(panic_on_empty);
        let err = processor.process(scenario()).await.unwrap_err();
        assert!(matches!(err, ProcessError::WorkerFailed(_)), "{err}");
    }

    #[test]
    fn slots_reject_double_writes_and_out_of_range() {
        let mut slots = OutputSlots::new(2);
        slots.fill(1, vec![1]).unwrap();
        assert!(matches!(
            slots.fill(1, vec![2]),
            Err(ProcessError::DuplicateSlot { index: 1 })
        ));
        assert!(matches!(
            slots.fill(2, vec![]),
            Err(ProcessError::SlotOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn unfilled_slot_is_reported() {
        let mut slots = OutputSlots::new(3);
        slots.fill(0, vec![]).unwrap();
        slots.fill(2, vec![]).unwrap();
        assert!(matches!(
            slots.into_sorted(),
            Err(ProcessError::MissingSlot { index: 1 })
        ));
    }

    #[test]
    fn strategy_names() {
        assert_eq!(Strategy::Sequential.to_string(), "sequential");
        assert_eq!(Strategy::Parallel.to_string(), "parallel");
    }
}
