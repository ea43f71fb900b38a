//! Bounded worker pool with batched dispatch.
//!
//! One enumerator thread cuts the incoming sequence into batches and feeds them through a
//! bounded channel; `workers` rayon threads each pull a whole batch at a time. Results flow back
//! over a second channel and are handed to the caller on the calling thread in completion
//! order. Enumeration and copying overlap: workers start on the first batch while the rest of
//! the tree is still being walked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded};
use tracing::debug;

use crate::error::{CopyError, Result};

/// Shared interrupt flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How much of the input made it through the pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Items handed to workers
    pub dispatched: u64,
    /// Items whose result reached the caller
    pub completed: u64,
    pub interrupted: bool,
}

pub struct CopyPool {
    pool: rayon::ThreadPool,
    workers: usize,
    batch_size: usize,
}

impl CopyPool {
    pub fn new(workers: usize, batch_size: usize) -> Result<Self> {
        if workers == 0 || batch_size == 0 {
            return Err(CopyError::InvalidConfig(format!(
                "pool needs at least one worker and a batch size of at least one (got {workers} workers, batch size {batch_size})"
            )));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("copy-worker-{i}"))
            .build()
            .map_err(|e| CopyError::Pool(e.to_string()))?;
        Ok(Self {
            pool,
            workers,
            batch_size,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run `work` over every item, calling `on_result` for each result as it arrives.
    ///
    /// Blocks until every worker has been joined. Once `cancel` is set no new batch is
    /// dispatched and workers stop starting new items; items already running finish normally.
    pub fn run<T, R, I, W, F>(&self, items: I, cancel: &CancelFlag, work: W, mut on_result: F) -> PoolStats
    where
        T: Send,
        R: Send,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send,
        W: Fn(T) -> R + Sync,
        F: FnMut(R),
    {
        let items = items.into_iter();
        let batch_size = self.batch_size;
        let (batch_tx, batch_rx) = bounded::<Vec<T>>(self.workers);
        let (result_tx, result_rx) = unbounded::<R>();
        let mut completed = 0u64;

        let dispatched = std::thread::scope(|scope| {
            let producer = scope.spawn(move || {
                let mut items = items;
                let mut sent = 0u64;
                while !cancel.is_cancelled() {
                    let batch: Vec<T> = items.by_ref().take(batch_size).collect();
                    if batch.is_empty() {
                        break;
                    }
                    let len = batch.len() as u64;
                    if batch_tx.send(batch).is_err() {
                        break;
                    }
                    sent += len;
                }
                debug!(dispatched = sent, "enumeration finished");
                sent
            });

            self.pool.in_place_scope(|s| {
                for _ in 0..self.workers {
                    let batch_rx = batch_rx.clone();
                    let result_tx = result_tx.clone();
                    let work = &work;
                    s.spawn(move |_| {
                        let worker = rayon::current_thread_index().unwrap_or_default();
                        for batch in batch_rx.iter() {
                            debug!(worker, jobs = batch.len(), "picked up batch");
                            for item in batch {
                                // remaining items of a batch are dropped once interrupted
                                if cancel.is_cancelled() {
                                    break;
                                }
                                if result_tx.send(work(item)).is_err() {
                                    return;
                                }
                            }
                        }
                    });
                }
                drop(result_tx);
                drop(batch_rx);

                for result in result_rx.iter() {
                    completed += 1;
                    on_result(result);
                }
            });

            producer
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        });

        PoolStats {
            dispatched,
            completed,
            interrupted: cancel.is_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn rejects_empty_pool() {
        assert!(matches!(CopyPool::new(0, 10), Err(CopyError::InvalidConfig(_))));
        assert!(matches!(CopyPool::new(2, 0), Err(CopyError::InvalidConfig(_))));
    }

    #[test]
    fn every_item_completes_once_for_any_shape() {
        for workers in 1..=4 {
            for batch in [1, 3, 100] {
                let pool = CopyPool::new(workers, batch).unwrap();
                let mut seen = HashSet::new();
                let stats = pool.run(0..257u32, &CancelFlag::new(), |i| i * 2, |r| {
                    assert!(seen.insert(r), "duplicate result {r}");
                });
                assert_eq!(stats.dispatched, 257);
                assert_eq!(stats.completed, 257);
                assert!(!stats.interrupted);
                assert_eq!(seen.len(), 257);
                assert!(seen.iter().all(|r| r % 2 == 0));
            }
        }
    }

    #[test]
    fn empty_input_returns_immediately() {
        let pool = CopyPool::new(3, 10).unwrap();
        let mut calls = 0;
        let stats = pool.run(std::iter::empty::<u8>(), &CancelFlag::new(), |x| x, |_| calls += 1);
        assert_eq!(calls, 0);
        assert_eq!(stats, PoolStats::default());
    }

    #[test]
    fn results_arrive_in_completion_order() {
        // first item is slow, so with two workers the rest overtake it
        let pool = CopyPool::new(2, 1).unwrap();
        let mut order = Vec::new();
        pool.run(
            0..4u64,
            &CancelFlag::new(),
            |i| {
                if i == 0 {
                    std::thread::sleep(Duration::from_millis(300));
                }
                i
            },
            |r| order.push(r),
        );
        assert_eq!(order.len(), 4);
        assert_eq!(*order.last().unwrap(), 0);
    }

    #[test]
    fn cancel_stops_new_work_and_joins() {
        let pool = CopyPool::new(2, 2).unwrap();
        let cancel = CancelFlag::new();
        let started = AtomicUsize::new(0);
        let stats = pool.run(
            0..10_000u32,
            &cancel,
            |i| {
                if started.fetch_add(1, Ordering::SeqCst) == 5 {
                    cancel.cancel();
                }
                std::thread::sleep(Duration::from_millis(1));
                i
            },
            |_| {},
        );
        assert!(stats.interrupted);
        assert!(stats.completed < 10_000);
        assert_eq!(stats.completed as usize, started.load(Ordering::SeqCst));
    }

    #[test]
    fn cancel_before_start_dispatches_nothing() {
        let pool = CopyPool::new(2, 5).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let stats = pool.run(0..100u32, &cancel, |i| i, |_| {});
        assert_eq!(stats.dispatched, 0);
        assert_eq!(stats.completed, 0);
        assert!(stats.interrupted);
    }
}
