//! # Parallel execution
//!
//! One reusable way to spread "the same work over `n` items" across worker
//! threads. Matrix arithmetic and decomposition use it, and so can any
//! higher-level algorithm that parallelizes per-sample or per-cluster work.
//!
//! The items `[0, n)` are split into contiguous [`BlockRange`]s (see
//! [`block_ranges`]), one rayon task per block, joined by a scope barrier
//! before the call returns. Blocks complete in no particular order. A block
//! that fails (by returning `Err` or by panicking) does not stop its
//! siblings; every failure is collected into a single [`ParallelError`].

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::error::{BlockFailure, ParallelError};

mod blocks;

pub use blocks::{block_ranges, BlockRange};

/// Parallelism strategy passed to the routines of this crate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// Run everything on the calling thread.
    None,
    /// Run on a rayon pool.
    ///
    /// The value is the number of blocks to split work into. `0` means one
    /// block per thread of the active pool.
    Rayon(usize),
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Rayon(0)
    }
}

/// Runs block-partitioned work, either inline or on a rayon pool.
///
/// Cloning is cheap; a dedicated pool is shared between clones.
#[derive(Clone, Debug)]
pub struct Executor {
    parallelism: Parallelism,
    pool: Option<Arc<ThreadPool>>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::global()
    }
}

impl Executor {
    /// Executor that never leaves the calling thread.
    pub fn sequential() -> Self {
        Executor {
            parallelism: Parallelism::None,
            pool: None,
        }
    }

    /// Executor backed by rayon's global pool.
    pub fn global() -> Self {
        Executor {
            parallelism: Parallelism::default(),
            pool: None,
        }
    }

    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Number of blocks work is split into when running in parallel.
    pub fn num_threads(&self) -> usize {
        match self.parallelism {
            Parallelism::None => 1,
            Parallelism::Rayon(0) => match &self.pool {
                Some(pool) => pool.current_num_threads(),
                None => rayon::current_num_threads(),
            },
            Parallelism::Rayon(n) => n,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.num_threads() > 1
    }

    /// The partition this executor uses for `n` items.
    pub fn partition(&self, n: usize) -> Vec<BlockRange> {
        block_ranges(n, self.num_threads())
    }

    /// Run `f(i)` for every `i` in `[0, n)`.
    ///
    /// Inside a block items run in index order and the first `Err` ends that
    /// block; other blocks keep going.
    pub fn run<F>(&self, n: usize, f: F) -> Result<(), ParallelError>
    where
        F: Fn(usize) -> anyhow::Result<()> + Sync,
    {
        self.run_blocks(n, |range| {
            for i in range.range() {
                f(i)?;
            }
            Ok(())
        })
    }

    /// Run `f` once per block of the partition of `[0, n)`.
    pub fn run_blocks<F>(&self, n: usize, f: F) -> Result<(), ParallelError>
    where
        F: Fn(BlockRange) -> anyhow::Result<()> + Sync,
    {
        let tasks = self.partition(n).into_iter().map(|r| (r, ())).collect();
        self.execute(tasks, |range, ()| f(range))
    }

    /// Map every block to a partial result and fold the partials with
    /// `combine`, starting from `identity`.
    ///
    /// Partials are folded in block order, so the result only depends on
    /// the partition and not on which block finished first.
    pub fn run_reduce<T, F, C>(
        &self,
        n: usize,
        identity: T,
        f: F,
        combine: C,
    ) -> Result<T, ParallelError>
    where
        T: Send,
        F: Fn(BlockRange) -> anyhow::Result<T> + Sync,
        C: Fn(T, T) -> T,
    {
        let ranges = self.partition(n);
        let partials: Mutex<Vec<Option<T>>> = Mutex::new((0..ranges.len()).map(|_| None).collect());

        let tasks = ranges.into_iter().map(|r| (r, ())).collect();
        self.execute(tasks, |range, ()| {
            let partial = f(range)?;
            partials.lock()[range.block] = Some(partial);
            Ok(())
        })?;

        Ok(partials
            .into_inner()
            .into_iter()
            .flatten()
            .fold(identity, combine))
    }

    /// Run `f` once per block with exclusive access to that block's items of
    /// `data`, where item `i` owns `data[i * stride..(i + 1) * stride]`.
    ///
    /// # Panics
    /// Panics if `data.len() != n * stride`.
    pub fn run_blocks_mut<T, F>(
        &self,
        n: usize,
        data: &mut [T],
        stride: usize,
        f: F,
    ) -> Result<(), ParallelError>
    where
        T: Send,
        F: Fn(BlockRange, &mut [T]) -> anyhow::Result<()> + Sync,
    {
        assert_eq!(
            data.len(),
            n * stride,
            "data length {} does not match {} items of stride {}",
            data.len(),
            n,
            stride
        );

        let ranges = self.partition(n);
        let mut tasks = Vec::with_capacity(ranges.len());
        let mut rest = data;
        for range in ranges {
            let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * stride);
            tasks.push((range, chunk));
            rest = tail;
        }

        self.execute(tasks, |range, chunk| f(range, chunk))
    }

    fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn execute<P, F>(&self, tasks: Vec<(BlockRange, P)>, body: F) -> Result<(), ParallelError>
    where
        P: Send,
        F: Fn(BlockRange, P) -> anyhow::Result<()> + Sync,
    {
        let total_blocks = tasks.len();
        let failures = Mutex::new(Vec::new());

        let run_block = |range: BlockRange, payload: P| {
            let outcome = catch_unwind(AssertUnwindSafe(|| body(range, payload)))
                .unwrap_or_else(|panic| Err(panic_error(panic)));
            if let Err(error) = outcome {
                log::warn!(
                    "block {} over items {}..{} failed: {:#}",
                    range.block,
                    range.start,
                    range.end,
                    error
                );
                failures.lock().push(BlockFailure {
                    block: range.block,
                    range: range.range(),
                    error,
                });
            }
        };

        if total_blocks <= 1 || !self.is_parallel() {
            for (range, payload) in tasks {
                run_block(range, payload);
            }
        } else {
            log::trace!("dispatching {} blocks", total_blocks);
            let run_block = &run_block;
            self.install(|| {
                rayon::scope(|s| {
                    for (range, payload) in tasks {
                        s.spawn(move |_| run_block(range, payload));
                    }
                })
            });
        }

        let mut failures = failures.into_inner();
        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort_by_key(|f| f.block);
            Err(ParallelError {
                total_blocks,
                failures,
            })
        }
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> anyhow::Error {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    anyhow!("worker panicked: {}", message)
}

/// Builder for [`Executor`].
///
/// Without a pool or thread count the executor runs on rayon's global pool,
/// which honours `RAYON_NUM_THREADS`.
#[derive(Default)]
pub struct ExecutorBuilder {
    parallelism: Option<Parallelism>,
    num_threads: Option<usize>,
    thread_pool: Option<Arc<ThreadPool>>,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Build a dedicated pool with `num_threads` workers.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Run on a pool owned by the caller. Takes precedence over
    /// [`num_threads`](Self::num_threads).
    pub fn thread_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<Executor, ThreadPoolBuildError> {
        let parallelism = self.parallelism.unwrap_or_default();

        let pool = match (parallelism, self.thread_pool, self.num_threads) {
            (Parallelism::None, _, _) => None,
            (_, Some(pool), _) => Some(pool),
            (_, None, Some(n)) => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("single-dense-{}", i))
                    .build()?,
            )),
            (_, None, None) => None,
        };

        let executor = Executor { parallelism, pool };
        log::debug!(
            "built executor: {:?}, {} threads, dedicated pool: {}",
            executor.parallelism,
            executor.num_threads(),
            executor.pool.is_some()
        );
        Ok(executor)
    }
}
