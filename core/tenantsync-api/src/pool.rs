//! Bounded task pool shared by every remote fan-out in a run.
//!
//! Two limits apply at once: at most `max_concurrent` tasks in flight, and
//! at most `max_per_second` task starts in any trailing one-second window.
//! Tasks are polled on the caller's task; nothing is spawned.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::debug;

/// Length of the rolling frequency window.
pub const FREQUENCY_WINDOW: Duration = Duration::from_secs(1);

/// Pool limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum tasks in flight.
    pub max_concurrent: usize,
    /// Maximum task starts per rolling second.
    pub max_per_second: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_per_second: 8,
        }
    }
}

/// Concurrency- and frequency-limited executor.
pub struct TaskPool {
    config: PoolConfig,
    slots: Semaphore,
    /// Start times inside the current window, oldest first.
    starts: Mutex<VecDeque<Instant>>,
}

impl TaskPool {
    /// Creates a pool. Zero limits are raised to one.
    pub fn new(config: PoolConfig) -> Self {
        let config = PoolConfig {
            max_concurrent: config.max_concurrent.max(1),
            max_per_second: config.max_per_second.max(1),
        };
        Self {
            slots: Semaphore::new(config.max_concurrent),
            starts: Mutex::new(VecDeque::with_capacity(config.max_per_second)),
            config,
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Runs `generator` over every item under both limits.
    ///
    /// Results come back in item order. On the first failure no further
    /// task is started; tasks already running are awaited, then that first
    /// error is returned and all other results are discarded.
    pub async fn run_each<T, R, E, F, Fut>(&self, items: Vec<T>, generator: F) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send,
        F: Fn(T) -> Fut + Sync,
        Fut: Future<Output = Result<R, E>> + Send,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let halted = AtomicBool::new(false);
        let generator = &generator;
        let halted_ref = &halted;

        let mut tasks: FuturesUnordered<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| async move {
                let Ok(_slot) = self.slots.acquire().await else {
                    return (index, None);
                };
                if !self.wait_for_window(halted_ref).await {
                    return (index, None);
                }
                let outcome = generator(item).await;
                if outcome.is_err() {
                    halted_ref.store(true, Ordering::Release);
                }
                (index, Some(outcome))
            })
            .collect();

        let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut first_error = None;
        let mut skipped = 0usize;

        while let Some((index, outcome)) = tasks.next().await {
            match outcome {
                Some(Ok(value)) => results[index] = Some(value),
                Some(Err(error)) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
                None => skipped += 1,
            }
        }

        if let Some(error) = first_error {
            debug!(total, skipped, "Task pool halted on first failure");
            return Err(error);
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Waits until one more start fits in the rolling window, then records it.
    /// Returns `false` without recording a start once `halted` is set.
    async fn wait_for_window(&self, halted: &AtomicBool) -> bool {
        loop {
            let wait = {
                let mut starts = self.starts.lock().await;
                if halted.load(Ordering::Acquire) {
                    return false;
                }
                let now = Instant::now();
                while starts
                    .front()
                    .is_some_and(|&t| now.duration_since(t) >= FREQUENCY_WINDOW)
                {
                    starts.pop_front();
                }
                if starts.len() < self.config.max_per_second {
                    starts.push_back(now);
                    return true;
                }
                match starts.front() {
                    Some(&oldest) => (oldest + FREQUENCY_WINDOW).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}
