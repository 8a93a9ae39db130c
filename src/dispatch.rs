use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time;

use crate::freq_table::FreqTable;
use crate::partition::Batch;
use crate::tokenizer::count_chunk;
use crate::LogHistogram;

/// Turns one batch into its partial frequency table.
///
/// Implementations run concurrently on the blocking pool and must not share
/// mutable state between calls.
pub trait ChunkCounter: Send + Sync + 'static {
    fn count(&self, batch: &Batch) -> Result<FreqTable, TaskError>;
}

/// The stock counter: tokenize and count every line of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl ChunkCounter for TokenCounter {
    fn count(&self, batch: &Batch) -> Result<FreqTable, TaskError> {
        Ok(count_chunk(&batch.lines))
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("worker was cancelled")]
    Cancelled,
}

impl From<JoinError> for TaskError {
    fn from(err: JoinError) -> TaskError {
        if err.is_cancelled() {
            return TaskError::Cancelled;
        }
        let payload = err.into_panic();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        TaskError::Panicked(msg)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("task for batch {batch} failed after {attempts} attempt(s): {source}")]
    TaskFailed {
        batch: usize,
        attempts: u32,
        #[source]
        source: TaskError,
    },
    #[error("timed out after {after:?} with {outstanding} of {total} tasks outstanding")]
    Timeout {
        after: Duration,
        outstanding: usize,
        total: usize,
    },
    #[error("no result was collected for batch {batch}")]
    Lost { batch: usize },
    #[error("task supervisor failed: {0}")]
    Supervisor(#[from] JoinError),
}

/// Bounded per-task retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per task, at least 1.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled for every further one.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before the attempt following `failed` failures.
    pub fn delay(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Upper bound on counting jobs running at the same time.
    pub workers: NonZeroUsize,
    pub retry: RetryPolicy,
    /// Deadline for the whole dispatch, not per task. Expiry stops result
    /// collection and pending attempts; a counting job already running on
    /// the blocking pool is abandoned, not interrupted.
    pub timeout: Option<Duration>,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        DispatchPolicy {
            workers: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            retry: RetryPolicy::none(),
            timeout: None,
        }
    }
}

/// Result of a completed dispatch.
#[derive(Debug)]
pub struct Dispatched {
    /// One table per submitted batch, in submission order.
    pub tables: Vec<FreqTable>,
    /// Wall time of each successful counting attempt.
    pub task_times: LogHistogram,
    /// Number of tasks that needed more than one attempt.
    pub retried: usize,
}

struct TaskOutput {
    table: FreqTable,
    elapsed: Duration,
    attempts: u32,
}

struct TaskReport {
    slot: usize,
    batch: usize,
    outcome: Result<TaskOutput, (u32, TaskError)>,
}

async fn run_task<C: ChunkCounter>(
    slot: usize,
    batch: Arc<Batch>,
    counter: Arc<C>,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
) -> TaskReport {
    let batch_index = batch.index;
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    let outcome = loop {
        attempt += 1;
        let result = match permits.acquire().await {
            Ok(_permit) => {
                let start = Instant::now();
                let job_batch = Arc::clone(&batch);
                let job_counter = Arc::clone(&counter);
                let result = tokio::task::spawn_blocking(move || job_counter.count(&job_batch))
                    .await
                    .map_err(TaskError::from)
                    .and_then(|counted| counted);
                result.map(|table| (table, start.elapsed()))
            }
            Err(_closed) => Err(TaskError::Cancelled),
        };

        match result {
            Ok((table, elapsed)) => {
                debug!(
                    "batch {} counted: {} lines, {} distinct tokens in {:?}",
                    batch_index,
                    batch.len(),
                    table.len(),
                    elapsed
                );
                break Ok(TaskOutput {
                    table,
                    elapsed,
                    attempts: attempt,
                });
            }
            Err(err) if attempt < max_attempts => {
                let delay = retry.delay(attempt);
                warn!(
                    "batch {} attempt {}/{} failed: {}; retrying in {:?}",
                    batch_index, attempt, max_attempts, err, delay
                );
                time::sleep(delay).await;
            }
            Err(err) => break Err((attempt, err)),
        }
    };

    TaskReport {
        slot,
        batch: batch_index,
        outcome,
    }
}

/// Count every batch concurrently and wait for all of them.
///
/// Tables come back aligned with `batches`, whatever order the tasks finish
/// in. The first task that fails for good aborts every outstanding task and
/// fails the whole dispatch; so does the timeout.
pub async fn dispatch<C: ChunkCounter>(
    batches: Vec<Batch>,
    counter: Arc<C>,
    policy: &DispatchPolicy,
) -> Result<Dispatched, DispatchError> {
    let total = batches.len();
    let permits = Arc::new(Semaphore::new(policy.workers.get()));
    let mut tasks = JoinSet::new();
    let mut batch_ids = Vec::with_capacity(total);

    for (slot, batch) in batches.into_iter().enumerate() {
        batch_ids.push(batch.index);
        tasks.spawn(run_task(
            slot,
            Arc::new(batch),
            Arc::clone(&counter),
            Arc::clone(&permits),
            policy.retry,
        ));
    }
    debug!("submitted {} tasks to {} workers", total, policy.workers);

    let deadline = policy.timeout.map(|t| time::Instant::now() + t);
    let mut slots: Vec<Option<FreqTable>> = vec![None; total];
    let mut task_times = LogHistogram::new();
    let mut retried = 0;
    let mut done = 0;

    loop {
        let joined = match (deadline, policy.timeout) {
            (Some(deadline), Some(after)) => {
                match time::timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_elapsed) => {
                        tasks.abort_all();
                        return Err(DispatchError::Timeout {
                            after,
                            outstanding: total - done,
                            total,
                        });
                    }
                }
            }
            _ => tasks.join_next().await,
        };

        let report = match joined {
            Some(report) => report?,
            None => break,
        };

        match report.outcome {
            Ok(output) => {
                task_times.add_duration(output.elapsed);
                if output.attempts > 1 {
                    retried += 1;
                }
                slots[report.slot] = Some(output.table);
                done += 1;
            }
            Err((attempts, source)) => {
                tasks.abort_all();
                return Err(DispatchError::TaskFailed {
                    batch: report.batch,
                    attempts,
                    source,
                });
            }
        }
    }

    let tables = slots
        .into_iter()
        .zip(batch_ids)
        .map(|(table, batch)| table.ok_or(DispatchError::Lost { batch }))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Dispatched {
        tables,
        task_times,
        retried,
    })
}
