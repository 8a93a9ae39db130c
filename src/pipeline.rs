//! One run: load, partition, dispatch, aggregate, select, report.

use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::RunParams;
use crate::dataset::{read_dataset, write_dataset};
use crate::dispatch::{dispatch, ChunkCounter, DispatchError, DispatchPolicy, TokenCounter};
use crate::error::WordCountError;
use crate::freq_table::{aggregate, FreqTable};
use crate::partition::{batch_count, partition};
use crate::report::{write_report, RunReport};
use crate::top_k::top_k;
use crate::util::{round_secs, CpuTime};
use crate::LogHistogram;

/// The computed result of the map-reduce path.
#[derive(Debug)]
pub struct Analysis {
    pub global: FreqTable,
    pub top: Vec<(String, u64)>,
    pub tasks: usize,
    /// Dispatch through aggregation, wall clock.
    pub elapsed: Duration,
    pub cpu: CpuTime,
    pub task_times: LogHistogram,
    pub retried: usize,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub analysis: Analysis,
}

/// Partition `lines`, count the batches concurrently, merge and select.
pub async fn analyze<C: ChunkCounter>(
    lines: Vec<String>,
    chunk_size: NonZeroUsize,
    k: usize,
    counter: Arc<C>,
    policy: &DispatchPolicy,
) -> Result<Analysis, DispatchError> {
    let batches = partition(lines, chunk_size);
    let tasks = batches.len();

    let start_cpu = CpuTime::now();
    let start = Instant::now();

    let dispatched = dispatch(batches, counter, policy).await?;
    let global = aggregate(dispatched.tables);

    let elapsed = start.elapsed();
    let cpu = CpuTime::now().since(&start_cpu);
    debug!("merged {} distinct tokens", global.len());

    let top = top_k(&global, k);
    Ok(Analysis {
        global,
        top,
        tasks,
        elapsed,
        cpu,
        task_times: dispatched.task_times,
        retried: dispatched.retried,
    })
}

/// Generate the dataset when asked to, then read it.
pub async fn load_dataset(params: &RunParams) -> Result<Vec<String>, WordCountError> {
    let path = params.dataset.as_path();
    if params.generate {
        info!("generating dataset: {} ({} lines)", path.display(), params.lines);
        write_dataset(path, params.lines, params.seed)
            .await
            .map_err(|source| WordCountError::Generate {
                path: path.to_path_buf(),
                source,
            })?;
    }

    info!("reading dataset: {}", path.display());
    read_dataset(path).await.map_err(|source| input_error(path, source))
}

fn input_error(path: &Path, source: io::Error) -> WordCountError {
    if source.kind() == io::ErrorKind::NotFound {
        WordCountError::MissingDataset {
            path: path.to_path_buf(),
        }
    } else {
        WordCountError::Input {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub async fn run(params: &RunParams) -> Result<RunOutcome, WordCountError> {
    run_with(params, Arc::new(TokenCounter)).await
}

/// Full run with a caller supplied counter.
///
/// The report is written only after every stage succeeded; any failure
/// returns before the report file is touched.
pub async fn run_with<C: ChunkCounter>(
    params: &RunParams,
    counter: Arc<C>,
) -> Result<RunOutcome, WordCountError> {
    let lines = load_dataset(params).await?;
    let line_count = lines.len();

    info!("total lines: {}", line_count);
    info!("chunk size: {}", params.chunk_size);
    info!("total tasks: {}", batch_count(line_count, params.chunk_size));

    let analysis = analyze(lines, params.chunk_size, params.top, counter, &params.dispatch).await?;
    info!("task times: {}", analysis.task_times);
    if analysis.retried > 0 {
        info!("{} task(s) succeeded after retry", analysis.retried);
    }

    let report = RunReport {
        dataset: params.dataset.display().to_string(),
        lines: line_count,
        chunk_size: params.chunk_size.get(),
        tasks: analysis.tasks,
        top: analysis.top.clone(),
        elapsed_s: round_secs(analysis.elapsed),
        full_counts: analysis.global.to_sorted(),
    };

    write_report(&params.output, &report)
        .await
        .map_err(|source| WordCountError::ReportWrite {
            path: params.output.clone(),
            source,
        })?;
    info!("wrote {}", params.output.display());

    Ok(RunOutcome { report, analysis })
}

/// Run on a dedicated multi-threaded runtime that lives for this call only.
pub fn run_blocking(params: &RunParams) -> Result<RunOutcome, WordCountError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(params.dispatch.workers.get())
        .thread_name("wc-worker")
        .enable_all()
        .build()
        .map_err(WordCountError::Runtime)?;

    let outcome = runtime.block_on(run(params));
    runtime.shutdown_timeout(Duration::from_secs(1));
    outcome
}
