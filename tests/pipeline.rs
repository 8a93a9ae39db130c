use std::path::Path;
use std::sync::Arc;

use word_count::dispatch::DispatchError;
use word_count::report::read_report;
use word_count::{
    run_with, tokenize, Batch, ChunkCounter, Config, FreqTable, RunParams, TaskError,
    TokenCounter, WordCountError,
};

fn params(dir: &Path, generate: bool) -> RunParams {
    Config {
        dataset: dir.join("logs.txt").display().to_string(),
        output: dir.join("report.json").display().to_string(),
        generate,
        lines: 250,
        chunk_size: 40,
        top: 5,
        threads: 2,
        ..Config::default()
    }
    .validate()
    .unwrap()
}

struct FailOn(usize);

impl ChunkCounter for FailOn {
    fn count(&self, batch: &Batch) -> Result<FreqTable, TaskError> {
        if batch.index == self.0 {
            return Err(TaskError::Failed("injected failure".to_owned()));
        }
        TokenCounter.count(batch)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generated_run_writes_a_complete_report() {
    let dir = tempfile::tempdir().unwrap();
    let params = params(dir.path(), true);

    let outcome = run_with(&params, Arc::new(TokenCounter)).await.unwrap();
    let report = read_report(&params.output).await.unwrap();

    assert_eq!(report, outcome.report);
    assert_eq!(report.lines, 250);
    assert_eq!(report.chunk_size, 40);
    assert_eq!(report.tasks, 7);
    assert_eq!(report.top.len(), 5);
    assert!(report.top.windows(2).all(|w| w[0].1 >= w[1].1));
    // every line carries exactly one event token
    assert_eq!(report.full_counts["event"], 250);

    let text = std::fs::read_to_string(&params.dataset).unwrap();
    let token_total: usize = text.lines().map(|l| tokenize(l).len()).sum();
    assert_eq!(report.full_counts.values().sum::<u64>(), token_total as u64);
}

#[tokio::test]
async fn existing_dataset_is_read_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let params = params(dir.path(), false);
    std::fs::write(
        &params.dataset,
        "INFO event=0 sensor ok\n\nWARN event=1 sensor timeout\n  ERROR event=2 sensor sensor  \n",
    )
    .unwrap();

    let outcome = run_with(&params, Arc::new(TokenCounter)).await.unwrap();

    assert_eq!(outcome.report.lines, 3);
    assert_eq!(outcome.report.tasks, 1);
    assert_eq!(
        outcome.report.top[..2],
        [("sensor".to_owned(), 4), ("event".to_owned(), 3)]
    );
    assert_eq!(outcome.report.full_counts.len(), 7);
}

#[tokio::test]
async fn task_failure_aborts_without_a_report() {
    let dir = tempfile::tempdir().unwrap();
    let params = params(dir.path(), true);

    let err = run_with(&params, Arc::new(FailOn(3))).await.unwrap_err();

    match err {
        WordCountError::Dispatch(DispatchError::TaskFailed { batch, .. }) => assert_eq!(batch, 3),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!params.output.exists());
}

#[tokio::test]
async fn missing_dataset_without_generate_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let params = params(dir.path(), false);

    let err = run_with(&params, Arc::new(TokenCounter)).await.unwrap_err();

    assert!(matches!(err, WordCountError::MissingDataset { .. }));
    assert!(!params.output.exists());
}

#[tokio::test]
async fn unwritable_report_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let mut params = params(dir.path(), true);
    params.output = dir.path().join("missing").join("report.json");

    let err = run_with(&params, Arc::new(TokenCounter)).await.unwrap_err();

    assert!(matches!(err, WordCountError::ReportWrite { .. }));
}
