use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use argparse::{ArgumentParser, Print, Store, StoreOption, StoreTrue};
use log::LevelFilter;
use thiserror::Error;

use crate::dispatch::{DispatchPolicy, RetryPolicy};

pub const DEFAULT_DATASET: &str = "telemetry_logs.txt";
pub const DEFAULT_OUTPUT: &str = "final_wordcount.json";
pub const DEFAULT_LINES: usize = 30_000;
pub const DEFAULT_CHUNK_SIZE: i64 = 500;
pub const DEFAULT_TOP: i64 = 20;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be positive, got {0}")]
    ChunkSize(i64),
    #[error("top-k must not be negative, got {0}")]
    TopK(i64),
    #[error("thread count must be positive")]
    Threads,
    #[error("retry count {0} is too large")]
    Retries(u32),
    #[error("task timeout must be positive")]
    Timeout,
    #[error("unknown log level \"{0}\"")]
    LogLevel(String),
}

/// Command line options as parsed, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub dataset: String,
    pub generate: bool,
    pub lines: usize,
    pub seed: u64,
    pub chunk_size: i64,
    pub top: i64,
    pub output: String,
    pub threads: usize,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub task_timeout_secs: Option<u64>,
    pub log_stream: String,
    pub log_level: String,
}

/// Validated run parameters.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub dataset: PathBuf,
    pub generate: bool,
    pub lines: usize,
    pub seed: u64,
    pub chunk_size: NonZeroUsize,
    pub top: usize,
    pub output: PathBuf,
    pub dispatch: DispatchPolicy,
    pub log_stream: String,
    pub log_level: LevelFilter,
}

const MAX_RETRIES: u32 = 16;

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset: DEFAULT_DATASET.to_owned(),
            generate: false,
            lines: DEFAULT_LINES,
            seed: DEFAULT_SEED,
            chunk_size: DEFAULT_CHUNK_SIZE,
            top: DEFAULT_TOP,
            output: DEFAULT_OUTPUT.to_owned(),
            threads: default_threads(),
            retries: 0,
            retry_backoff_ms: 100,
            task_timeout_secs: None,
            log_stream: "-".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<RunParams, ConfigError> {
        let chunk_size = usize::try_from(self.chunk_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::ChunkSize(self.chunk_size))?;
        let top = usize::try_from(self.top).map_err(|_| ConfigError::TopK(self.top))?;
        let workers = NonZeroUsize::new(self.threads).ok_or(ConfigError::Threads)?;
        if self.retries > MAX_RETRIES {
            return Err(ConfigError::Retries(self.retries));
        }
        let timeout = match self.task_timeout_secs {
            Some(0) => return Err(ConfigError::Timeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };
        let log_level = LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))?;

        Ok(RunParams {
            dataset: PathBuf::from(&self.dataset),
            generate: self.generate,
            lines: self.lines,
            seed: self.seed,
            chunk_size,
            top,
            output: PathBuf::from(&self.output),
            dispatch: DispatchPolicy {
                workers,
                retry: RetryPolicy {
                    max_attempts: self.retries + 1,
                    backoff: Duration::from_millis(self.retry_backoff_ms),
                },
                timeout,
            },
            log_stream: self.log_stream.clone(),
            log_level,
        })
    }
}

fn build_parser<'p>(conf: &'p mut Config, description: &'p str) -> ArgumentParser<'p> {
    let mut ap = ArgumentParser::new();
    ap.set_description(description);
    ap.add_option(
        &["-V", "--version"],
        Print(env!("CARGO_PKG_VERSION").to_string()),
        "Show version",
    );

    ap.refer(&mut conf.dataset)
        .add_option(&["--dataset"], Store, "dataset path - default: telemetry_logs.txt");
    ap.refer(&mut conf.generate).add_option(
        &["--generate"],
        StoreTrue,
        "generate the synthetic dataset before reading it",
    );
    ap.refer(&mut conf.lines)
        .add_option(&["--lines"], Store, "lines to generate - default: 30000");
    ap.refer(&mut conf.seed)
        .add_option(&["--seed"], Store, "generator seed - default: 42");
    ap.refer(&mut conf.chunk_size)
        .add_option(&["--chunk-size"], Store, "lines per task - default: 500");
    ap.refer(&mut conf.top)
        .add_option(&["--top"], Store, "number of top tokens to report - default: 20");
    ap.refer(&mut conf.output).add_option(
        &["-o", "--output"],
        Store,
        "report file - default: final_wordcount.json",
    );
    ap.refer(&mut conf.threads).add_option(
        &["-t", "--threads"],
        Store,
        "worker count - default: available cores",
    );
    ap.refer(&mut conf.retries).add_option(
        &["--retries"],
        Store,
        "extra attempts for a failed task - default: 0",
    );
    ap.refer(&mut conf.retry_backoff_ms).add_option(
        &["--retry-backoff-ms"],
        Store,
        "delay before the first retry, doubled per attempt - default: 100",
    );
    ap.refer(&mut conf.task_timeout_secs).add_option(
        &["--task-timeout"],
        StoreOption,
        "seconds before outstanding tasks are cancelled - default: none",
    );
    ap.refer(&mut conf.log_stream)
        .add_option(&["--log"], Store, "log file, '-' for stderr - default: -");
    ap.refer(&mut conf.log_level).add_option(
        &["--log-level"],
        Store,
        "off, error, warn, info, debug or trace - default: info",
    );
    ap
}

/// Parse `args` (program name first).
///
/// `Err` carries the exit code argparse asks for: 0 after `--help` or
/// `--version`, non-zero on a usage error.
pub fn parse_args_from(
    description: &str,
    args: Vec<String>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Config, i32> {
    let mut conf = Config::default();
    {
        // this block limits scope of borrows by ap.refer() method
        let ap = build_parser(&mut conf, description);
        ap.parse(args, stdout, stderr)?;
    }
    Ok(conf)
}

pub fn parse_args(description: &str) -> Config {
    let mut conf = Config::default();
    {
        let ap = build_parser(&mut conf, description);
        ap.parse_args_or_exit();
    }
    conf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, i32> {
        let mut argv = vec!["wc-distributed".to_owned()];
        argv.extend(args.iter().map(|a| a.to_string()));
        let mut out = Vec::new();
        let mut err = Vec::new();
        parse_args_from("test", argv, &mut out, &mut err)
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let conf = parse(&[]).unwrap();
        assert_eq!(conf.dataset, DEFAULT_DATASET);
        assert_eq!(conf.chunk_size, 500);
        assert_eq!(conf.top, 20);
        assert_eq!(conf.lines, 30_000);
        assert!(!conf.generate);

        let params = conf.validate().unwrap();
        assert_eq!(params.chunk_size.get(), 500);
        assert_eq!(params.top, 20);
        assert_eq!(params.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(params.dispatch.retry.max_attempts, 1);
        assert_eq!(params.dispatch.timeout, None);
        assert_eq!(params.log_level, LevelFilter::Info);
    }

    #[test]
    fn options_are_parsed() {
        let conf = parse(&[
            "--dataset", "logs.txt", "--generate", "--lines", "100", "--chunk-size", "7",
            "--top", "3", "-t", "2", "--retries", "2", "--task-timeout", "5",
            "--log-level", "debug", "-o", "out.json",
        ])
        .unwrap();
        let params = conf.validate().unwrap();
        assert!(params.generate);
        assert_eq!(params.dataset, PathBuf::from("logs.txt"));
        assert_eq!(params.lines, 100);
        assert_eq!(params.chunk_size.get(), 7);
        assert_eq!(params.top, 3);
        assert_eq!(params.dispatch.workers.get(), 2);
        assert_eq!(params.dispatch.retry.max_attempts, 3);
        assert_eq!(params.dispatch.timeout, Some(Duration::from_secs(5)));
        assert_eq!(params.log_level, LevelFilter::Debug);
        assert_eq!(params.output, PathBuf::from("out.json"));
    }

    #[test]
    fn unknown_option_is_a_usage_error() {
        assert!(matches!(parse(&["--bogus"]), Err(code) if code != 0));
    }

    #[test]
    fn non_positive_chunk_size_is_rejected() {
        for bad in [0, -1] {
            let conf = Config {
                chunk_size: bad,
                ..Config::default()
            };
            assert_eq!(conf.validate().unwrap_err(), ConfigError::ChunkSize(bad));
        }
    }

    #[test]
    fn negative_top_is_rejected_but_zero_is_fine() {
        let conf = Config {
            top: -2,
            ..Config::default()
        };
        assert_eq!(conf.validate().unwrap_err(), ConfigError::TopK(-2));

        let conf = Config {
            top: 0,
            ..Config::default()
        };
        assert_eq!(conf.validate().unwrap().top, 0);
    }

    #[test]
    fn other_invalid_settings() {
        let zero_threads = Config {
            threads: 0,
            ..Config::default()
        };
        assert_eq!(zero_threads.validate().unwrap_err(), ConfigError::Threads);

        let zero_timeout = Config {
            task_timeout_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(zero_timeout.validate().unwrap_err(), ConfigError::Timeout);

        let bad_level = Config {
            log_level: "loud".to_owned(),
            ..Config::default()
        };
        assert_eq!(
            bad_level.validate().unwrap_err(),
            ConfigError::LogLevel("loud".to_owned())
        );

        let many_retries = Config {
            retries: 1000,
            ..Config::default()
        };
        assert_eq!(many_retries.validate().unwrap_err(), ConfigError::Retries(1000));
    }
}
