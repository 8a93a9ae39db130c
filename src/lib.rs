pub mod logging;
pub mod util;
pub mod config;
pub mod error;
pub mod freq_table;
pub mod tokenizer;
pub mod partition;
pub mod dispatch;
pub mod top_k;
pub mod dataset;
pub mod report;
pub mod pipeline;
mod log_histogram;
pub use crate::log_histogram::LogHistogram;

pub use crate::config::{Config, RunParams};
pub use crate::dispatch::{ChunkCounter, DispatchPolicy, RetryPolicy, TaskError, TokenCounter};
pub use crate::error::WordCountError;
pub use crate::freq_table::{aggregate, FreqTable};
pub use crate::partition::{partition, Batch};
pub use crate::pipeline::{analyze, run, run_blocking, run_with, RunOutcome};
pub use crate::report::RunReport;
pub use crate::tokenizer::{count_chunk, tokenize};
pub use crate::top_k::top_k;
