use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::report::ReportError;

/// Fatal run failure; the message names the stage that failed.
#[derive(Debug, Error)]
pub enum WordCountError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("dataset {} not found (use --generate to create it)", .path.display())]
    MissingDataset { path: PathBuf },
    #[error("can't read dataset {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't generate dataset {}: {source}", .path.display())]
    Generate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("counting stage failed: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("can't write report {}: {source}", .path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: ReportError,
    },
    #[error("can't start task runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl WordCountError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            WordCountError::Config(_) => 2,
            _ => 1,
        }
    }
}

/// `err` followed by its chain of causes, separated by `: caused by: `.
pub fn error_chain(err: &dyn Error) -> String {
    let mut msg = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !msg.contains(&text) {
            msg.push_str(": caused by: ");
            msg.push_str(&text);
        }
        cause = inner.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::TaskError;

    #[test]
    fn messages_name_the_failed_stage() {
        let err = WordCountError::from(ConfigError::ChunkSize(0));
        assert_eq!(err.to_string(), "configuration error: chunk size must be positive, got 0");
        assert_eq!(err.exit_code(), 2);

        let err = WordCountError::MissingDataset {
            path: PathBuf::from("logs.txt"),
        };
        assert!(err.to_string().contains("logs.txt not found"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn chain_includes_nested_causes_once() {
        let err = WordCountError::from(DispatchError::TaskFailed {
            batch: 3,
            attempts: 1,
            source: TaskError::Failed("disk on fire".to_owned()),
        });
        let chain = error_chain(&err);
        assert!(chain.starts_with("counting stage failed: task for batch 3"));
        assert_eq!(chain.matches("disk on fire").count(), 1);
    }
}
