use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::exit;

use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, TerminalMode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("set_logger error: {0}")]
    Init(#[from] SetLoggerError),
}

/// Install the global logger.
///
/// `log_stream` is either `-` for stderr or a file path, which is truncated.
pub fn set_logger(log_stream: &str, log_level: LevelFilter) -> Result<(), LoggingError> {
    let log_conf = simplelog::ConfigBuilder::new()
        .set_thread_level(LevelFilter::Debug)
        .build();

    let logger: Box<dyn simplelog::SharedLogger> = if log_stream == "-" {
        simplelog::TermLogger::new(log_level, log_conf, TerminalMode::Stderr, ColorChoice::Auto)
    } else {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_stream)?;
        simplelog::WriteLogger::new(log_level, log_conf, file)
    };

    simplelog::CombinedLogger::init(vec![logger])?;

    Ok(())
}

pub fn set_logger_or_exit(log_stream: &str, log_level: LevelFilter) {
    if let Err(err) = set_logger(log_stream, log_level) {
        let stderr = io::stderr();
        let _ = writeln!(
            stderr.lock(),
            "can't start logging to \"{}\": {}",
            log_stream,
            err
        );
        exit(2);
    }
}
