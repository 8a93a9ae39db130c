use std::io::{self, Write};
use std::process::exit;

use log::error;

use word_count::config::parse_args;
use word_count::error::error_chain;
use word_count::logging::set_logger_or_exit;
use word_count::pipeline::{run_blocking, RunOutcome};
use word_count::WordCountError;

fn print_outcome(outcome: &RunOutcome, output: &std::path::Path) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "Top tokens")?;
    for (token, count) in &outcome.report.top {
        writeln!(out, "{:15} {}", token, count)?;
    }
    let cpu = &outcome.analysis.cpu;
    writeln!(
        out,
        "\nDistributed analysis time: {:.2}s (usr: {:.3}s sys: {:.3}s)",
        outcome.analysis.elapsed.as_secs_f64(),
        cpu.user.as_secs_f64(),
        cpu.system.as_secs_f64()
    )?;
    writeln!(out, "Wrote {}", output.display())?;
    Ok(())
}

fn fail(err: &WordCountError) -> ! {
    let msg = error_chain(err);
    error!("{}", msg);
    let _ = writeln!(io::stderr().lock(), "error: {}", msg);
    exit(err.exit_code());
}

fn main() {
    let conf = parse_args("distributed word frequency analysis");
    let params = match conf.validate() {
        Ok(params) => params,
        Err(err) => {
            let err = WordCountError::from(err);
            let _ = writeln!(io::stderr().lock(), "error: {}", err);
            exit(err.exit_code());
        }
    };
    set_logger_or_exit(&params.log_stream, params.log_level);

    match run_blocking(&params) {
        Ok(outcome) => {
            if let Err(err) = print_outcome(&outcome, &params.output) {
                let _ = writeln!(io::stderr().lock(), "can't print results: {}", err);
                exit(1);
            }
        }
        Err(err) => fail(&err),
    }
}
