//! CLI entry point for the tsukiji stress driver.
//!
//! Parses arguments with clap, runs the requested command, prints the summary
//! on stdout and maps failures to a non-zero exit code. Logging is installed
//! first so every later step can report through `tracing`.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, field};

use tsukiji_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("stress run failed")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_summary(&summary, &mut writer).context("failed to render summary")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let (code, index_code) = err
            .downcast_ref::<CliError>()
            .map_or((None, None), |cli_error| match cli_error {
                CliError::Pipeline(pipeline) => {
                    (Some(pipeline.code().as_str()), pipeline.index_code())
                }
                CliError::Index(index) => (None, Some(index.code())),
                _ => (None, None),
            });

        error!(
            error = %format!("{err:#}"),
            code = code.map(field::display),
            index_code = index_code.map(|code| field::display(code.as_str())),
            "command execution failed"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
