mod cli;
mod commands;
mod config;
mod error;
mod metadata;
mod output;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;
use crate::error::CliError;

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let rendered = commands::run(&cli)?;
    output::render(&rendered.envelope, &rendered.sections, cli.format, cli.pretty)?;

    if let Some(code) = rendered.exit_code {
        return Ok(ExitCode::from(code));
    }

    if cli.strict && !rendered.envelope.meta.warnings.is_empty() {
        return Err(CliError::StrictModeViolation {
            warning_count: rendered.envelope.meta.warnings.len(),
        });
    }

    Ok(ExitCode::SUCCESS)
}
