//! Tablecart CLI

use std::{error::Error, process::ExitCode};

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore if missing)
    _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

#[expect(
    clippy::print_stderr,
    reason = "logging may not be initialised when startup fails."
)]
fn report(error: &cli::CliError) {
    eprintln!("{error}");

    let mut source = error.source();

    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
