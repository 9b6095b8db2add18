use std::io;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

use tablecart::{
    context::{AppContext, SeedError},
    domain::{
        carts::{CartsServiceError, sweeper::SweepError},
        reports::ReportsServiceError,
    },
};

use self::config::AppConfig;

mod config;
mod history;
mod logging;
mod output;
mod shutdown;
mod sweep;
mod top;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("failed to initialise tracing subscriber")]
    Logging(#[from] TryInitError),

    #[error("failed to load seed data")]
    Seed(#[from] SeedError),

    #[error("failed to install shutdown handler")]
    Shutdown(#[from] shutdown::ShutdownSignalError),

    #[error("sweep failed")]
    Sweep(#[from] SweepError),

    #[error("report failed")]
    Reports(#[from] ReportsServiceError),

    #[error("cart query failed")]
    Carts(#[from] CartsServiceError),

    #[error("failed to encode output")]
    Output(#[from] serde_json::Error),

    #[error("failed to write output")]
    Io(#[from] io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "tablecart", about = "Tablecart CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Expire and purge abandoned carts.
    Sweep(sweep::SweepArgs),

    /// Best-selling items from closed carts.
    Top(top::TopArgs),

    /// A customer's most recent closed carts.
    History(history::HistoryArgs),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), CliError> {
        logging::init_subscriber(&self.config.logging)?;

        let settings = self.config.settings();

        let context = match &self.config.seed_file {
            Some(path) => AppContext::from_seed_file(path, settings).await?,
            None => AppContext::in_memory(settings),
        };

        match self.command {
            Commands::Sweep(args) => sweep::run(&context, args).await,
            Commands::Top(args) => top::run(&context, args).await,
            Commands::History(args) => history::run(&context, args).await,
        }
    }
}
