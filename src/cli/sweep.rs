use clap::Args;
use tablecart::context::AppContext;
use tracing::info;

use super::{CliError, shutdown};

#[derive(Debug, Args)]
pub(crate) struct SweepArgs {
    /// Run a single cycle and exit instead of looping until interrupted
    #[arg(long)]
    once: bool,
}

pub(crate) async fn run(context: &AppContext, args: SweepArgs) -> Result<(), CliError> {
    let sweeper = context.sweeper();

    if args.once {
        let report = sweeper.run_once().await?;

        info!(expired = report.expired, purged = report.purged, "sweep finished");

        return Ok(());
    }

    let handle = sweeper.spawn();

    info!(
        interval = ?context.settings.sweeper.interval,
        "sweeper running, press Ctrl+C to stop"
    );

    let signal = shutdown::wait().await;

    handle.stop().await?;
    signal?;

    info!("sweeper stopped");

    Ok(())
}
