use clap::Args;
use tablecart::{
    context::AppContext,
    domain::{carts::records::CartRecord, ids::UserEmail},
};

use super::{
    CliError,
    output::{self, OutputFormat, TableRows},
};

#[derive(Debug, Args)]
pub(crate) struct HistoryArgs {
    /// Customer email address
    #[arg(long)]
    user: String,

    /// Output format (table, json)
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl TableRows for CartRecord {
    fn header() -> Vec<&'static str> {
        vec!["Cart", "Restaurant", "Created", "Units", "Total"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.uuid.to_string(),
            self.restaurant
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            self.created_at.to_string(),
            self.unit_count().to_string(),
            self.total.to_string(),
        ]
    }

    fn numeric_columns() -> &'static [usize] {
        &[3, 4]
    }
}

pub(crate) async fn run(context: &AppContext, args: HistoryArgs) -> Result<(), CliError> {
    let carts = context
        .carts
        .last_closed_for_user(&UserEmail::from(args.user))
        .await?;

    output::write(args.format, &carts)
}
