use clap::Args;
use tablecart::{
    context::AppContext,
    domain::{ids::RestaurantId, reports::TopItem},
    settings::DEFAULT_TOP_ITEMS_LIMIT,
};

use super::{
    CliError,
    output::{self, OutputFormat, TableRows},
};

#[derive(Debug, Args)]
pub(crate) struct TopArgs {
    /// Only count carts from this restaurant
    #[arg(long)]
    restaurant: Option<String>,

    /// Maximum number of rows
    #[arg(long, default_value_t = DEFAULT_TOP_ITEMS_LIMIT)]
    limit: usize,

    /// Output format (table, json)
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl TableRows for TopItem {
    fn header() -> Vec<&'static str> {
        vec!["Item", "Name", "Sold"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.item.to_string(), self.name.clone(), self.quantity.to_string()]
    }

    fn numeric_columns() -> &'static [usize] {
        &[0, 2]
    }
}

pub(crate) async fn run(context: &AppContext, args: TopArgs) -> Result<(), CliError> {
    let restaurant = args.restaurant.map(RestaurantId::from);
    let top = context.reports.top_items(restaurant, args.limit).await?;

    output::write(args.format, &top)
}
