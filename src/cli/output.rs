//! Command output rendering.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

use super::CliError;

/// How command results are written to stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Rounded table for humans.
    #[default]
    Table,

    /// Pretty-printed JSON.
    Json,
}

/// Rows that can be rendered as a table.
pub(crate) trait TableRows {
    fn header() -> Vec<&'static str>;

    fn row(&self) -> Vec<String>;

    /// Columns holding numbers, aligned right.
    fn numeric_columns() -> &'static [usize] {
        &[]
    }
}

pub(super) fn write<T>(format: OutputFormat, rows: &[T]) -> Result<(), CliError>
where
    T: Serialize + TableRows,
{
    write_to(&mut io::stdout().lock(), format, rows)
}

fn write_to<T>(out: &mut impl Write, format: OutputFormat, rows: &[T]) -> Result<(), CliError>
where
    T: Serialize + TableRows,
{
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, rows)?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            writeln!(out, "{}", render_table(rows))?;
        }
    }

    Ok(())
}

pub(super) fn render_table<T: TableRows>(rows: &[T]) -> String {
    let mut builder = Builder::default();

    builder.push_record(T::header());

    for row in rows {
        builder.push_record(row.row());
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());

    for &column in T::numeric_columns() {
        table.modify(Columns::one(column), Alignment::right());
    }

    table.to_string()
}
