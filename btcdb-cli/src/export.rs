//! CSV export of the observation table.

use anyhow::{Context, Result};
use btcdb_core::data::schema::{DATE_COLUMN, REQUIRED_COLUMNS};
use btcdb_core::domain::{Instrument, Table};
use std::path::Path;

/// Render the table as CSV: `date` then the value columns in storage order.
/// Null instrument values are empty cells.
pub fn table_to_csv(table: &Table) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![DATE_COLUMN];
    header.extend(value_columns());
    wtr.write_record(&header)?;

    for row in table.rows() {
        let mut record = vec![row.date.to_string()];
        record.extend(row.values().iter().map(|(_, v)| match v {
            Some(v) => v.to_string(),
            None => String::new(),
        }));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_csv(table: &Table, out: &Path) -> Result<()> {
    let csv = table_to_csv(table)?;
    std::fs::write(out, csv).with_context(|| format!("writing {}", out.display()))
}

fn value_columns() -> impl Iterator<Item = &'static str> {
    REQUIRED_COLUMNS
        .into_iter()
        .chain(Instrument::ALL.into_iter().map(Instrument::column))
}
