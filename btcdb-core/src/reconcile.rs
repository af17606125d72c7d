//! Reconciliation of the historical table with the day's new row.
//!
//! `reconcile` = `merge` (append) then `canonicalize`:
//! 1. stable sort ascending by date
//! 2. dedup on date, keeping the last occurrence (the newly fetched row)
//! 3. forward-fill each nullable column independently
//!
//! Leading nulls stay null: there is no earlier value to carry.

use crate::domain::{Instrument, ObservationRow, Table};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("non-finite value {value} in column '{column}' for {date}")]
    NonFinite {
        column: &'static str,
        date: NaiveDate,
        value: f64,
    },

    #[error("table not strictly ordered: {previous} followed by {next}")]
    OutOfOrder { previous: NaiveDate, next: NaiveDate },
}

/// Append `row` to `historical`. Order is not yet guaranteed.
pub fn merge(historical: Table, row: ObservationRow) -> Result<Table, MergeError> {
    for (column, value) in row.values() {
        if let Some(value) = value.filter(|v| !v.is_finite()) {
            return Err(MergeError::NonFinite {
                column,
                date: row.date,
                value,
            });
        }
    }

    let mut table = historical;
    table.push(row);
    Ok(table)
}

/// Sort by date, keep the last row per date, forward-fill nullable columns.
pub fn canonicalize(table: Table) -> Table {
    let mut rows = table.into_rows();
    rows.sort_by_key(|r| r.date);

    let mut deduped: Vec<ObservationRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match deduped.last_mut() {
            Some(last) if last.date == row.date => *last = row,
            _ => deduped.push(row),
        }
    }

    let mut table = Table::from_rows(deduped);
    for instrument in Instrument::ALL {
        fill_forward(
            table
                .rows_mut()
                .iter_mut()
                .map(|r| r.instruments.slot_mut(instrument)),
        );
    }
    table
}

/// Merge and canonicalize in one step.
pub fn reconcile(historical: Table, row: ObservationRow) -> Result<Table, MergeError> {
    let table = canonicalize(merge(historical, row)?);
    check_invariants(&table)?;
    Ok(table)
}

/// Verify dates are strictly increasing (sorted and unique).
pub fn check_invariants(table: &Table) -> Result<(), MergeError> {
    for pair in table.rows().windows(2) {
        if pair[0].date >= pair[1].date {
            return Err(MergeError::OutOfOrder {
                previous: pair[0].date,
                next: pair[1].date,
            });
        }
    }
    Ok(())
}

/// Replace each `None` with the most recent preceding `Some`.
pub fn forward_fill(values: &mut [Option<f64>]) {
    fill_forward(values.iter_mut());
}

fn fill_forward<'a>(slots: impl IntoIterator<Item = &'a mut Option<f64>>) {
    let mut last = None;
    for slot in slots {
        match *slot {
            Some(v) => last = Some(v),
            None => *slot = last,
        }
    }
}
