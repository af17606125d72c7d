use super::row::ObservationRow;
use chrono::NaiveDate;

/// Date-keyed collection of observation rows.
///
/// Ordering and uniqueness are only guaranteed after
/// [`canonicalize`](crate::reconcile::canonicalize); a freshly appended table
/// may hold the new row out of order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<ObservationRow>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ObservationRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ObservationRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: ObservationRow) {
        self.rows.push(row);
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).max()
    }

    /// Last row stored for `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<&ObservationRow> {
        self.rows.iter().rev().find(|r| r.date == date)
    }

    /// Last `n` rows in storage order.
    pub fn tail(&self, n: usize) -> &[ObservationRow] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<ObservationRow> {
        &mut self.rows
    }
}
