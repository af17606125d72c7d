//! Property tests for reconciliation invariants.
//!
//! Uses proptest to verify:
//! 1. Idempotence: reconciling the same row twice changes nothing
//! 2. Sort: output dates are strictly increasing
//! 3. Dedup-keeps-latest: the new row's values win on a date collision
//! 4. Forward-fill: no null follows an observed value in any column

use btcdb_core::domain::{CryptoQuote, Instrument, InstrumentQuotes, ObservationRow, Table};
use btcdb_core::reconcile::reconcile;
use chrono::NaiveDate;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn arb_value() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        2 => (1.0..100_000.0_f64).prop_map(|v| Some((v * 100.0).round() / 100.0)),
    ]
}

fn arb_row() -> impl Strategy<Value = ObservationRow> {
    (
        0i64..60,
        1.0..100_000.0_f64,
        proptest::collection::vec(arb_value(), 5),
    )
        .prop_map(|(offset, price, values)| {
            let mut instruments = InstrumentQuotes::closed();
            for (instrument, value) in Instrument::ALL.into_iter().zip(values) {
                instruments.set(instrument, value);
            }
            ObservationRow::new(
                base_date() + chrono::Duration::days(offset),
                CryptoQuote {
                    price,
                    total_volume: price * 10.0,
                    market_cap: price * 1_000.0,
                },
                instruments,
            )
        })
}

fn arb_table() -> impl Strategy<Value = Table> {
    proptest::collection::vec(arb_row(), 0..40).prop_map(Table::from_rows)
}

proptest! {
    #[test]
    fn reconcile_is_idempotent(table in arb_table(), row in arb_row()) {
        let once = reconcile(table, row.clone()).unwrap();
        let twice = reconcile(once.clone(), row).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn output_dates_strictly_increase(table in arb_table(), row in arb_row()) {
        let out = reconcile(table, row).unwrap();
        for pair in out.rows().windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn new_row_wins_on_its_date(table in arb_table(), row in arb_row()) {
        let out = reconcile(table, row.clone()).unwrap();

        let matching: Vec<&ObservationRow> =
            out.rows().iter().filter(|r| r.date == row.date).collect();
        prop_assert_eq!(matching.len(), 1);
        prop_assert_eq!(matching[0].crypto, row.crypto);
        for (instrument, value) in row.instruments.iter() {
            if value.is_some() {
                prop_assert_eq!(matching[0].instruments.get(instrument), value);
            }
        }
    }

    #[test]
    fn no_gap_after_first_observation(table in arb_table(), row in arb_row()) {
        let out = reconcile(table, row).unwrap();
        for instrument in Instrument::ALL {
            let mut seen = false;
            for r in out.rows() {
                match r.instruments.get(instrument) {
                    Some(_) => seen = true,
                    None => prop_assert!(!seen, "{} has a gap after an observation", instrument),
                }
            }
        }
    }

    #[test]
    fn every_input_date_survives(table in arb_table(), row in arb_row()) {
        let mut dates: Vec<NaiveDate> = table.rows().iter().map(|r| r.date).collect();
        dates.push(row.date);
        dates.sort();
        dates.dedup();

        let out = reconcile(table, row).unwrap();
        let out_dates: Vec<NaiveDate> = out.rows().iter().map(|r| r.date).collect();
        prop_assert_eq!(out_dates, dates);
    }
}
