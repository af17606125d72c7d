//! Criterion benchmarks for the daily update hot paths.
//!
//! Benchmarks:
//! 1. Reconcile a new row into a multi-year table
//! 2. Canonicalize a table with heavy weekend gaps

use chrono::{Datelike, NaiveDate, Weekday};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use btcdb_core::domain::{CryptoQuote, Instrument, InstrumentQuotes, ObservationRow, Table};
use btcdb_core::reconcile::{canonicalize, reconcile};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_rows(n: usize) -> Vec<ObservationRow> {
    let base_date = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let date = base_date + chrono::Duration::days(i as i64);
            let price = 20_000.0 + (i as f64 * 0.05).sin() * 5_000.0;
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let mut instruments = InstrumentQuotes::closed();
            if !weekend {
                for (k, instrument) in Instrument::ALL.into_iter().enumerate() {
                    instruments.set(instrument, Some(100.0 * (k + 1) as f64 + i as f64 * 0.01));
                }
            }
            ObservationRow::new(
                date,
                CryptoQuote {
                    price,
                    total_volume: price * 1e5,
                    market_cap: price * 1.9e7,
                },
                instruments,
            )
        })
        .collect()
}

// ── 1. Reconcile ─────────────────────────────────────────────────────

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for years in [1usize, 5, 10] {
        let mut rows = make_rows(years * 365 + 1);
        let today = rows.pop().unwrap();
        let table = Table::from_rows(rows);

        group.bench_with_input(BenchmarkId::new("append_today", years), &table, |b, table| {
            b.iter(|| reconcile(black_box(table.clone()), black_box(today.clone())))
        });
    }

    group.finish();
}

// ── 2. Canonicalize ──────────────────────────────────────────────────

fn bench_canonicalize(c: &mut Criterion) {
    let mut rows = make_rows(3_650);
    rows.reverse();
    let table = Table::from_rows(rows);

    c.bench_function("canonicalize_reversed_10y", |b| {
        b.iter(|| canonicalize(black_box(table.clone())))
    });
}

criterion_group!(benches, bench_reconcile, bench_canonicalize);
criterion_main!(benches);
