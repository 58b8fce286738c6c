//! Ranking benchmarks: trailing-window aggregation and top/bottom selection.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rankbook::{Reducer, SignalAggregator, SignalObservation, Symbol, rank};

/// `n_days` of signal values for `n_symbols` symbols.
///
/// Values come from a deterministic xorshift32 so runs are comparable.
fn generate_history(n_days: usize, n_symbols: usize) -> (Vec<SignalObservation>, BTreeSet<Symbol>) {
    let symbols: Vec<Symbol> = (0..n_symbols)
        .map(|i| Symbol::new(&format!("S{i:04}")))
        .collect();
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

    let mut rng_state: u32 = 42;
    let mut history = Vec::with_capacity(n_days * n_symbols);
    for day in 0..n_days {
        let date = start + Days::new(day as u64);
        for sym in &symbols {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 17;
            rng_state ^= rng_state << 5;
            let value = (rng_state % 2001) as f64 / 1000.0 - 1.0;
            history.push(SignalObservation::new(date, sym.clone(), value));
        }
    }

    (history, symbols.into_iter().collect())
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal/aggregate");

    for &n_symbols in &[50usize, 500] {
        let (history, universe) = generate_history(250, n_symbols);
        let as_of = history.last().map(|o| o.date).unwrap();
        let agg = SignalAggregator::new(20, Reducer::Sum).unwrap();

        group.bench_with_input(
            BenchmarkId::new("250d_window20", n_symbols),
            &n_symbols,
            |b, _| b.iter(|| black_box(agg.aggregate(&history, as_of, &universe).unwrap())),
        );
    }

    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let (history, universe) = generate_history(20, 500);
    let as_of = history.last().map(|o| o.date).unwrap();
    let score = SignalAggregator::new(20, Reducer::Sum)
        .unwrap()
        .aggregate(&history, as_of, &universe)
        .unwrap();

    c.bench_function("rank/500_symbols_top10", |b| {
        b.iter(|| black_box(rank(&score, 10).unwrap()))
    });
}

criterion_group!(benches, bench_aggregate, bench_rank);
criterion_main!(benches);
