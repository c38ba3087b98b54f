//! Engine Benchmarks — Hot-Path Pricing and Matching
//!
//! Benchmarks the kernels that run on every trade request: CPMM
//! pricing, the inverse pricing function, the fill loop against a
//! populated book, and the parimutuel share formula.
//!
//! Run with: cargo bench --bench engine_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use exchange_engine::domain::cpmm::{self, CpmmState};
use exchange_engine::domain::dpm;
use exchange_engine::domain::fees::FeeSchedule;
use exchange_engine::domain::market::BinaryOutcome;
use exchange_engine::domain::bet::LimitBet;
use exchange_engine::usecases::matching::compute_fills;

/// Benchmark the implied-probability read.
fn bench_cpmm_probability(c: &mut Criterion) {
    let state = CpmmState::new(123.0, 87.0, 0.45);

    c.bench_function("cpmm_probability", |b| {
        b.iter(|| {
            let _prob = cpmm::probability(black_box(&state));
        });
    });
}

/// Benchmark a single fee-bearing purchase.
fn bench_cpmm_purchase(c: &mut Criterion) {
    let state = CpmmState::new(123.0, 87.0, 0.45);
    let schedule = FeeSchedule::default();

    c.bench_function("cpmm_purchase", |b| {
        b.iter(|| {
            let _purchase = cpmm::purchase(
                black_box(&state),
                black_box(25.0),
                black_box(BinaryOutcome::Yes),
                &schedule,
            );
        });
    });
}

/// Benchmark the inverse pricing function used to cap pool fills.
fn bench_amount_to_reach_prob(c: &mut Criterion) {
    let state = CpmmState::new(123.0, 87.0, 0.45);

    c.bench_function("cpmm_amount_to_reach_prob", |b| {
        b.iter(|| {
            let _amount = cpmm::amount_to_reach_prob(
                black_box(&state),
                black_box(0.7),
                black_box(BinaryOutcome::Yes),
            );
        });
    });
}

/// Benchmark the full fill loop walking a ten-order book.
fn bench_compute_fills_with_book(c: &mut Criterion) {
    let state = CpmmState::new(100.0, 100.0, 0.5);
    let schedule = FeeSchedule::default();
    let book: Vec<LimitBet> = (0..10)
        .map(|i| LimitBet {
            id: format!("maker_{i}"),
            user_id: format!("user_{i}"),
            outcome: BinaryOutcome::No,
            limit_prob: 0.4 + 0.01 * f64::from(i),
            order_amount: 5.0,
            amount: 0.0,
            created_time: i64::from(i),
        })
        .collect();

    c.bench_function("compute_fills_10_order_book", |b| {
        b.iter(|| {
            let _outcome = compute_fills(
                black_box(BinaryOutcome::Yes),
                black_box(80.0),
                &state,
                None,
                &book,
                &schedule,
                0,
            );
        });
    });
}

/// Benchmark the parimutuel share formula on a three-outcome market.
fn bench_dpm_shares(c: &mut Criterion) {
    let totals = [("a", 120.0), ("b", 340.0), ("c", 90.0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    c.bench_function("dpm_shares", |b| {
        b.iter(|| {
            let _shares = dpm::shares(black_box(&totals), black_box(15.0), "b");
        });
    });
}

/// Benchmark spreading a numeric trade over one hundred buckets.
fn bench_numeric_bucket_spread(c: &mut Criterion) {
    c.bench_function("dpm_bucket_bets_100", |b| {
        b.iter(|| {
            let _bets = dpm::bucket_bets(
                black_box(100),
                black_box(42),
                black_box(50.0),
                dpm::NUMERIC_FIXED_VAR,
            );
        });
    });
}

criterion_group!(
    benches,
    bench_cpmm_probability,
    bench_cpmm_purchase,
    bench_amount_to_reach_prob,
    bench_compute_fills_with_book,
    bench_dpm_shares,
    bench_numeric_bucket_spread,
);
criterion_main!(benches);
