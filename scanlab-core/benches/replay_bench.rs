//! Criterion benchmarks for the replay hot paths.
//!
//! Benchmarks:
//! 1. Full replay over synthetic multi-day sessions (mock scanner)
//! 2. Point-in-time view truncation
//! 3. Indicator precompute on one session

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{NaiveDate, NaiveTime};
use scanlab_core::domain::{Bar, Direction, Signal};
use scanlab_core::exits::ExitStrategyConfig;
use scanlab_core::indicators::{Atr, Indicator, Vwap};
use scanlab_core::replay::{run_replay, CancelToken, PointInTimeView, ReplayConfig};
use scanlab_core::scanner::{ScanError, ScanRequest, ScanResponse, Scanner};
use scanlab_core::store::{BarStore, InMemoryBarStore};
use std::collections::BTreeMap;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_store(tickers: &[&str], days: u32, bars_per_day: u32) -> InMemoryBarStore {
    let mut store = InMemoryBarStore::new("bench.db");
    for d in 0..days {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap() + chrono::Duration::days(d as i64);
        for (ti, ticker) in tickers.iter().enumerate() {
            for m in 0..bars_per_day {
                let wave = ((m as f64) * 0.07 + ti as f64).sin();
                let close = 100.0 + 10.0 * wave;
                store.push_bar(Bar {
                    ticker: ticker.to_string(),
                    timestamp: (d as i64) * 86_400_000 + (m as i64) * 60_000,
                    open: close - 0.1,
                    high: close + 0.4,
                    low: close - 0.4,
                    close,
                    volume: 10_000 + m as u64,
                    time_of_day: NaiveTime::from_hms_opt(9, 30, 0).unwrap()
                        + chrono::Duration::minutes(m as i64),
                    trading_day: day,
                });
            }
        }
    }
    store.sort_sessions();
    store
}

/// Mock scanner that fires a signal on every 20th request.
struct PeriodicScanner;

impl Scanner for PeriodicScanner {
    fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
        let data = if request.request_id % 20 == 0 {
            vec![Signal {
                ticker: request.tickers[0].clone(),
                signal_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                signal_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                pattern_strength: 75.0,
                direction: Direction::Long,
                metrics: BTreeMap::new(),
            }]
        } else {
            vec![]
        };
        Ok(ScanResponse {
            request_id: request.request_id,
            success: true,
            data,
            error: None,
        })
    }
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    for &bars_per_day in &[100u32, 390] {
        let store = make_store(&["AAA", "BBB", "CCC"], 5, bars_per_day);
        let config = ReplayConfig::new(
            vec!["AAA".into(), "BBB".into(), "CCC".into()],
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 8).unwrap(),
            ExitStrategyConfig::fixed(1.0, 2.0),
        );
        group.bench_with_input(
            BenchmarkId::new("five_days_three_tickers", bars_per_day),
            &bars_per_day,
            |b, _| {
                b.iter(|| {
                    let mut scanner = PeriodicScanner;
                    let result =
                        run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();
                    black_box(result.ledger.trade_count())
                })
            },
        );
    }
    group.finish();
}

fn bench_view(c: &mut Criterion) {
    let store = make_store(&["AAA"], 1, 390);
    let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    c.bench_function("point_in_time_view", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for m in 0..390i64 {
                let view = PointInTimeView::new(&store, m * 60_000);
                total += view.session("AAA", day).len();
            }
            black_box(total)
        })
    });
}

fn bench_indicators(c: &mut Criterion) {
    let store = make_store(&["AAA"], 1, 390);
    let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let session = store.session("AAA", day).to_vec();
    let atr = Atr::new(14);
    let vwap = Vwap::new();
    c.bench_function("atr_session", |b| {
        b.iter(|| black_box(atr.compute(black_box(&session))))
    });
    c.bench_function("vwap_session", |b| {
        b.iter(|| black_box(vwap.compute(black_box(&session))))
    });
}

criterion_group!(benches, bench_replay, bench_view, bench_indicators);
criterion_main!(benches);
