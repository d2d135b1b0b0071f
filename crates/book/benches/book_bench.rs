//! Benchmarks for `PriceLevelBook` and `TrackedBook` operations using criterion.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;

use lob_book::{PriceLevelBook, TrackedBook};
use lob_core::types::{OrderId, Precision, Side, Symbol};

fn precision() -> Precision {
    Precision::new(2, 8).unwrap()
}

/// Build a pre-populated book with `n` levels on each side.
fn populated_book(n: usize) -> PriceLevelBook {
    let bids: Vec<(String, String)> = (0..n)
        .map(|i| {
            (
                format!("{:.2}", 50000.0 - i as f64),
                format!("{:.8}", 0.001 + i as f64 * 0.00001),
            )
        })
        .collect();

    let asks: Vec<(String, String)> = (0..n)
        .map(|i| {
            (
                format!("{:.2}", 50001.0 + i as f64),
                format!("{:.8}", 0.001 + i as f64 * 0.00001),
            )
        })
        .collect();

    PriceLevelBook::from_levels(0, &bids, &asks, precision()).unwrap()
}

fn bench_apply_delta(c: &mut Criterion) {
    let book = populated_book(100);
    let mut sequence = 1u64;

    // Typical batch: 5 levels, one of them a delete
    let bids = [
        ("49995.00", "0.00150000"),
        ("49996.00", "0.00160000"),
        ("49997.00", "0"),
        ("49998.00", "0.00180000"),
        ("49999.00", "0.00190000"),
    ];

    c.bench_function("apply_delta_5", |b| {
        b.iter(|| {
            sequence += 1;
            book.apply_delta(Side::Bid, black_box(&bids), sequence).unwrap();
        })
    });
}

fn bench_best_bid(c: &mut Criterion) {
    let book = populated_book(100);

    c.bench_function("best_bid", |b| {
        b.iter(|| {
            black_box(book.best_bid());
        })
    });
}

fn bench_depth_for(c: &mut Criterion) {
    let book = populated_book(100);

    c.bench_function("depth_for_bid", |b| {
        b.iter(|| {
            black_box(book.depth_for(Side::Bid, black_box(dec!(0.05)), None, 1).unwrap());
        })
    });
}

fn bench_encode_decode(c: &mut Criterion) {
    let book = populated_book(100);
    let text = book.encode(5);

    c.bench_function("encode_5", |b| {
        b.iter(|| {
            black_box(book.encode(5));
        })
    });

    c.bench_function("decode_5", |b| {
        b.iter(|| {
            black_box(PriceLevelBook::decode(black_box(&text), precision()).unwrap());
        })
    });
}

fn bench_tracked_insert_cancel(c: &mut Criterion) {
    let book: TrackedBook = TrackedBook::new(Symbol::new("BTCUSDT"), precision());
    for i in 0..100u64 {
        book.insert(OrderId(i), Side::Ask, &format!("{}.00", 50001 + i % 20), "0.001", String::new())
            .unwrap();
    }
    let mut next = 1_000u64;

    c.bench_function("tracked_insert_cancel", |b| {
        b.iter(|| {
            next += 1;
            book.insert(OrderId(next), Side::Bid, "49999.00", "0.001", String::new())
                .unwrap();
            black_box(book.best_bid());
            book.cancel(OrderId(next));
        })
    });
}

criterion_group!(
    benches,
    bench_apply_delta,
    bench_best_bid,
    bench_depth_for,
    bench_encode_decode,
    bench_tracked_insert_cancel,
);
criterion_main!(benches);
