use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;

use salesdesk_core::TransactionId;
use salesdesk_forecast::{
    ApprovedLine, ApprovedTransaction, MissingProductPolicy, ProductFacts, SalesForecastAggregator,
};

const REGIONS: [&str; 4] = ["CENTRAL", "EAST_COAST", "SOUTH", "NORTH"];
const CATEGORIES: [&str; 4] = ["Product", "Gold", "Organic", "Straight"];

/// Deterministic synthetic feed: `count` transactions with 1-5 lines each.
fn synthetic_feed(count: usize) -> Vec<ApprovedTransaction> {
    (0..count)
        .map(|i| ApprovedTransaction {
            transaction_id: TransactionId::new(i as i64 + 1),
            region_code: REGIONS[i % REGIONS.len()].to_string(),
            lines: (0..(i % 5) + 1)
                .map(|j| ApprovedLine {
                    product_code: format!("P-{j:03}"),
                    product: Some(ProductFacts {
                        category: CATEGORIES[(i + j) % CATEGORIES.len()].to_string(),
                        base_uom: if j % 2 == 0 { "MT" } else { "BAG" }.to_string(),
                    }),
                    quantity: Decimal::new((i * 7 + j) as i64 % 1_000 + 1, 1),
                    unit_price: Decimal::new((j as i64 + 1) * 12_50, 2),
                })
                .collect(),
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let aggregator = SalesForecastAggregator::new();

    for size in [100usize, 1_000, 10_000] {
        let feed = synthetic_feed(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &feed, |b, feed| {
            b.iter(|| aggregator.aggregate(black_box(feed)))
        });
    }

    group.finish();
}

fn bench_skip_policy(c: &mut Criterion) {
    let mut feed = synthetic_feed(1_000);
    for tx in feed.iter_mut().step_by(10) {
        if let Some(line) = tx.lines.first_mut() {
            line.product = None;
        }
    }
    let aggregator =
        SalesForecastAggregator::new().with_missing_product_policy(MissingProductPolicy::Skip);

    c.bench_function("aggregate_with_skipped_lines", |b| {
        b.iter(|| aggregator.aggregate(black_box(&feed)))
    });
}

criterion_group!(benches, bench_aggregate, bench_skip_policy);
criterion_main!(benches);
