//! 报告渲染基准测试
//!
//! 测试文本和HTML报告在不同目标数量下的渲染性能

use access_relay::config::Target;
use access_relay::probe::ProbeOutcome;
use access_relay::report::{ReportFormatter, ReportMode};
use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;

fn sample_outcomes(count: usize) -> Vec<ProbeOutcome> {
    (0..count)
        .map(|i| {
            let target = Target::new(
                format!("ACCESS_SITE_{i}"),
                format!("https://site-{i}.example.com/health?q=<{i}>"),
            );
            if i % 4 == 0 {
                ProbeOutcome::error(
                    &target,
                    "Request timeout after 30000ms".to_string(),
                    Duration::from_millis(30_000),
                )
            } else {
                ProbeOutcome::response(
                    &target,
                    200,
                    "OK".to_string(),
                    true,
                    true,
                    1024 * i as u64,
                    Duration::from_millis(40 + i as u64),
                )
            }
        })
        .collect()
}

fn report_formatting_benchmark(c: &mut Criterion) {
    let formatter = ReportFormatter::new();
    let generated_at = Utc::now();
    let mut group = c.benchmark_group("report_formatting");

    for count in [5usize, 50, 500] {
        let outcomes = sample_outcomes(count);

        group.bench_with_input(BenchmarkId::new("text", count), &outcomes, |b, outcomes| {
            b.iter(|| {
                let report = formatter
                    .format_at(black_box(outcomes), ReportMode::Text, generated_at)
                    .unwrap();
                black_box(report)
            });
        });

        group.bench_with_input(BenchmarkId::new("html", count), &outcomes, |b, outcomes| {
            b.iter(|| {
                let report = formatter
                    .format_at(black_box(outcomes), ReportMode::Html, generated_at)
                    .unwrap();
                black_box(report)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, report_formatting_benchmark);
criterion_main!(benches);
