// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Benches panic on failure

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rclcore::{Context, EnvConfig, QosProfile};
use std::sync::Arc;
use std::time::Duration;

fn context(domain_id: u32) -> Context {
    let config = EnvConfig {
        domain_id,
        ..EnvConfig::default()
    };
    Context::with_config(config).unwrap()
}

// ============================================================================
// WaitSet Benchmarks
// ============================================================================

/// Benchmark: refill + poll with one triggered guard among N.
/// Steady state: sizes unchanged between waits, no resize.
fn bench_wait_one_ready(c: &mut Criterion) {
    let mut group = c.benchmark_group("wait_one_ready");
    for count in [1usize, 16, 256] {
        let ctx = context(9601);
        let guards: Vec<_> = (0..count)
            .map(|_| ctx.create_guard_condition(|| {}).unwrap())
            .collect();
        let mut wait_set = ctx.create_wait_set().unwrap();
        for guard in &guards {
            wait_set.add_guard_condition(Arc::clone(guard)).unwrap();
        }
        let last = Arc::clone(&guards[count - 1]);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                last.trigger().unwrap();
                let result = wait_set.wait(Some(Duration::ZERO)).unwrap();
                black_box(result.ready_guard_conditions().unwrap().len())
            })
        });
    }
    group.finish();
}

/// Benchmark: call_async + serve + try_process on one thread.
fn bench_call_round_trip(c: &mut Criterion) {
    let ctx = context(9602);
    let node = ctx.create_node("bench", "/").unwrap();
    let server = node
        .create_service::<i64, i64, _>("/bench_inc", QosProfile::services_default(), |x| x + 1)
        .unwrap();
    let client = node
        .create_client::<i64, i64>("/bench_inc", QosProfile::services_default())
        .unwrap();
    let mut wait_set = ctx.create_wait_set().unwrap();
    wait_set.add_service(server).unwrap();
    wait_set.add_client(client.clone()).unwrap();

    c.bench_function("call_round_trip", |b| {
        b.iter(|| {
            let mut future = client.call_async(black_box(&1)).unwrap();
            loop {
                if let Some(response) = future.try_result() {
                    break black_box(response.unwrap());
                }
                let result = wait_set.wait(Some(Duration::from_secs(1))).unwrap();
                result.ready().unwrap().process_all().unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_wait_one_ready, bench_call_round_trip);
criterion_main!(benches);
