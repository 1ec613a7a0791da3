// ABOUTME: Criterion benchmarks for recommendation routing and chain planning
// ABOUTME: Runs the in-memory coach service over the bundled demo catalog
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Criterion benchmarks for the recommendation engines.
//!
//! Measures a full hybrid routing pass (cache bypassed by moving the clock
//! past the staleness window) and plan construction at several lengths.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use chrono::{DateTime, Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pierre_coach::catalog::CatalogFixture;
use pierre_coach::config::CoachConfig;
use pierre_coach::models::{InteractionEvent, InteractionKind, ItemId, MuscleGroup, Scenario};
use pierre_coach::service::CoachService;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use uuid::Uuid;

const WARM_HISTORY: [u64; 8] = [1, 2, 6, 11, 14, 17, 20, 25];

fn demo_service(rt: &Runtime) -> CoachService {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/catalog.json");
    rt.block_on(async {
        let fixture = CatalogFixture::from_path(path).await.unwrap();
        let mut config = CoachConfig::default();
        config.models.weights_dir = std::env::temp_dir().join("pierre-coach-bench-no-weights");
        CoachService::from_fixture(config, &fixture, Some(42))
            .await
            .unwrap()
    })
}

fn warm_user(rt: &Runtime, service: &CoachService, start: DateTime<Utc>) -> Uuid {
    let user = Uuid::new_v4();
    rt.block_on(async {
        for (id, minutes) in WARM_HISTORY.iter().zip(0i64..) {
            service
                .record_interaction(
                    InteractionEvent::new(user, ItemId(*id), InteractionKind::Finish)
                        .at(start + Duration::minutes(minutes)),
                )
                .await
                .unwrap();
        }
    });
    user
}

fn bench_router(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = demo_service(&rt);
    let start = Utc::now() - Duration::days(3);
    let warm = warm_user(&rt, &service, start);
    let mut group = c.benchmark_group("router");

    for scenario in [Scenario::Default, Scenario::Discovery, Scenario::DailyPlan] {
        group.bench_with_input(
            BenchmarkId::new("recompute", scenario),
            &scenario,
            |b, scenario| {
                let mut tick = 0_i64;
                b.iter(|| {
                    tick += 1;
                    let now = Utc::now() + Duration::hours(7 * tick);
                    rt.block_on(async {
                        service
                            .get_recommendations_at(black_box(warm), *scenario, 10, now)
                            .await
                            .unwrap()
                    })
                });
            },
        );
    }

    group.bench_function("cached", |b| {
        let now = Utc::now();
        rt.block_on(async {
            service
                .get_recommendations_at(warm, Scenario::Default, 10, now)
                .await
                .unwrap()
        });
        b.iter(|| {
            rt.block_on(async {
                service
                    .get_recommendations_at(black_box(warm), Scenario::Default, 10, now)
                    .await
                    .unwrap()
            })
        });
    });

    group.bench_function("cold_start", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .get_recommendations(black_box(Uuid::new_v4()), Scenario::Default, Some(10))
                    .await
                    .unwrap()
            })
        });
    });

    group.finish();
}

fn bench_planner(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = demo_service(&rt);
    let mut group = c.benchmark_group("planner");

    for length in [3_usize, 5, 8] {
        group.bench_with_input(BenchmarkId::new("build_plan", length), &length, |b, length| {
            b.iter(|| {
                rt.block_on(async {
                    service
                        .build_plan(black_box("squat"), 3, MuscleGroup::Legs, Some(*length))
                        .await
                        .unwrap()
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_router, bench_planner);
criterion_main!(benches);
