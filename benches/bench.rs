// Criterion benchmarks for Lume Pulse

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lume_pulse::core::{Badge, BadgeBoard, CoordinatorContext, NoopSink, ToggleRegistry};
use lume_pulse::models::Session;
use lume_pulse::services::{CacheManager, MemoryStore};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_badge_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("badge_rendering");

    for count in [0u32, 5, 99, 150, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("pulse", count), count, |b, &count| {
            b.iter(|| Badge::pulse(black_box(count)).map(|badge| badge.to_html()));
        });
        group.bench_with_input(BenchmarkId::new("unread", count), count, |b, &count| {
            b.iter(|| Badge::unread(black_box(count)).map(|badge| badge.to_html()));
        });
    }

    group.finish();
}

fn bench_badge_redraw(c: &mut Criterion) {
    c.bench_function("badge_board_redraw", |b| {
        let mut board = BadgeBoard::default();
        b.iter(|| {
            board.redraw_pulse(black_box(42));
            board.redraw_unread(black_box(120));
        });
    });
}

fn bench_toggle_registry(c: &mut Criterion) {
    let registry = ToggleRegistry::new();
    c.bench_function("toggle_registry_begin_rollback", |b| {
        b.iter(|| {
            let pending = registry.begin(black_box("u1"), black_box("u2")).unwrap();
            pending.rollback()
        });
    });
}

fn bench_toggle_favorite(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("toggle_favorite");

    for targets in [1usize, 100, 1000].iter() {
        let store = Arc::new(MemoryStore::new());
        let ctx = CoordinatorContext::new(store, Arc::new(CacheManager::in_memory(10_000, 300)));
        let coordinator = ctx.coordinator(Session::new("bench_user"), Arc::new(NoopSink));
        let ids: Vec<String> = (0..*targets).map(|i| format!("target_{}", i)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(targets), &ids, |b, ids| {
            b.iter(|| {
                rt.block_on(async {
                    for id in ids {
                        coordinator.toggle_favorite(black_box(id)).await.unwrap();
                    }
                })
            });
        });
    }

    group.finish();
}

fn bench_mutual_match(c: &mut Criterion) {
    let rt = runtime();
    let store = Arc::new(MemoryStore::new());
    let ctx = CoordinatorContext::new(store, Arc::new(CacheManager::in_memory(10_000, 300)));
    let liker = ctx.coordinator(Session::new("u1"), Arc::new(NoopSink));
    let closer = ctx.coordinator(Session::new("u2"), Arc::new(NoopSink));

    rt.block_on(liker.toggle_favorite("u2")).unwrap();

    // Each iteration likes (closing the match) then unlikes again
    c.bench_function("mutual_match_close_and_undo", |b| {
        b.iter(|| {
            rt.block_on(async {
                closer.toggle_favorite("u1").await.unwrap();
                closer.toggle_favorite("u1").await.unwrap();
            })
        });
    });
}

criterion_group!(
    benches,
    bench_badge_rendering,
    bench_badge_redraw,
    bench_toggle_registry,
    bench_toggle_favorite,
    bench_mutual_match
);

criterion_main!(benches);
