//! Tab churn benchmark suite.
//!
//! Runs against the in-memory backend:
//! - open then close N tabs
//! - snapshot-clone the active tab
//! - project the menu for N tabs
//!
//! Run with: cargo bench --bench tab_churn
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use tab_shell::view::memory::MemoryBackend;
use tab_shell::{CloneStrategy, MenuProjector, ShellOptions, TabManager, TabMode};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const TAB_COUNTS: &[usize] = &[10, 100, 500];

const PAGE: &str = "https://bench.test/";

const MARKUP: &str = "<html><head><title>Bench</title></head>\
    <body><form><input name=\"q\" value=\"draft\"></form></body></html>";

fn backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_resource(PAGE, MARKUP);
    backend
}

fn manager_on(backend: &Arc<MemoryBackend>) -> TabManager {
    TabManager::new(backend.window(), backend.clone(), ShellOptions::new())
}

fn manager() -> TabManager {
    manager_on(&backend())
}

// ============================================================================
// Benchmark: Open and Close
// ============================================================================

fn bench_open_close(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("open_close");

    for &count in TAB_COUNTS {
        group.bench_with_input(BenchmarkId::new("tabs", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| async move {
                let manager = manager();
                for _ in 0..count {
                    manager
                        .create_tab(PAGE, TabMode::Headful)
                        .await
                        .expect("create");
                }
                manager.close_all_tabs();
                black_box(manager.tab_count())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Snapshot Clone
// ============================================================================

fn bench_full_clone(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let backend = backend();
    let manager = rt.block_on(async {
        let manager = manager_on(&backend);
        manager
            .create_tab(PAGE, TabMode::Headful)
            .await
            .expect("create");
        manager
    });

    c.bench_function("full_clone", |b| {
        b.to_async(&rt).iter(|| async {
            let clone = manager
                .duplicate_tab(CloneStrategy::Full)
                .await
                .expect("clone");
            manager.remove_active_tab();
            backend.prune_destroyed();
            black_box(clone)
        });
    });
}

// ============================================================================
// Benchmark: Menu Projection
// ============================================================================

fn bench_menu_projection(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("menu_projection");

    for &count in TAB_COUNTS {
        let snapshot = rt.block_on(async {
            let manager = manager();
            for _ in 0..count {
                manager
                    .create_tab(PAGE, TabMode::Headful)
                    .await
                    .expect("create");
            }
            manager.snapshot()
        });

        group.bench_with_input(BenchmarkId::new("tabs", count), &snapshot, |b, snapshot| {
            b.iter(|| black_box(MenuProjector::build(snapshot)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_open_close, bench_full_clone, bench_menu_projection);
criterion_main!(benches);
