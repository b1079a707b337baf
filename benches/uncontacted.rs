//! Benchmarks for conversation indexing and uncontacted resolution.
//!
//! Both run on every fan-out before any write, so they sit on the latency
//! path of an emergency alert.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use lifeline::models::{Conversation, EmergencyContact, Identity, canonicalize};
use lifeline::services::{ConversationIndex, resolve_uncontacted};

fn user() -> Identity {
    Identity::new("+923000000000").expect("identity")
}

fn conversations(n: usize) -> Vec<Conversation> {
    let user = user();
    (0..n)
        .map(|i| {
            let other = Identity::new(format!("+92301{i:07}")).expect("identity");
            Conversation::new(canonicalize(&user, &other).expect("key"))
        })
        .collect()
}

/// Half the contacts already have a conversation.
fn contacts(n: usize) -> Vec<EmergencyContact> {
    (0..n)
        .map(|i| {
            let prefix = if i % 2 == 0 { "+92301" } else { "+92302" };
            EmergencyContact::new(user(), format!("{prefix}{i:07}"))
        })
        .collect()
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversation_index");
    group.measurement_time(Duration::from_secs(5));

    for size in [10, 100, 1_000, 10_000] {
        let convos = conversations(size);
        let user = user();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("build", size), &convos, |b, convos| {
            b.iter(|| ConversationIndex::build(black_box(&user), black_box(convos)));
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontacted");

    for size in [10, 100, 1_000] {
        let index = ConversationIndex::build(&user(), &conversations(size));
        let list = contacts(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("resolve", size), &list, |b, list| {
            b.iter(|| resolve_uncontacted(black_box(list), black_box(&index)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_index_build, bench_resolve);
criterion_main!(benches);
