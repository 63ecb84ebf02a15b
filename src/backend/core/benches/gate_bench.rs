//! Benchmarks for permission resolution and the authorization gate.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lectern_core::rbac::{
    AccessRequest, Operation, PrivilegedUser, ProjectSlug, ResourceId, User, UserKind,
    VisibilityOptions,
};
use lectern_core::AccessEngine;

fn user(roles: &[&str]) -> User {
    PrivilegedUser::new("bench", UserKind::Standard)
        .with_roles(roles.iter().copied())
        .with_current_project(ProjectSlug::Alpha)
        .into()
}

fn bench_resolve(c: &mut Criterion) {
    let engine = AccessEngine::builtin().unwrap();
    let mut group = c.benchmark_group("resolve");
    let assignments: [&[&str]; 3] = [
        &["viewer"],
        &["alpha", "editor", "translator"],
        &[
            "alpha", "beta", "gamma", "alpha-manager", "beta-manager", "gamma-manager", "editor",
            "translator", "viewer",
        ],
    ];
    for roles in assignments {
        let u = user(roles);
        group.throughput(Throughput::Elements(roles.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(roles.len()), &u, |b, u| {
            b.iter(|| black_box(engine.resolve(u)));
        });
    }
    group.finish();
}

fn bench_gate(c: &mut Criterion) {
    let engine = AccessEngine::builtin().unwrap();
    let gate = engine.gate();
    let mut group = c.benchmark_group("gate");

    let uncached = user(&["alpha", "editor"]);
    let cached = gate.cache().materialize(uncached.clone());
    let admin: User = PrivilegedUser::new("root", UserKind::Admin).into();

    group.bench_function("admin", |b| {
        b.iter(|| {
            let granted =
                gate.has_permission(Some(&admin), ResourceId::Settings, Operation::Delete, None);
            black_box(granted)
        });
    });
    group.bench_function("cached", |b| {
        b.iter(|| {
            let granted =
                gate.has_permission(Some(&cached), ResourceId::Articles, Operation::Update, None);
            black_box(granted)
        });
    });
    group.bench_function("uncached", |b| {
        b.iter(|| {
            let granted =
                gate.has_permission(Some(&uncached), ResourceId::Articles, Operation::Update, None);
            black_box(granted)
        });
    });

    let translator: User = PrivilegedUser::new("t", UserKind::Standard)
        .with_locale_roles("fr", ["translator"])
        .with_locale_roles("de", ["viewer"])
        .into();
    let request = AccessRequest::new(ResourceId::Articles, Operation::Translate).with_locale("fr");
    group.bench_function("translate_per_locale", |b| {
        b.iter(|| black_box(gate.has_permission_in(Some(&translator), &request)));
    });
    group.finish();
}

fn bench_visibility(c: &mut Criterion) {
    let engine = AccessEngine::builtin().unwrap();
    let cached = engine.gate().cache().materialize(user(&["alpha"]));
    let hidden = engine.visibility().hidden_predicate(
        ResourceId::Pages,
        vec![ProjectSlug::Alpha, ProjectSlug::Beta],
        VisibilityOptions::default(),
    );

    c.bench_function("visibility_is_hidden", |b| {
        b.iter(|| black_box(hidden(Some(&cached))));
    });
}

criterion_group!(benches, bench_resolve, bench_gate, bench_visibility);
criterion_main!(benches);
