//! Direct vs Barnes–Hut gravity, and full integrator steps, across system sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use grav::{gravity_for, advance, Body, Engine, IntegratorKind, NVec3, Parameters, SimulationState, Workspace};

/// Deterministic cloud of `n` unit masses, no rand needed
fn make_system(n: usize, engine: Engine) -> SimulationState {
    let bodies = (0..n)
        .map(|i| {
            let i_f = i as f64;
            let x = NVec3::new(
                (i_f * 0.37).sin() * 5.0,
                (i_f * 0.13).cos() * 5.0,
                (i_f * 0.07).sin() * 5.0,
            );
            Body::new(format!("body-{i}"), 1.0, x, NVec3::zeros())
        })
        .collect();

    let parameters = Parameters {
        dt: 0.001,
        G: 0.1,
        eps: 1e-2,
        t_end: None,
    };
    SimulationState::new(bodies, parameters, engine)
}

fn engine(barnes_hut: bool, integrator: IntegratorKind) -> Engine {
    Engine {
        integrator,
        barnes_hut,
        theta: 0.7,
    }
}

fn bench_gravity(c: &mut Criterion) {
    let mut group = c.benchmark_group("gravity");

    for n in [200usize, 800, 3200] {
        for (label, bh) in [("direct", false), ("barnes_hut", true)] {
            let sys = make_system(n, engine(bh, IntegratorKind::Leapfrog));
            let mut forces = gravity_for(&sys.parameters, &sys.engine);
            let mut out = vec![NVec3::zeros(); n];

            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, _| {
                b.iter(|| forces.accumulate_accels(&sys.bodies, &mut out));
            });
        }
    }

    group.finish();
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    group.sample_size(20);

    let n = 800;
    for integrator in [IntegratorKind::Leapfrog, IntegratorKind::Rk4] {
        for (label, bh) in [("direct", false), ("barnes_hut", true)] {
            let mut sys = make_system(n, engine(bh, integrator));
            let mut forces = gravity_for(&sys.parameters, &sys.engine);
            let mut ws = Workspace::new();

            group.bench_function(BenchmarkId::new(format!("{integrator}/{label}"), n), |b| {
                b.iter(|| advance(&mut sys, &mut forces, &mut ws));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_gravity, bench_step);
criterion_main!(benches);
