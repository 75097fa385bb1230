//! Benchmarks for the recycling sweep and per-frame CPU work.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spindrift::prelude::*;

fn pool(capacity: usize, lifetime: f32) -> ParticlePool {
    let profile = EmissionProfile::spherical_shell(0.25, RadialDistribution::Sqrt)
        .with_time_jitter(0.1);
    ParticlePool::new(capacity, profile, Vec3::ZERO, lifetime, 42)
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for capacity in [1_000usize, 10_000, 100_000] {
        // Steady state: a 60 fps step expires about 1/90 of a 1.5 s pool
        group.bench_with_input(BenchmarkId::new("steady", capacity), &capacity, |b, &cap| {
            let mut pool = pool(cap, 1.5);
            let mut t = 0.0f64;
            b.iter(|| {
                t += 1.0 / 60.0;
                black_box(pool.sweep(t))
            })
        });

        // Worst case: every slot respawns
        group.bench_with_input(BenchmarkId::new("all_expired", capacity), &capacity, |b, &cap| {
            let mut pool = pool(cap, 0.001);
            let mut t = 0.0f64;
            b.iter(|| {
                t += 1.0;
                black_box(pool.sweep(t))
            })
        });
    }

    group.finish();
}

fn bench_effect_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("effect_frame");

    for kind in [EffectKind::Rain, EffectKind::ImpulseTrail] {
        group.bench_function(kind.name(), |b| {
            let mut host = EffectHost::with_config(kind, EffectConfig::new().with_seed(7));
            let mut t = 0.0f64;
            b.iter(|| {
                t += 1.0 / 60.0;
                let angle = t as f32;
                let report = host.frame(t, Some(Vec3::new(angle.sin(), angle.cos(), 0.0)));
                let bytes = host.active().parameter_bindings().to_bytes();
                host.active_mut().clear_dirty();
                black_box((report, bytes))
            })
        });
    }

    group.finish();
}

fn bench_motion_wgsl(c: &mut Criterion) {
    let trail = ImpulseTrail::new(EffectConfig::new().with_capacity(16).with_seed(1));
    c.bench_function("impulse_trail_wgsl", |b| b.iter(|| black_box(trail.motion_wgsl())));
}

criterion_group!(benches, bench_sweep, bench_effect_frame, bench_motion_wgsl);
criterion_main!(benches);
