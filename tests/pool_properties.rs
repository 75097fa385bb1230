//! Lifecycle properties of particle pools and the effects built on them.

use spindrift::prelude::*;
use spindrift::{SweepReport, TIME_EPOCH_STEP};

fn shell_pool(capacity: usize, lifetime: f32, radius: f32, seed: u64) -> ParticlePool {
    let profile = EmissionProfile::spherical_shell(radius, RadialDistribution::Sqrt)
        .with_time_jitter(0.3);
    ParticlePool::new(capacity, profile, Vec3::ZERO, lifetime, seed)
}

fn assert_ages_bounded(pool: &ParticlePool, now: f64) {
    for i in 0..pool.capacity() {
        let age = pool.age(i, now).unwrap();
        assert!(age < f64::from(pool.lifetime()), "slot {} has age {} at t={}", i, age, now);
    }
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_age_stays_below_lifetime_over_many_lifetimes() {
    let mut pool = shell_pool(500, 0.7, 0.1, 1);
    let mut t = 0.0;
    for _ in 0..400 {
        t += 0.033;
        pool.sweep(t);
        assert_ages_bounded(&pool, t);
    }
}

#[test]
fn test_age_bound_with_large_steps() {
    let mut pool = shell_pool(200, 0.5, 0.1, 2);
    for t in [0.0, 3.0, 3.1, 50.0, 50.0, 1000.0] {
        pool.sweep(t);
        assert_ages_bounded(&pool, t);
    }
}

#[test]
fn test_short_lifetimes_keep_recycling_after_long_uptime() {
    let mut pool = shell_pool(300, 0.05, 0.1, 5);
    let mut t = 1.0e6;
    for _ in 0..120 {
        t += 1.0 / 60.0;
        pool.sweep(t);
        assert_ages_bounded(&pool, t);
    }
    // Uploaded start times stay within one epoch step of the bound uTime
    let now = pool.relative_time(t);
    assert!(now < TIME_EPOCH_STEP as f32);
    for start in pool.attributes().relative_start_times() {
        assert!((now - start) < 0.05 + 1e-3, "start {} at uTime {}", start, now);
    }
}

#[test]
fn test_capacity_never_changes() {
    let mut trail = ImpulseTrail::new(EffectConfig::new().with_capacity(300).with_seed(3));
    for step in 0..200 {
        let t = f64::from(step) * 0.05;
        let angle = t as f32;
        trail.set_target(Vec3::new(angle.sin(), angle.cos(), 0.0));
        trail.advance(t);
        assert_eq!(trail.pool().capacity(), 300);
        assert_eq!(trail.pool().attributes().start_times().len(), 300);
        assert_eq!(trail.pool().attributes().spawn_origins().len(), 300);
    }
}

#[test]
fn test_respawn_start_time_is_within_one_lifetime() {
    let mut pool = shell_pool(400, 1.0, 0.1, 4);
    let before = pool.attributes().start_times().to_vec();
    let t = 0.6;
    pool.sweep(t);

    let mut respawned = 0;
    for (old, new) in before.iter().zip(pool.attributes().start_times()) {
        if old != new {
            assert!(
                *new >= t && *new < t + f64::from(pool.lifetime()),
                "start {} at t={}",
                new,
                t
            );
            respawned += 1;
        }
    }
    assert!(respawned > 0);
}

#[test]
fn test_fixed_seed_is_deterministic() {
    let run = |seed| {
        let mut pool = shell_pool(256, 0.4, 1.0, seed);
        for step in 1..50 {
            if step == 20 {
                pool.set_emitter_position(Vec3::new(3.0, 0.0, 1.0));
            }
            pool.sweep(f64::from(step) * 0.1);
        }
        (
            pool.attributes().start_times().to_vec(),
            pool.attributes().spawn_origins().to_vec(),
        )
    };

    assert_eq!(run(99), run(99));
    assert_ne!(run(99), run(100));
}

#[test]
fn test_target_then_advance_respawns_near_target() {
    let mut trail = ImpulseTrail::new(EffectConfig::new().with_capacity(200).with_seed(5));
    let target = Vec3::new(2.0, -1.0, 0.5);

    // Target first, then a step past one lifetime: every respawn sees it.
    trail.set_target(target);
    trail.advance(2.0);

    let radius = trail.params().spawn_radius;
    for origin in trail.pool().attributes().spawn_origins() {
        assert!(origin.distance(target) <= radius + 1e-5);
    }
}

#[test]
fn test_prev_spawn_origin_holds_the_old_origin() {
    let mut pool = shell_pool(50, 1.0, 0.0, 6);
    pool.set_emitter_position(Vec3::X);
    pool.sweep(5.0);
    pool.set_emitter_position(Vec3::Y);
    pool.sweep(10.0);

    let a = pool.attributes();
    for i in 0..pool.capacity() {
        assert_eq!(a.prev_spawn_origin(i).unwrap(), Vec3::X);
        assert_eq!(a.spawn_origin(i).unwrap(), Vec3::Y);
    }
}

#[test]
fn test_dirty_only_when_something_respawned() {
    let mut pool = shell_pool(100, 2.0, 0.1, 7);
    pool.clear_dirty();

    // Youngest-first offsets: nothing expires in the first few milliseconds
    let quiet = pool.sweep(0.001);
    assert_eq!(quiet, SweepReport { respawned: 0, skipped: false });
    assert!(!pool.attributes().dirty().any());

    let busy = pool.sweep(1.0);
    assert!(busy.respawned > 0);
    assert!(pool.attributes().dirty().any());
}

#[test]
fn test_zero_radius_spawns_on_the_emitter() {
    let mut pool = shell_pool(64, 0.2, 0.0, 8);
    let emitter = Vec3::new(-4.0, 2.0, 9.0);
    pool.set_emitter_position(emitter);
    pool.sweep(1.0);
    assert!(pool.attributes().spawn_origins().iter().all(|o| *o == emitter));
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_tight_emitter_after_one_lifetime() {
    let mut pool = shell_pool(1000, 0.5, 0.05, 10);
    pool.set_emitter_position(Vec3::ZERO);
    pool.sweep(0.6);

    let a = pool.attributes();
    assert!(a.start_times().iter().all(|s| *s > 0.0));
    assert!(a.spawn_origins().iter().all(|o| o.length() <= 0.05 + 1e-6));
}

#[test]
fn test_scenario_tight_emitter_through_impulse_trail() {
    let mut trail = ImpulseTrail::new(EffectConfig::new().with_capacity(1000).with_seed(10));
    trail.update_params(|p| {
        p.set_lifetime(0.5).set_spawn_radius(0.05);
    });
    trail.set_target(Vec3::ZERO);
    trail.advance(0.6);

    let a = trail.pool().attributes();
    assert!(a.start_times().iter().all(|s| *s > 0.0));
    assert!(a.spawn_origins().iter().all(|o| o.length() <= 0.05 + 1e-6));
}

#[test]
fn test_scenario_single_particle_boundary() {
    let mut pool = shell_pool(1, 1.0, 0.1, 11);

    pool.sweep(0.0);
    let start = pool.attributes().start_time(0).unwrap();
    assert_eq!(start, 0.0);

    pool.sweep(0.999);
    assert_eq!(pool.attributes().start_time(0).unwrap(), start);

    pool.sweep(1.0);
    assert_ne!(pool.attributes().start_time(0).unwrap(), start);
}

#[test]
fn test_lowering_lifetime_expires_older_particles_next_sweep() {
    let mut rain = Rain::new(EffectConfig::new().with_capacity(400).with_seed(12));
    rain.advance(1.0);
    rain.set_parameter("uLifetime", UniformValue::F32(0.5)).unwrap();
    rain.advance(1.0);
    assert_ages_bounded(rain.pool(), 1.0);
}
