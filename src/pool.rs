//! Fixed-capacity particle pool with age-based recycling.
//!
//! Every slot cycles through the same states:
//!
//! ```text
//! Spawned ──► Aging ──► Expired ──► Spawned (respawn)
//! ```
//!
//! - **Spawned**: `startTime` is assigned. At construction the pool uses
//!   stratified offsets `k·lifetime/capacity`, randomly permuted over the
//!   slots, so particles start mid-life and expire evenly instead of all at
//!   once. On respawn the start time is `now + jitter·lifetime`.
//! - **Aging**: nothing is written. The rendering stage computes the moving
//!   position from `(now − startTime)`, `spawnOrigin` and the effect's motion
//!   parameters.
//! - **Expired**: `now − startTime ≥ lifetime`, detected by [`ParticlePool::sweep`].
//! - **Respawn**: `prevSpawnOrigin ← spawnOrigin`, then a new origin is drawn
//!   from the [`EmissionProfile`] around the current emitter position.
//!
//! The sweep is a single O(capacity) pass with one age comparison per slot and
//! no allocation. Dirty flags are raised once, and only if a slot changed.
//!
//! Time is `f64` seconds throughout. The pool keeps the buffer's time epoch
//! on a multiple of [`TIME_EPOCH_STEP`] at or below the current time, so the
//! `f32` values handed to shaders ([`ParticlePool::relative_time`] and the
//! uploaded start times) stay within a few thousand seconds of zero.
//!
//! # Example
//!
//! ```ignore
//! let profile = EmissionProfile::spherical_shell(0.05, RadialDistribution::Sqrt);
//! let mut pool = ParticlePool::new(1000, profile, Vec3::ZERO, 0.5, 42);
//!
//! pool.set_emitter_position(Vec3::new(1.0, 0.0, 0.0));
//! let report = pool.sweep(0.6);
//! assert_eq!(report.respawned, 1000);
//! ```

use crate::attributes::AttributeBuffer;
use crate::emission::EmissionProfile;
use crate::error::EffectError;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Smallest lifetime a pool accepts, in seconds.
pub const MIN_LIFETIME: f32 = 1.0e-3;

/// Spacing of time epochs, in seconds.
pub const TIME_EPOCH_STEP: f64 = 1024.0;

/// Outcome of one recycling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Slots that expired and were respawned.
    pub respawned: usize,
    /// The pass was skipped because time went backwards.
    pub skipped: bool,
}

/// Fixed-capacity, recycled particle storage plus its emission policy.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    attributes: AttributeBuffer,
    profile: EmissionProfile,
    emitter: Vec3,
    lifetime: f32,
    rng: SmallRng,
    last_time: Option<f64>,
}

impl ParticlePool {
    /// Build a pool whose clock starts at `0.0`.
    ///
    /// See [`ParticlePool::starting_at`].
    pub fn new(
        capacity: usize,
        profile: EmissionProfile,
        emitter: Vec3,
        lifetime: f32,
        seed: u64,
    ) -> Self {
        Self::starting_at(capacity, profile, emitter, lifetime, seed, 0.0)
    }

    /// Build a pool and spawn every slot as of time `now`.
    ///
    /// Sizes are drawn once here and never again. Start times are
    /// `now − offset` with offsets covering `[0, lifetime)` evenly in random
    /// slot order.
    pub fn starting_at(
        capacity: usize,
        profile: EmissionProfile,
        emitter: Vec3,
        lifetime: f32,
        seed: u64,
        now: f64,
    ) -> Self {
        let lifetime = sanitize_lifetime(lifetime);
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut attributes = AttributeBuffer::new(capacity);
        if now.is_finite() {
            attributes.rebase(epoch_for(now));
        }

        let mut offsets: Vec<f64> = (0..capacity)
            .map(|k| f64::from(lifetime) * k as f64 / capacity as f64)
            .collect();
        offsets.shuffle(&mut rng);

        for (index, offset) in offsets.into_iter().enumerate() {
            let emission = profile.sample(&mut rng);
            attributes.spawn_slot(
                index,
                emitter + emission.offset,
                now - offset,
                emission.size,
                emission.velocity,
                emission.angle,
            );
        }

        log::debug!(
            "particle pool: {} slots, lifetime {:.3}s, seed {}",
            capacity,
            lifetime,
            seed
        );

        Self {
            attributes,
            profile,
            emitter,
            lifetime,
            rng,
            last_time: None,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.attributes.capacity()
    }

    #[inline]
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    /// Change the lifetime. Slots already older than the new value respawn
    /// on the very next sweep.
    pub fn set_lifetime(&mut self, lifetime: f32) {
        self.lifetime = sanitize_lifetime(lifetime);
    }

    #[inline]
    pub fn emitter_position(&self) -> Vec3 {
        self.emitter
    }

    /// Move the emitter. Applies to every respawn from the next sweep on.
    pub fn set_emitter_position(&mut self, position: Vec3) {
        self.emitter = position;
    }

    pub fn profile(&self) -> &EmissionProfile {
        &self.profile
    }

    /// Change the spread radius of the profile (point and spherical shapes).
    pub fn set_spawn_radius(&mut self, radius: f32) {
        self.profile.set_radius(radius);
    }

    pub fn attributes(&self) -> &AttributeBuffer {
        &self.attributes
    }

    /// Forget pending attribute changes after an upload.
    pub fn clear_dirty(&mut self) {
        self.attributes.clear_dirty();
    }

    /// Time passed to the last completed sweep.
    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }

    /// Absolute time the uploaded start times are measured from.
    pub fn time_epoch(&self) -> f64 {
        self.attributes.time_epoch()
    }

    /// `now` as shaders see it: seconds since the time epoch.
    pub fn relative_time(&self, now: f64) -> f32 {
        (now - self.attributes.time_epoch()) as f32
    }

    /// Age of one slot at time `now`. Negative while a respawn delay runs.
    pub fn age(&self, index: usize, now: f64) -> Result<f64, EffectError> {
        Ok(now - self.attributes.start_time(index)?)
    }

    /// Whether the slot has reached its lifetime at time `now`.
    pub fn is_expired(&self, index: usize, now: f64) -> Result<bool, EffectError> {
        Ok(self.age(index, now)? >= f64::from(self.lifetime))
    }

    /// Run one recycling pass at time `now`.
    ///
    /// Afterwards every slot satisfies `now − startTime < lifetime`. A `now`
    /// earlier than the previous sweep, or not finite, is ignored.
    pub fn sweep(&mut self, now: f64) -> SweepReport {
        if !now.is_finite() {
            log::warn!("particle pool: non-finite time {}, sweep skipped", now);
            return SweepReport {
                respawned: 0,
                skipped: true,
            };
        }
        if let Some(last) = self.last_time {
            if now < last {
                log::warn!(
                    "particle pool: time went backwards ({} -> {}), sweep skipped",
                    last,
                    now
                );
                return SweepReport {
                    respawned: 0,
                    skipped: true,
                };
            }
        }
        self.last_time = Some(now);

        let epoch = epoch_for(now);
        if epoch != self.attributes.time_epoch() {
            log::debug!("particle pool: time epoch moved to {}s", epoch);
            self.attributes.rebase(epoch);
        }

        let lifetime = f64::from(self.lifetime);
        let mut respawned = 0;
        for index in 0..self.attributes.capacity() {
            if now - self.attributes.start_times()[index] < lifetime {
                continue;
            }
            let emission = self.profile.sample(&mut self.rng);
            let start = now + f64::from(emission.start_jitter) * lifetime;
            self.attributes.respawn_slot(
                index,
                self.emitter + emission.offset,
                start,
                emission.velocity,
                emission.angle,
            );
            respawned += 1;
        }

        if respawned > 0 {
            self.attributes.mark_respawned();
        }
        log::trace!("particle pool: sweep at {:.4}s respawned {}", now, respawned);

        SweepReport {
            respawned,
            skipped: false,
        }
    }
}

/// Latest epoch step at or below `now`.
fn epoch_for(now: f64) -> f64 {
    (now / TIME_EPOCH_STEP).floor() * TIME_EPOCH_STEP
}

fn sanitize_lifetime(lifetime: f32) -> f32 {
    if lifetime.is_finite() {
        lifetime.max(MIN_LIFETIME)
    } else {
        log::debug!("particle pool: non-finite lifetime {}, using 1s", lifetime);
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attribute;
    use crate::emission::{Footprint, RadialDistribution};

    fn shell(radius: f32) -> EmissionProfile {
        EmissionProfile::spherical_shell(radius, RadialDistribution::Sqrt).with_time_jitter(0.5)
    }

    #[test]
    fn test_initial_start_times_cover_lifetime() {
        let pool = ParticlePool::new(100, shell(0.1), Vec3::ZERO, 2.0, 1);
        let mut starts: Vec<f64> = pool.attributes().start_times().to_vec();
        starts.sort_by(|a, b| a.partial_cmp(b).unwrap());

        assert!(starts.iter().all(|s| *s <= 0.0 && *s > -2.0));
        // Evenly stratified: consecutive offsets differ by lifetime / capacity
        for pair in starts.windows(2) {
            assert!((pair[1] - pair[0] - 0.02).abs() < 1e-4);
        }
    }

    #[test]
    fn test_initial_prev_origin_matches_origin() {
        let pool = ParticlePool::new(16, shell(1.0), Vec3::ONE, 1.0, 3);
        let a = pool.attributes();
        assert_eq!(a.spawn_origins(), a.prev_spawn_origins());
        assert_eq!(a.spawn_origins(), a.positions());
    }

    #[test]
    fn test_sweep_respawns_expired_only() {
        let mut pool = ParticlePool::new(10, shell(0.1), Vec3::ZERO, 1.0, 5);
        // Offsets are 0.0, 0.1, ... 0.9; at t = 0.55 the slots with offset
        // >= 0.45 have reached one lifetime.
        let report = pool.sweep(0.55);
        assert_eq!(report.respawned, 5);
        assert!(!report.skipped);
    }

    #[test]
    fn test_sweep_without_changes_keeps_flags_clean() {
        let mut pool = ParticlePool::new(10, shell(0.1), Vec3::ZERO, 10.0, 5);
        pool.clear_dirty();
        let report = pool.sweep(0.01);
        assert_eq!(report.respawned, 0);
        assert!(!pool.attributes().dirty().any());
    }

    #[test]
    fn test_respawn_marks_spawn_attributes_not_size() {
        let mut pool = ParticlePool::new(10, shell(0.1), Vec3::ZERO, 1.0, 5);
        pool.clear_dirty();
        pool.sweep(5.0);
        let dirty = pool.attributes().dirty();
        assert!(dirty.is_dirty(Attribute::SpawnOrigin));
        assert!(dirty.is_dirty(Attribute::PrevSpawnOrigin));
        assert!(dirty.is_dirty(Attribute::StartTime));
        assert!(!dirty.is_dirty(Attribute::Size));
    }

    #[test]
    fn test_sizes_never_change() {
        let profile = shell(0.1).with_size(1.0..3.0);
        let mut pool = ParticlePool::new(50, profile, Vec3::ZERO, 0.2, 9);
        let sizes = pool.attributes().sizes().to_vec();
        for step in 1..100 {
            pool.sweep(step as f64 * 0.05);
        }
        assert_eq!(pool.attributes().sizes(), &sizes[..]);
    }

    #[test]
    fn test_prev_origin_receives_old_origin() {
        let profile = EmissionProfile::point_jitter(0.0, Footprint::Disc);
        let mut pool = ParticlePool::new(4, profile, Vec3::X, 1.0, 2);
        pool.set_emitter_position(Vec3::Y);
        pool.sweep(10.0);

        let a = pool.attributes();
        assert!(a.prev_spawn_origins().iter().all(|p| *p == Vec3::X));
        assert!(a.spawn_origins().iter().all(|p| *p == Vec3::Y));
    }

    #[test]
    fn test_time_regression_is_ignored() {
        let mut pool = ParticlePool::new(10, shell(0.1), Vec3::ZERO, 1.0, 5);
        pool.sweep(3.0);
        let starts = pool.attributes().start_times().to_vec();

        let report = pool.sweep(1.0);
        assert!(report.skipped);
        assert_eq!(pool.attributes().start_times(), &starts[..]);
        assert_eq!(pool.last_time(), Some(3.0));
    }

    #[test]
    fn test_shorter_lifetime_applies_next_sweep() {
        let mut pool = ParticlePool::new(100, shell(0.1), Vec3::ZERO, 10.0, 5);
        pool.sweep(0.0);
        pool.set_lifetime(0.5);
        pool.sweep(0.0);
        for i in 0..pool.capacity() {
            assert!(pool.age(i, 0.0).unwrap() < 0.5);
        }
    }

    #[test]
    fn test_jitter_survives_long_uptime() {
        let profile = shell(0.1);
        let mut pool = ParticlePool::new(200, profile, Vec3::ZERO, 0.05, 13);

        for now in [1.0e6, 2.0e7] {
            let report = pool.sweep(now);
            assert_eq!(report.respawned, 200);

            let starts = pool.attributes().start_times();
            for start in starts {
                assert!(*start >= now && *start < now + 0.05, "start {} at t={}", start, now);
            }
            let mut distinct = starts.to_vec();
            distinct.sort_by(|a, b| a.partial_cmp(b).unwrap());
            distinct.dedup();
            assert!(distinct.len() > 150, "{} distinct start times", distinct.len());
        }
    }

    #[test]
    fn test_epoch_keeps_uploaded_times_small() {
        let mut pool = ParticlePool::new(50, shell(0.1), Vec3::ZERO, 0.5, 14);
        pool.sweep(1.0e6 + 3.0);

        assert_eq!(pool.time_epoch(), 999_424.0);
        assert!((pool.relative_time(1.0e6 + 3.5) - 579.5).abs() < 1e-4);
        for (relative, start) in pool
            .attributes()
            .relative_start_times()
            .iter()
            .zip(pool.attributes().start_times())
        {
            assert!((f64::from(*relative) + pool.time_epoch() - start).abs() < 1e-3);
        }
    }

    #[test]
    fn test_non_finite_time_is_ignored() {
        let mut pool = ParticlePool::new(10, shell(0.1), Vec3::ZERO, 1.0, 5);
        pool.sweep(2.0);
        assert!(pool.sweep(f64::NAN).skipped);
        assert!(pool.sweep(f64::INFINITY).skipped);
        assert_eq!(pool.last_time(), Some(2.0));
        assert_eq!(pool.time_epoch(), 0.0);
    }

    #[test]
    fn test_lifetime_is_sanitized() {
        let mut pool = ParticlePool::new(1, shell(0.1), Vec3::ZERO, -4.0, 5);
        assert_eq!(pool.lifetime(), MIN_LIFETIME);
        pool.set_lifetime(f32::NAN);
        assert_eq!(pool.lifetime(), 1.0);
    }

    #[test]
    fn test_age_out_of_bounds() {
        let pool = ParticlePool::new(3, shell(0.1), Vec3::ZERO, 1.0, 5);
        assert!(matches!(
            pool.age(3, 0.0),
            Err(EffectError::IndexOutOfBounds { index: 3, capacity: 3 })
        ));
    }

    #[test]
    fn test_empty_pool() {
        let mut pool = ParticlePool::new(0, shell(0.1), Vec3::ZERO, 1.0, 5);
        assert_eq!(pool.sweep(100.0).respawned, 0);
    }
}
