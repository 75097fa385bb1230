//! Trails: particles left behind by a moving target.
//!
//! Both trails re-emit around the target as particles expire, so moving the
//! target leaves a wake of older particles at earlier positions.
//!
//! - [`Trail`] jitters spawns inside a cube of `uSpawnRadius` and lets them
//!   drift outward at `uSpeed`.
//! - [`ImpulseTrail`] spawns inside a sphere and pushes each particle with
//!   a constant force for `uForceTime` seconds, then holds it at the reached
//!   position plus `uPostCorrection`.
//!
//! # Emitter interpolation
//!
//! Every respawn keeps the previous spawn origin in `prevSpawnOrigin`, and
//! [`ImpulseTrailParams::interpolate_emitter`] is bound as
//! `uInterpolateEmitter`. Nothing consumes either yet: the motion WGSL draws
//! from `spawnOrigin` only.

use super::{forward_effect_core, EffectConfig, EffectCore, EffectModule, Targetable};
use crate::emission::{EmissionProfile, Footprint, RadialDistribution, VelocityMode};
use crate::error::EffectError;
use crate::motion::{shader_prelude, MotionLaw};
use crate::params::{ParameterSet, ParameterSpec};
use crate::pool::{ParticlePool, SweepReport};
use crate::uniforms::UniformValue;
use glam::Vec3;
use spindrift_derive::ParameterSet;

/// Outward velocity of simple-trail particles before `uSpeed` scaling.
const OUTWARD_DRIFT: f32 = 0.1;

/// Simple trail controls.
#[derive(ParameterSet, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[parameters(effect = "trail")]
pub struct TrailParams {
    #[param(uniform = "uSize", label = "Size", min = 0.1, max = 10.0)]
    pub size: f32,
    #[param(uniform = "uSpeed", label = "Speed", min = 0.1, max = 50.0)]
    pub speed: f32,
    #[param(uniform = "uObjectSize", label = "Object size", min = 0.01, max = 5.0)]
    pub object_size: f32,
    #[param(uniform = "uObjectPosition", label = "Object position", min = -1000.0, max = 1000.0)]
    pub object_position: Vec3,
    #[param(uniform = "uLifetime", label = "Life time", min = 0.1, max = 50.0)]
    pub lifetime: f32,
    #[param(uniform = "uSpawnRadius", label = "Spawn radius", min = 0.0, max = 50.0)]
    pub spawn_radius: f32,
}

impl Default for TrailParams {
    fn default() -> Self {
        Self {
            size: 2.0,
            speed: 10.0,
            object_size: 0.5,
            object_position: Vec3::ZERO,
            lifetime: 5.0,
            spawn_radius: 5.0,
        }
    }
}

/// Drifting particle wake around a target.
#[derive(Debug, Clone)]
pub struct Trail {
    core: EffectCore<TrailParams>,
}

impl Trail {
    pub const DEFAULT_CAPACITY: usize = 1_000;

    pub fn new(config: EffectConfig) -> Self {
        Self::with_params(config, TrailParams::default())
    }

    pub fn with_params(config: EffectConfig, mut params: TrailParams) -> Self {
        params.normalize();
        let profile = EmissionProfile::point_jitter(params.spawn_radius, Footprint::Cube)
            .with_time_jitter(0.1)
            .with_velocity(VelocityMode::Radial(OUTWARD_DRIFT));
        let pool = ParticlePool::starting_at(
            config.capacity_or(Self::DEFAULT_CAPACITY),
            profile,
            params.object_position,
            params.lifetime,
            config.seed_or_clock(),
            config.start_time,
        );
        Self {
            core: EffectCore::new(pool, params, config.start_time),
        }
    }

    pub fn params(&self) -> &TrailParams {
        &self.core.params
    }

    pub fn update_params(&mut self, f: impl FnOnce(&mut TrailParams)) {
        self.core.update_params(f);
        self.apply_params();
    }

    fn apply_params(&mut self) {
        let params = &self.core.params;
        let pool = &mut self.core.pool;
        pool.set_lifetime(params.lifetime);
        pool.set_spawn_radius(params.spawn_radius);
        pool.set_emitter_position(params.object_position);
    }
}

impl Targetable for Trail {
    fn set_target(&mut self, position: Vec3) {
        self.update_params(|p| {
            p.set_object_position(position);
        });
    }

    fn target(&self) -> Vec3 {
        self.core.params.object_position
    }
}

impl EffectModule for Trail {
    fn name(&self) -> &'static str {
        TrailParams::EFFECT
    }

    fn advance(&mut self, time: f64) -> SweepReport {
        self.core.advance(time)
    }

    forward_effect_core!();

    fn parameter_specs(&self) -> &'static [ParameterSpec] {
        TrailParams::SPECS
    }

    fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError> {
        self.core.set_parameter(name, value)?;
        self.apply_params();
        Ok(())
    }

    fn motion_law(&self) -> MotionLaw {
        MotionLaw::drift(self.core.params.speed)
    }

    fn motion_wgsl(&self) -> String {
        format!("{}{}", shader_prelude(self.core.bindings()), TRAIL_WGSL)
    }

    fn as_targetable(&mut self) -> Option<&mut dyn Targetable> {
        Some(self)
    }
}

const TRAIL_WGSL: &str = r#"
fn particle_position(p: ParticleAttributes) -> vec3<f32> {
    let age = particle_age(p.startTime);
    return drift(p.spawnOrigin, p.velocity, effect.uSpeed, age);
}

fn particle_size(p: ParticleAttributes) -> f32 {
    let life = clamp(1.0 - particle_age(p.startTime) / effect.uLifetime, 0.0, 1.0);
    return p.size * effect.uSize * effect.uObjectSize * life;
}
"#;

/// Impulse trail controls.
#[derive(ParameterSet, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[parameters(effect = "impulse_trail", constrain = "clamp_force_window")]
pub struct ImpulseTrailParams {
    #[param(uniform = "uParticleSize", label = "Particle size", min = 0.1, max = 10.0)]
    pub particle_size: f32,
    #[param(uniform = "uLifetime", label = "Life time", min = 0.05, max = 20.0)]
    pub lifetime: f32,
    #[param(uniform = "uSpawnRadius", label = "Spawn radius", min = 0.0, max = 10.0)]
    pub spawn_radius: f32,
    #[param(uniform = "uInitialVelocity", label = "Initial velocity", min = -100.0, max = 100.0)]
    pub initial_velocity: Vec3,
    #[param(uniform = "uInitialForce", label = "Initial force", min = -100.0, max = 100.0)]
    pub initial_force: Vec3,
    /// Never exceeds `lifetime`.
    #[param(uniform = "uForceTime", label = "Force application time", min = 0.0, max = 20.0)]
    pub force_time: f32,
    #[param(uniform = "uPostCorrection", label = "Post correction", min = -100.0, max = 100.0)]
    pub post_correction: Vec3,
    #[param(uniform = "uEmitterPosition", label = "Emitter position", min = -1000.0, max = 1000.0)]
    pub emitter_position: Vec3,
    /// Bound for shaders but not consumed yet.
    #[param(uniform = "uInterpolateEmitter", label = "Interpolate emitter")]
    pub interpolate_emitter: bool,
}

impl ImpulseTrailParams {
    fn clamp_force_window(&mut self) {
        if self.force_time > self.lifetime {
            log::debug!(
                "impulse_trail: force time {} exceeds lifetime {}, clamped",
                self.force_time,
                self.lifetime
            );
            self.force_time = self.lifetime;
        }
    }
}

impl Default for ImpulseTrailParams {
    fn default() -> Self {
        Self {
            particle_size: 2.0,
            lifetime: 1.5,
            spawn_radius: 0.25,
            initial_velocity: Vec3::new(0.0, 0.5, 0.0),
            initial_force: Vec3::new(0.0, -1.0, 0.0),
            force_time: 0.5,
            post_correction: Vec3::ZERO,
            emitter_position: Vec3::ZERO,
            interpolate_emitter: false,
        }
    }
}

/// Trail driven by a two-phase impulse law.
#[derive(Debug, Clone)]
pub struct ImpulseTrail {
    core: EffectCore<ImpulseTrailParams>,
}

impl ImpulseTrail {
    pub const DEFAULT_CAPACITY: usize = 2_000;

    pub fn new(config: EffectConfig) -> Self {
        Self::with_params(config, ImpulseTrailParams::default())
    }

    pub fn with_params(config: EffectConfig, mut params: ImpulseTrailParams) -> Self {
        params.normalize();
        let profile = EmissionProfile::spherical_shell(params.spawn_radius, RadialDistribution::Sqrt)
            .with_size(0.5..1.5)
            .with_time_jitter(0.1);
        let pool = ParticlePool::starting_at(
            config.capacity_or(Self::DEFAULT_CAPACITY),
            profile,
            params.emitter_position,
            params.lifetime,
            config.seed_or_clock(),
            config.start_time,
        );
        Self {
            core: EffectCore::new(pool, params, config.start_time),
        }
    }

    pub fn params(&self) -> &ImpulseTrailParams {
        &self.core.params
    }

    pub fn update_params(&mut self, f: impl FnOnce(&mut ImpulseTrailParams)) {
        let interpolating = self.core.params.interpolate_emitter;
        self.core.update_params(f);
        if self.core.params.interpolate_emitter && !interpolating {
            warn_interpolation();
        }
        self.apply_params();
    }

    fn apply_params(&mut self) {
        let params = &self.core.params;
        let pool = &mut self.core.pool;
        pool.set_lifetime(params.lifetime);
        pool.set_spawn_radius(params.spawn_radius);
        pool.set_emitter_position(params.emitter_position);
    }
}

fn warn_interpolation() {
    log::warn!(
        "impulse_trail: emitter interpolation is not implemented; \
         prevSpawnOrigin is uploaded but unused"
    );
}

impl Targetable for ImpulseTrail {
    fn set_target(&mut self, position: Vec3) {
        self.update_params(|p| {
            p.set_emitter_position(position);
        });
    }

    fn target(&self) -> Vec3 {
        self.core.params.emitter_position
    }
}

impl EffectModule for ImpulseTrail {
    fn name(&self) -> &'static str {
        ImpulseTrailParams::EFFECT
    }

    fn advance(&mut self, time: f64) -> SweepReport {
        self.core.advance(time)
    }

    forward_effect_core!();

    fn parameter_specs(&self) -> &'static [ParameterSpec] {
        ImpulseTrailParams::SPECS
    }

    fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError> {
        let interpolating = self.core.params.interpolate_emitter;
        self.core.set_parameter(name, value)?;
        if self.core.params.interpolate_emitter && !interpolating {
            warn_interpolation();
        }
        self.apply_params();
        Ok(())
    }

    fn motion_law(&self) -> MotionLaw {
        let p = &self.core.params;
        MotionLaw::Impulse {
            initial_velocity: p.initial_velocity,
            force: p.initial_force,
            force_time: p.force_time,
            post_correction: p.post_correction,
        }
    }

    fn motion_wgsl(&self) -> String {
        format!("{}{}", shader_prelude(self.core.bindings()), IMPULSE_TRAIL_WGSL)
    }

    fn as_targetable(&mut self) -> Option<&mut dyn Targetable> {
        Some(self)
    }
}

const IMPULSE_TRAIL_WGSL: &str = r#"
fn particle_position(p: ParticleAttributes) -> vec3<f32> {
    let age = particle_age(p.startTime);
    return impulse(
        p.spawnOrigin,
        effect.uInitialVelocity,
        effect.uInitialForce,
        effect.uForceTime,
        effect.uPostCorrection,
        age,
    );
}

fn particle_size(p: ParticleAttributes) -> f32 {
    let life = clamp(1.0 - particle_age(p.startTime) / effect.uLifetime, 0.0, 1.0);
    return p.size * effect.uParticleSize * life;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{validate_wgsl, wrap_in_vertex_shader};

    fn trail() -> Trail {
        Trail::new(EffectConfig::new().with_capacity(200).with_seed(21))
    }

    fn impulse() -> ImpulseTrail {
        ImpulseTrail::new(EffectConfig::new().with_capacity(200).with_seed(21))
    }

    #[test]
    fn test_trail_respawns_around_target() {
        let mut trail = trail();
        let target = Vec3::new(10.0, -3.0, 0.0);
        trail.set_target(target);
        assert_eq!(trail.pool().emitter_position(), target);

        trail.advance(6.0);
        for origin in trail.pool().attributes().spawn_origins() {
            assert!((*origin - target).abs().max_element() <= 5.0 + 1e-4);
        }
        assert_eq!(trail.target(), target);
    }

    #[test]
    fn test_trail_spawn_radius_reaches_profile() {
        let mut trail = trail();
        trail.set_parameter("uSpawnRadius", UniformValue::F32(0.0)).unwrap();
        assert_eq!(trail.pool().profile().radius(), Some(0.0));

        trail.advance(6.0);
        assert!(trail
            .pool()
            .attributes()
            .spawn_origins()
            .iter()
            .all(|o| *o == Vec3::ZERO));
    }

    #[test]
    fn test_trail_wgsl_is_valid() {
        let wgsl = trail().motion_wgsl();
        validate_wgsl(&wrap_in_vertex_shader(&wgsl)).expect("trail WGSL should be valid");
    }

    #[test]
    fn test_impulse_defaults() {
        let trail = ImpulseTrail::new(EffectConfig::new().with_seed(1));
        assert_eq!(trail.pool().capacity(), 2_000);
        assert_eq!(trail.params(), &ImpulseTrailParams::default());
        assert_eq!(trail.pool().lifetime(), 1.5);
    }

    #[test]
    fn test_force_time_never_exceeds_lifetime() {
        let mut trail = impulse();
        trail.set_parameter("uForceTime", UniformValue::F32(5.0)).unwrap();
        assert_eq!(trail.params().force_time, 1.5);

        trail.set_parameter("uLifetime", UniformValue::F32(0.2)).unwrap();
        assert_eq!(trail.params().force_time, 0.2);
        assert_eq!(
            trail.parameter_bindings().get("uForceTime"),
            Some(UniformValue::F32(0.2))
        );
        assert_eq!(trail.pool().lifetime(), 0.2);
    }

    #[test]
    fn test_impulse_motion_law_tracks_params() {
        let mut trail = impulse();
        trail.update_params(|p| {
            p.set_post_correction(Vec3::new(0.0, 2.0, 0.0));
        });
        match trail.motion_law() {
            MotionLaw::Impulse {
                post_correction,
                force_time,
                ..
            } => {
                assert_eq!(post_correction, Vec3::new(0.0, 2.0, 0.0));
                assert_eq!(force_time, 0.5);
            }
            other => panic!("unexpected law {:?}", other),
        }
    }

    #[test]
    fn test_interpolate_flag_is_bound_as_u32() {
        let mut trail = impulse();
        trail.set_parameter("uInterpolateEmitter", UniformValue::U32(1)).unwrap();
        assert!(trail.params().interpolate_emitter);
        let wgsl = trail.motion_wgsl();
        assert!(wgsl.contains("uInterpolateEmitter: u32,"));
    }

    #[test]
    fn test_impulse_wgsl_is_valid() {
        let wgsl = impulse().motion_wgsl();
        validate_wgsl(&wrap_in_vertex_shader(&wgsl)).expect("impulse trail WGSL should be valid");
    }
}
