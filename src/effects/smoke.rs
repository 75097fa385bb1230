//! Smoke: a small column of slowly rising, rotating puffs.
//!
//! Puffs spawn in a disc of radius 0.1 around the emitter with heights in
//! `[0, 5)`, drift along a scattered upward velocity and are capped at
//! `uMaxHeight`. Each puff turns at `uRotationSpeed` from its spawn angle.

use super::{forward_effect_core, EffectConfig, EffectCore, EffectModule};
use crate::emission::{EmissionProfile, Footprint, VelocityMode};
use crate::error::EffectError;
use crate::motion::{shader_prelude, MotionLaw};
use crate::params::{ParameterSet, ParameterSpec};
use crate::pool::{ParticlePool, SweepReport};
use crate::uniforms::UniformValue;
use glam::Vec3;
use spindrift_derive::ParameterSet;

const SPAWN_RADIUS: f32 = 0.1;
const COLUMN_HEIGHT: f32 = 5.0;
const PUFF_SIZE: f32 = 100.0;

/// Smoke controls.
#[derive(ParameterSet, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[parameters(effect = "smoke")]
pub struct SmokeParams {
    #[param(uniform = "uSize", label = "Size", min = 0.1, max = 10.0)]
    pub size: f32,
    #[param(uniform = "uSpeed", label = "Speed", min = 0.05, max = 3.0)]
    pub speed: f32,
    #[param(uniform = "uMaxHeight", label = "Max height", min = 1.0, max = 10.0)]
    pub max_height: f32,
    #[param(uniform = "uRotationSpeed", label = "Rotation speed", min = 0.1, max = 5.0)]
    pub rotation_speed: f32,
    #[param(uniform = "uLifetime", label = "Life time", min = 0.5, max = 20.0)]
    pub lifetime: f32,
}

impl Default for SmokeParams {
    fn default() -> Self {
        Self {
            size: 4.0,
            speed: 0.5,
            max_height: 2.5,
            rotation_speed: 1.0,
            lifetime: 5.0,
        }
    }
}

/// Rising smoke column.
#[derive(Debug, Clone)]
pub struct Smoke {
    core: EffectCore<SmokeParams>,
}

impl Smoke {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(config: EffectConfig) -> Self {
        Self::with_params(config, SmokeParams::default())
    }

    pub fn with_params(config: EffectConfig, mut params: SmokeParams) -> Self {
        params.normalize();
        let profile = EmissionProfile::point_jitter(SPAWN_RADIUS, Footprint::Disc)
            .with_height(0.0..COLUMN_HEIGHT)
            .with_size(PUFF_SIZE..PUFF_SIZE)
            .with_time_jitter(0.2)
            .with_velocity(VelocityMode::Scatter);
        let pool = ParticlePool::starting_at(
            config.capacity_or(Self::DEFAULT_CAPACITY),
            profile,
            Vec3::ZERO,
            params.lifetime,
            config.seed_or_clock(),
            config.start_time,
        );
        Self {
            core: EffectCore::new(pool, params, config.start_time),
        }
    }

    pub fn params(&self) -> &SmokeParams {
        &self.core.params
    }

    pub fn update_params(&mut self, f: impl FnOnce(&mut SmokeParams)) {
        self.core.update_params(f);
        self.apply_params();
    }

    fn apply_params(&mut self) {
        self.core.pool.set_lifetime(self.core.params.lifetime);
    }

    /// Rotation of one puff at time `now`, in radians.
    pub fn rotation(&self, index: usize, now: f64) -> Result<f32, EffectError> {
        let angle = self.core.pool.attributes().angle(index)?;
        let age = self.core.pool.age(index, now)?.max(0.0) as f32;
        Ok(angle + age * self.core.params.rotation_speed)
    }
}

impl EffectModule for Smoke {
    fn name(&self) -> &'static str {
        SmokeParams::EFFECT
    }

    fn advance(&mut self, time: f64) -> SweepReport {
        self.core.advance(time)
    }

    forward_effect_core!();

    fn parameter_specs(&self) -> &'static [ParameterSpec] {
        SmokeParams::SPECS
    }

    fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError> {
        self.core.set_parameter(name, value)?;
        self.apply_params();
        Ok(())
    }

    fn motion_law(&self) -> MotionLaw {
        MotionLaw::Drift {
            speed: self.core.params.speed,
            wrap: None,
            cap_y: Some(self.core.params.max_height),
        }
    }

    fn motion_wgsl(&self) -> String {
        format!("{}{}", shader_prelude(self.core.bindings()), SMOKE_WGSL)
    }
}

const SMOKE_WGSL: &str = r#"
fn particle_position(p: ParticleAttributes) -> vec3<f32> {
    let age = particle_age(p.startTime);
    var pos = drift(p.spawnOrigin, p.velocity, effect.uSpeed, age);
    pos.y = min(pos.y, effect.uMaxHeight);
    return pos;
}

fn particle_rotation(p: ParticleAttributes) -> f32 {
    return p.angle + particle_age(p.startTime) * effect.uRotationSpeed;
}

fn particle_size(p: ParticleAttributes) -> f32 {
    return p.size * effect.uSize / effect.uResolution.y;
}
"#;
