//! Rain: a large field of drops falling through a vertical band.
//!
//! Drops spawn in a 50×50 square in XZ at heights `[0, maxHeight − minHeight)`
//! and fall straight down at `uSpeed`. The shader wraps their height back
//! into `[minHeight, maxHeight)`, so the field looks continuous even though
//! each drop is recycled after `uLifetime` seconds.

use super::{forward_effect_core, EffectConfig, EffectCore, EffectModule};
use crate::emission::{EmissionProfile, VelocityMode};
use crate::error::EffectError;
use crate::motion::{shader_prelude, MotionLaw};
use crate::params::{ParameterSet, ParameterSpec};
use crate::pool::{ParticlePool, SweepReport};
use crate::uniforms::UniformValue;
use glam::Vec3;
use spindrift_derive::ParameterSet;

/// Half the side of the square drops spawn in.
const HALF_EXTENT: f32 = 25.0;

/// Rain controls.
#[derive(ParameterSet, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[parameters(effect = "rain", constrain = "order_heights")]
pub struct RainParams {
    #[param(uniform = "uSize", label = "Size", min = 0.1, max = 10.0)]
    pub size: f32,
    #[param(uniform = "uSpeed", label = "Speed", min = 0.1, max = 50.0)]
    pub speed: f32,
    #[param(uniform = "uMaxHeight", label = "Max height", min = -100.0, max = 100.0)]
    pub max_height: f32,
    #[param(uniform = "uMinHeight", label = "Min height", min = -100.0, max = 100.0)]
    pub min_height: f32,
    #[param(uniform = "uLifetime", label = "Life time", min = 0.1, max = 120.0)]
    pub lifetime: f32,
}

impl RainParams {
    /// The wrap range may not be inverted.
    fn order_heights(&mut self) {
        if self.min_height > self.max_height {
            self.min_height = self.max_height;
        }
    }
}

impl Default for RainParams {
    fn default() -> Self {
        Self {
            size: 2.0,
            speed: 10.0,
            max_height: 25.0,
            min_height: -25.0,
            lifetime: 10.0,
        }
    }
}

/// Falling rain drops.
#[derive(Debug, Clone)]
pub struct Rain {
    core: EffectCore<RainParams>,
}

impl Rain {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new(config: EffectConfig) -> Self {
        Self::with_params(config, RainParams::default())
    }

    pub fn with_params(config: EffectConfig, mut params: RainParams) -> Self {
        params.normalize();
        let range = params.max_height - params.min_height;
        let profile = EmissionProfile::band(Vec3::new(HALF_EXTENT, range * 0.5, HALF_EXTENT))
            .with_size(1.0..2.5)
            .with_time_jitter(0.1)
            .with_velocity(VelocityMode::Fixed(Vec3::NEG_Y));
        let pool = ParticlePool::starting_at(
            config.capacity_or(Self::DEFAULT_CAPACITY),
            profile,
            Vec3::new(0.0, range * 0.5, 0.0),
            params.lifetime,
            config.seed_or_clock(),
            config.start_time,
        );
        Self {
            core: EffectCore::new(pool, params, config.start_time),
        }
    }

    pub fn params(&self) -> &RainParams {
        &self.core.params
    }

    /// Edit the controls through their typed setters.
    pub fn update_params(&mut self, f: impl FnOnce(&mut RainParams)) {
        self.core.update_params(f);
        self.apply_params();
    }

    fn apply_params(&mut self) {
        self.core.pool.set_lifetime(self.core.params.lifetime);
    }
}

impl EffectModule for Rain {
    fn name(&self) -> &'static str {
        RainParams::EFFECT
    }

    fn advance(&mut self, time: f64) -> SweepReport {
        self.core.advance(time)
    }

    forward_effect_core!();

    fn parameter_specs(&self) -> &'static [ParameterSpec] {
        RainParams::SPECS
    }

    fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError> {
        self.core.set_parameter(name, value)?;
        self.apply_params();
        Ok(())
    }

    fn motion_law(&self) -> MotionLaw {
        let p = &self.core.params;
        MotionLaw::Drift {
            speed: p.speed,
            wrap: Some((p.min_height, p.max_height)),
            cap_y: None,
        }
    }

    fn motion_wgsl(&self) -> String {
        format!("{}{}", shader_prelude(self.core.bindings()), RAIN_WGSL)
    }
}

const RAIN_WGSL: &str = r#"
fn particle_position(p: ParticleAttributes) -> vec3<f32> {
    let age = particle_age(p.startTime);
    var pos = drift(p.spawnOrigin, p.velocity, effect.uSpeed, age);

    // Wrap into [min, max) with a floored modulo
    let span = max(effect.uMaxHeight - effect.uMinHeight, 0.0001);
    let shifted = pos.y - effect.uMinHeight;
    pos.y = effect.uMinHeight + shifted - floor(shifted / span) * span;
    return pos;
}

fn particle_size(p: ParticleAttributes) -> f32 {
    return p.size * effect.uSize;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{validate_wgsl, wrap_in_vertex_shader};

    fn rain(capacity: usize) -> Rain {
        Rain::new(EffectConfig::new().with_capacity(capacity).with_seed(11))
    }

    #[test]
    fn test_default_capacity() {
        let rain = Rain::new(EffectConfig::new().with_seed(1));
        assert_eq!(rain.pool().capacity(), 10_000);
        assert_eq!(rain.pool().lifetime(), 10.0);
    }

    #[test]
    fn test_bindings_start_with_time_and_resolution() {
        let rain = rain(4);
        let names: Vec<_> = rain.parameter_bindings().iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["uTime", "uResolution", "uSize", "uSpeed", "uMaxHeight", "uMinHeight", "uLifetime"]
        );
    }

    #[test]
    fn test_spawn_band() {
        let mut rain = rain(500);
        rain.advance(100.0);
        for origin in rain.pool().attributes().spawn_origins() {
            assert!(origin.x.abs() <= HALF_EXTENT && origin.z.abs() <= HALF_EXTENT);
            assert!((0.0..=50.0).contains(&origin.y));
        }
        assert!(rain
            .pool()
            .attributes()
            .velocities()
            .iter()
            .all(|v| *v == Vec3::NEG_Y));
    }

    #[test]
    fn test_out_of_range_speed_is_clamped() {
        let mut rain = rain(4);
        rain.set_parameter("uSpeed", UniformValue::F32(100.0)).unwrap();
        assert_eq!(rain.params().speed, 50.0);
        assert_eq!(rain.parameter("speed"), Some(UniformValue::F32(50.0)));
        assert_eq!(
            rain.parameter_bindings().get("uSpeed"),
            Some(UniformValue::F32(50.0))
        );
    }

    #[test]
    fn test_lifetime_reaches_pool() {
        let mut rain = rain(4);
        rain.set_parameter("uLifetime", UniformValue::F32(0.5)).unwrap();
        assert_eq!(rain.pool().lifetime(), 0.5);

        rain.update_params(|p| {
            p.set_lifetime(3.0);
        });
        assert_eq!(rain.pool().lifetime(), 3.0);
    }

    #[test]
    fn test_heights_never_invert() {
        let mut rain = rain(4);
        rain.update_params(|p| {
            p.set_min_height(40.0);
        });
        assert_eq!(rain.params().min_height, 25.0);
    }

    #[test]
    fn test_wrong_kind_and_unknown_name() {
        let mut rain = rain(4);
        assert_eq!(
            rain.set_parameter("uSize", UniformValue::Vec3(Vec3::ONE)),
            Err(EffectError::ParameterType {
                name: "uSize",
                expected: "f32"
            })
        );
        assert!(matches!(
            rain.set_parameter("uObjectPosition", UniformValue::F32(1.0)),
            Err(EffectError::UnknownParameter { effect: "rain", .. })
        ));
    }

    #[test]
    fn test_rain_is_not_targetable() {
        let mut rain = rain(4);
        assert!(rain.as_targetable().is_none());
    }

    #[test]
    fn test_cpu_motion_wraps_like_the_shader() {
        let rain = rain(4);
        let law = rain.motion_law();

        // Falls 90 units from y = 40 and wraps back into [-25, 25)
        let p = law.position(Vec3::new(0.0, 40.0, 0.0), Vec3::NEG_Y, 9.0);
        assert!((-25.0..25.0).contains(&p.y));
        assert!((p.y - 0.0).abs() < 1e-4);

        assert!(rain
            .motion_wgsl()
            .contains("pos.y = effect.uMinHeight + shifted - floor(shifted / span) * span;"));
    }

    #[test]
    fn test_rain_wgsl_is_valid() {
        let rain = rain(4);
        let wgsl = rain.motion_wgsl();
        assert!(wgsl.contains("uMinHeight: f32,"));
        validate_wgsl(&wrap_in_vertex_shader(&wgsl)).expect("rain WGSL should be valid");
    }
}
