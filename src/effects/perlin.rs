//! Perlin field: a flat sheet of points coloured by fractal noise.
//!
//! Points spawn in a square of side `uSize` in the XY plane at z = 0 and do
//! not move on their own. Targeting the field starts a ring-shaped wave at
//! the target that travels outward at `uWaveSpeed` and fades with
//! `uWaveDissipation`. The spawn area never moves.
//!
//! A target only records the click. The wave starts at the time of the next
//! [`advance`](EffectModule::advance), so a host that targets before it
//! advances stamps the click with the current frame's time.

use super::{forward_effect_core, EffectConfig, EffectCore, EffectModule, Targetable};
use crate::emission::EmissionProfile;
use crate::error::EffectError;
use crate::motion::{shader_prelude, MotionLaw};
use crate::params::{ParameterSet, ParameterSpec};
use crate::pool::{ParticlePool, SweepReport};
use crate::uniforms::UniformValue;
use glam::Vec3;
use spindrift_derive::ParameterSet;

/// Perlin field controls.
#[derive(ParameterSet, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[parameters(effect = "perlin_field")]
pub struct PerlinParams {
    #[param(uniform = "uSize", label = "Size", min = 0.1, max = 10.0)]
    pub size: f32,
    #[param(uniform = "uSpeed", label = "Color speed", min = 0.0, max = 2.0)]
    pub speed: f32,
    #[param(uniform = "uColor", label = "Color", min = 0.0, max = 1.0)]
    pub color: Vec3,
    #[param(uniform = "uAlpha", label = "Alpha", min = 0.0, max = 1.0)]
    pub alpha: f32,
    #[param(uniform = "uOctaves", label = "Octaves", min = 1, max = 10)]
    pub octaves: u32,
    /// Origin of the most recent click wave.
    #[param(uniform = "uPosition", label = "Wave origin", min = -1000.0, max = 1000.0)]
    pub position: Vec3,
    /// Time the most recent click wave started, relative to the pool's time
    /// epoch. Goes negative once the epoch moves past the click.
    #[param(uniform = "uClickTime", label = "Click time")]
    pub click_time: f32,
    #[param(uniform = "uWaveSpread", label = "Wave spread", min = 1.0, max = 20.0)]
    pub wave_spread: f32,
    #[param(uniform = "uWaveSpeed", label = "Wave speed", min = 1.0, max = 20.0)]
    pub wave_speed: f32,
    #[param(uniform = "uWaveDissipation", label = "Wave dissipation", min = 0.0, max = 10.0)]
    pub wave_dissipation: f32,
    #[param(uniform = "uWaveForce", label = "Wave force", min = 0.0, max = 2.0)]
    pub wave_force: f32,
    #[param(uniform = "uLifetime", label = "Life time", min = 1.0, max = 120.0)]
    pub lifetime: f32,
}

impl Default for PerlinParams {
    fn default() -> Self {
        Self {
            size: 3.0,
            speed: 0.5,
            color: Vec3::new(0.4, 0.87, 0.68),
            alpha: 1.0,
            octaves: 2,
            position: Vec3::ZERO,
            click_time: 0.0,
            wave_spread: 10.0,
            wave_speed: 10.0,
            wave_dissipation: 4.0,
            wave_force: 0.2,
            lifetime: 30.0,
        }
    }
}

/// Noise-coloured point sheet with click waves.
#[derive(Debug, Clone)]
pub struct PerlinField {
    core: EffectCore<PerlinParams>,
    /// Absolute time of the most recent click.
    click_at: f64,
    /// A target arrived and waits for the next advance.
    click_pending: bool,
}

impl PerlinField {
    pub const DEFAULT_CAPACITY: usize = 5_000;

    pub fn new(config: EffectConfig) -> Self {
        Self::with_params(config, PerlinParams::default())
    }

    pub fn with_params(config: EffectConfig, mut params: PerlinParams) -> Self {
        params.normalize();
        let half = params.size * 0.5;
        let profile = EmissionProfile::band(Vec3::new(half, half, 0.0)).with_time_jitter(0.05);
        let pool = ParticlePool::starting_at(
            config.capacity_or(Self::DEFAULT_CAPACITY),
            profile,
            Vec3::ZERO,
            params.lifetime,
            config.seed_or_clock(),
            config.start_time,
        );
        let core = EffectCore::new(pool, params, config.start_time);
        let click_at = core.pool.time_epoch() + f64::from(core.params.click_time);
        Self {
            core,
            click_at,
            click_pending: false,
        }
    }

    pub fn params(&self) -> &PerlinParams {
        &self.core.params
    }

    pub fn update_params(&mut self, f: impl FnOnce(&mut PerlinParams)) {
        let click_time = self.core.params.click_time;
        self.core.update_params(f);
        self.apply_params(click_time);
    }

    fn apply_params(&mut self, previous_click_time: f32) {
        self.core.pool.set_lifetime(self.core.params.lifetime);
        if self.core.params.click_time != previous_click_time {
            self.click_at = self.core.pool.time_epoch() + f64::from(self.core.params.click_time);
        }
    }

    /// Rebind the click time against the current epoch.
    fn sync_click_time(&mut self) {
        let relative = (self.click_at - self.core.pool.time_epoch()) as f32;
        if relative != self.core.params.click_time {
            self.core.update_params(|p| {
                p.set_click_time(relative);
            });
        }
    }

    /// The click wave as it stands at time `now`.
    pub fn wave_law(&self, now: f64) -> MotionLaw {
        let p = &self.core.params;
        MotionLaw::Wave {
            center: p.position,
            since: (now - self.click_at) as f32,
            speed: p.wave_speed,
            spread: p.wave_spread,
            dissipation: p.wave_dissipation,
            force: p.wave_force,
        }
    }

    /// Click-wave displacement of a point spawned at `origin`, at time `now`.
    pub fn wave_offset(&self, origin: Vec3, now: f64) -> Vec3 {
        self.wave_law(now).position(origin, Vec3::ZERO, 0.0) - origin
    }
}

impl Targetable for PerlinField {
    /// Move the wave origin to `position`. The wave starts at the next
    /// advance.
    fn set_target(&mut self, position: Vec3) {
        self.core.update_params(|p| {
            p.set_position(position);
        });
        self.click_pending = true;
    }

    fn target(&self) -> Vec3 {
        self.core.params.position
    }
}

impl EffectModule for PerlinField {
    fn name(&self) -> &'static str {
        PerlinParams::EFFECT
    }

    fn advance(&mut self, time: f64) -> SweepReport {
        let report = self.core.advance(time);
        if !report.skipped {
            if self.click_pending {
                self.click_pending = false;
                self.click_at = time;
                log::debug!(
                    "perlin_field: wave at {:?} from t={:.3}",
                    self.core.params.position,
                    time
                );
            }
            self.sync_click_time();
        }
        report
    }

    forward_effect_core!();

    fn parameter_specs(&self) -> &'static [ParameterSpec] {
        PerlinParams::SPECS
    }

    fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError> {
        let click_time = self.core.params.click_time;
        self.core.set_parameter(name, value)?;
        self.apply_params(click_time);
        Ok(())
    }

    /// The click wave as of the last advance.
    fn motion_law(&self) -> MotionLaw {
        self.wave_law(self.core.time())
    }

    fn motion_wgsl(&self) -> String {
        format!("{}{}", shader_prelude(self.core.bindings()), PERLIN_WGSL)
    }

    fn as_targetable(&mut self) -> Option<&mut dyn Targetable> {
        Some(self)
    }
}

const PERLIN_WGSL: &str = r#"
fn cell_hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let u = f * f * (3.0 - 2.0 * f);
    let a = cell_hash(i);
    let b = cell_hash(i + vec2<f32>(1.0, 0.0));
    let c = cell_hash(i + vec2<f32>(0.0, 1.0));
    let d = cell_hash(i + vec2<f32>(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

fn fbm(p: vec2<f32>, octaves: u32) -> f32 {
    var value = 0.0;
    var amplitude = 0.5;
    var q = p;
    for (var i = 0u; i < octaves; i = i + 1u) {
        value = value + amplitude * value_noise(q);
        q = q * 2.0;
        amplitude = amplitude * 0.5;
    }
    return value;
}

fn click_wave(origin: vec3<f32>) -> vec3<f32> {
    let since = max(effect.uTime - effect.uClickTime, 0.0);
    let offset = origin - effect.uPosition;
    let d = length(offset.xy);
    if (d < 0.0001) {
        return vec3<f32>(0.0);
    }
    let ring = exp(-abs(d - since * effect.uWaveSpeed) * effect.uWaveSpread);
    let fade = exp(-since * effect.uWaveDissipation);
    return vec3<f32>(offset.xy / d, 0.0) * ring * fade * effect.uWaveForce;
}

fn particle_position(p: ParticleAttributes) -> vec3<f32> {
    return p.spawnOrigin + click_wave(p.spawnOrigin);
}

fn particle_color(p: ParticleAttributes) -> vec4<f32> {
    let n = fbm(p.spawnOrigin.xy + vec2<f32>(effect.uTime * effect.uSpeed), effect.uOctaves);
    return vec4<f32>(effect.uColor * n, effect.uAlpha);
}

fn particle_size(p: ParticleAttributes) -> f32 {
    return p.size * effect.uSize;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_support::{validate_wgsl, wrap_in_vertex_shader};
    use glam::Vec2;

    fn field() -> PerlinField {
        PerlinField::new(EffectConfig::new().with_capacity(300).with_seed(9))
    }

    #[test]
    fn test_sheet_spawn() {
        let mut field = field();
        field.advance(100.0);
        for origin in field.pool().attributes().spawn_origins() {
            assert_eq!(origin.z, 0.0);
            assert!(origin.x.abs() <= 1.5 && origin.y.abs() <= 1.5);
        }
    }

    #[test]
    fn test_target_moves_wave_not_spawn_area() {
        let mut field = field();
        field.advance(4.0);
        let target = Vec3::new(0.5, -0.5, 0.0);
        field.as_targetable().unwrap().set_target(target);

        assert_eq!(field.params().position, target);
        assert_eq!(field.pool().emitter_position(), Vec3::ZERO);
        assert_eq!(
            field.parameter_bindings().get("uPosition"),
            Some(UniformValue::Vec3(target))
        );
    }

    #[test]
    fn test_click_is_stamped_by_the_next_advance() {
        let mut field = field();
        field.advance(4.0);
        field.set_target(Vec3::ONE);
        assert_eq!(field.params().click_time, 0.0);

        field.advance(4.5);
        assert_eq!(field.params().click_time, 4.5);
        assert_eq!(
            field.parameter_bindings().get("uClickTime"),
            Some(UniformValue::F32(4.5))
        );

        // Later frames without a target keep the click
        field.advance(5.0);
        assert_eq!(field.params().click_time, 4.5);
    }

    #[test]
    fn test_click_survives_epoch_change() {
        let mut field = field();
        field.update_params(|p| {
            p.set_wave_speed(2.0).set_wave_dissipation(0.0);
        });
        field.advance(1023.5);
        field.set_target(Vec3::ZERO);
        field.advance(1023.75);

        field.advance(1024.25);
        assert_eq!(field.pool().time_epoch(), 1024.0);
        assert!((field.params().click_time + 0.25).abs() < 1e-5);

        // Half a second after the click the front is one unit out
        let on_front = field.wave_offset(Vec3::X, 1024.25);
        assert!((on_front - Vec3::new(0.2, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_wave_ring_travels() {
        let mut field = field();
        field.update_params(|p| {
            p.set_wave_speed(2.0).set_wave_dissipation(0.0);
        });
        field.set_target(Vec3::ZERO);
        field.advance(1.0);

        // Half a second later the front is 1 unit out.
        let on_front = field.wave_offset(Vec3::new(1.0, 0.0, 0.0), 1.5);
        assert!((on_front - Vec3::new(0.2, 0.0, 0.0)).length() < 1e-5);

        let behind = field.wave_offset(Vec3::new(0.2, 0.0, 0.0), 1.5);
        assert!(behind.length() < on_front.length());
        assert_eq!(field.wave_offset(Vec3::ZERO, 1.5), Vec3::ZERO);
    }

    #[test]
    fn test_cpu_motion_follows_the_click_wave() {
        let mut field = field();
        field.update_params(|p| {
            p.set_wave_speed(2.0).set_wave_dissipation(0.0);
        });
        field.set_target(Vec3::ZERO);
        field.advance(1.0);
        field.advance(1.5);

        let law = field.motion_law();
        let origin = Vec3::new(1.0, 0.0, 0.0);
        let p = law.position(origin, Vec3::ZERO, 0.5);
        assert!((p - Vec3::new(1.2, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(p - origin, field.wave_offset(origin, 1.5));

        let wgsl = field.motion_wgsl();
        assert!(wgsl.contains("return p.spawnOrigin + click_wave(p.spawnOrigin);"));
    }

    #[test]
    fn test_octaves_and_color_ranges() {
        let mut field = field();
        field.set_parameter("uOctaves", UniformValue::U32(40)).unwrap();
        field
            .set_parameter("color", UniformValue::Vec3(Vec3::new(2.0, -1.0, 0.5)))
            .unwrap();
        assert_eq!(field.params().octaves, 10);
        assert_eq!(field.params().color, Vec3::new(1.0, 0.0, 0.5));
        assert!(field.set_parameter("uOctaves", UniformValue::Vec2(Vec2::ONE)).is_err());
    }

    #[test]
    fn test_perlin_wgsl_is_valid() {
        let wgsl = field().motion_wgsl();
        assert!(wgsl.contains("uOctaves: u32,"));
        validate_wgsl(&wrap_in_vertex_shader(&wgsl)).expect("perlin WGSL should be valid");
    }
}
