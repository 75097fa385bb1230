//! Effect modules: a particle pool, an emission profile and a motion law
//! bundled with a typed parameter set.
//!
//! | Effect | Default capacity | Emission | Motion | Targetable |
//! |--------|------------------|----------|--------|------------|
//! | [`Rain`] | 10 000 | band in XZ | drift down, vertical wrap | no |
//! | [`Smoke`] | 100 | disc + column | drift up, rotation | no |
//! | [`PerlinField`] | 5 000 | square in XY | static + click wave | yes (wave origin) |
//! | [`Trail`] | 1 000 | cube jitter | drift | yes (emitter) |
//! | [`ImpulseTrail`] | 2 000 | spherical shell | impulse | yes (emitter) |
//!
//! Modules are driven by an [`EffectHost`](crate::EffectHost) or directly:
//!
//! ```ignore
//! let mut trail = Trail::new(EffectConfig::new().with_seed(7));
//! trail.set_target(Vec3::new(1.0, 2.0, 0.0));
//! trail.advance(time);
//! let buffers = trail.renderable_buffers();
//! ```

mod perlin;
mod rain;
mod smoke;
mod trail;

pub use perlin::{PerlinField, PerlinParams};
pub use rain::{Rain, RainParams};
pub use smoke::{Smoke, SmokeParams};
pub use trail::{ImpulseTrail, ImpulseTrailParams, Trail, TrailParams};

use crate::attributes::{AttributeData, Attribute, DirtyFlags};
use crate::error::EffectError;
use crate::motion::MotionLaw;
use crate::params::{ParameterSet, ParameterSpec};
use crate::pool::{ParticlePool, SweepReport};
use crate::uniforms::{ParameterBindings, UniformValue};
use glam::{Vec2, Vec3};

/// Viewport size bound before the host pushes a real one.
pub const DEFAULT_RESOLUTION: Vec2 = Vec2::new(1280.0, 720.0);

/// Capability of effects that follow a world-space target.
///
/// The target is already resolved to world space; pointer picking and
/// ray/plane projection happen before it gets here.
pub trait Targetable {
    /// Point the effect at `position`. Takes effect on the next advance.
    fn set_target(&mut self, position: Vec3);

    /// Current target.
    fn target(&self) -> Vec3;
}

/// One continuous particle effect.
///
/// All modules are `Send` so a host may own them on any single thread.
pub trait EffectModule: Send {
    /// Stable effect name.
    fn name(&self) -> &'static str;

    /// Run one recycling pass at `time` seconds and refresh the time binding.
    ///
    /// `uTime` is bound relative to the pool's time epoch.
    fn advance(&mut self, time: f64) -> SweepReport;

    fn pool(&self) -> &ParticlePool;

    /// Attribute arrays and their dirty flags, ready for upload.
    fn renderable_buffers(&self) -> RenderableBuffers<'_> {
        RenderableBuffers::new(self.pool())
    }

    /// Forget pending attribute changes after an upload.
    fn clear_dirty(&mut self);

    /// Ordered uniform values: `uTime`, `uResolution`, then the parameters.
    fn parameter_bindings(&self) -> &ParameterBindings;

    /// Declared parameters with kinds and ranges.
    fn parameter_specs(&self) -> &'static [ParameterSpec];

    /// Read a parameter by field or uniform name.
    fn parameter(&self, name: &str) -> Option<UniformValue>;

    /// Write a parameter by field or uniform name. Out-of-range values are
    /// clamped, unknown names and wrong kinds fail.
    fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError>;

    /// Push the viewport size.
    fn set_resolution(&mut self, resolution: Vec2);

    fn motion_law(&self) -> MotionLaw;

    /// Complete WGSL for this effect: uniforms, vertex input struct, shared
    /// helpers and the effect's `particle_position`/`particle_size` functions.
    fn motion_wgsl(&self) -> String;

    /// Targeting capability, if the effect has one.
    fn as_targetable(&mut self) -> Option<&mut dyn Targetable> {
        None
    }
}

/// Borrowed attribute arrays of one effect.
#[derive(Debug, Clone, Copy)]
pub struct RenderableBuffers<'a> {
    pool: &'a ParticlePool,
}

impl<'a> RenderableBuffers<'a> {
    pub fn new(pool: &'a ParticlePool) -> Self {
        Self { pool }
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.pool.attributes().dirty()
    }

    pub fn get(&self, attr: Attribute) -> AttributeData<'a> {
        self.pool.attributes().data(attr)
    }

    /// Dirty attributes with their data, in upload order.
    pub fn dirty_attributes(&self) -> impl Iterator<Item = (Attribute, AttributeData<'a>)> + 'a {
        let attributes = self.pool.attributes();
        attributes.dirty().iter().map(move |a| (a, attributes.data(a)))
    }
}

/// Construction options shared by every effect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectConfig {
    /// Particle count; `None` uses the effect's default.
    pub capacity: Option<usize>,
    /// RNG seed; `None` derives one from the system clock.
    pub seed: Option<u64>,
    /// Time the pool is spawned at.
    pub start_time: f64,
}

impl EffectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_start_time(mut self, time: f64) -> Self {
        self.start_time = time;
        self
    }

    pub(crate) fn capacity_or(&self, default: usize) -> usize {
        self.capacity.unwrap_or(default)
    }

    /// Seed for the pool RNG. Unseeded effects differ between runs.
    pub(crate) fn seed_or_clock(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        })
    }
}

/// State every effect carries: pool, parameters and their bindings.
#[derive(Debug, Clone)]
pub(crate) struct EffectCore<P: ParameterSet> {
    pub pool: ParticlePool,
    pub params: P,
    bindings: ParameterBindings,
    resolution: Vec2,
    time: f64,
}

impl<P: ParameterSet> EffectCore<P> {
    pub fn new(pool: ParticlePool, mut params: P, start_time: f64) -> Self {
        params.normalize();
        let mut core = Self {
            pool,
            params,
            bindings: ParameterBindings::new(),
            resolution: DEFAULT_RESOLUTION,
            time: start_time,
        };
        core.refresh_bindings();
        core
    }

    /// Rewrite every binding from the current state. Layout order is fixed
    /// by the first call.
    pub fn refresh_bindings(&mut self) {
        self.bindings.set("uTime", self.pool.relative_time(self.time));
        self.bindings.set("uResolution", self.resolution);
        self.params.write_bindings(&mut self.bindings);
    }

    pub fn advance(&mut self, time: f64) -> SweepReport {
        let report = self.pool.sweep(time);
        if !report.skipped {
            self.time = time;
            self.bindings.set("uTime", self.pool.relative_time(time));
        }
        report
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn bindings(&self) -> &ParameterBindings {
        &self.bindings
    }

    pub fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError> {
        self.params.set(name, value)?;
        self.params.write_bindings(&mut self.bindings);
        Ok(())
    }

    pub fn update_params(&mut self, f: impl FnOnce(&mut P)) {
        f(&mut self.params);
        self.params.normalize();
        self.params.write_bindings(&mut self.bindings);
    }

    pub fn set_resolution(&mut self, resolution: Vec2) {
        self.resolution = resolution;
        self.bindings.set("uResolution", resolution);
    }
}

/// Implements the [`EffectModule`] methods that only forward to the
/// effect's `core` field.
macro_rules! forward_effect_core {
    () => {
        fn pool(&self) -> &$crate::pool::ParticlePool {
            &self.core.pool
        }

        fn clear_dirty(&mut self) {
            self.core.pool.clear_dirty();
        }

        fn parameter_bindings(&self) -> &$crate::uniforms::ParameterBindings {
            self.core.bindings()
        }

        fn parameter(&self, name: &str) -> Option<$crate::uniforms::UniformValue> {
            $crate::params::ParameterSet::get(&self.core.params, name)
        }

        fn set_resolution(&mut self, resolution: glam::Vec2) {
            self.core.set_resolution(resolution);
        }
    };
}
pub(crate) use forward_effect_core;
