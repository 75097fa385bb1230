//! # Spindrift - continuous particle effects
//!
//! CPU-side lifecycle and emission core for GPU-rendered particle effects.
//!
//! Spindrift keeps a fixed pool of particles alive forever: each particle is
//! spawned, ages, expires and is respawned in place. The CPU only decides
//! *where* and *when* a particle starts; the rendering stage computes where it
//! is now from its age with a closed-form motion law.
//!
//! ## Quick Start
//!
//! ```ignore
//! use spindrift::prelude::*;
//!
//! let mut host = EffectHost::new(EffectKind::ImpulseTrail);
//! let mut clock = FrameClock::new();
//!
//! loop {
//!     let now = clock.tick();
//!     host.frame(now, Some(Vec3::new(0.0, 1.0, 0.0)));
//!
//!     let buffers = host.active().renderable_buffers();
//!     for (attribute, data) in buffers.dirty_attributes() {
//!         upload(attribute.name(), data.as_bytes());
//!     }
//!     host.active_mut().clear_dirty();
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particle pool
//!
//! [`ParticlePool`] owns an [`AttributeBuffer`] (struct-of-arrays storage) and
//! an [`EmissionProfile`]. [`ParticlePool::sweep`] respawns every particle
//! whose age reached the lifetime and marks the touched arrays dirty.
//!
//! ### Effects
//!
//! | Effect | Emission | Motion | Targetable |
//! |--------|----------|--------|------------|
//! | [`Rain`] | band | drift with vertical wrap | no |
//! | [`Smoke`] | disc column | drift with rotation | no |
//! | [`PerlinField`] | flat sheet | click wave | yes |
//! | [`Trail`] | cube jitter | drift | yes |
//! | [`ImpulseTrail`] | spherical shell | impulse | yes |
//!
//! Every effect has a typed parameter struct with declared ranges, derived
//! with [`ParameterSet`](derive@ParameterSet). Writes outside a range are
//! clamped, never rejected.
//!
//! ### Host
//!
//! [`EffectHost`] owns the active effect, swaps effects by [`EffectKind`] or
//! name, and applies targets before advancing so a target set this frame
//! already affects this frame's respawns.
//!
//! ### Time
//!
//! Hosts pass absolute time in seconds as `f64`. Start times are kept in
//! `f64` on the CPU. The GPU sees `f32` values relative to a time epoch
//! that moves in steps of [`TIME_EPOCH_STEP`] seconds, so `uTime` and the
//! uploaded start times stay small after long uptimes.
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade. Install
//! any logger in the application to see them.

extern crate self as spindrift;

pub mod attributes;
pub mod effects;
pub mod emission;
mod error;
pub mod gpu;
mod host;
pub mod motion;
pub mod params;
pub mod pool;
pub mod time;
mod uniforms;

pub use attributes::{Attribute, AttributeBuffer, AttributeData, DirtyFlags};
pub use bytemuck;
pub use effects::{
    EffectConfig, EffectModule, ImpulseTrail, ImpulseTrailParams, PerlinField, PerlinParams, Rain,
    RainParams, RenderableBuffers, Smoke, SmokeParams, Targetable, Trail, TrailParams,
};
pub use emission::{
    Emission, EmissionProfile, EmissionShape, Footprint, RadialDistribution, VelocityMode,
};
pub use error::EffectError;
pub use glam::{Vec2, Vec3};
pub use host::{EffectHost, EffectKind};
pub use motion::MotionLaw;
pub use params::{ParameterKind, ParameterSet, ParameterSpec};
pub use pool::{ParticlePool, SweepReport, TIME_EPOCH_STEP};
pub use spindrift_derive::ParameterSet;
pub use time::FrameClock;
pub use uniforms::{ParameterBindings, UniformValue};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use spindrift::prelude::*;
/// ```
///
/// This imports:
/// - [`EffectHost`] and [`EffectKind`] - the host and the built-in effects
/// - [`EffectModule`] and [`Targetable`] - the effect traits
/// - [`ParameterSet`] - the parameter trait and its derive macro
/// - [`FrameClock`] - a monotonic frame clock
/// - [`Vec2`], [`Vec3`] - glam vector types
pub mod prelude {
    pub use crate::effects::{
        EffectConfig, EffectModule, ImpulseTrail, PerlinField, Rain, Smoke, Targetable, Trail,
    };
    pub use crate::emission::{EmissionProfile, Footprint, RadialDistribution, VelocityMode};
    pub use crate::host::{EffectHost, EffectKind};
    pub use crate::params::ParameterSet;
    pub use crate::pool::ParticlePool;
    pub use crate::time::FrameClock;
    pub use crate::uniforms::UniformValue;
    pub use crate::{EffectError, Vec2, Vec3};
    pub use spindrift_derive::ParameterSet;
}
