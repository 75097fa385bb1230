//! Emission profiles: where and how a (re)spawned particle starts.
//!
//! A profile is a pure sampling policy. Given the pool's RNG and the current
//! emitter position it yields an [`Emission`]: the spawn offset, a size sample,
//! a start-time jitter and the initial velocity/rotation seeds.
//!
//! # Shapes
//!
//! | Shape | Used by | Distribution |
//! |-------|---------|--------------|
//! | [`EmissionShape::PointJitter`] | smoke, simple trail | disc in XZ or cube, plus a height range |
//! | [`EmissionShape::SphericalShell`] | impulse trail | `r = R·f(U₁)`, `θ = 2πU₂`, `φ = acos(2U₃−1)` |
//! | [`EmissionShape::Band`] | rain, perlin field | axis-aligned box (a flat band when one extent is 0) |
//!
//! Profiles never see screen coordinates: targeted effects receive an already
//! resolved world position through [`crate::Targetable`] and feed it in as
//! the emitter position.
//!
//! # Example
//!
//! ```ignore
//! let profile = EmissionProfile::new(EmissionShape::SphericalShell {
//!     radius: 0.25,
//!     distribution: RadialDistribution::Sqrt,
//! })
//! .with_size(1.0..2.0)
//! .with_time_jitter(0.2);
//! ```

use glam::Vec3;
use rand::Rng;
use std::f32::consts::{PI, TAU};
use std::ops::Range;

/// Footprint of a [`EmissionShape::PointJitter`] emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Footprint {
    /// Uniform disc in the XZ plane.
    #[default]
    Disc,
    /// Uniform cube, every axis in `±radius`.
    Cube,
}

/// Radial sampling law for [`EmissionShape::SphericalShell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadialDistribution {
    /// `r = R·√U`. Denser toward the centre than a uniform volume.
    #[default]
    Sqrt,
    /// `r = R·U`. Strongly concentrated at the centre.
    Linear,
    /// `r = R·∛U`. Uniform throughout the volume.
    Cbrt,
}

impl RadialDistribution {
    #[inline]
    fn apply(self, u: f32) -> f32 {
        match self {
            RadialDistribution::Sqrt => u.sqrt(),
            RadialDistribution::Linear => u,
            RadialDistribution::Cbrt => u.cbrt(),
        }
    }
}

/// Spatial spread of an emission profile.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmissionShape {
    /// Jitter around the emitter inside `radius`.
    ///
    /// `height` adds a vertical offset range (smoke column); `0.0..0.0`
    /// keeps particles in the emitter's plane.
    PointJitter {
        radius: f32,
        footprint: Footprint,
        height: Range<f32>,
    },
    /// Volume of a sphere around the emitter.
    SphericalShell {
        radius: f32,
        distribution: RadialDistribution,
    },
    /// Axis-aligned box of half-size `half_extent` centred on the emitter.
    Band { half_extent: Vec3 },
}

/// Initial velocity policy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VelocityMode {
    /// Particles carry no velocity of their own.
    #[default]
    Zero,
    /// Every particle gets the same vector.
    Fixed(Vec3),
    /// `((U−0.5)·2, U, (U−0.5)·2)`: lateral scatter with upward drift.
    Scatter,
    /// Away from the emitter along the spawn offset, with this magnitude.
    Radial(f32),
}

/// One sampled spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    /// Offset from the emitter position.
    pub offset: Vec3,
    /// Point size sample (used at construction only).
    pub size: f32,
    /// Start-time delay as a fraction of the lifetime, in `[0, 1)`.
    pub start_jitter: f32,
    pub velocity: Vec3,
    /// Rotation seed in `[-1, 1)`.
    pub angle: f32,
}

/// Sampling policy for new and recycled particles.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmissionProfile {
    pub shape: EmissionShape,
    /// Range of per-particle point sizes.
    pub size: Range<f32>,
    /// Largest respawn delay as a fraction of the lifetime.
    pub time_jitter: f32,
    pub velocity: VelocityMode,
}

impl EmissionProfile {
    /// Largest accepted `time_jitter`; keeps respawn times strictly inside
    /// `[t, t + lifetime)`.
    pub const MAX_TIME_JITTER: f32 = 0.999;

    /// Profile with unit sizes, no jitter and no velocity.
    pub fn new(shape: EmissionShape) -> Self {
        Self {
            shape,
            size: 1.0..1.0,
            time_jitter: 0.0,
            velocity: VelocityMode::Zero,
        }
    }

    /// Disc or cube jitter around the emitter.
    pub fn point_jitter(radius: f32, footprint: Footprint) -> Self {
        Self::new(EmissionShape::PointJitter {
            radius: radius.max(0.0),
            footprint,
            height: 0.0..0.0,
        })
    }

    /// Sphere volume around the emitter.
    pub fn spherical_shell(radius: f32, distribution: RadialDistribution) -> Self {
        Self::new(EmissionShape::SphericalShell {
            radius: radius.max(0.0),
            distribution,
        })
    }

    /// Box of half-size `half_extent` around the emitter.
    pub fn band(half_extent: Vec3) -> Self {
        Self::new(EmissionShape::Band {
            half_extent: half_extent.abs(),
        })
    }

    pub fn with_size(mut self, size: Range<f32>) -> Self {
        self.size = size;
        self
    }

    pub fn with_time_jitter(mut self, fraction: f32) -> Self {
        self.time_jitter = fraction.clamp(0.0, Self::MAX_TIME_JITTER);
        self
    }

    pub fn with_velocity(mut self, velocity: VelocityMode) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the vertical range of a [`EmissionShape::PointJitter`] profile.
    pub fn with_height(mut self, range: Range<f32>) -> Self {
        if let EmissionShape::PointJitter { height, .. } = &mut self.shape {
            *height = range;
        }
        self
    }

    /// Spread radius of point and spherical shapes.
    pub fn radius(&self) -> Option<f32> {
        match self.shape {
            EmissionShape::PointJitter { radius, .. } => Some(radius),
            EmissionShape::SphericalShell { radius, .. } => Some(radius),
            EmissionShape::Band { .. } => None,
        }
    }

    /// Change the spread radius of point and spherical shapes.
    ///
    /// Bands are left unchanged. Negative radii are treated as 0.
    pub fn set_radius(&mut self, value: f32) {
        match &mut self.shape {
            EmissionShape::PointJitter { radius, .. } => *radius = value.max(0.0),
            EmissionShape::SphericalShell { radius, .. } => *radius = value.max(0.0),
            EmissionShape::Band { .. } => {}
        }
    }

    /// Draw one spawn. The number and order of RNG draws is fixed per
    /// profile so seeded runs replay exactly.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Emission {
        let offset = match &self.shape {
            EmissionShape::PointJitter {
                radius,
                footprint,
                height,
            } => {
                let lateral = match footprint {
                    Footprint::Disc => {
                        let theta = rng.gen::<f32>() * TAU;
                        let r = radius * rng.gen::<f32>().sqrt(); // sqrt for uniform disk
                        Vec3::new(r * theta.cos(), 0.0, r * theta.sin())
                    }
                    Footprint::Cube => Vec3::new(
                        (rng.gen::<f32>() - 0.5) * 2.0 * radius,
                        (rng.gen::<f32>() - 0.5) * 2.0 * radius,
                        (rng.gen::<f32>() - 0.5) * 2.0 * radius,
                    ),
                };
                lateral + Vec3::Y * lerp(height, rng.gen())
            }
            EmissionShape::SphericalShell {
                radius,
                distribution,
            } => {
                let r = radius * distribution.apply(rng.gen());
                let theta = rng.gen::<f32>() * TAU;
                let phi = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
                Vec3::new(
                    r * phi.sin() * theta.cos(),
                    r * phi.sin() * theta.sin(),
                    r * phi.cos(),
                )
            }
            EmissionShape::Band { half_extent } => Vec3::new(
                (rng.gen::<f32>() - 0.5) * 2.0 * half_extent.x,
                (rng.gen::<f32>() - 0.5) * 2.0 * half_extent.y,
                (rng.gen::<f32>() - 0.5) * 2.0 * half_extent.z,
            ),
        };

        let size = lerp(&self.size, rng.gen());
        let start_jitter = rng.gen::<f32>() * self.time_jitter.clamp(0.0, Self::MAX_TIME_JITTER);

        let velocity = match self.velocity {
            VelocityMode::Zero => Vec3::ZERO,
            VelocityMode::Fixed(v) => v,
            VelocityMode::Scatter => Vec3::new(
                (rng.gen::<f32>() - 0.5) * 2.0,
                rng.gen::<f32>(),
                (rng.gen::<f32>() - 0.5) * 2.0,
            ),
            VelocityMode::Radial(speed) => {
                if offset.length_squared() > 1e-8 {
                    offset.normalize() * speed
                } else {
                    random_direction(rng) * speed
                }
            }
        };

        let angle = (rng.gen::<f32>() - 0.5) * 2.0;

        Emission {
            offset,
            size,
            start_jitter,
            velocity,
            angle,
        }
    }
}

/// Map `t ∈ [0, 1)` onto `range` without panicking on empty ranges.
#[inline]
fn lerp(range: &Range<f32>, t: f32) -> f32 {
    range.start + (range.end - range.start) * t
}

/// Random unit vector (uniformly distributed on unit sphere).
fn random_direction<R: Rng>(rng: &mut R) -> Vec3 {
    let theta = rng.gen::<f32>() * TAU;
    let phi = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    debug_assert!((0.0..=PI).contains(&phi));
    Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
}
