//! Motion laws: where a particle is drawn as a function of its age.
//!
//! The CPU core never integrates particle motion. It keeps `spawnOrigin`,
//! `startTime` and the parameter bindings current, and the rendering stage
//! evaluates one of three closed-form laws per vertex:
//!
//! | Law | Formula |
//! |-----|---------|
//! | [`MotionLaw::Drift`] | `origin + velocity·speed·age`, optionally wrapped or capped in y |
//! | [`MotionLaw::Impulse`] | `origin + v₀·t + ½·F·t²` with `t = min(age, forceTime)`, plus `correction` once `age ≥ forceTime` |
//! | [`MotionLaw::Wave`] | `origin` pushed along XY away from a click by a travelling, fading ring |
//!
//! [`MotionLaw::position`] evaluates the same formulas as each effect's WGSL
//! on the CPU, for tests and for hosts that want to pick or cull particles.
//!
//! The WGSL side is assembled here too: every effect's shader source starts
//! with [`shader_prelude`], which declares the uniform struct in binding order
//! and the shared helpers, followed by the effect's own
//! `particle_position`/`particle_size` functions.

use crate::attributes::Attribute;
use crate::uniforms::ParameterBindings;
use glam::Vec3;

/// Name of the WGSL uniform struct every effect declares.
pub const UNIFORM_STRUCT: &str = "EffectUniforms";

/// Name of the WGSL uniform variable holding the effect's bindings.
pub const UNIFORM_VAR: &str = "effect";

/// Closed-form position law with its current parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionLaw {
    /// Linear drift along the particle's own velocity.
    Drift {
        speed: f32,
        /// Wrap y into `[min, max)` with a floored modulo.
        wrap: Option<(f32, f32)>,
        /// Upper limit on y.
        cap_y: Option<f32>,
    },
    /// Constant force for `force_time` seconds, then a fixed offset.
    Impulse {
        initial_velocity: Vec3,
        force: Vec3,
        force_time: f32,
        post_correction: Vec3,
    },
    /// Static points displaced by a click wave, as of one moment.
    ///
    /// `since` is the time from the click to that moment. The law ignores
    /// particle age.
    Wave {
        center: Vec3,
        since: f32,
        speed: f32,
        spread: f32,
        dissipation: f32,
        force: f32,
    },
}

impl MotionLaw {
    /// Drift without wrap or cap.
    pub fn drift(speed: f32) -> Self {
        MotionLaw::Drift {
            speed,
            wrap: None,
            cap_y: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MotionLaw::Drift { .. } => "drift",
            MotionLaw::Impulse { .. } => "impulse",
            MotionLaw::Wave { .. } => "wave",
        }
    }

    /// Rendered position of a particle of the given age.
    ///
    /// Negative ages (respawn delay still running) evaluate to the origin.
    pub fn position(&self, origin: Vec3, velocity: Vec3, age: f32) -> Vec3 {
        let age = age.max(0.0);
        match *self {
            MotionLaw::Drift { speed, wrap, cap_y } => {
                let mut p = origin + velocity * speed * age;
                if let Some((min, max)) = wrap {
                    let span = (max - min).max(0.0001);
                    let shifted = p.y - min;
                    p.y = min + shifted - (shifted / span).floor() * span;
                }
                if let Some(cap) = cap_y {
                    p.y = p.y.min(cap);
                }
                p
            }
            MotionLaw::Impulse {
                initial_velocity,
                force,
                force_time,
                post_correction,
            } => {
                let t = age.min(force_time);
                let mut p = origin + initial_velocity * t + 0.5 * force * t * t;
                if age >= force_time {
                    p += post_correction;
                }
                p
            }
            MotionLaw::Wave {
                center,
                since,
                speed,
                spread,
                dissipation,
                force,
            } => {
                let since = since.max(0.0);
                let offset = (origin - center).truncate();
                let d = offset.length();
                if d < 0.0001 {
                    return origin;
                }
                let ring = (-(d - since * speed).abs() * spread).exp();
                let fade = (-since * dissipation).exp();
                origin + (offset / d).extend(0.0) * ring * fade * force
            }
        }
    }
}

/// WGSL vertex input struct, one location per attribute in upload order.
///
/// Matches [`crate::gpu::vertex_layouts`].
pub fn vertex_input_wgsl() -> String {
    let fields = Attribute::ALL
        .iter()
        .enumerate()
        .map(|(location, attr)| {
            let ty = if attr.components() == 3 { "vec3<f32>" } else { "f32" };
            format!("    @location({}) {}: {},", location, attr.name(), ty)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("struct ParticleAttributes {{\n{}\n}};\n", fields)
}

/// Shared helpers available to every effect's motion code.
pub const MOTION_HELPERS_WGSL: &str = r#"
fn particle_age(start_time: f32) -> f32 {
    return max(effect.uTime - start_time, 0.0);
}

fn drift(origin: vec3<f32>, velocity: vec3<f32>, speed: f32, age: f32) -> vec3<f32> {
    return origin + velocity * speed * age;
}

fn impulse(
    origin: vec3<f32>,
    initial_velocity: vec3<f32>,
    force: vec3<f32>,
    force_time: f32,
    correction: vec3<f32>,
    age: f32,
) -> vec3<f32> {
    let t = min(age, force_time);
    var p = origin + initial_velocity * t + 0.5 * force * t * t;
    if (age >= force_time) {
        p = p + correction;
    }
    return p;
}
"#;

/// Uniform declaration, vertex input struct and shared helpers.
pub fn shader_prelude(bindings: &ParameterBindings) -> String {
    format!(
        "{}\n@group(0) @binding(0) var<uniform> {}: {};\n\n{}{}",
        bindings.to_wgsl_struct(UNIFORM_STRUCT),
        UNIFORM_VAR,
        UNIFORM_STRUCT,
        vertex_input_wgsl(),
        MOTION_HELPERS_WGSL
    )
}
