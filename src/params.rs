//! Typed, range-checked effect parameter sets.
//!
//! Each effect owns one plain struct of controls annotated with
//! `#[derive(ParameterSet)]`. The derive records every control's uniform
//! name, label and inclusive range in [`ParameterSet::SPECS`] and generates a
//! clamping `set_<field>` method per control, so out-of-range writes are
//! normalized where they are assigned instead of being rejected.
//!
//! # Example
//!
//! ```ignore
//! #[derive(ParameterSet, Clone, Debug)]
//! #[parameters(effect = "sparks")]
//! struct SparkParams {
//!     #[param(uniform = "uSize", label = "Size", min = 0.1, max = 10.0)]
//!     size: f32,
//! }
//!
//! let mut params = SparkParams { size: 1.0 };
//! params.set_size(50.0);
//! assert_eq!(params.size, 10.0);
//! ```

use crate::error::EffectError;
use crate::uniforms::{ParameterBindings, UniformValue};
use glam::{Vec2, Vec3};

/// Value kind of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    F32,
    U32,
    Bool,
    Vec2,
    Vec3,
}

/// Static description of one control in a parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    /// Rust field name.
    pub field: &'static str,
    /// Name the value is bound under for the shader.
    pub uniform: &'static str,
    /// Human-readable control name.
    pub label: &'static str,
    pub kind: ParameterKind,
    /// Inclusive lower bound (per component for vectors).
    pub min: f32,
    /// Inclusive upper bound (per component for vectors).
    pub max: f32,
}

impl ParameterSpec {
    /// Whether `name` addresses this parameter (field or uniform name).
    pub fn matches(&self, name: &str) -> bool {
        self.field == name || self.uniform == name
    }
}

/// Trait implemented by `#[derive(ParameterSet)]`.
///
/// # Do Not Implement Manually
///
/// The derive keeps `SPECS`, lookup, clamping and binding export in sync;
/// hand-written impls tend to drift from the struct.
pub trait ParameterSet: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Effect name used in diagnostics.
    const EFFECT: &'static str;

    /// Every declared parameter, in binding order.
    const SPECS: &'static [ParameterSpec];

    /// Read a parameter by field or uniform name.
    fn get(&self, name: &str) -> Option<UniformValue>;

    /// Write a parameter by field or uniform name, clamping into range.
    ///
    /// Fails only for names the set does not declare or for values of the
    /// wrong kind; range violations are clamped.
    fn set(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError>;

    /// Append or refresh every parameter in `bindings`.
    fn write_bindings(&self, bindings: &mut ParameterBindings);

    /// Clamp every field into range and apply cross-field constraints.
    fn normalize(&mut self);

    /// Look up the spec for a field or uniform name.
    fn spec(name: &str) -> Option<&'static ParameterSpec> {
        Self::SPECS.iter().find(|s| s.matches(name))
    }
}

/// Clamp a scalar write, logging when the requested value was out of range.
///
/// NaN writes are discarded and the current value is kept.
pub fn clamp_f32(effect: &str, name: &str, current: f32, value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        log::debug!("{}: ignoring NaN write to {}", effect, name);
        return current;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::debug!(
            "{}: {} = {} is outside [{}, {}], clamped to {}",
            effect,
            name,
            value,
            min,
            max,
            clamped
        );
    }
    clamped
}

/// Integer variant of [`clamp_f32`].
pub fn clamp_u32(effect: &str, name: &str, current: u32, value: u32, min: f32, max: f32) -> u32 {
    let lo = if min.is_finite() { min.max(0.0).ceil() as u32 } else { 0 };
    let hi = if max.is_finite() { max.max(0.0).floor() as u32 } else { u32::MAX };
    if hi < lo {
        return current;
    }
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        log::debug!(
            "{}: {} = {} is outside [{}, {}], clamped to {}",
            effect,
            name,
            value,
            lo,
            hi,
            clamped
        );
    }
    clamped
}

/// Per-component clamp of a `Vec2` write.
pub fn clamp_vec2(effect: &str, name: &str, current: Vec2, value: Vec2, min: f32, max: f32) -> Vec2 {
    Vec2::new(
        clamp_f32(effect, name, current.x, value.x, min, max),
        clamp_f32(effect, name, current.y, value.y, min, max),
    )
}

/// Per-component clamp of a `Vec3` write.
pub fn clamp_vec3(effect: &str, name: &str, current: Vec3, value: Vec3, min: f32, max: f32) -> Vec3 {
    Vec3::new(
        clamp_f32(effect, name, current.x, value.x, min, max),
        clamp_f32(effect, name, current.y, value.y, min, max),
        clamp_f32(effect, name, current.z, value.z, min, max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_f32() {
        assert_eq!(clamp_f32("t", "uSize", 1.0, 20.0, 0.1, 10.0), 10.0);
        assert_eq!(clamp_f32("t", "uSize", 1.0, -3.0, 0.1, 10.0), 0.1);
        assert_eq!(clamp_f32("t", "uSize", 1.0, 4.0, 0.1, 10.0), 4.0);
        assert_eq!(clamp_f32("t", "uSize", 1.0, f32::NAN, 0.1, 10.0), 1.0);
    }

    #[test]
    fn test_clamp_u32_uses_integer_bounds() {
        assert_eq!(clamp_u32("t", "uOctaves", 2, 0, 1.0, 10.0), 1);
        assert_eq!(clamp_u32("t", "uOctaves", 2, 99, 1.0, 10.0), 10);
        assert_eq!(clamp_u32("t", "uOctaves", 2, 5, f32::NEG_INFINITY, f32::INFINITY), 5);
    }

    #[test]
    fn test_clamp_vec3_per_component() {
        let v = clamp_vec3(
            "t",
            "uColor",
            Vec3::ZERO,
            Vec3::new(-1.0, 0.5, 2.0),
            0.0,
            1.0,
        );
        assert_eq!(v, Vec3::new(0.0, 0.5, 1.0));
    }
}
