//! Shader parameter values and the per-effect binding snapshot.
//!
//! Every effect publishes its parameter set, the current time and the
//! viewport resolution as an ordered list of named [`UniformValue`]s. The
//! rendering boundary reads the list once per frame and either uploads it as
//! one uniform buffer ([`ParameterBindings::to_bytes`]) or declares the
//! matching WGSL struct ([`ParameterBindings::to_wgsl_struct`]).
//!
//! # Example
//!
//! ```ignore
//! let mut bindings = ParameterBindings::new();
//! bindings.set("uTime", 1.5f32);
//! bindings.set("uObjectPosition", Vec3::new(0.0, 1.0, 0.0));
//!
//! assert_eq!(bindings.get("uTime"), Some(UniformValue::F32(1.5)));
//! ```

use glam::{Vec2, Vec3};
use std::collections::HashMap;

/// Supported parameter value types.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UniformValue {
    F32(f32),
    U32(u32),
    /// Stored as `u32` (0 or 1) on the GPU side.
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
}

impl UniformValue {
    /// Get the WGSL type name for this value.
    pub fn wgsl_type(&self) -> &'static str {
        match self {
            UniformValue::F32(_) => "f32",
            UniformValue::U32(_) | UniformValue::Bool(_) => "u32",
            UniformValue::Vec2(_) => "vec2<f32>",
            UniformValue::Vec3(_) => "vec3<f32>",
        }
    }

    /// Get the byte size of this value (without trailing padding).
    pub fn byte_size(&self) -> usize {
        match self {
            UniformValue::F32(_) | UniformValue::U32(_) | UniformValue::Bool(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec3(_) => 12, // 12 bytes, aligned to 16
        }
    }

    /// WGSL alignment of this value in a uniform struct.
    pub fn alignment(&self) -> usize {
        match self {
            UniformValue::Vec3(_) => 16,
            UniformValue::Vec2(_) => 8,
            _ => 4,
        }
    }

    /// Write this value to a byte buffer.
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        match self {
            UniformValue::F32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            UniformValue::U32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            UniformValue::Bool(v) => buf.extend_from_slice(&(*v as u32).to_le_bytes()),
            UniformValue::Vec2(v) => buf.extend_from_slice(bytemuck::bytes_of(v)),
            // No padding here - a following scalar may sit in the trailing bytes
            UniformValue::Vec3(v) => buf.extend_from_slice(bytemuck::bytes_of(v)),
        }
    }

    /// Read as `f32`, accepting integer values.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            UniformValue::F32(v) => Some(v),
            UniformValue::U32(v) => Some(v as f32),
            _ => None,
        }
    }

    /// Read as `u32`, accepting non-negative floats (rounded).
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            UniformValue::U32(v) => Some(v),
            UniformValue::F32(v) if v >= 0.0 => Some(v.round() as u32),
            _ => None,
        }
    }

    /// Read as `bool`, accepting `0`/`1` integers.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            UniformValue::Bool(v) => Some(v),
            UniformValue::U32(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match *self {
            UniformValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match *self {
            UniformValue::Vec3(v) => Some(v),
            _ => None,
        }
    }
}

// Conversion traits for ergonomic API
impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::U32(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

/// Ordered, named parameter values consumed by the rendering boundary.
#[derive(Clone, Debug, Default)]
pub struct ParameterBindings {
    /// Ordered list of (name, value) pairs.
    /// Order matters for WGSL struct layout.
    values: Vec<(&'static str, UniformValue)>,
    /// Quick lookup by name.
    indices: HashMap<&'static str, usize>,
}

impl ParameterBindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a value. New names are appended, existing names keep
    /// their slot so the layout stays stable across frames.
    pub fn set<V: Into<UniformValue>>(&mut self, name: &'static str, value: V) {
        let value = value.into();
        if let Some(&idx) = self.indices.get(name) {
            self.values[idx].1 = value;
        } else {
            let idx = self.values.len();
            self.values.push((name, value));
            self.indices.insert(name, idx);
        }
    }

    /// Get a value by name.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.indices.get(name).map(|&idx| self.values[idx].1)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate over all values in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, UniformValue)> + '_ {
        self.values.iter().map(|&(n, v)| (n, v))
    }

    /// WGSL struct declaration matching [`to_bytes`](Self::to_bytes).
    pub fn to_wgsl_struct(&self, struct_name: &str) -> String {
        let fields = self
            .values
            .iter()
            .map(|(name, value)| format!("    {}: {},", name, value.wgsl_type()))
            .collect::<Vec<_>>()
            .join("\n");
        format!("struct {} {{\n{}\n}};\n", struct_name, fields)
    }

    /// Serialize all values to bytes for GPU upload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (_, value) in &self.values {
            let align = value.alignment();
            while buf.len() % align != 0 {
                buf.push(0);
            }
            value.write_bytes(&mut buf);
        }
        // Round up to 16-byte alignment for the uniform buffer
        while buf.len() % 16 != 0 {
            buf.push(0);
        }
        buf
    }

    /// Total uniform buffer size in bytes.
    pub fn byte_size(&self) -> usize {
        self.to_bytes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_slot_order() {
        let mut bindings = ParameterBindings::new();
        bindings.set("uTime", 0.0f32);
        bindings.set("uSize", 2.0f32);
        bindings.set("uTime", 3.0f32);

        let names: Vec<_> = bindings.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["uTime", "uSize"]);
        assert_eq!(bindings.get("uTime"), Some(UniformValue::F32(3.0)));
    }

    #[test]
    fn test_byte_layout_pads_vectors() {
        let mut bindings = ParameterBindings::new();
        bindings.set("uTime", 1.0f32);
        bindings.set("uResolution", Vec2::new(800.0, 600.0));
        bindings.set("uColor", Vec3::new(0.1, 0.2, 0.3));
        bindings.set("uAlpha", 0.5f32);
        bindings.set("uOctaves", 2u32);

        let bytes = bindings.to_bytes();
        // f32 @0, vec2 @8, vec3 @16, f32 @28 (tail of vec3), u32 @32
        assert_eq!(bytes.len(), 48);
        assert_eq!(f32::from_le_bytes(bytes[8..12].try_into().unwrap()), 800.0);
        assert_eq!(f32::from_le_bytes(bytes[16..20].try_into().unwrap()), 0.1);
        assert_eq!(f32::from_le_bytes(bytes[28..32].try_into().unwrap()), 0.5);
        assert_eq!(u32::from_le_bytes(bytes[32..36].try_into().unwrap()), 2);
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(UniformValue::U32(3).as_f32(), Some(3.0));
        assert_eq!(UniformValue::F32(2.6).as_u32(), Some(3));
        assert_eq!(UniformValue::F32(-1.0).as_u32(), None);
        assert_eq!(UniformValue::U32(1).as_bool(), Some(true));
        assert_eq!(UniformValue::F32(1.0).as_vec3(), None);
    }

    #[test]
    fn test_wgsl_struct() {
        let mut bindings = ParameterBindings::new();
        bindings.set("uTime", 0.0f32);
        bindings.set("uInterpolate", false);
        let wgsl = bindings.to_wgsl_struct("EffectUniforms");
        assert!(wgsl.contains("struct EffectUniforms"));
        assert!(wgsl.contains("uTime: f32,"));
        assert!(wgsl.contains("uInterpolate: u32,"));
    }
}
