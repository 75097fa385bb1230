//! Error types for spindrift.
//!
//! Only programmer errors and control-surface misuse are surfaced here.
//! Out-of-range parameter values are not errors: they are clamped where they
//! are assigned (see [`crate::params`]).

use std::fmt;

/// Errors produced by the particle core and the effect host.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectError {
    /// A particle slot beyond the pool's capacity was addressed.
    IndexOutOfBounds {
        /// The offending slot index.
        index: usize,
        /// Fixed capacity of the buffer.
        capacity: usize,
    },
    /// The effect does not implement the requested capability.
    UnsupportedOperation {
        /// Name of the active effect.
        effect: &'static str,
        /// Operation that was attempted.
        operation: &'static str,
    },
    /// A string-keyed parameter write named no declared parameter.
    UnknownParameter {
        /// Name of the effect whose parameter set was addressed.
        effect: &'static str,
        /// The unrecognised name.
        name: String,
    },
    /// A string-keyed parameter write carried the wrong kind of value.
    ParameterType {
        /// Uniform name of the parameter.
        name: &'static str,
        /// Value kind the parameter accepts.
        expected: &'static str,
    },
    /// The host was asked to select an effect it does not know.
    UnknownEffect(String),
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectError::IndexOutOfBounds { index, capacity } => write!(
                f,
                "Particle index {} is out of bounds for a pool of capacity {}",
                index, capacity
            ),
            EffectError::UnsupportedOperation { effect, operation } => {
                write!(f, "Effect '{}' does not support {}", effect, operation)
            }
            EffectError::UnknownParameter { effect, name } => {
                write!(f, "Effect '{}' has no parameter named '{}'", effect, name)
            }
            EffectError::ParameterType { name, expected } => {
                write!(f, "Parameter '{}' expects a {} value", name, expected)
            }
            EffectError::UnknownEffect(name) => write!(
                f,
                "Unknown effect '{}'. Expected one of: rain, smoke, perlin_field, trail, impulse_trail",
                name
            ),
        }
    }
}

impl std::error::Error for EffectError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_context() {
        let err = EffectError::IndexOutOfBounds {
            index: 12,
            capacity: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("10"));

        let err = EffectError::UnsupportedOperation {
            effect: "rain",
            operation: "set_target",
        };
        assert!(err.to_string().contains("rain"));
        assert!(err.to_string().contains("set_target"));
    }
}
