//! The effect host: owns the active effect and drives it frame by frame.
//!
//! The host is the only thing a render loop talks to. Per frame it applies
//! a pending target, advances the effect and hands its buffers to the
//! rendering stage, always in that order:
//!
//! ```ignore
//! let mut host = EffectHost::new(EffectKind::ImpulseTrail);
//! host.set_resolution(Vec2::new(1920.0, 1080.0));
//!
//! // Each frame
//! let now = clock.tick();
//! host.frame(now, pointer_world_position);
//! gpu.sync(&queue, host.active_mut());
//!
//! // From a UI
//! host.select_by_name("smoke")?;
//! host.set_parameter("uSpeed", UniformValue::F32(1.5))?;
//! ```
//!
//! Swapping effects drops the old module whole and builds the new one
//! spawned at the last advanced time, with the current resolution applied.

use crate::effects::{
    EffectConfig, EffectModule, ImpulseTrail, PerlinField, Rain, Smoke, Trail,
};
use crate::error::EffectError;
use crate::pool::SweepReport;
use crate::uniforms::UniformValue;
use glam::{Vec2, Vec3};
use std::fmt;
use std::str::FromStr;

/// The built-in effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectKind {
    Rain,
    Smoke,
    PerlinField,
    Trail,
    ImpulseTrail,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        EffectKind::Rain,
        EffectKind::Smoke,
        EffectKind::PerlinField,
        EffectKind::Trail,
        EffectKind::ImpulseTrail,
    ];

    /// Name used for selection and in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Rain => "rain",
            EffectKind::Smoke => "smoke",
            EffectKind::PerlinField => "perlin_field",
            EffectKind::Trail => "trail",
            EffectKind::ImpulseTrail => "impulse_trail",
        }
    }

    pub fn default_capacity(self) -> usize {
        match self {
            EffectKind::Rain => Rain::DEFAULT_CAPACITY,
            EffectKind::Smoke => Smoke::DEFAULT_CAPACITY,
            EffectKind::PerlinField => PerlinField::DEFAULT_CAPACITY,
            EffectKind::Trail => Trail::DEFAULT_CAPACITY,
            EffectKind::ImpulseTrail => ImpulseTrail::DEFAULT_CAPACITY,
        }
    }

    /// Build the effect with default parameters.
    pub fn build(self, config: EffectConfig) -> Box<dyn EffectModule> {
        match self {
            EffectKind::Rain => Box::new(Rain::new(config)),
            EffectKind::Smoke => Box::new(Smoke::new(config)),
            EffectKind::PerlinField => Box::new(PerlinField::new(config)),
            EffectKind::Trail => Box::new(Trail::new(config)),
            EffectKind::ImpulseTrail => Box::new(ImpulseTrail::new(config)),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EffectError::UnknownEffect(s.to_string()))
    }
}

/// Owns the active effect and forwards time, targets and controls to it.
pub struct EffectHost {
    active: Box<dyn EffectModule>,
    kind: Option<EffectKind>,
    config: EffectConfig,
    resolution: Vec2,
    last_time: f64,
    /// An unsupported target was already reported at warn for this module.
    target_warned: bool,
}

impl EffectHost {
    /// Host a built-in effect with default configuration.
    pub fn new(kind: EffectKind) -> Self {
        Self::with_config(kind, EffectConfig::default())
    }

    /// Host a built-in effect. `config` is reused for every later swap, with
    /// its start time replaced by the host's last advanced time.
    pub fn with_config(kind: EffectKind, config: EffectConfig) -> Self {
        let mut host = Self::with_module(kind.build(config));
        host.kind = Some(kind);
        host.config = config;
        host.last_time = config.start_time;
        host
    }

    /// Host a custom effect.
    pub fn with_module(module: Box<dyn EffectModule>) -> Self {
        let mut host = Self {
            active: module,
            kind: None,
            config: EffectConfig::default(),
            resolution: crate::effects::DEFAULT_RESOLUTION,
            last_time: 0.0,
            target_warned: false,
        };
        host.active.set_resolution(host.resolution);
        host
    }

    /// Kind of the active effect; `None` for custom modules.
    pub fn kind(&self) -> Option<EffectKind> {
        self.kind
    }

    pub fn active(&self) -> &dyn EffectModule {
        &*self.active
    }

    pub fn active_mut(&mut self) -> &mut dyn EffectModule {
        &mut *self.active
    }

    /// Time passed to the last successful advance.
    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }

    /// Switch to a built-in effect. Selecting the active kind does nothing.
    pub fn select(&mut self, kind: EffectKind) {
        if self.kind == Some(kind) {
            log::debug!("effect host: {} already active", kind);
            return;
        }
        let config = self.config.with_start_time(self.last_time);
        self.replace(kind.build(config));
        self.kind = Some(kind);
    }

    /// Switch to a built-in effect by name.
    pub fn select_by_name(&mut self, name: &str) -> Result<(), EffectError> {
        let kind = name.parse::<EffectKind>()?;
        self.select(kind);
        Ok(())
    }

    /// Swap in a custom module.
    pub fn set_module(&mut self, module: Box<dyn EffectModule>) {
        self.replace(module);
        self.kind = None;
    }

    fn replace(&mut self, mut module: Box<dyn EffectModule>) {
        module.set_resolution(self.resolution);
        log::info!(
            "effect host: {} -> {} ({} particles)",
            self.active.name(),
            module.name(),
            module.pool().capacity()
        );
        self.active = module;
        self.target_warned = false;
    }

    /// Advance the active effect to `time` seconds.
    pub fn advance(&mut self, time: f64) -> SweepReport {
        let report = self.active.advance(time);
        if !report.skipped {
            self.last_time = time;
        }
        report
    }

    /// Point the active effect at a world-space position.
    ///
    /// Effects without the targeting capability are left untouched and
    /// `UnsupportedOperation` is returned. The first refusal per module is
    /// logged at warn, later ones at debug.
    pub fn set_target(&mut self, position: Vec3) -> Result<(), EffectError> {
        let effect = self.active.name();
        match self.active.as_targetable() {
            Some(target) => {
                target.set_target(position);
                Ok(())
            }
            None => {
                let err = EffectError::UnsupportedOperation {
                    effect,
                    operation: "set_target",
                };
                if self.target_warned {
                    log::debug!("effect host: {}", err);
                } else {
                    log::warn!("effect host: {}", err);
                    self.target_warned = true;
                }
                Err(err)
            }
        }
    }

    /// One frame: apply `target` if any, then advance.
    ///
    /// An unsupported target is logged and skipped; the frame still advances.
    pub fn frame(&mut self, time: f64, target: Option<Vec3>) -> SweepReport {
        if let Some(position) = target {
            let _ = self.set_target(position);
        }
        self.advance(time)
    }

    /// Push the viewport size to the active effect and every later one.
    pub fn set_resolution(&mut self, resolution: Vec2) {
        self.resolution = resolution;
        self.active.set_resolution(resolution);
    }

    pub fn set_parameter(&mut self, name: &str, value: UniformValue) -> Result<(), EffectError> {
        self.active.set_parameter(name, value)
    }
}

impl fmt::Debug for EffectHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHost")
            .field("active", &self.active.name())
            .field("kind", &self.kind)
            .field("resolution", &self.resolution)
            .field("last_time", &self.last_time)
            .finish()
    }
}
