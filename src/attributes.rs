//! Fixed-capacity struct-of-arrays particle storage.
//!
//! A particle is a row across parallel arrays rather than a boxed object:
//!
//! | Attribute | Type | Written |
//! |-----------|------|---------|
//! | `position` | `Vec3` | at spawn and respawn |
//! | `spawnOrigin` | `Vec3` | at spawn and respawn only |
//! | `prevSpawnOrigin` | `Vec3` | at respawn, before `spawnOrigin` is overwritten |
//! | `startTime` | `f64` | at spawn and respawn |
//! | `size` | `f32` | once, at construction |
//! | `velocity` | `Vec3` | at spawn and respawn |
//! | `angle` | `f32` | at spawn and respawn |
//!
//! Every write marks its attribute dirty so the rendering boundary only
//! re-uploads arrays that changed. The capacity never changes; use
//! [`AttributeBuffer::copy_from`] to move rows into a larger buffer.
//!
//! # Time epoch
//!
//! Start times are absolute `f64` seconds. Shaders only get `f32`, so the
//! buffer also keeps each start time relative to a time epoch, and that
//! mirror is what [`Attribute::StartTime`] uploads. The owning pool moves the
//! epoch forward as time passes ([`AttributeBuffer::rebase`]), which keeps
//! the uploaded values small enough for `f32` to resolve sub-millisecond
//! ages after any uptime.

use crate::error::EffectError;
use glam::Vec3;

/// Names one attribute array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    SpawnOrigin,
    PrevSpawnOrigin,
    StartTime,
    Size,
    Velocity,
    Angle,
}

impl Attribute {
    /// All attributes in upload order.
    pub const ALL: [Attribute; 7] = [
        Attribute::Position,
        Attribute::SpawnOrigin,
        Attribute::PrevSpawnOrigin,
        Attribute::StartTime,
        Attribute::Size,
        Attribute::Velocity,
        Attribute::Angle,
    ];

    /// Attribute name as seen by shaders.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Position => "position",
            Attribute::SpawnOrigin => "spawnOrigin",
            Attribute::PrevSpawnOrigin => "prevSpawnOrigin",
            Attribute::StartTime => "startTime",
            Attribute::Size => "size",
            Attribute::Velocity => "velocity",
            Attribute::Angle => "angle",
        }
    }

    /// Number of `f32` components per particle.
    pub fn components(self) -> usize {
        match self {
            Attribute::Position
            | Attribute::SpawnOrigin
            | Attribute::PrevSpawnOrigin
            | Attribute::Velocity => 3,
            Attribute::StartTime | Attribute::Size | Attribute::Angle => 1,
        }
    }

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of attributes changed since the last upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags(u8);

impl DirtyFlags {
    /// Every attribute dirty.
    pub fn all() -> Self {
        let mut flags = Self::default();
        for attr in Attribute::ALL {
            flags.mark(attr);
        }
        flags
    }

    pub fn mark(&mut self, attr: Attribute) {
        self.0 |= attr.bit();
    }

    pub fn is_dirty(&self, attr: Attribute) -> bool {
        self.0 & attr.bit() != 0
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Dirty attributes in upload order.
    pub fn iter(self) -> impl Iterator<Item = Attribute> {
        Attribute::ALL.into_iter().filter(move |a| self.is_dirty(*a))
    }
}

/// Borrowed view of one attribute array.
#[derive(Debug, Clone, Copy)]
pub enum AttributeData<'a> {
    Vec3(&'a [Vec3]),
    Scalar(&'a [f32]),
}

impl<'a> AttributeData<'a> {
    /// Raw bytes for upload.
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            AttributeData::Vec3(v) => bytemuck::cast_slice(v),
            AttributeData::Scalar(v) => bytemuck::cast_slice(v),
        }
    }

    /// Number of particles in the view.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Vec3(v) => v.len(),
            AttributeData::Scalar(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Struct-of-arrays storage for a fixed number of particles.
#[derive(Debug, Clone)]
pub struct AttributeBuffer {
    position: Vec<Vec3>,
    spawn_origin: Vec<Vec3>,
    prev_spawn_origin: Vec<Vec3>,
    start_time: Vec<f64>,
    /// `start_time - time_epoch`, the uploaded form.
    relative_start_time: Vec<f32>,
    time_epoch: f64,
    size: Vec<f32>,
    velocity: Vec<Vec3>,
    angle: Vec<f32>,
    dirty: DirtyFlags,
}

impl AttributeBuffer {
    /// Allocate zeroed storage for `capacity` particles.
    ///
    /// All attributes start dirty so the first upload sends everything.
    pub fn new(capacity: usize) -> Self {
        Self {
            position: vec![Vec3::ZERO; capacity],
            spawn_origin: vec![Vec3::ZERO; capacity],
            prev_spawn_origin: vec![Vec3::ZERO; capacity],
            start_time: vec![0.0; capacity],
            relative_start_time: vec![0.0; capacity],
            time_epoch: 0.0,
            size: vec![0.0; capacity],
            velocity: vec![Vec3::ZERO; capacity],
            angle: vec![0.0; capacity],
            dirty: DirtyFlags::all(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.start_time.len()
    }

    #[inline]
    fn check(&self, index: usize) -> Result<(), EffectError> {
        if index < self.capacity() {
            Ok(())
        } else {
            Err(EffectError::IndexOutOfBounds {
                index,
                capacity: self.capacity(),
            })
        }
    }

    // ========== Indexed reads ==========

    pub fn position(&self, index: usize) -> Result<Vec3, EffectError> {
        self.check(index)?;
        Ok(self.position[index])
    }

    pub fn spawn_origin(&self, index: usize) -> Result<Vec3, EffectError> {
        self.check(index)?;
        Ok(self.spawn_origin[index])
    }

    pub fn prev_spawn_origin(&self, index: usize) -> Result<Vec3, EffectError> {
        self.check(index)?;
        Ok(self.prev_spawn_origin[index])
    }

    pub fn start_time(&self, index: usize) -> Result<f64, EffectError> {
        self.check(index)?;
        Ok(self.start_time[index])
    }

    pub fn size(&self, index: usize) -> Result<f32, EffectError> {
        self.check(index)?;
        Ok(self.size[index])
    }

    pub fn velocity(&self, index: usize) -> Result<Vec3, EffectError> {
        self.check(index)?;
        Ok(self.velocity[index])
    }

    pub fn angle(&self, index: usize) -> Result<f32, EffectError> {
        self.check(index)?;
        Ok(self.angle[index])
    }

    // ========== Indexed writes ==========

    pub fn set_position(&mut self, index: usize, value: Vec3) -> Result<(), EffectError> {
        self.check(index)?;
        self.position[index] = value;
        self.dirty.mark(Attribute::Position);
        Ok(())
    }

    pub fn set_spawn_origin(&mut self, index: usize, value: Vec3) -> Result<(), EffectError> {
        self.check(index)?;
        self.spawn_origin[index] = value;
        self.dirty.mark(Attribute::SpawnOrigin);
        Ok(())
    }

    pub fn set_prev_spawn_origin(&mut self, index: usize, value: Vec3) -> Result<(), EffectError> {
        self.check(index)?;
        self.prev_spawn_origin[index] = value;
        self.dirty.mark(Attribute::PrevSpawnOrigin);
        Ok(())
    }

    pub fn set_start_time(&mut self, index: usize, value: f64) -> Result<(), EffectError> {
        self.check(index)?;
        self.write_start_time(index, value);
        self.dirty.mark(Attribute::StartTime);
        Ok(())
    }

    pub fn set_size(&mut self, index: usize, value: f32) -> Result<(), EffectError> {
        self.check(index)?;
        self.size[index] = value;
        self.dirty.mark(Attribute::Size);
        Ok(())
    }

    pub fn set_velocity(&mut self, index: usize, value: Vec3) -> Result<(), EffectError> {
        self.check(index)?;
        self.velocity[index] = value;
        self.dirty.mark(Attribute::Velocity);
        Ok(())
    }

    pub fn set_angle(&mut self, index: usize, value: f32) -> Result<(), EffectError> {
        self.check(index)?;
        self.angle[index] = value;
        self.dirty.mark(Attribute::Angle);
        Ok(())
    }

    // ========== Whole-array access ==========

    pub fn positions(&self) -> &[Vec3] {
        &self.position
    }

    pub fn spawn_origins(&self) -> &[Vec3] {
        &self.spawn_origin
    }

    pub fn prev_spawn_origins(&self) -> &[Vec3] {
        &self.prev_spawn_origin
    }

    pub fn start_times(&self) -> &[f64] {
        &self.start_time
    }

    /// Start times relative to [`time_epoch`](Self::time_epoch), as uploaded.
    pub fn relative_start_times(&self) -> &[f32] {
        &self.relative_start_time
    }

    pub fn sizes(&self) -> &[f32] {
        &self.size
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocity
    }

    pub fn angles(&self) -> &[f32] {
        &self.angle
    }

    /// Borrow one attribute array by name.
    pub fn data(&self, attr: Attribute) -> AttributeData<'_> {
        match attr {
            Attribute::Position => AttributeData::Vec3(&self.position),
            Attribute::SpawnOrigin => AttributeData::Vec3(&self.spawn_origin),
            Attribute::PrevSpawnOrigin => AttributeData::Vec3(&self.prev_spawn_origin),
            Attribute::StartTime => AttributeData::Scalar(&self.relative_start_time),
            Attribute::Size => AttributeData::Scalar(&self.size),
            Attribute::Velocity => AttributeData::Vec3(&self.velocity),
            Attribute::Angle => AttributeData::Scalar(&self.angle),
        }
    }

    /// Raw bytes of one attribute array.
    pub fn as_bytes(&self, attr: Attribute) -> &[u8] {
        self.data(attr).as_bytes()
    }

    // ========== Time epoch ==========

    /// Absolute time the uploaded start times are measured from.
    pub fn time_epoch(&self) -> f64 {
        self.time_epoch
    }

    /// Measure uploaded start times from `epoch` instead.
    ///
    /// Rewrites every relative start time and marks the attribute dirty.
    pub fn rebase(&mut self, epoch: f64) {
        self.time_epoch = epoch;
        for (relative, start) in self.relative_start_time.iter_mut().zip(&self.start_time) {
            *relative = (start - epoch) as f32;
        }
        self.dirty.mark(Attribute::StartTime);
    }

    #[inline]
    fn write_start_time(&mut self, index: usize, value: f64) {
        self.start_time[index] = value;
        self.relative_start_time[index] = (value - self.time_epoch) as f32;
    }

    // ========== Dirty tracking ==========

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn mark_dirty(&mut self, attr: Attribute) {
        self.dirty.mark(attr);
    }

    /// Forget pending changes once they have been uploaded.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Copy the overlapping prefix of `other` into this buffer.
    ///
    /// Used to grow a pool: allocate a larger buffer, copy, fill the tail.
    /// Returns the number of rows copied.
    pub fn copy_from(&mut self, other: &AttributeBuffer) -> usize {
        let n = self.capacity().min(other.capacity());
        self.position[..n].copy_from_slice(&other.position[..n]);
        self.spawn_origin[..n].copy_from_slice(&other.spawn_origin[..n]);
        self.prev_spawn_origin[..n].copy_from_slice(&other.prev_spawn_origin[..n]);
        self.start_time[..n].copy_from_slice(&other.start_time[..n]);
        for i in 0..n {
            self.relative_start_time[i] = (self.start_time[i] - self.time_epoch) as f32;
        }
        self.size[..n].copy_from_slice(&other.size[..n]);
        self.velocity[..n].copy_from_slice(&other.velocity[..n]);
        self.angle[..n].copy_from_slice(&other.angle[..n]);
        if n > 0 {
            self.dirty = DirtyFlags::all();
        }
        n
    }

    /// First spawn of a slot. There is no earlier origin, so both origins
    /// match and the size is written.
    pub(crate) fn spawn_slot(
        &mut self,
        index: usize,
        origin: Vec3,
        start_time: f64,
        size: f32,
        velocity: Vec3,
        angle: f32,
    ) {
        self.respawn_slot(index, origin, start_time, velocity, angle);
        self.prev_spawn_origin[index] = origin;
        self.size[index] = size;
    }

    /// Rewrite the spawn state of a slot the caller has already bounds-checked.
    ///
    /// `prevSpawnOrigin` receives the old origin before it is replaced. Dirty
    /// flags are left to the caller so a sweep marks them once.
    #[inline]
    pub(crate) fn respawn_slot(
        &mut self,
        index: usize,
        origin: Vec3,
        start_time: f64,
        velocity: Vec3,
        angle: f32,
    ) {
        self.prev_spawn_origin[index] = self.spawn_origin[index];
        self.spawn_origin[index] = origin;
        self.position[index] = origin;
        self.write_start_time(index, start_time);
        self.velocity[index] = velocity;
        self.angle[index] = angle;
    }

    /// Mark every attribute a respawn touches.
    pub(crate) fn mark_respawned(&mut self) {
        self.dirty.mark(Attribute::PrevSpawnOrigin);
        self.dirty.mark(Attribute::SpawnOrigin);
        self.dirty.mark(Attribute::Position);
        self.dirty.mark(Attribute::StartTime);
        self.dirty.mark(Attribute::Velocity);
        self.dirty.mark(Attribute::Angle);
    }
}
