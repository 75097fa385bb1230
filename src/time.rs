//! Monotonic effect clock.
//!
//! Effects are driven by absolute time in seconds. Hosts that already own a
//! clock pass their own value to [`EffectHost::advance`](crate::EffectHost::advance);
//! everything else can use [`FrameClock`].
//!
//! The clock accumulates scaled frame deltas instead of reading wall time
//! directly, so pausing or slowing it never makes `elapsed()` jump backwards.
//!
//! # Example
//!
//! ```ignore
//! use spindrift::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//!
//! // In your render loop:
//! let now = clock.tick();
//! host.advance(now);
//! ```

use std::time::{Duration, Instant};

/// Frame timing for effect hosts.
///
/// Provides elapsed time, delta time, frame counting and an FPS estimate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// When the last tick occurred.
    last_tick: Instant,
    /// Accumulated scaled time in seconds. Kept in `f64` so frame-sized
    /// steps still register after days of uptime.
    elapsed_secs: f64,
    /// Scaled time added by the last tick.
    delta_secs: f32,
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    /// Fixed delta time for deterministic stepping (optional).
    fixed_delta: Option<f32>,
    /// Time scale multiplier (1.0 = normal speed).
    time_scale: f32,
}

impl FrameClock {
    /// Create a clock at zero, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_tick: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Advance by the wall time since the previous tick. Call once per frame.
    ///
    /// Returns the new elapsed time.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        let elapsed = self.step(self.fixed_delta.map_or(raw_delta, f64::from));

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        elapsed
    }

    /// Advance by an explicit delta in seconds, ignoring wall time.
    ///
    /// Negative and non-finite deltas count as zero.
    pub fn advance_by(&mut self, delta: f64) -> f64 {
        self.last_tick = Instant::now();
        self.step(delta)
    }

    fn step(&mut self, raw_delta: f64) -> f64 {
        self.frame_count += 1;
        if self.paused {
            self.delta_secs = 0.0;
            return self.elapsed_secs;
        }
        let raw_delta = if raw_delta.is_finite() { raw_delta.max(0.0) } else { 0.0 };
        let delta = raw_delta * f64::from(self.time_scale);
        self.delta_secs = delta as f32;
        self.elapsed_secs += delta;
        self.elapsed_secs
    }

    /// Total scaled time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed_secs
    }

    /// Scaled time added by the last tick.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Ticks since creation or the last reset.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Stop time. While paused `delta()` is 0 and `elapsed()` holds.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after [`pause`](Self::pause). The paused interval is skipped.
    pub fn resume(&mut self) {
        if self.paused {
            self.last_tick = Instant::now();
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Use a fixed step per tick instead of wall time. `None` restores
    /// wall-time stepping.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Set time scale multiplier.
    ///
    /// - `1.0` = normal speed
    /// - `0.5` = half speed (slow motion)
    /// - `2.0` = double speed
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    }

    /// Return to zero.
    ///
    /// Effects treat a clock that goes backwards as a regression, so rebuild
    /// or reselect them after a reset.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_tick = now;
        self.elapsed_secs = 0.0;
        self.delta_secs = 0.0;
        self.frame_count = 0;
        self.fps = 0.0;
        self.fps_frame_count = 0;
        self.fps_update_time = now;
        self.paused = false;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
