//! Frame timing.
//!
//! [`Time`] is updated once at the start of every redraw. The sphere's spin
//! is a function of [`Time::elapsed_secs_f64`], so animation speed doesn't
//! depend on frame rate.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Time {
    /// When the viewer started.
    startup: Instant,
    /// When the current frame started.
    frame_start: Instant,
    /// Duration of the previous frame.
    delta: Duration,
    /// Total time since startup.
    elapsed: Duration,
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            frame_start: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Call at the start of each frame to update timing.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    fn update_at(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.frame_start);
        self.frame_start = now;
        self.elapsed = now.saturating_duration_since(self.startup);
        self.frame_count += 1;
    }

    /// Duration of the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Seconds since startup, in f64 so the spin angle keeps its precision
    /// over long sessions.
    pub fn elapsed_secs_f64(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Number of frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
