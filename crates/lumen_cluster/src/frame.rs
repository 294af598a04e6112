//! # Frame Clock
//!
//! Monotonic frame counter and delta-time source.
//!
//! ## Design
//!
//! The root is the only process that *measures* time; it ticks its clock
//! once per frame and broadcasts the result as a `Tick` event. Nodes never
//! look at a wall clock - they apply the received delta verbatim, which is
//! what keeps animation bit-identical across the cluster.

use std::time::Instant;

/// How the root computes per-frame delta time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockMode {
    /// Wall-clock elapsed time between frames.
    RealTime,
    /// Fixed step regardless of wall time, for reproducible benchmarks.
    Benchmark {
        /// The fixed step, in seconds.
        dt: f64,
    },
    /// Fixed step derived from a target movie frame rate.
    Capture {
        /// Target frames per second.
        fps: f64,
    },
}

impl ClockMode {
    /// Default fixed step for benchmark mode (60 Hz).
    pub const BENCHMARK_DT: f64 = 1.0 / 60.0;
}

/// Monotonic frame counter plus last-frame delta time.
#[derive(Clone, Debug)]
pub struct FrameClock {
    frame: u64,
    dt: f64,
    last: Instant,
    mode: ClockMode,
}

impl FrameClock {
    /// Creates a clock in the given mode.
    #[must_use]
    pub fn new(mode: ClockMode) -> Self {
        Self {
            frame: 0,
            dt: 0.0,
            last: Instant::now(),
            mode,
        }
    }

    /// Creates a wall-clock driven frame clock.
    #[must_use]
    pub fn real_time() -> Self {
        Self::new(ClockMode::RealTime)
    }

    /// Returns the current frame number.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns the last frame's delta time in seconds.
    #[inline]
    #[must_use]
    pub const fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the clock mode.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Advances to the next frame and returns its delta time.
    ///
    /// Root side only; the returned value is what gets broadcast in the
    /// frame's `Tick` event.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        self.dt = match self.mode {
            ClockMode::RealTime => now.duration_since(self.last).as_secs_f64(),
            ClockMode::Benchmark { dt } => dt,
            ClockMode::Capture { fps } => 1.0 / fps,
        };
        self.last = now;
        self.frame += 1;
        self.dt
    }

    /// Applies a delta time received from the root.
    ///
    /// Node side only; advances the frame counter without measuring.
    pub fn apply(&mut self, dt: f64) {
        self.dt = dt;
        self.frame += 1;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::real_time()
    }
}
