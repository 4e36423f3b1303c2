// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-root delta-time clock.
//!
//! [`FrameClock`] measures the time between successive renders of a root.
//! It reads wall time through a [`TimeSource`], so hosts can plug in
//! `performance.now()`, `std::time::Instant`, or a manually stepped value.
//!
//! All values are in seconds.

use alloc::rc::Rc;
use core::fmt;

/// A monotonic time source reporting seconds from an arbitrary origin.
pub trait TimeSource {
    /// Returns the current time in seconds.
    fn now(&self) -> f64;
}

impl<F: Fn() -> f64> TimeSource for F {
    fn now(&self) -> f64 {
        self()
    }
}

/// A [`TimeSource`] backed by [`std::time::Instant`].
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct StdTimeSource {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdTimeSource {
    /// Creates a time source whose origin is the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for StdTimeSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Tracks elapsed and delta time for one root.
///
/// The clock starts lazily on the first [`get_delta`](Self::get_delta) call
/// when `auto_start` is set (the default), so a freshly created root reports
/// a zero delta on its first render.
pub struct FrameClock {
    source: Rc<dyn TimeSource>,
    /// Whether the first `get_delta` call starts the clock.
    pub auto_start: bool,
    /// Time at which the clock was last started.
    pub start_time: f64,
    /// Time of the previous `get_delta` sample.
    pub old_time: f64,
    /// Seconds accumulated while running.
    pub elapsed_time: f64,
    /// Whether the clock is accumulating time.
    pub running: bool,
}

impl FrameClock {
    /// Creates a stopped, auto-starting clock reading from `source`.
    #[must_use]
    pub fn new(source: Rc<dyn TimeSource>) -> Self {
        Self {
            source,
            auto_start: true,
            start_time: 0.0,
            old_time: 0.0,
            elapsed_time: 0.0,
            running: false,
        }
    }

    /// Starts (or restarts) the clock and resets elapsed time.
    pub fn start(&mut self) {
        self.start_time = self.source.now();
        self.old_time = self.start_time;
        self.elapsed_time = 0.0;
        self.running = true;
    }

    /// Stops the clock, folding the time since the last sample into
    /// `elapsed_time`. A stopped clock no longer auto-starts.
    pub fn stop(&mut self) {
        self.get_elapsed_time();
        self.running = false;
        self.auto_start = false;
    }

    /// Returns total elapsed seconds, sampling the time source first.
    pub fn get_elapsed_time(&mut self) -> f64 {
        self.get_delta();
        self.elapsed_time
    }

    /// Returns seconds since the previous call.
    pub fn get_delta(&mut self) -> f64 {
        if self.auto_start && !self.running {
            self.start();
            return 0.0;
        }

        if !self.running {
            return 0.0;
        }

        let now = self.source.now();
        let diff = now - self.old_time;
        self.old_time = now;
        self.elapsed_time += diff;
        diff
    }

    /// Moves the clock to an externally supplied `timestamp` and returns the
    /// delta from the previous elapsed time.
    ///
    /// Used for roots that are never auto-rendered, so a host pacing them by
    /// hand controls their notion of time.
    pub fn advance_to(&mut self, timestamp: f64) -> f64 {
        let delta = timestamp - self.elapsed_time;
        self.old_time = self.elapsed_time;
        self.elapsed_time = timestamp;
        delta
    }
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClock")
            .field("auto_start", &self.auto_start)
            .field("start_time", &self.start_time)
            .field("old_time", &self.old_time)
            .field("elapsed_time", &self.elapsed_time)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}
