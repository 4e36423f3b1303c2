// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for cadence.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`RafRequester`]: a [`FrameRequester`] backed by
//!   `requestAnimationFrame`
//! - [`PerformanceTime`]: a [`TimeSource`] backed by `performance.now()`
//!
//! ```ignore
//! let raf = RafRequester::new();
//! let frame_loop = Rc::new(FrameLoop::new(roots.clone(), raf.clone()));
//! raf.bind(&frame_loop);
//! frame_loop.invalidate(None);
//! ```

#![no_std]

extern crate alloc;

mod raf;

pub use cadence_core::driver::FrameRequester;
pub use raf::RafRequester;

use cadence_core::clock::TimeSource;

/// Returns `performance.now()` in seconds.
#[must_use]
pub fn now() -> f64 {
    ms_to_seconds(raf::performance_now())
}

/// Converts a `DOMHighResTimeStamp` (milliseconds) to seconds.
#[must_use]
pub fn ms_to_seconds(ms: f64) -> f64 {
    ms / 1000.0
}

/// A [`TimeSource`] reading `performance.now()`.
///
/// Shares its origin with `requestAnimationFrame` timestamps, so clock deltas
/// and tick timestamps agree.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceTime;

impl TimeSource for PerformanceTime {
    fn now(&self) -> f64 {
        now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raf_timestamps_become_seconds() {
        assert_eq!(ms_to_seconds(16.0), 0.016);
        assert_eq!(ms_to_seconds(1500.0), 1.5);
        assert_eq!(ms_to_seconds(0.0), 0.0);
    }
}
