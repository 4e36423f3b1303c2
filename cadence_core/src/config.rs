// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loop configuration.

/// Hard upper bound on a root's frame credit.
///
/// Credit is a bounded counter rather than an unbounded queue, so a burst of
/// invalidations after a long stall cannot turn into a long run of catch-up
/// renders.
pub const MAX_FRAME_CREDIT: u32 = 60;

/// Configuration for a [`FrameLoop`](crate::driver::FrameLoop).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum frame credit a single root can accumulate through
    /// invalidation (1–[`MAX_FRAME_CREDIT`]).
    pub frame_credit_limit: u32,
}

impl LoopConfig {
    /// Default configuration: credit capped at [`MAX_FRAME_CREDIT`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame_credit_limit: MAX_FRAME_CREDIT,
        }
    }

    /// Returns a copy with the given credit limit, clamped to
    /// `1..=MAX_FRAME_CREDIT`.
    #[must_use]
    pub const fn with_frame_credit_limit(mut self, limit: u32) -> Self {
        self.frame_credit_limit = if limit == 0 {
            1
        } else if limit > MAX_FRAME_CREDIT {
            MAX_FRAME_CREDIT
        } else {
            limit
        };
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::new()
    }
}
