// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-root render step.
//!
//! [`render`] draws one root for one timestamp:
//!
//! 1. Sample the root's clock for a delta. Roots with
//!    [`Frameloop::Never`] are paced by the caller instead, so their clock is
//!    moved to `timestamp` and the delta is taken from that.
//! 2. Run every subscriber with `(state, delta, frame)`. A subscriber
//!    removed earlier in the same pass is skipped.
//! 3. Draw, unless a subscriber has claimed rendering priority or the surface
//!    cannot draw.
//! 4. Spend one unit of frame credit.
//!
//! The returned credit tells the loop whether this root still wants ticks:
//! always `1` for [`Frameloop::Always`], otherwise the remaining credit.

use crate::root::{Frameloop, RootState};
use crate::surface::Surface;

/// What one render step did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderReport {
    /// Delta in seconds handed to subscribers.
    pub delta: f64,
    /// Number of subscribers invoked.
    pub subscribers: u32,
    /// Whether the surface's draw call ran.
    pub drew: bool,
    /// Frame credit left after this render.
    pub frames_remaining: u32,
    /// Credit this root contributes to the loop's repeat count.
    pub credit: u32,
}

/// Renders one root and returns its next-frame credit.
pub fn render<S: Surface>(
    timestamp: f64,
    state: &mut RootState<S>,
    frame: Option<&S::Frame>,
) -> u32 {
    render_root(timestamp, state, frame).credit
}

/// Renders one root and reports what happened.
pub fn render_root<S: Surface>(
    timestamp: f64,
    state: &mut RootState<S>,
    frame: Option<&S::Frame>,
) -> RenderReport {
    let mut delta = state.clock.get_delta();
    if state.frameloop() == Frameloop::Never {
        delta = state.clock.advance_to(timestamp);
    }

    let mut subscribers = 0;
    for (live, frame_ref) in state.internal.subscriber_snapshot() {
        if live.get() && frame_ref.invoke(state, delta, frame) {
            subscribers += 1;
        }
    }

    let drew = state.internal.priority() == 0 && state.gl.can_render();
    if drew {
        state.gl.render(&state.scene, &state.camera);
    }

    let frames_remaining = state.internal.spend_frame();
    let credit = match state.frameloop() {
        Frameloop::Always => 1,
        Frameloop::Demand | Frameloop::Never => frames_remaining,
    };

    RenderReport {
        delta,
        subscribers,
        drew,
        frames_remaining,
        credit,
    }
}
