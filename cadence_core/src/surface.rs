// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable surface contract.
//!
//! Cadence does not own devices, contexts, or scene graphs. Each root hands
//! the loop a *surface* (a renderer bound to a canvas, window, or swapchain)
//! together with the scene and camera it should draw. The loop only ever
//! asks three things of it:
//!
//! - **Draw**: [`Surface::render`] with the root's scene and camera.
//! - **Capability**: [`Surface::can_render`]; surfaces that cannot draw
//!   (headless stubs, compute-only targets) are valid and degrade the root
//!   to "subscribers only".
//! - **Immersive presentation**: [`Surface::is_presenting`]; while an XR
//!   session owns the frame pump, the automatic driver leaves the root to
//!   [`FrameLoop::advance`](crate::driver::FrameLoop::advance).

/// A drawable render target.
///
/// # Frame loop pseudocode
///
/// ```rust,ignore
/// // Once per host frame:
/// frame_loop.tick(timestamp);
/// //   for each due root:
/// //     subscribers(state, delta, frame)
/// //     if surface.can_render() { surface.render(&scene, &camera) }
/// ```
pub trait Surface {
    /// Scene graph handle passed to [`render`](Self::render).
    type Scene;
    /// Camera handle passed to [`render`](Self::render).
    type Camera;
    /// Platform-native per-frame context (e.g. an XR frame), handed to
    /// subscribers during [`FrameLoop::advance`](crate::driver::FrameLoop::advance).
    type Frame;

    /// Draws `scene` as seen from `camera`.
    fn render(&mut self, scene: &Self::Scene, camera: &Self::Camera);

    /// Whether this surface can draw at all.
    fn can_render(&self) -> bool {
        true
    }

    /// Whether an immersive (XR) session is currently presenting.
    fn is_presenting(&self) -> bool {
        false
    }
}
