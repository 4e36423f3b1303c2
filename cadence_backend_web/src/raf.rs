// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` frame requester.
//!
//! [`RafRequester`] schedules [`FrameLoop::tick`] through the browser's
//! `requestAnimationFrame`. Each callback receives a
//! [`DOMHighResTimeStamp`][mdn] in milliseconds, which is converted to
//! seconds before ticking.
//!
//! The loop owns its requester, and the JS callback needs the loop, so the
//! two are tied together after construction with [`RafRequester::bind`]. The
//! callback holds the loop weakly; dropping the last `Rc<FrameLoop>` stops
//! ticking.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use cadence_core::driver::{FrameLoop, FrameRequest, FrameRequester};
use cadence_core::surface::Surface;

use crate::ms_to_seconds;

// Direct global bindings instead of `web_sys::Window` methods; avoids
// fetching (and unwrapping) the Window/Performance objects on every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type RafClosure = Closure<dyn FnMut(f64)>;

/// Browser request ids are positive, so zero marks a request that was made
/// before [`RafRequester::bind`] and is held until then.
const DEFERRED: FrameRequest = FrameRequest(0);

struct RafShared {
    /// The JS closure registered with `requestAnimationFrame`.
    closure: RefCell<Option<RafClosure>>,
    /// A frame was requested before a closure was bound.
    deferred: Cell<bool>,
    /// Browser id issued by `bind` for the deferred request. The loop still
    /// tracks that request as [`DEFERRED`].
    handoff: Cell<Option<i32>>,
}

impl RafShared {
    /// Resolves `request` to the browser id to cancel, if any.
    fn cancel_target(&self, request: FrameRequest) -> Option<i32> {
        if request == DEFERRED {
            self.deferred.set(false);
            return self.handoff.take();
        }
        let id = i32::try_from(request.0).ok()?;
        if self.handoff.get() == Some(id) {
            self.handoff.set(None);
        }
        Some(id)
    }
}

/// A [`FrameRequester`] that schedules ticks with `requestAnimationFrame`.
///
/// Clones share the same binding.
#[derive(Clone)]
pub struct RafRequester {
    shared: Rc<RafShared>,
}

impl RafRequester {
    /// Creates an unbound requester.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RafShared {
                closure: RefCell::new(None),
                deferred: Cell::new(false),
                handoff: Cell::new(None),
            }),
        }
    }

    /// Routes animation frames to `frame_loop`.
    ///
    /// `frame_loop` must own a clone of this requester. A frame requested
    /// before binding is issued now. Returns `false` without rebinding if a
    /// loop is already bound, since a pending browser callback may still
    /// reference the existing closure.
    pub fn bind<K, S>(&self, frame_loop: &Rc<FrameLoop<K, S, Self>>) -> bool
    where
        K: Ord + 'static,
        S: Surface + 'static,
    {
        if self.is_bound() {
            return false;
        }
        let target = Rc::downgrade(frame_loop);
        let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
            if let Some(frame_loop) = target.upgrade() {
                frame_loop.tick(ms_to_seconds(timestamp_ms));
            }
        }) as Box<dyn FnMut(f64)>);
        *self.shared.closure.borrow_mut() = Some(closure);

        if self.shared.deferred.replace(false) {
            let issued = self.schedule().and_then(|r| i32::try_from(r.0).ok());
            self.shared.handoff.set(issued);
        }
        true
    }

    /// Returns `true` once [`bind`](Self::bind) has been called.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.shared.closure.borrow().is_some()
    }

    fn schedule(&self) -> Option<FrameRequest> {
        let closure = self.shared.closure.borrow();
        let closure = closure.as_ref()?;
        let id = request_animation_frame(closure.as_ref().unchecked_ref());
        u64::try_from(id).ok().map(FrameRequest)
    }
}

impl Default for RafRequester {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRequester for RafRequester {
    fn request_frame(&mut self) -> FrameRequest {
        self.schedule().unwrap_or_else(|| {
            self.shared.deferred.set(true);
            DEFERRED
        })
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if let Some(id) = self.shared.cancel_target(request) {
            cancel_animation_frame(id);
        }
    }
}

impl core::fmt::Debug for RafRequester {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafRequester")
            .field("bound", &self.is_bound())
            .field("deferred", &self.shared.deferred.get())
            .finish()
    }
}
