// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory host primitives.
//!
//! Hosts that own their frame pump (native event loops, XR runtimes,
//! deterministic tests) have no `requestAnimationFrame` to hand the loop.
//! [`ManualRequester`] stands in for it: requests are queued in memory and
//! fired by the host with [`ManualRequester::pump`]. [`ManualTime`] is a
//! [`TimeSource`] the host sets explicitly.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use crate::clock::TimeSource;
use crate::driver::{FrameLoop, FrameRequest, FrameRequester, TickReport};
use crate::surface::Surface;

/// A settable [`TimeSource`]. Clones share the same value.
#[derive(Clone, Debug, Default)]
pub struct ManualTime {
    now: Rc<Cell<f64>>,
}

impl ManualTime {
    /// Creates a time source reading `now` seconds.
    #[must_use]
    pub fn new(now: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    /// Moves the current time forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Default)]
struct Queue {
    pending: VecDeque<FrameRequest>,
    next_id: u64,
    requested: u64,
    cancelled: u64,
}

/// A [`FrameRequester`] that queues requests until the host pumps them.
///
/// Clones share the same queue, so a host can keep one handle while the
/// loop owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualRequester {
    queue: Rc<RefCell<Queue>>,
}

impl ManualRequester {
    /// Creates a requester with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of frame requests waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().pending.len()
    }

    /// Total requests made since creation.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.queue.borrow().requested
    }

    /// Total requests cancelled since creation.
    #[must_use]
    pub fn cancelled(&self) -> u64 {
        self.queue.borrow().cancelled
    }

    /// Fires the oldest pending request by ticking `frame_loop`.
    ///
    /// Returns `None` without ticking when nothing is pending, i.e. the loop
    /// is dormant.
    pub fn pump<K: Ord, S: Surface>(
        &self,
        frame_loop: &FrameLoop<K, S, Self>,
        timestamp: f64,
    ) -> Option<TickReport> {
        self.queue.borrow_mut().pending.pop_front()?;
        Some(frame_loop.tick(timestamp))
    }
}

impl FrameRequester for ManualRequester {
    fn request_frame(&mut self) -> FrameRequest {
        let mut queue = self.queue.borrow_mut();
        let request = FrameRequest(queue.next_id);
        queue.next_id += 1;
        queue.requested += 1;
        queue.pending.push_back(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let mut queue = self.queue.borrow_mut();
        if let Some(pos) = queue.pending.iter().position(|r| *r == request) {
            queue.pending.remove(pos);
            queue.cancelled += 1;
        }
    }
}
