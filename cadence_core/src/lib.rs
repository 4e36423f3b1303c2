// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-loop scheduling core.
//!
//! `cadence_core` decides *when* and *how often* a scenegraph renderer draws.
//! A single [`FrameLoop`](driver::FrameLoop) multiplexes any number of
//! independently configured render targets ("roots") onto one host-provided
//! frame clock. It is `no_std` compatible (with `alloc`) and strictly
//! single-threaded: shared state lives behind `Rc`, `Cell`, and `RefCell`.
//!
//! # Architecture
//!
//! ```text
//!   Host frame source (rAF, display link, XR session)
//!       │
//!       ▼
//!   FrameLoop::tick(t) ──► effects ──► render(root) × N ──► after-effects
//!       ▲                                   │
//!       │                          credit == 0 for all roots?
//!       │                                   │
//!       │                                   ▼
//!   FrameLoop::invalidate() ◄──── tail callbacks, driver goes dormant
//! ```
//!
//! **[`driver`]**: [`FrameLoop`](driver::FrameLoop) with ticking, on-demand
//! invalidation, manual advance, and the `{Dormant, Running}` state machine.
//!
//! **[`render`]**: the per-root render step.
//!
//! **[`root`]**: Root handles, per-root state, frame credit, and
//! hot-swappable per-frame subscribers.
//!
//! **[`registry`]**: Global effect, after-effect, and tail registries with
//! identity-keyed unsubscribe handles.
//!
//! **[`clock`]**: [`FrameClock`](clock::FrameClock) delta-time tracking over
//! a pluggable [`TimeSource`](clock::TimeSource).
//!
//! **[`surface`]**: the [`Surface`](surface::Surface) trait that drawable
//! targets implement.
//!
//! **[`host`]**: In-memory frame requester and time source for hosts that
//! own their frame pump, and for tests.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! loop instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables [`StdTimeSource`](clock::StdTimeSource).
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod config;
pub mod driver;
pub mod host;
pub mod registry;
pub mod render;
pub mod root;
pub mod surface;
pub mod trace;
