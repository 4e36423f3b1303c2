// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for render-loop
//! diagnostics.
//!
//! This crate provides [`TraceSink`](cadence_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: one human-readable line per event.
//! - [`recorder::RecorderSink`]: compact binary recording, read back with
//!   [`recorder::decode`].
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! Install a sink with
//! [`FrameLoop::set_trace_sink`](cadence_core::driver::FrameLoop::set_trace_sink).
//! Because the loop owns the sink, [`recorder::SharedRecorder`] lets the
//! caller keep a handle to the recorded bytes.

pub mod chrome;
pub mod pretty;
pub mod recorder;
