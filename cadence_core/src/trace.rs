// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the render loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the [`FrameLoop`](crate::driver::FrameLoop) calls as it ticks, invalidates,
//! and advances. All method bodies default to no-ops, so implementing only
//! the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`TickSummaryBuilder`] collects per-root results during a tick and produces
//! a [`TickSummary`] at the end.

use crate::driver::DriverState;
use crate::registry::EffectPhase;
use crate::render::RenderReport;
use crate::root::{Frameloop, RootId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What drove a root's render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderSource {
    /// The automatic driver's [`tick`](crate::driver::FrameLoop::tick).
    Tick,
    /// A host call to [`advance`](crate::driver::FrameLoop::advance).
    Advance,
}

/// Why the driver changed state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionCause {
    /// An invalidation woke the dormant driver.
    Invalidate,
    /// The host ticked a dormant driver directly.
    Tick,
    /// A whole tick produced no frame credit.
    Idle,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a tick starts.
#[derive(Clone, Copy, Debug)]
pub struct TickBeginEvent {
    /// Monotonic tick counter.
    pub tick_index: u64,
    /// Host timestamp in seconds.
    pub timestamp: f64,
}

/// Emitted after a global registry ran.
#[derive(Clone, Copy, Debug)]
pub struct EffectsEvent {
    /// Which registry ran.
    pub phase: EffectPhase,
    /// Timestamp handed to the callbacks.
    pub timestamp: f64,
    /// Number of callbacks invoked.
    pub invoked: u32,
}

/// Emitted after one root rendered.
#[derive(Clone, Copy, Debug)]
pub struct RootRenderEvent {
    /// Which root rendered, if it belongs to a root map.
    pub root: Option<RootId>,
    /// What drove the render.
    pub source: RenderSource,
    /// Timestamp handed to the render step.
    pub timestamp: f64,
    /// The root's policy at render time.
    pub frameloop: Frameloop,
    /// Delta handed to subscribers.
    pub delta: f64,
    /// Subscribers invoked.
    pub subscribers: u32,
    /// Whether the surface drew.
    pub drew: bool,
    /// Frame credit left.
    pub frames_remaining: u32,
    /// Credit added to the tick's repeat count.
    pub credit: u32,
}

impl RootRenderEvent {
    /// Creates an event from a [`RenderReport`].
    #[must_use]
    pub fn new(
        root: Option<RootId>,
        source: RenderSource,
        timestamp: f64,
        frameloop: Frameloop,
        report: &RenderReport,
    ) -> Self {
        Self {
            root,
            source,
            timestamp,
            frameloop,
            delta: report.delta,
            subscribers: report.subscribers,
            drew: report.drew,
            frames_remaining: report.frames_remaining,
            credit: report.credit,
        }
    }
}

/// Emitted when an invalidation granted credit.
#[derive(Clone, Copy, Debug)]
pub struct InvalidateEvent {
    /// Which root was invalidated, if it belongs to a root map.
    pub root: Option<RootId>,
    /// Credit after the grant.
    pub frames: u32,
    /// Whether this invalidation woke the driver.
    pub woke: bool,
}

/// Emitted when the driver moves between dormant and running.
#[derive(Clone, Copy, Debug)]
pub struct TransitionEvent {
    /// Tick counter at the time of the transition.
    pub tick_index: u64,
    /// Previous state.
    pub from: DriverState,
    /// New state.
    pub to: DriverState,
    /// Why it changed.
    pub cause: TransitionCause,
}

/// Emitted after a manual advance.
#[derive(Clone, Copy, Debug)]
pub struct AdvanceEvent {
    /// Host timestamp in seconds.
    pub timestamp: f64,
    /// Roots rendered.
    pub roots: u32,
    /// Whether the global registries ran.
    pub global_effects: bool,
}

/// Per-tick summary produced by [`TickSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct TickSummary {
    /// Tick counter.
    pub tick_index: u64,
    /// Host timestamp in seconds.
    pub timestamp: f64,
    /// Roots present in the snapshot.
    pub roots_seen: u32,
    /// Roots rendered.
    pub roots_rendered: u32,
    /// Draw calls issued.
    pub draws: u32,
    /// Subscribers invoked across all roots.
    pub subscribers: u32,
    /// Aggregate frame credit.
    pub repeat: u32,
    /// Whether the tick left the driver dormant.
    pub dormant: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the render loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a tick starts.
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        _ = e;
    }

    /// Called after a global registry ran.
    fn on_effects(&mut self, e: &EffectsEvent) {
        _ = e;
    }

    /// Called after a root rendered.
    fn on_root_render(&mut self, e: &RootRenderEvent) {
        _ = e;
    }

    /// Called when an invalidation granted credit.
    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        _ = e;
    }

    /// Called when the driver changes state.
    fn on_transition(&mut self, e: &TransitionEvent) {
        _ = e;
    }

    /// Called after a manual advance.
    fn on_advance(&mut self, e: &AdvanceEvent) {
        _ = e;
    }

    /// Called with a per-tick summary.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around a [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method dispatches straight to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: &'a mut dyn TraceSink,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Generates a `Tracer` method that forwards one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident => $sink_method:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            self.sink.$sink_method(e);
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits a [`TickBeginEvent`].
        tick_begin => on_tick_begin(TickBeginEvent)
    );
    forward!(
        /// Emits an [`EffectsEvent`].
        effects => on_effects(EffectsEvent)
    );
    forward!(
        /// Emits a [`RootRenderEvent`].
        root_render => on_root_render(RootRenderEvent)
    );
    forward!(
        /// Emits an [`InvalidateEvent`].
        invalidate => on_invalidate(InvalidateEvent)
    );
    forward!(
        /// Emits a [`TransitionEvent`].
        transition => on_transition(TransitionEvent)
    );
    forward!(
        /// Emits an [`AdvanceEvent`].
        advance => on_advance(AdvanceEvent)
    );
    forward!(
        /// Emits a [`TickSummary`].
        tick_summary => on_tick_summary(TickSummary)
    );
}

// ---------------------------------------------------------------------------
// TickSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects per-root results during a tick and produces a [`TickSummary`].
#[derive(Debug)]
pub struct TickSummaryBuilder {
    tick_index: u64,
    timestamp: f64,
    roots_seen: u32,
    roots_rendered: u32,
    draws: u32,
    subscribers: u32,
}

impl TickSummaryBuilder {
    /// Starts building a summary for the given tick.
    #[must_use]
    pub fn new(tick_index: u64, timestamp: f64) -> Self {
        Self {
            tick_index,
            timestamp,
            roots_seen: 0,
            roots_rendered: 0,
            draws: 0,
            subscribers: 0,
        }
    }

    /// Records a root that was considered but not due.
    pub fn skip_root(&mut self) {
        self.roots_seen += 1;
    }

    /// Records a rendered root.
    pub fn record_render(&mut self, report: &RenderReport) {
        self.roots_seen += 1;
        self.roots_rendered += 1;
        self.subscribers += report.subscribers;
        if report.drew {
            self.draws += 1;
        }
    }

    /// Consumes the builder and produces the final [`TickSummary`].
    #[must_use]
    pub fn finish(self, repeat: u32, dormant: bool) -> TickSummary {
        TickSummary {
            tick_index: self.tick_index,
            timestamp: self.timestamp,
            roots_seen: self.roots_seen,
            roots_rendered: self.roots_rendered,
            draws: self.draws,
            subscribers: self.subscribers,
            repeat,
            dormant,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
