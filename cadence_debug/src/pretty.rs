// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in milliseconds.

use std::io::Write;

use cadence_core::driver::DriverState;
use cadence_core::registry::EffectPhase;
use cadence_core::root::RootId;
use cadence_core::trace::{
    AdvanceEvent, EffectsEvent, InvalidateEvent, RenderSource, RootRenderEvent, TickBeginEvent,
    TickSummary, TraceSink, TransitionEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    ///
    /// Per-root render and effect lines are suppressed until
    /// [`verbose`](Self::verbose) is enabled; an always-on root would
    /// otherwise print every frame.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Enables or disables per-root render and effect lines.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(seconds: f64) -> f64 {
    seconds * 1000.0
}

fn state_name(state: DriverState) -> &'static str {
    match state {
        DriverState::Dormant => "dormant",
        DriverState::Running => "running",
    }
}

fn root_label(root: Option<RootId>) -> String {
    root.map_or_else(|| "-".to_owned(), |id| id.0.to_string())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[tick] #{} at {:.3}ms",
            e.tick_index,
            ms(e.timestamp),
        );
    }

    fn on_effects(&mut self, e: &EffectsEvent) {
        if !self.verbose && e.phase != EffectPhase::Tail {
            return;
        }
        let phase = match e.phase {
            EffectPhase::Before => "effects",
            EffectPhase::After => "after",
            EffectPhase::Tail => "tail",
        };
        let _ = writeln!(self.writer, "[{phase}] ran={}", e.invoked);
    }

    fn on_root_render(&mut self, e: &RootRenderEvent) {
        if !self.verbose && e.source == RenderSource::Tick {
            return;
        }
        let source = match e.source {
            RenderSource::Tick => "render",
            RenderSource::Advance => "advance:render",
        };
        let _ = writeln!(
            self.writer,
            "[{source}] root={} {:?} delta={:.3}ms subscribers={} drew={} frames={} credit={}",
            root_label(e.root),
            e.frameloop,
            ms(e.delta),
            e.subscribers,
            e.drew,
            e.frames_remaining,
            e.credit,
        );
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        let woke = if e.woke { " (woke loop)" } else { "" };
        let _ = writeln!(
            self.writer,
            "[invalidate] root={} frames={}{woke}",
            root_label(e.root),
            e.frames,
        );
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        let _ = writeln!(
            self.writer,
            "[loop] {} -> {} at tick #{} ({:?})",
            state_name(e.from),
            state_name(e.to),
            e.tick_index,
            e.cause,
        );
    }

    fn on_advance(&mut self, e: &AdvanceEvent) {
        let _ = writeln!(
            self.writer,
            "[advance] at {:.3}ms roots={} global_effects={}",
            ms(e.timestamp),
            e.roots,
            e.global_effects,
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        if !self.verbose && !s.dormant {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[summary] #{} roots={}/{} draws={} subscribers={} repeat={}{}",
            s.tick_index,
            s.roots_rendered,
            s.roots_seen,
            s.draws,
            s.subscribers,
            s.repeat,
            if s.dormant { " idle" } else { "" },
        );
    }
}
