// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, one tag byte followed by
//! the event's fields. Timestamps and deltas are stored as raw `f64` bits.
//! [`decode`] reads them back as an iterator of [`RecordedEvent`].
//!
//! A [`FrameLoop`](cadence_core::driver::FrameLoop) owns its sink, so
//! [`SharedRecorder`] is provided for callers that need the bytes back after
//! the loop has run.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_core::driver::DriverState;
use cadence_core::registry::EffectPhase;
use cadence_core::root::{Frameloop, RootId};
use cadence_core::trace::{
    AdvanceEvent, EffectsEvent, InvalidateEvent, RenderSource, RootRenderEvent, TickBeginEvent,
    TickSummary, TraceSink, TransitionCause, TransitionEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TICK_BEGIN: u8 = 1;
const TAG_EFFECTS: u8 = 2;
const TAG_ROOT_RENDER: u8 = 3;
const TAG_INVALIDATE: u8 = 4;
const TAG_TRANSITION: u8 = 5;
const TAG_ADVANCE: u8 = 6;
const TAG_TICK_SUMMARY: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_root(&mut self, root: Option<RootId>) {
        match root {
            Some(id) => {
                self.write_u8(1);
                self.write_u32(id.0);
            }
            None => {
                self.write_u8(0);
                self.write_u32(0);
            }
        }
    }

    fn write_phase(&mut self, phase: EffectPhase) {
        self.write_u8(match phase {
            EffectPhase::Before => 0,
            EffectPhase::After => 1,
            EffectPhase::Tail => 2,
        });
    }

    fn write_frameloop(&mut self, frameloop: Frameloop) {
        self.write_u8(match frameloop {
            Frameloop::Always => 0,
            Frameloop::Demand => 1,
            Frameloop::Never => 2,
        });
    }

    fn write_driver_state(&mut self, state: DriverState) {
        self.write_u8(match state {
            DriverState::Dormant => 0,
            DriverState::Running => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        self.write_u8(TAG_TICK_BEGIN);
        self.write_u64(e.tick_index);
        self.write_f64(e.timestamp);
    }

    fn on_effects(&mut self, e: &EffectsEvent) {
        self.write_u8(TAG_EFFECTS);
        self.write_phase(e.phase);
        self.write_f64(e.timestamp);
        self.write_u32(e.invoked);
    }

    fn on_root_render(&mut self, e: &RootRenderEvent) {
        self.write_u8(TAG_ROOT_RENDER);
        self.write_root(e.root);
        self.write_u8(match e.source {
            RenderSource::Tick => 0,
            RenderSource::Advance => 1,
        });
        self.write_f64(e.timestamp);
        self.write_frameloop(e.frameloop);
        self.write_f64(e.delta);
        self.write_u32(e.subscribers);
        self.write_bool(e.drew);
        self.write_u32(e.frames_remaining);
        self.write_u32(e.credit);
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        self.write_u8(TAG_INVALIDATE);
        self.write_root(e.root);
        self.write_u32(e.frames);
        self.write_bool(e.woke);
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.write_u8(TAG_TRANSITION);
        self.write_u64(e.tick_index);
        self.write_driver_state(e.from);
        self.write_driver_state(e.to);
        self.write_u8(match e.cause {
            TransitionCause::Invalidate => 0,
            TransitionCause::Tick => 1,
            TransitionCause::Idle => 2,
        });
    }

    fn on_advance(&mut self, e: &AdvanceEvent) {
        self.write_u8(TAG_ADVANCE);
        self.write_f64(e.timestamp);
        self.write_u32(e.roots);
        self.write_bool(e.global_effects);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.tick_index);
        self.write_f64(s.timestamp);
        self.write_u32(s.roots_seen);
        self.write_u32(s.roots_rendered);
        self.write_u32(s.draws);
        self.write_u32(s.subscribers);
        self.write_u32(s.repeat);
        self.write_bool(s.dormant);
    }
}

// ---------------------------------------------------------------------------
// SharedRecorder
// ---------------------------------------------------------------------------

/// A cloneable handle to one [`RecorderSink`].
///
/// Give one clone to the loop and keep another to read the bytes.
#[derive(Clone, Debug, Default)]
pub struct SharedRecorder {
    inner: Rc<RefCell<RecorderSink>>,
}

impl SharedRecorder {
    /// Creates an empty shared recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the bytes recorded so far.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.borrow().as_bytes().to_vec()
    }

    /// Returns the recorded bytes and clears the buffer.
    pub fn take_bytes(&self) -> Vec<u8> {
        std::mem::take(&mut self.inner.borrow_mut().buf)
    }
}

impl TraceSink for SharedRecorder {
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        self.inner.borrow_mut().on_tick_begin(e);
    }

    fn on_effects(&mut self, e: &EffectsEvent) {
        self.inner.borrow_mut().on_effects(e);
    }

    fn on_root_render(&mut self, e: &RootRenderEvent) {
        self.inner.borrow_mut().on_root_render(e);
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        self.inner.borrow_mut().on_invalidate(e);
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.inner.borrow_mut().on_transition(e);
    }

    fn on_advance(&mut self, e: &AdvanceEvent) {
        self.inner.borrow_mut().on_advance(e);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.inner.borrow_mut().on_tick_summary(s);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`TickBeginEvent`].
    TickBegin(TickBeginEvent),
    /// An [`EffectsEvent`].
    Effects(EffectsEvent),
    /// A [`RootRenderEvent`].
    RootRender(RootRenderEvent),
    /// An [`InvalidateEvent`].
    Invalidate(InvalidateEvent),
    /// A [`TransitionEvent`].
    Transition(TransitionEvent),
    /// An [`AdvanceEvent`].
    Advance(AdvanceEvent),
    /// A [`TickSummary`].
    TickSummary(TickSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_root(&mut self) -> Option<Option<RootId>> {
        let present = self.read_u8()?;
        let id = self.read_u32()?;
        Some((present != 0).then_some(RootId(id)))
    }

    fn read_phase(&mut self) -> Option<EffectPhase> {
        Some(match self.read_u8()? {
            0 => EffectPhase::Before,
            1 => EffectPhase::After,
            _ => EffectPhase::Tail,
        })
    }

    fn read_frameloop(&mut self) -> Option<Frameloop> {
        Some(match self.read_u8()? {
            0 => Frameloop::Always,
            1 => Frameloop::Demand,
            _ => Frameloop::Never,
        })
    }

    fn read_driver_state(&mut self) -> Option<DriverState> {
        Some(match self.read_u8()? {
            0 => DriverState::Dormant,
            _ => DriverState::Running,
        })
    }

    fn decode_tick_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickBegin(TickBeginEvent {
            tick_index: self.read_u64()?,
            timestamp: self.read_f64()?,
        }))
    }

    fn decode_effects(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Effects(EffectsEvent {
            phase: self.read_phase()?,
            timestamp: self.read_f64()?,
            invoked: self.read_u32()?,
        }))
    }

    fn decode_root_render(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RootRender(RootRenderEvent {
            root: self.read_root()?,
            source: match self.read_u8()? {
                0 => RenderSource::Tick,
                _ => RenderSource::Advance,
            },
            timestamp: self.read_f64()?,
            frameloop: self.read_frameloop()?,
            delta: self.read_f64()?,
            subscribers: self.read_u32()?,
            drew: self.read_bool()?,
            frames_remaining: self.read_u32()?,
            credit: self.read_u32()?,
        }))
    }

    fn decode_invalidate(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Invalidate(InvalidateEvent {
            root: self.read_root()?,
            frames: self.read_u32()?,
            woke: self.read_bool()?,
        }))
    }

    fn decode_transition(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Transition(TransitionEvent {
            tick_index: self.read_u64()?,
            from: self.read_driver_state()?,
            to: self.read_driver_state()?,
            cause: match self.read_u8()? {
                0 => TransitionCause::Invalidate,
                1 => TransitionCause::Tick,
                _ => TransitionCause::Idle,
            },
        }))
    }

    fn decode_advance(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Advance(AdvanceEvent {
            timestamp: self.read_f64()?,
            roots: self.read_u32()?,
            global_effects: self.read_bool()?,
        }))
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            tick_index: self.read_u64()?,
            timestamp: self.read_f64()?,
            roots_seen: self.read_u32()?,
            roots_rendered: self.read_u32()?,
            draws: self.read_u32()?,
            subscribers: self.read_u32()?,
            repeat: self.read_u32()?,
            dormant: self.read_bool()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_TICK_BEGIN => self.decode_tick_begin(),
            TAG_EFFECTS => self.decode_effects(),
            TAG_ROOT_RENDER => self.decode_root_render(),
            TAG_INVALIDATE => self.decode_invalidate(),
            TAG_TRANSITION => self.decode_transition(),
            TAG_ADVANCE => self.decode_advance(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
