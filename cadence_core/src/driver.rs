// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render-loop driver.
//!
//! [`FrameLoop`] is the single scheduling loop shared by every root. The host
//! supplies a [`FrameRequester`] (e.g. `requestAnimationFrame`) and calls
//! [`FrameLoop::tick`] whenever a requested frame fires.
//!
//! # State machine
//!
//! ```text
//!            invalidate() / tick()
//!   Dormant ───────────────────────► Running
//!      ▲                                │
//!      └────────────────────────────────┘
//!        a whole tick yields zero credit
//! ```
//!
//! While running, every tick requests the next frame before doing any work.
//! A tick in which no root asks for another frame runs the tail callbacks,
//! cancels that request, and leaves the loop dormant. Only
//! [`invalidate`](FrameLoop::invalidate) revives a dormant loop; there is no
//! external pause.
//!
//! # Tick
//!
//! 1. Request the next frame and mark the loop running.
//! 2. Run global effects.
//! 3. Render every root that is active, due (`Always`, or holding credit),
//!    and not presenting in an immersive session; sum their credit.
//! 4. Run global after-effects.
//! 5. If the summed credit is zero, run tail callbacks and go dormant.
//!
//! # Re-entrancy
//!
//! All methods take `&self`, so callbacks holding an `Rc<FrameLoop>` may call
//! [`invalidate`](FrameLoop::invalidate), register effects, or add roots
//! mid-tick. Roots are iterated from a snapshot taken after the global
//! effects ran. A root whose state is already borrowed (because the caller
//! is one of its own subscribers) is skipped by whole-map operations; use the
//! `&mut RootState` handed to the subscriber instead.
//!
//! # Failure policy
//!
//! Callbacks are infallible. A panicking callback unwinds through the tick and
//! aborts the rest of it; the loop does not isolate failures per callback.

use alloc::boxed::Box;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::config::LoopConfig;
use crate::registry::{EffectPhase, GlobalEffects, Unsubscribe};
use crate::render::render_root;
use crate::root::{Frameloop, RootMap, RootState};
use crate::surface::Surface;
use crate::trace::{
    AdvanceEvent, EffectsEvent, InvalidateEvent, RenderSource, RootRenderEvent, TickBeginEvent,
    TickSummaryBuilder, TraceSink, Tracer, TransitionCause, TransitionEvent,
};

/// Handle to one outstanding host frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// The host's per-display-refresh scheduling primitive.
///
/// Each request must eventually result in exactly one call to
/// [`FrameLoop::tick`] unless it is cancelled first.
pub trait FrameRequester {
    /// Schedules one tick for the next display refresh.
    fn request_frame(&mut self) -> FrameRequest;

    /// Cancels a request. Cancelling a request that already fired is a
    /// no-op.
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Whether the loop is ticking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// No frame is requested; waiting for an invalidation.
    #[default]
    Dormant,
    /// A frame is requested and ticks keep coming.
    Running,
}

/// What one [`FrameLoop::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Monotonic tick counter.
    pub tick_index: u64,
    /// Aggregate frame credit returned by the rendered roots.
    pub repeat: u32,
    /// Number of roots rendered.
    pub rendered: u32,
    /// Whether the tick left the loop dormant.
    pub dormant: bool,
}

/// The process-wide render loop, as an explicit object.
///
/// Independent instances share nothing, so tests and multi-window hosts can
/// run several side by side.
pub struct FrameLoop<K, S: Surface, H: FrameRequester> {
    roots: RootMap<K, S>,
    effects: GlobalEffects,
    requester: RefCell<H>,
    state: Cell<DriverState>,
    pending: Cell<Option<FrameRequest>>,
    config: LoopConfig,
    tick_count: Cell<u64>,
    sink: RefCell<Option<Box<dyn TraceSink>>>,
}

impl<K: Ord, S: Surface, H: FrameRequester> FrameLoop<K, S, H> {
    /// Creates a dormant loop over `roots` with the default configuration.
    pub fn new(roots: RootMap<K, S>, requester: H) -> Self {
        Self::with_config(roots, requester, LoopConfig::new())
    }

    /// Creates a dormant loop over `roots`.
    pub fn with_config(roots: RootMap<K, S>, requester: H, config: LoopConfig) -> Self {
        Self {
            roots,
            effects: GlobalEffects::new(),
            requester: RefCell::new(requester),
            state: Cell::new(DriverState::Dormant),
            pending: Cell::new(None),
            config,
            tick_count: Cell::new(0),
            sink: RefCell::new(None),
        }
    }

    /// Returns the roots this loop drives.
    #[must_use]
    pub fn roots(&self) -> &RootMap<K, S> {
        &self.roots
    }

    /// Returns the global registries.
    #[must_use]
    pub fn effects(&self) -> &GlobalEffects {
        &self.effects
    }

    /// Registers a callback that runs before roots render on each tick.
    pub fn add_effect(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.effects.add_effect(callback)
    }

    /// Registers a callback that runs after roots render on each tick.
    pub fn add_after_effect(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.effects.add_after_effect(callback)
    }

    /// Registers a callback that runs when the loop goes dormant.
    pub fn add_tail(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.effects.add_tail(callback)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> LoopConfig {
        self.config
    }

    /// Returns the driver state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state.get()
    }

    /// Returns `true` while the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.get() == DriverState::Running
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.get()
    }

    /// Installs a trace sink and returns the previous one.
    ///
    /// Events are only delivered when the `trace` feature is enabled.
    pub fn set_trace_sink(&self, sink: Option<Box<dyn TraceSink>>) -> Option<Box<dyn TraceSink>> {
        self.sink.replace(sink)
    }

    /// Runs one tick. Hand this to the host's frame callback.
    pub fn tick(&self, timestamp: f64) -> TickReport {
        let tick_index = self.tick_count.get();
        self.tick_count.set(tick_index + 1);

        // Keep at most one request outstanding, even if the host ticks us
        // directly while an invalidation's request is still queued.
        {
            let mut requester = self.requester.borrow_mut();
            if let Some(stale) = self.pending.take() {
                requester.cancel_frame(stale);
            }
            self.pending.set(Some(requester.request_frame()));
        }
        if self.state.replace(DriverState::Running) == DriverState::Dormant {
            self.trace(|t| {
                t.transition(&TransitionEvent {
                    tick_index,
                    from: DriverState::Dormant,
                    to: DriverState::Running,
                    cause: TransitionCause::Tick,
                });
            });
        }
        self.trace(|t| {
            t.tick_begin(&TickBeginEvent {
                tick_index,
                timestamp,
            });
        });

        let mut summary = TickSummaryBuilder::new(tick_index, timestamp);
        self.run_effects(EffectPhase::Before, timestamp);

        let mut repeat: u32 = 0;
        let mut rendered = 0;
        for root in self.roots.snapshot() {
            let Ok(mut state) = root.try_state_mut() else {
                summary.skip_root();
                continue;
            };
            if !state.is_due() {
                summary.skip_root();
                continue;
            }
            let report = render_root(timestamp, &mut state, None);
            let event = RootRenderEvent::new(
                Some(root.id()),
                RenderSource::Tick,
                timestamp,
                state.frameloop(),
                &report,
            );
            drop(state);

            repeat = repeat.saturating_add(report.credit);
            rendered += 1;
            summary.record_render(&report);
            self.trace(|t| t.root_render(&event));
        }

        self.run_effects(EffectPhase::After, timestamp);

        let dormant = repeat == 0;
        if dormant {
            self.run_effects(EffectPhase::Tail, timestamp);
            self.state.set(DriverState::Dormant);
            if let Some(request) = self.pending.take() {
                self.requester.borrow_mut().cancel_frame(request);
            }
            self.trace(|t| {
                t.transition(&TransitionEvent {
                    tick_index,
                    from: DriverState::Running,
                    to: DriverState::Dormant,
                    cause: TransitionCause::Idle,
                });
            });
        }

        let summary = summary.finish(repeat, dormant);
        self.trace(|t| t.tick_summary(&summary));

        TickReport {
            tick_index,
            repeat,
            rendered,
            dormant,
        }
    }

    /// Requests more frames.
    ///
    /// With `None`, every root in the map is invalidated. With a state, that
    /// root gains one unit of frame credit (capped by
    /// [`LoopConfig::frame_credit_limit`]) unless it is presenting, inactive,
    /// or [`Frameloop::Never`]. A dormant loop is woken by the first
    /// successful grant.
    pub fn invalidate(&self, state: Option<&mut RootState<S>>) {
        match state {
            Some(state) => self.invalidate_root(state),
            None => {
                for root in self.roots.snapshot() {
                    if let Ok(mut state) = root.try_state_mut() {
                        self.invalidate_root(&mut state);
                    }
                }
            }
        }
    }

    fn invalidate_root(&self, state: &mut RootState<S>) {
        if state.gl.is_presenting()
            || !state.internal.active
            || state.frameloop() == Frameloop::Never
        {
            return;
        }
        let frames = state.internal.grant_frame(self.config.frame_credit_limit);

        let woke = self.state.get() == DriverState::Dormant;
        if woke {
            self.state.set(DriverState::Running);
            let request = self.requester.borrow_mut().request_frame();
            self.pending.set(Some(request));
            let tick_index = self.tick_count.get();
            self.trace(|t| {
                t.transition(&TransitionEvent {
                    tick_index,
                    from: DriverState::Dormant,
                    to: DriverState::Running,
                    cause: TransitionCause::Invalidate,
                });
            });
        }
        let root = state.id();
        self.trace(|t| t.invalidate(&InvalidateEvent { root, frames, woke }));
    }

    /// Renders synchronously on behalf of a host that owns its frame pump.
    ///
    /// With a state, only that root renders and `frame` is handed to its
    /// subscribers. Without one, every root in the map renders (including
    /// presenting, inactive, and [`Frameloop::Never`] roots) and `frame` is
    /// ignored. The driver state and pending request are left untouched.
    pub fn advance(
        &self,
        timestamp: f64,
        run_global_effects: bool,
        state: Option<&mut RootState<S>>,
        frame: Option<&S::Frame>,
    ) {
        if run_global_effects {
            self.run_effects(EffectPhase::Before, timestamp);
        }

        let mut roots = 0;
        match state {
            Some(state) => {
                self.advance_root(timestamp, state, frame);
                roots += 1;
            }
            None => {
                for root in self.roots.snapshot() {
                    if let Ok(mut state) = root.try_state_mut() {
                        self.advance_root(timestamp, &mut state, None);
                        roots += 1;
                    }
                }
            }
        }

        if run_global_effects {
            self.run_effects(EffectPhase::After, timestamp);
        }
        self.trace(|t| {
            t.advance(&AdvanceEvent {
                timestamp,
                roots,
                global_effects: run_global_effects,
            });
        });
    }

    fn advance_root(&self, timestamp: f64, state: &mut RootState<S>, frame: Option<&S::Frame>) {
        let report = render_root(timestamp, state, frame);
        let event = RootRenderEvent::new(
            state.id(),
            RenderSource::Advance,
            timestamp,
            state.frameloop(),
            &report,
        );
        self.trace(|t| t.root_render(&event));
    }

    fn run_effects(&self, phase: EffectPhase, timestamp: f64) {
        let invoked = self.effects.run(phase, timestamp);
        if invoked > 0 {
            self.trace(|t| {
                t.effects(&EffectsEvent {
                    phase,
                    timestamp,
                    invoked,
                });
            });
        }
    }

    fn trace(&self, emit: impl FnOnce(&mut Tracer<'_>)) {
        // A sink that is busy (replaced from inside one of its own events)
        // just misses the event.
        let Ok(mut slot) = self.sink.try_borrow_mut() else {
            return;
        };
        if let Some(sink) = slot.as_deref_mut() {
            emit(&mut Tracer::new(sink));
        }
    }
}

impl<K: fmt::Debug, S: Surface, H: FrameRequester> fmt::Debug for FrameLoop<K, S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoop")
            .field("roots", &self.roots)
            .field("effects", &self.effects)
            .field("state", &self.state.get())
            .field("pending", &self.pending.get())
            .field("config", &self.config)
            .field("tick_count", &self.tick_count.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FrameClock, TimeSource};
    use crate::config::MAX_FRAME_CREDIT;
    use crate::host::{ManualRequester, ManualTime};
    use crate::root::{FrameRef, Root};
    use alloc::rc::{Rc, Weak};
    use alloc::vec;
    use alloc::vec::Vec;

    #[derive(Default)]
    struct Canvas {
        draws: Rc<Cell<u32>>,
        presenting: Rc<Cell<bool>>,
    }

    impl Surface for Canvas {
        type Scene = ();
        type Camera = ();
        type Frame = u32;

        fn render(&mut self, _: &(), _: &()) {
            self.draws.set(self.draws.get() + 1);
        }

        fn is_presenting(&self) -> bool {
            self.presenting.get()
        }
    }

    type Loop = FrameLoop<&'static str, Canvas, ManualRequester>;

    struct Fixture {
        time: ManualTime,
        host: ManualRequester,
        frame_loop: Rc<Loop>,
    }

    struct TestRoot {
        root: Root<Canvas>,
        draws: Rc<Cell<u32>>,
        presenting: Rc<Cell<bool>>,
    }

    impl TestRoot {
        fn frames(&self) -> u32 {
            self.root.state().internal.frames()
        }
    }

    fn fixture() -> Fixture {
        let host = ManualRequester::new();
        let frame_loop = Rc::new(FrameLoop::new(RootMap::new(), host.clone()));
        Fixture {
            time: ManualTime::new(0.0),
            host,
            frame_loop,
        }
    }

    impl Fixture {
        fn add_root(&self, key: &'static str, frameloop: Frameloop) -> TestRoot {
            let canvas = Canvas::default();
            let draws = Rc::clone(&canvas.draws);
            let presenting = Rc::clone(&canvas.presenting);
            let state = RootState::new(canvas, (), (), FrameClock::new(Rc::new(self.time.clone())))
                .with_frameloop(frameloop);
            let root = self.frame_loop.roots().insert(key, state).unwrap();
            TestRoot {
                root,
                draws,
                presenting,
            }
        }

        fn pump(&self) -> Option<TickReport> {
            self.time.advance(1.0 / 60.0);
            self.host.pump(&*self.frame_loop, self.time.now())
        }
    }

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logger(log: &Log, name: &'static str) -> impl FnMut(f64) + 'static {
        let log = Rc::clone(log);
        move |_| log.borrow_mut().push(name)
    }

    #[test]
    fn new_loop_is_dormant() {
        let fx = fixture();
        assert_eq!(fx.frame_loop.state(), DriverState::Dormant);
        assert_eq!(fx.host.pending(), 0);
        assert!(fx.pump().is_none(), "nothing to pump while dormant");
    }

    #[test]
    fn demand_root_without_credit_is_not_rendered() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Demand);

        let report = fx.frame_loop.tick(0.0);
        assert_eq!(report.rendered, 0);
        assert_eq!(root.draws.get(), 0);
        assert!(report.dormant);
        assert!(!fx.frame_loop.is_running());
        assert_eq!(fx.host.pending(), 0, "idle tick must cancel its request");
    }

    #[test]
    fn invalidate_never_exceeds_credit_cap() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Demand);

        for _ in 0..200 {
            fx.frame_loop.invalidate(Some(&mut root.root.state_mut()));
        }
        assert_eq!(root.frames(), MAX_FRAME_CREDIT);
        assert_eq!(fx.host.requested(), 1, "only the first grant wakes the loop");
    }

    #[test]
    fn configured_credit_limit_is_respected() {
        let host = ManualRequester::new();
        let roots = RootMap::new();
        let frame_loop: Loop = FrameLoop::with_config(
            roots.clone(),
            host.clone(),
            LoopConfig::new().with_frame_credit_limit(2),
        );
        let state = RootState::new(
            Canvas::default(),
            (),
            (),
            FrameClock::new(Rc::new(ManualTime::new(0.0))),
        )
        .with_frameloop(Frameloop::Demand);
        let root = roots.insert("a", state).unwrap();

        for _ in 0..5 {
            frame_loop.invalidate(None);
        }
        assert_eq!(root.state().internal.frames(), 2);

        assert!(!host.pump(&frame_loop, 0.1).unwrap().dormant);
        assert!(host.pump(&frame_loop, 0.2).unwrap().dormant);
        assert!(host.pump(&frame_loop, 0.3).is_none());
    }

    #[test]
    fn dormant_loop_waits_for_invalidation() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Demand);

        fx.frame_loop.invalidate(None);
        assert!(fx.frame_loop.is_running());
        assert_eq!(fx.host.pending(), 1);

        let report = fx.pump().unwrap();
        assert!(report.dormant);
        assert_eq!(root.draws.get(), 1);
        assert_eq!(fx.host.pending(), 0);
        assert!(fx.pump().is_none(), "no ticks until invalidated again");

        fx.frame_loop.invalidate(None);
        fx.frame_loop.invalidate(None);
        assert_eq!(fx.host.pending(), 1, "exactly one new tick chain");
        assert_eq!(root.frames(), 2);
    }

    #[test]
    fn always_root_renders_every_tick_and_keeps_loop_alive() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Always);

        assert!(!fx.frame_loop.tick(0.0).dormant);
        for _ in 0..10 {
            let report = fx.pump().unwrap();
            assert_eq!(report.repeat, 1);
            assert!(!report.dormant);
        }
        assert_eq!(root.draws.get(), 11);
        assert_eq!(root.frames(), 0, "always roots ignore credit");
        assert_eq!(fx.host.pending(), 1);
        assert_eq!(fx.frame_loop.tick_count(), 11);
    }

    #[test]
    fn always_and_demand_roots_share_the_loop() {
        let fx = fixture();
        let a = fx.add_root("a", Frameloop::Always);
        let b = fx.add_root("b", Frameloop::Demand);

        let first = fx.frame_loop.tick(0.0);
        assert_eq!(a.draws.get(), 1);
        assert_eq!(b.draws.get(), 0);
        assert_eq!(first.repeat, 1);
        assert!(fx.frame_loop.is_running());

        fx.frame_loop.invalidate(Some(&mut b.root.state_mut()));
        assert_eq!(b.frames(), 1);
        assert_eq!(fx.host.pending(), 1, "running loop is not re-requested");

        let second = fx.pump().unwrap();
        assert_eq!(a.draws.get(), 2);
        assert_eq!(b.draws.get(), 1);
        assert_eq!(b.frames(), 0);
        assert!(second.repeat >= 1);
        assert_eq!(second.rendered, 2);
    }

    #[test]
    fn single_demand_root_runs_tail_once() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Demand);
        let tails = Rc::new(Cell::new(0));
        let tails2 = Rc::clone(&tails);
        let _tail = fx
            .frame_loop
            .add_tail(move |_| tails2.set(tails2.get() + 1));

        fx.frame_loop.invalidate(None);
        assert_eq!(root.frames(), 1);
        assert!(fx.frame_loop.is_running());

        let report = fx.pump().unwrap();
        assert_eq!(root.draws.get(), 1);
        assert_eq!(root.frames(), 0);
        assert_eq!(report.repeat, 0);
        assert!(!fx.frame_loop.is_running());
        assert_eq!(tails.get(), 1);

        assert!(fx.pump().is_none());
        assert_eq!(tails.get(), 1, "tail fires once per transition");
    }

    #[test]
    fn tick_phases_run_in_order() {
        let fx = fixture();
        let log: Log = Rc::default();
        let root = fx.add_root("a", Frameloop::Demand);
        let log2 = Rc::clone(&log);
        root.root
            .state_mut()
            .internal
            .subscribe(FrameRef::new(move |_, _, _| log2.borrow_mut().push("subscriber")), 0);
        let _e = fx.frame_loop.add_effect(logger(&log, "effect"));
        let _a = fx.frame_loop.add_after_effect(logger(&log, "after"));
        let _t = fx.frame_loop.add_tail(logger(&log, "tail"));

        fx.frame_loop.invalidate(None);
        fx.pump();
        assert_eq!(*log.borrow(), vec!["effect", "subscriber", "after", "tail"]);
    }

    #[test]
    fn unsubscribing_mid_pass_keeps_other_effects_intact() {
        let fx = fixture();
        let _root = fx.add_root("a", Frameloop::Always);
        let log: Log = Rc::default();

        let first = fx.frame_loop.add_effect(logger(&log, "first"));
        let first_slot = Rc::new(RefCell::new(Some(first)));
        let later_slot: Rc<RefCell<Option<Unsubscribe>>> = Rc::default();

        let (log2, first2, later2) = (
            Rc::clone(&log),
            Rc::clone(&first_slot),
            Rc::clone(&later_slot),
        );
        let _middle = fx.frame_loop.add_effect(move |_| {
            log2.borrow_mut().push("middle");
            if let Some(h) = first2.borrow_mut().take() {
                h.unsubscribe();
            }
            if let Some(h) = later2.borrow_mut().take() {
                h.unsubscribe();
            }
        });
        *later_slot.borrow_mut() = Some(fx.frame_loop.add_effect(logger(&log, "later")));
        let _last = fx.frame_loop.add_effect(logger(&log, "last"));

        fx.frame_loop.tick(0.0);
        assert_eq!(*log.borrow(), vec!["first", "middle", "last"]);

        log.borrow_mut().clear();
        fx.pump();
        assert_eq!(*log.borrow(), vec!["middle", "last"]);
    }

    #[test]
    fn advance_with_state_renders_only_that_root() {
        let fx = fixture();
        let a = fx.add_root("a", Frameloop::Demand);
        let b = fx.add_root("b", Frameloop::Demand);

        fx.frame_loop
            .advance(1.0, true, Some(&mut a.root.state_mut()), Some(&7));
        assert_eq!(a.draws.get(), 1);
        assert_eq!(b.draws.get(), 0);
        assert_eq!(fx.frame_loop.state(), DriverState::Dormant);
        assert_eq!(fx.host.requested(), 0);

        fx.frame_loop.invalidate(Some(&mut b.root.state_mut()));
        fx.frame_loop
            .advance(2.0, true, Some(&mut a.root.state_mut()), None);
        assert_eq!(fx.frame_loop.state(), DriverState::Running);
        assert_eq!(fx.host.pending(), 1, "advance leaves the pending request alone");
        assert_eq!(b.frames(), 1, "advance does not touch other roots' credit");
    }

    #[test]
    fn advance_hands_native_frame_to_subscribers() {
        let fx = fixture();
        let a = fx.add_root("a", Frameloop::Never);
        let seen: Rc<RefCell<Vec<Option<u32>>>> = Rc::default();
        let seen2 = Rc::clone(&seen);
        a.root.state_mut().internal.subscribe(
            FrameRef::new(move |_, _, frame: Option<&u32>| seen2.borrow_mut().push(frame.copied())),
            0,
        );

        fx.frame_loop
            .advance(0.5, false, Some(&mut a.root.state_mut()), Some(&11));
        fx.frame_loop.advance(1.0, false, None, Some(&12));
        assert_eq!(*seen.borrow(), vec![Some(11), None]);
    }

    #[test]
    fn advance_without_state_renders_every_root() {
        let fx = fixture();
        let a = fx.add_root("a", Frameloop::Demand);
        let b = fx.add_root("b", Frameloop::Never);
        let c = fx.add_root("c", Frameloop::Always);
        c.presenting.set(true);
        let log: Log = Rc::default();
        let _e = fx.frame_loop.add_effect(logger(&log, "effect"));
        let _a = fx.frame_loop.add_after_effect(logger(&log, "after"));

        fx.frame_loop.advance(1.0, true, None, None);
        assert_eq!((a.draws.get(), b.draws.get(), c.draws.get()), (1, 1, 1));
        assert_eq!(*log.borrow(), vec!["effect", "after"]);

        fx.frame_loop.advance(2.0, false, None, None);
        assert_eq!(log.borrow().len(), 2, "global effects skipped on request");
        assert!(!fx.frame_loop.is_running());
    }

    #[test]
    fn never_root_is_paced_only_by_advance() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Never);
        let deltas: Rc<RefCell<Vec<f64>>> = Rc::default();
        let deltas2 = Rc::clone(&deltas);
        root.root.state_mut().internal.subscribe(
            FrameRef::new(move |_, delta, _| deltas2.borrow_mut().push(delta)),
            0,
        );

        fx.frame_loop.invalidate(Some(&mut root.root.state_mut()));
        assert_eq!(root.frames(), 0, "never roots are not invalidated");
        assert!(!fx.frame_loop.is_running());
        fx.frame_loop.tick(0.0);
        assert_eq!(root.draws.get(), 0, "never roots are not ticked");

        fx.frame_loop.advance(0.5, true, None, None);
        fx.frame_loop.advance(0.75, true, None, None);
        assert_eq!(*deltas.borrow(), vec![0.5, 0.25]);
    }

    #[test]
    fn presenting_root_is_left_to_the_xr_pump() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Always);
        root.presenting.set(true);

        fx.frame_loop.invalidate(Some(&mut root.root.state_mut()));
        assert_eq!(root.frames(), 0);
        assert!(!fx.frame_loop.is_running());

        let report = fx.frame_loop.tick(0.0);
        assert_eq!(root.draws.get(), 0);
        assert!(report.dormant);

        fx.frame_loop
            .advance(0.1, false, Some(&mut root.root.state_mut()), Some(&1));
        assert_eq!(root.draws.get(), 1);
    }

    #[test]
    fn inactive_root_is_skipped() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Always);
        root.root.state_mut().internal.active = false;

        fx.frame_loop.invalidate(None);
        assert!(!fx.frame_loop.is_running());
        assert!(fx.frame_loop.tick(0.0).dormant);
        assert_eq!(root.draws.get(), 0);
    }

    #[test]
    fn subscriber_can_keep_its_root_invalidated() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Demand);
        let remaining = Rc::new(Cell::new(3_u32));
        let weak: Weak<Loop> = Rc::downgrade(&fx.frame_loop);
        let remaining2 = Rc::clone(&remaining);
        root.root.state_mut().internal.subscribe(
            FrameRef::new(move |state: &mut RootState<Canvas>, _, _| {
                if remaining2.get() > 0 {
                    remaining2.set(remaining2.get() - 1);
                    if let Some(frame_loop) = weak.upgrade() {
                        frame_loop.invalidate(Some(state));
                    }
                }
            }),
            0,
        );

        fx.frame_loop.invalidate(None);
        let mut ticks = 0;
        while fx.pump().is_some() {
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        assert_eq!(root.draws.get(), 4);
        assert!(!fx.frame_loop.is_running());
    }

    #[test]
    fn invalidate_all_from_subscriber_skips_busy_root() {
        let fx = fixture();
        let a = fx.add_root("a", Frameloop::Always);
        let b = fx.add_root("b", Frameloop::Demand);
        let weak: Weak<Loop> = Rc::downgrade(&fx.frame_loop);
        a.root.state_mut().internal.subscribe(
            FrameRef::new(move |_, _, _| {
                if let Some(frame_loop) = weak.upgrade() {
                    frame_loop.invalidate(None);
                }
            }),
            0,
        );

        fx.frame_loop.tick(0.0);
        assert_eq!(a.frames(), 0, "the rendering root is busy and skipped");
        // "b" sorts after "a", so it renders in the same tick and spends it.
        assert_eq!(b.draws.get(), 1);
        assert_eq!(b.frames(), 0);
    }

    #[test]
    fn roots_added_by_effects_render_in_same_tick() {
        let fx = fixture();
        let added: Rc<RefCell<Option<TestRoot>>> = Rc::default();
        let fx_time = fx.time.clone();
        let roots = fx.frame_loop.roots().clone();
        let added2 = Rc::clone(&added);
        let _e = fx.frame_loop.add_effect(move |_| {
            if added2.borrow().is_some() {
                return;
            }
            let canvas = Canvas::default();
            let draws = Rc::clone(&canvas.draws);
            let presenting = Rc::clone(&canvas.presenting);
            let state = RootState::new(canvas, (), (), FrameClock::new(Rc::new(fx_time.clone())));
            let root = roots.insert("late", state).unwrap();
            *added2.borrow_mut() = Some(TestRoot {
                root,
                draws,
                presenting,
            });
        });

        let report = fx.frame_loop.tick(0.0);
        assert_eq!(report.rendered, 1);
        let added = added.borrow();
        assert_eq!(added.as_ref().unwrap().draws.get(), 1);
    }

    #[test]
    fn direct_tick_does_not_fork_the_chain() {
        let fx = fixture();
        let _root = fx.add_root("a", Frameloop::Always);

        fx.frame_loop.invalidate(None);
        assert_eq!(fx.host.pending(), 1);
        // Host ticks on its own before the queued request fires.
        fx.frame_loop.tick(0.0);
        assert_eq!(fx.host.pending(), 1, "stale request is replaced, not doubled");
        fx.pump();
        assert_eq!(fx.host.pending(), 1);
    }

    #[test]
    fn loops_do_not_share_registries() {
        let a = fixture();
        let b = fixture();
        let log: Log = Rc::default();
        let _e = a.frame_loop.add_effect(logger(&log, "a"));

        b.frame_loop.tick(0.0);
        assert!(log.borrow().is_empty());
        a.frame_loop.tick(0.0);
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn priority_subscriber_takes_over_drawing() {
        let fx = fixture();
        let root = fx.add_root("a", Frameloop::Always);
        let ran = Rc::new(Cell::new(0));
        let ran2 = Rc::clone(&ran);
        let id = root.root.state_mut().internal.subscribe(
            FrameRef::new(move |_, _, _| ran2.set(ran2.get() + 1)),
            1,
        );

        fx.frame_loop.tick(0.0);
        assert_eq!(ran.get(), 1);
        assert_eq!(root.draws.get(), 0);

        root.root.state_mut().internal.unsubscribe(id);
        fx.pump();
        assert_eq!(root.draws.get(), 1);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn trace_sink_sees_lifecycle() {
        use crate::trace::TickSummary;

        #[derive(Default)]
        struct Recording {
            events: Rc<RefCell<Vec<&'static str>>>,
        }
        impl TraceSink for Recording {
            fn on_invalidate(&mut self, _: &InvalidateEvent) {
                self.events.borrow_mut().push("invalidate");
            }
            fn on_transition(&mut self, e: &TransitionEvent) {
                self.events.borrow_mut().push(match e.to {
                    DriverState::Running => "running",
                    DriverState::Dormant => "dormant",
                });
            }
            fn on_root_render(&mut self, _: &RootRenderEvent) {
                self.events.borrow_mut().push("render");
            }
            fn on_tick_summary(&mut self, s: &TickSummary) {
                assert_eq!(s.roots_rendered, 1);
                self.events.borrow_mut().push("summary");
            }
        }

        let fx = fixture();
        let _root = fx.add_root("a", Frameloop::Demand);
        let sink = Recording::default();
        let events = Rc::clone(&sink.events);
        assert!(fx.frame_loop.set_trace_sink(Some(Box::new(sink))).is_none());

        fx.frame_loop.invalidate(None);
        fx.pump();
        assert_eq!(
            *events.borrow(),
            vec!["running", "invalidate", "render", "dormant", "summary"]
        );
    }
}
