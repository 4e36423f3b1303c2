// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render roots, their state, and per-frame subscribers.
//!
//! A *root* is one independently configured render target: a [`Surface`]
//! plus the scene and camera it draws, a [`FrameClock`], and a
//! [`Frameloop`] policy. Roots are registered in a [`RootMap`] keyed by an
//! opaque surface identity; the loop driver only ever reads a snapshot of
//! that map taken at tick time.
//!
//! # Frame credit
//!
//! `Internal::frames` is a bounded counter (0–60). A [`Frameloop::Demand`]
//! root is rendered on a tick only while it holds credit; each render spends
//! one unit. Credit is granted by
//! [`FrameLoop::invalidate`](crate::driver::FrameLoop::invalidate).
//!
//! # Subscribers
//!
//! Per-root subscribers are the extension point for animation, physics, and
//! controls. Each one is registered through a [`FrameRef`], a shared cell
//! whose callback can be replaced with [`FrameRef::set`] without
//! re-subscribing. Subscribers run in ascending render priority; equal
//! priorities keep registration order. Any subscriber with a positive
//! priority takes over drawing for the root: the loop still runs every
//! subscriber but skips its own draw call.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell, RefMut};
use core::fmt;

use crate::clock::FrameClock;
use crate::surface::Surface;

/// Scheduling policy for one root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Frameloop {
    /// Render on every tick.
    #[default]
    Always,
    /// Render only while the root holds frame credit.
    Demand,
    /// Never rendered by the automatic driver; the host paces it through
    /// [`FrameLoop::advance`](crate::driver::FrameLoop::advance).
    Never,
}

/// Stable identity of a root within a [`RootMap`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RootId(pub u32);

impl fmt::Debug for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootId({})", self.0)
    }
}

/// Errors from root registration and access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootError {
    /// A root is already registered under this key.
    DuplicateKey,
    /// The root's state is currently borrowed (e.g. the caller is running
    /// inside one of its subscribers).
    Busy,
}

impl fmt::Display for RootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey => f.write_str("a root is already registered for this key"),
            Self::Busy => f.write_str("root state is already borrowed"),
        }
    }
}

impl core::error::Error for RootError {}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// A per-root per-frame callback: `(state, delta_seconds, native_frame)`.
pub type FrameCallback<S> = dyn FnMut(&mut RootState<S>, f64, Option<&<S as Surface>::Frame>);

/// A swappable slot holding the current per-frame callback.
///
/// The subscription keeps the slot, not the callback, so the owner can
/// redefine the callback at any time (including from inside it).
pub struct FrameRef<S: Surface> {
    current: Cell<Option<Box<FrameCallback<S>>>>,
}

impl<S: Surface> FrameRef<S> {
    /// Creates a slot holding `callback`.
    pub fn new(
        callback: impl FnMut(&mut RootState<S>, f64, Option<&S::Frame>) + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            current: Cell::new(Some(Box::new(callback))),
        })
    }

    /// Replaces the current callback. Takes effect on the next invocation.
    pub fn set(&self, callback: impl FnMut(&mut RootState<S>, f64, Option<&S::Frame>) + 'static) {
        self.current.set(Some(Box::new(callback)));
    }

    /// Invokes the current callback. Returns `false` if the slot was empty,
    /// which happens only when the callback is already executing further up
    /// the stack.
    pub fn invoke(&self, state: &mut RootState<S>, delta: f64, frame: Option<&S::Frame>) -> bool {
        let Some(mut callback) = self.current.take() else {
            return false;
        };
        callback(state, delta, frame);
        // A replacement installed during the call wins over the old callback.
        let replacement = self.current.take();
        self.current.set(Some(replacement.unwrap_or(callback)));
        true
    }
}

impl<S: Surface> fmt::Debug for FrameRef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRef").finish_non_exhaustive()
    }
}

/// Identifies one subscription on one root.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// A registered per-frame subscriber.
pub struct Subscription<S: Surface> {
    id: SubscriptionId,
    priority: i32,
    frame_ref: Rc<FrameRef<S>>,
    /// Cleared on unsubscribe so an in-flight pass skips the entry.
    live: Rc<Cell<bool>>,
}

impl<S: Surface> Subscription<S> {
    /// Returns the subscription id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the render priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the callback slot.
    #[must_use]
    pub fn frame_ref(&self) -> &Rc<FrameRef<S>> {
        &self.frame_ref
    }
}

impl<S: Surface> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Internal bookkeeping
// ---------------------------------------------------------------------------

/// Scheduler bookkeeping for one root.
pub struct Internal<S: Surface> {
    /// Inactive roots are never rendered or invalidated.
    pub active: bool,
    frames: u32,
    priority: u32,
    subscribers: Vec<Subscription<S>>,
    next_subscription: u64,
}

impl<S: Surface> Internal<S> {
    fn new() -> Self {
        Self {
            active: true,
            frames: 0,
            priority: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Remaining frame credit.
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Number of subscribers that have taken over drawing.
    #[must_use]
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Returns the subscribers in invocation order.
    #[must_use]
    pub fn subscribers(&self) -> &[Subscription<S>] {
        &self.subscribers
    }

    /// Registers `frame_ref` with the given render priority.
    ///
    /// A positive priority means the subscriber renders the root itself, so
    /// the loop skips its own draw call while the subscription exists.
    pub fn subscribe(&mut self, frame_ref: Rc<FrameRef<S>>, priority: i32) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        if priority > 0 {
            self.priority += 1;
        }
        let pos = self
            .subscribers
            .iter()
            .position(|s| s.priority > priority)
            .unwrap_or(self.subscribers.len());
        self.subscribers.insert(
            pos,
            Subscription {
                id,
                priority,
                frame_ref,
                live: Rc::new(Cell::new(true)),
            },
        );
        id
    }

    /// Removes the subscription with the given id. Returns `false` if it
    /// was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(pos) = self.subscribers.iter().position(|s| s.id == id) else {
            return false;
        };
        let removed = self.subscribers.remove(pos);
        removed.live.set(false);
        if removed.priority > 0 {
            self.priority -= 1;
        }
        true
    }

    /// Adds one unit of credit, capped at `limit`. Returns the new credit.
    pub(crate) fn grant_frame(&mut self, limit: u32) -> u32 {
        self.frames = self.frames.saturating_add(1).min(limit);
        self.frames
    }

    /// Spends one unit of credit, floored at zero. Returns the new credit.
    pub(crate) fn spend_frame(&mut self) -> u32 {
        self.frames = self.frames.saturating_sub(1);
        self.frames
    }

    /// Copies the subscriber list for one pass. Each slot comes with its
    /// liveness flag; entries removed mid-pass must be skipped.
    pub(crate) fn subscriber_snapshot(&self) -> Vec<(Rc<Cell<bool>>, Rc<FrameRef<S>>)> {
        self.subscribers
            .iter()
            .map(|s| (Rc::clone(&s.live), Rc::clone(&s.frame_ref)))
            .collect()
    }
}

impl<S: Surface> fmt::Debug for Internal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Internal")
            .field("active", &self.active)
            .field("frames", &self.frames)
            .field("priority", &self.priority)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RootState
// ---------------------------------------------------------------------------

/// Everything the loop needs to know about one root.
pub struct RootState<S: Surface> {
    id: Option<RootId>,
    /// Delta-time clock.
    pub clock: FrameClock,
    frameloop: Frameloop,
    /// Scheduler bookkeeping.
    pub internal: Internal<S>,
    /// The drawable surface.
    pub gl: S,
    /// Scene handed to [`Surface::render`].
    pub scene: S::Scene,
    /// Camera handed to [`Surface::render`].
    pub camera: S::Camera,
}

impl<S: Surface> RootState<S> {
    /// Creates an active root with [`Frameloop::Always`] and no credit.
    pub fn new(gl: S, scene: S::Scene, camera: S::Camera, clock: FrameClock) -> Self {
        Self {
            id: None,
            clock,
            frameloop: Frameloop::default(),
            internal: Internal::new(),
            gl,
            scene,
            camera,
        }
    }

    /// Sets the scheduling policy.
    #[must_use]
    pub fn with_frameloop(mut self, frameloop: Frameloop) -> Self {
        self.set_frameloop(frameloop);
        self
    }

    /// Returns the scheduling policy.
    #[must_use]
    pub fn frameloop(&self) -> Frameloop {
        self.frameloop
    }

    /// Changes the scheduling policy and resets the clock.
    ///
    /// [`Frameloop::Never`] stops the clock so that only the host's
    /// timestamps move it; the other policies restart it from zero.
    pub fn set_frameloop(&mut self, frameloop: Frameloop) {
        self.clock.stop();
        self.clock.elapsed_time = 0.0;
        if frameloop != Frameloop::Never {
            self.clock.start();
        }
        self.frameloop = frameloop;
    }

    /// Returns the id assigned when the root was inserted into a
    /// [`RootMap`], if any.
    #[must_use]
    pub fn id(&self) -> Option<RootId> {
        self.id
    }

    /// Whether the automatic driver should render this root on the next tick.
    #[must_use]
    pub fn is_due(&self) -> bool {
        self.internal.active
            && (self.frameloop == Frameloop::Always || self.internal.frames > 0)
            && !self.gl.is_presenting()
    }
}

impl<S: Surface> fmt::Debug for RootState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootState")
            .field("id", &self.id)
            .field("clock", &self.clock)
            .field("frameloop", &self.frameloop)
            .field("internal", &self.internal)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Root + RootMap
// ---------------------------------------------------------------------------

/// Shared handle to one root's state.
pub struct Root<S: Surface> {
    id: RootId,
    state: Rc<RefCell<RootState<S>>>,
}

impl<S: Surface> Clone for Root<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Rc::clone(&self.state),
        }
    }
}

impl<S: Surface> Root<S> {
    /// Returns the root's id.
    #[must_use]
    pub fn id(&self) -> RootId {
        self.id
    }

    /// Borrows the state.
    ///
    /// # Panics
    ///
    /// Panics if the state is mutably borrowed.
    #[must_use]
    pub fn state(&self) -> Ref<'_, RootState<S>> {
        self.state.borrow()
    }

    /// Mutably borrows the state.
    ///
    /// # Panics
    ///
    /// Panics if the state is already borrowed.
    #[must_use]
    pub fn state_mut(&self) -> RefMut<'_, RootState<S>> {
        self.state.borrow_mut()
    }

    /// Mutably borrows the state if it is not already borrowed.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::Busy`] while the state is borrowed.
    pub fn try_state_mut(&self) -> Result<RefMut<'_, RootState<S>>, RootError> {
        self.state.try_borrow_mut().map_err(|_| RootError::Busy)
    }
}

impl<S: Surface> fmt::Debug for Root<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

struct RootMapInner<K, S: Surface> {
    roots: RefCell<BTreeMap<K, Root<S>>>,
    next_id: Cell<u32>,
}

/// Shared mapping from surface identity to root.
///
/// Cloning a `RootMap` yields another handle to the same mapping, so hosts
/// can keep adding and removing roots after handing it to a loop.
pub struct RootMap<K, S: Surface> {
    inner: Rc<RootMapInner<K, S>>,
}

impl<K, S: Surface> Clone for RootMap<K, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Ord, S: Surface> Default for RootMap<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, S: Surface> RootMap<K, S> {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RootMapInner {
                roots: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Registers `state` under `key` and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`RootError::DuplicateKey`] if `key` is already registered.
    pub fn insert(&self, key: K, mut state: RootState<S>) -> Result<Root<S>, RootError> {
        let mut roots = self.inner.roots.borrow_mut();
        if roots.contains_key(&key) {
            return Err(RootError::DuplicateKey);
        }
        let id = RootId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        state.id = Some(id);
        let root = Root {
            id,
            state: Rc::new(RefCell::new(state)),
        };
        roots.insert(key, root.clone());
        Ok(root)
    }

    /// Unregisters and returns the root under `key`.
    pub fn remove(&self, key: &K) -> Option<Root<S>> {
        self.inner.roots.borrow_mut().remove(key)
    }

    /// Returns the root under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Root<S>> {
        self.inner.roots.borrow().get(key).cloned()
    }

    /// Returns `true` if a root is registered under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.roots.borrow().contains_key(key)
    }

    /// Returns the number of registered roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.roots.borrow().len()
    }

    /// Returns `true` if no roots are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.roots.borrow().is_empty()
    }

    /// Returns handles to every registered root.
    ///
    /// The snapshot is detached from the map: roots added or removed while
    /// iterating it do not affect the current pass.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Root<S>> {
        self.inner.roots.borrow().values().cloned().collect()
    }
}

impl<K: fmt::Debug, S: Surface> fmt::Debug for RootMap<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.roots.borrow().iter().map(|(k, r)| (k, r.id)))
            .finish()
    }
}
