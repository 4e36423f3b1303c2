// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Global per-frame callback registries.
//!
//! A [`FrameLoop`](crate::driver::FrameLoop) owns three ordered registries,
//! bundled as [`GlobalEffects`]:
//!
//! - **effects**: run at the start of every tick, before any root renders.
//! - **after-effects**: run at the end of every tick.
//! - **tail**: run only when a tick leaves the loop dormant.
//!
//! Registration returns an [`Unsubscribe`] handle that removes exactly that
//! entry. Entries are keyed by a unique id, never by position, so removing
//! one entry cannot redirect another handle to the wrong callback.
//!
//! [`CallbackRegistry::run`] iterates a snapshot of the entries. Callbacks may
//! add or remove entries (including themselves) while a pass is in progress:
//! entries added during a pass first run on the next pass, and entries
//! removed during a pass are skipped if they have not run yet.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

/// A global per-frame callback, invoked with the tick timestamp in seconds.
pub type GlobalCallback = dyn FnMut(f64);

/// Which registry a callback belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectPhase {
    /// Runs before roots render.
    Before,
    /// Runs after roots render.
    After,
    /// Runs when the loop goes dormant.
    Tail,
}

/// Identifies one entry within a [`CallbackRegistry`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(pub u64);

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectId({})", self.0)
    }
}

struct Entry {
    id: EffectId,
    live: Cell<bool>,
    callback: RefCell<Box<GlobalCallback>>,
}

#[derive(Default)]
struct RegistryInner {
    entries: RefCell<Vec<Rc<Entry>>>,
    next_id: Cell<u64>,
}

impl RegistryInner {
    fn remove(&self, id: EffectId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let entry = entries.remove(pos);
        entry.live.set(false);
        true
    }
}

/// An ordered list of global callbacks.
#[derive(Default)]
pub struct CallbackRegistry {
    inner: Rc<RegistryInner>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `callback` and returns a handle that removes it again.
    pub fn add(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        let id = EffectId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.entries.borrow_mut().push(Rc::new(Entry {
            id,
            live: Cell::new(true),
            callback: RefCell::new(Box::new(callback)),
        }));
        Unsubscribe {
            registry: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Removes the entry with the given id. Returns `false` if it was
    /// already gone.
    pub fn remove(&self, id: EffectId) -> bool {
        self.inner.remove(id)
    }

    /// Invokes every registered callback in registration order and returns
    /// how many ran.
    ///
    /// A callback that is already executing further up the stack (a nested
    /// `run` triggered from inside it) is not re-entered.
    pub fn run(&self, timestamp: f64) -> u32 {
        if self.is_empty() {
            return 0;
        }
        let snapshot: Vec<Rc<Entry>> = self.inner.entries.borrow().clone();
        let mut invoked = 0;
        for entry in snapshot {
            if !entry.live.get() {
                continue;
            }
            if let Ok(mut callback) = entry.callback.try_borrow_mut() {
                callback(timestamp);
                invoked += 1;
            }
        }
        invoked
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<EffectId> = self.inner.entries.borrow().iter().map(|e| e.id).collect();
        f.debug_struct("CallbackRegistry")
            .field("entries", &ids)
            .finish()
    }
}

/// Removes one callback from the registry that produced it.
///
/// Dropping the handle does **not** unregister the callback; call
/// [`unsubscribe`](Self::unsubscribe) explicitly.
#[must_use = "dropping the handle leaves the callback registered"]
pub struct Unsubscribe {
    registry: Weak<RegistryInner>,
    id: EffectId,
}

impl Unsubscribe {
    /// Returns the id of the entry this handle removes.
    #[must_use]
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Removes the callback. Returns `false` if it was already removed or the
    /// registry no longer exists.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|inner| inner.remove(self.id))
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The three global registries owned by one loop.
#[derive(Debug, Default)]
pub struct GlobalEffects {
    effects: CallbackRegistry,
    after_effects: CallbackRegistry,
    tail: CallbackRegistry,
}

impl GlobalEffects {
    /// Creates three empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback that runs before roots render on each tick.
    pub fn add_effect(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.effects.add(callback)
    }

    /// Registers a callback that runs after roots render on each tick.
    pub fn add_after_effect(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.after_effects.add(callback)
    }

    /// Registers a callback that runs when the loop goes dormant.
    pub fn add_tail(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.tail.add(callback)
    }

    /// Returns the registry for `phase`.
    #[must_use]
    pub fn registry(&self, phase: EffectPhase) -> &CallbackRegistry {
        match phase {
            EffectPhase::Before => &self.effects,
            EffectPhase::After => &self.after_effects,
            EffectPhase::Tail => &self.tail,
        }
    }

    /// Runs the registry for `phase` and returns how many callbacks ran.
    pub fn run(&self, phase: EffectPhase, timestamp: f64) -> u32 {
        self.registry(phase).run(timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logger(log: &Log, name: &'static str) -> impl FnMut(f64) + 'static {
        let log = Rc::clone(log);
        move |_| log.borrow_mut().push(name)
    }

    #[test]
    fn runs_in_registration_order() {
        let log: Log = Rc::default();
        let registry = CallbackRegistry::new();
        let _a = registry.add(logger(&log, "a"));
        let _b = registry.add(logger(&log, "b"));
        let _c = registry.add(logger(&log, "c"));

        assert_eq!(registry.run(0.0), 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn passes_timestamp() {
        let seen = Rc::new(Cell::new(0.0));
        let registry = CallbackRegistry::new();
        let seen2 = Rc::clone(&seen);
        let _h = registry.add(move |t| seen2.set(t));

        registry.run(1.5);
        assert_eq!(seen.get(), 1.5);
    }

    #[test]
    fn unsubscribe_removes_exactly_that_entry() {
        let log: Log = Rc::default();
        let registry = CallbackRegistry::new();
        let a = registry.add(logger(&log, "a"));
        let b = registry.add(logger(&log, "b"));
        let _c = registry.add(logger(&log, "c"));

        // Removing an earlier entry first must not shift later handles.
        assert!(a.unsubscribe());
        assert!(b.unsubscribe());
        registry.run(0.0);
        assert_eq!(*log.borrow(), vec!["c"]);
    }

    #[test]
    fn double_remove_is_harmless() {
        let registry = CallbackRegistry::new();
        let h = registry.add(|_| {});
        let id = h.id();
        assert!(h.unsubscribe());
        assert!(!registry.remove(id), "entry should already be gone");
        assert!(registry.is_empty());
    }

    #[test]
    fn self_removal_mid_pass_keeps_other_entries() {
        let log: Log = Rc::default();
        let registry = Rc::new(CallbackRegistry::new());
        let _a = registry.add(logger(&log, "a"));

        let handle: Rc<RefCell<Option<Unsubscribe>>> = Rc::default();
        let handle2 = Rc::clone(&handle);
        let log2 = Rc::clone(&log);
        *handle.borrow_mut() = Some(registry.add(move |_| {
            log2.borrow_mut().push("b");
            if let Some(h) = handle2.borrow_mut().take() {
                h.unsubscribe();
            }
        }));
        let _c = registry.add(logger(&log, "c"));

        registry.run(0.0);
        registry.run(0.0);
        assert_eq!(*log.borrow(), vec!["a", "b", "c", "a", "c"]);
    }

    #[test]
    fn removing_later_entry_mid_pass_skips_it() {
        let log: Log = Rc::default();
        let registry = CallbackRegistry::new();
        let _a = registry.add(logger(&log, "a"));

        let victim: Rc<RefCell<Option<Unsubscribe>>> = Rc::default();
        let victim2 = Rc::clone(&victim);
        let log2 = Rc::clone(&log);
        let _b = registry.add(move |_| {
            log2.borrow_mut().push("b");
            if let Some(h) = victim2.borrow_mut().take() {
                h.unsubscribe();
            }
        });
        *victim.borrow_mut() = Some(registry.add(logger(&log, "c")));
        let _d = registry.add(logger(&log, "d"));

        registry.run(0.0);
        assert_eq!(*log.borrow(), vec!["a", "b", "d"]);
    }

    #[test]
    fn entries_added_mid_pass_run_next_pass() {
        let log: Log = Rc::default();
        let registry = Rc::new(CallbackRegistry::new());
        let reg2 = Rc::clone(&registry);
        let log2 = Rc::clone(&log);
        let added = Rc::new(Cell::new(false));
        let _a = registry.add(move |_| {
            log2.borrow_mut().push("a");
            if !added.replace(true) {
                let _late = reg2.add(logger(&log2, "late"));
            }
        });

        assert_eq!(registry.run(0.0), 1);
        assert_eq!(registry.run(0.0), 2);
        assert_eq!(*log.borrow(), vec!["a", "a", "late"]);
    }

    #[test]
    fn empty_registry_runs_nothing() {
        let registry = CallbackRegistry::new();
        assert_eq!(registry.run(0.0), 0);
    }

    #[test]
    fn handle_outliving_registry_is_inert() {
        let registry = CallbackRegistry::new();
        let h = registry.add(|_| {});
        drop(registry);
        assert!(!h.unsubscribe());
    }

    #[test]
    fn global_effects_keep_phases_separate() {
        let log: Log = Rc::default();
        let effects = GlobalEffects::new();
        let _e = effects.add_effect(logger(&log, "effect"));
        let _a = effects.add_after_effect(logger(&log, "after"));
        let _t = effects.add_tail(logger(&log, "tail"));

        effects.run(EffectPhase::After, 0.0);
        effects.run(EffectPhase::Before, 0.0);
        effects.run(EffectPhase::Tail, 0.0);
        assert_eq!(*log.borrow(), vec!["after", "effect", "tail"]);
        assert_eq!(effects.registry(EffectPhase::Tail).len(), 1);
    }
}
