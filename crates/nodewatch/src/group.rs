//! Group Node Observer
//!
//! Composes one [`SingleNodeObserver`] per slot and reports the group only
//! while every slot is occupied. Slot changes are re-checked one tick later,
//! so slots settling within the same tick produce a single group callback.

use crate::deferred::{DeferredSlot, Generation};
use crate::handle::{Dispose, ObserverHandle};
use crate::host::{Scheduler, TreeHost};
use crate::observer::SingleNodeObserver;
use crate::Teardown;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Slot key to settled node
pub type SlotMap<K, N> = HashMap<K, N>;

type GroupSettleFn<K, N> = Rc<dyn Fn(SlotMap<K, N>) -> Teardown>;

/// Debounced observer for a fixed set of named slots under one parent
pub struct GroupNodeObserver<H: TreeHost, S: Scheduler, K> {
    scheduler: S,
    expected: usize,
    state: RefCell<GroupState<H, S, K>>,
}

struct GroupState<H: TreeHost, S: Scheduler, K> {
    /// Occupied slots only
    members: SlotMap<K, H::Node>,
    pending: DeferredSlot<S::Task>,
    /// Mapping the active setup was called with
    active: Option<SlotMap<K, H::Node>>,
    teardown: Option<Teardown>,
    slots: Vec<ObserverHandle>,
    on_settle: Option<GroupSettleFn<K, H::Node>>,
    disposed: bool,
}

impl<H, S, K> GroupNodeObserver<H, S, K>
where
    H: TreeHost,
    S: Scheduler,
    K: Clone + Eq + Hash + fmt::Debug + 'static,
{
    /// Start observing `parent` for every `(slot key, node name)` pair
    ///
    /// `on_settle` receives the full slot mapping once all slots are
    /// occupied at a settle point; its teardown runs as soon as any slot is
    /// found vacant. A repeated slot key keeps its first name.
    pub fn observe<I, V, F, T>(
        host: &H,
        scheduler: &S,
        parent: &H::Node,
        slots: I,
        recursive: bool,
        on_settle: F,
    ) -> ObserverHandle
    where
        I: IntoIterator<Item = (K, V)>,
        V: Into<String>,
        F: Fn(SlotMap<K, H::Node>) -> T + 'static,
        T: FnOnce() + 'static,
    {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for (key, name) in slots {
            let name = name.into();
            if seen.insert(key.clone()) {
                names.push((key, name));
            } else {
                tracing::warn!("Ignoring duplicate slot {:?} ({:?})", key, name);
            }
        }

        let on_settle: GroupSettleFn<K, H::Node> =
            Rc::new(move |members| Box::new(on_settle(members)) as Teardown);
        let group = Rc::new(Self {
            scheduler: scheduler.clone(),
            expected: names.len(),
            state: RefCell::new(GroupState {
                members: HashMap::with_capacity(names.len()),
                pending: DeferredSlot::new(),
                active: None,
                teardown: None,
                slots: Vec::with_capacity(names.len()),
                on_settle: Some(on_settle),
                disposed: false,
            }),
        });

        if names.is_empty() {
            tracing::warn!("Group observer on {:?} has no slots", parent);
            Self::request_check(&group);
        }

        for (key, name) in names {
            let slot_group = group.clone();
            let handle = SingleNodeObserver::observe(host, scheduler, parent, &name, recursive, move |node| {
                Self::slot_filled(&slot_group, key.clone(), node);
                let group = slot_group.clone();
                let key = key.clone();
                move || Self::slot_vacated(&group, &key)
            });
            group.state.borrow_mut().slots.push(handle);
        }

        ObserverHandle::new(group)
    }

    fn slot_filled(this: &Rc<Self>, key: K, node: H::Node) {
        {
            let mut state = this.state.borrow_mut();
            if state.disposed {
                return;
            }
            tracing::trace!("Slot {:?} filled by {:?}", key, node);
            state.members.insert(key, node);
        }
        Self::request_check(this);
    }

    fn slot_vacated(this: &Rc<Self>, key: &K) {
        {
            let mut state = this.state.borrow_mut();
            if state.disposed {
                return;
            }
            tracing::trace!("Slot {:?} vacated", key);
            state.members.remove(key);
        }
        Self::request_check(this);
    }

    /// Replace any queued group check with a fresh one
    fn request_check(this: &Rc<Self>) {
        let mut state = this.state.borrow_mut();
        if let Some(task) = state.pending.invalidate() {
            this.scheduler.cancel(task);
        }
        let generation = state.pending.generation();
        let group = this.clone();
        let task = this
            .scheduler
            .defer(Box::new(move || group.settle(generation)));
        state.pending.arm(task);
    }

    /// Deferred group check
    ///
    /// Runs on a scheduler tick, so a stale teardown is called inline here,
    /// before any replacement setup.
    fn settle(&self, generation: Generation) {
        let stale = {
            let mut state = self.state.borrow_mut();
            if state.disposed || !state.pending.fire(generation) {
                return;
            }
            let complete = state.members.len() == self.expected;
            if complete && state.active.as_ref() == Some(&state.members) {
                return;
            }
            state.active = None;
            state.teardown.take()
        };
        if let Some(teardown) = stale {
            tracing::debug!("Group changed, tearing down");
            teardown();
        }

        let (on_settle, members) = {
            let mut state = self.state.borrow_mut();
            if state.disposed
                || state.pending.generation() != generation
                || state.members.len() != self.expected
            {
                return;
            }
            let Some(on_settle) = state.on_settle.clone() else {
                return;
            };
            let members = state.members.clone();
            state.active = Some(members.clone());
            (on_settle, members)
        };

        tracing::debug!("Group complete with {} slots", members.len());
        let teardown = on_settle(members);

        let mut state = self.state.borrow_mut();
        if state.disposed || state.pending.generation() != generation {
            // Membership changed while the callback ran.
            state.active = None;
            drop(state);
            self.scheduler.spawn(teardown);
            return;
        }
        state.teardown = Some(teardown);
    }
}

impl<H, S, K> Dispose for GroupNodeObserver<H, S, K>
where
    H: TreeHost,
    S: Scheduler,
    K: Clone + Eq + Hash + fmt::Debug + 'static,
{
    fn dispose(&self) {
        let (slots, teardown) = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            if let Some(task) = state.pending.invalidate() {
                self.scheduler.cancel(task);
            }
            state.members.clear();
            state.active = None;
            state.on_settle = None;
            (std::mem::take(&mut state.slots), state.teardown.take())
        };

        for slot in slots {
            slot.disconnect();
        }
        tracing::debug!("Stopped observing group of {} slots", self.expected);
        if let Some(teardown) = teardown {
            self.scheduler.spawn(teardown);
        }
    }

    fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }
}
