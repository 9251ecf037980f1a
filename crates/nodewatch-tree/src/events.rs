//! Tree Events
//!
//! Lifecycle signals and their connections.

use crate::NodeId;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Lifecycle event kinds a node emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeEventKind {
    /// A node became a direct child (payload: the child)
    ChildAdded,
    /// A direct child is about to be detached (payload: the child)
    ChildRemoving,
    /// A node entered the subtree (payload: the descendant)
    DescendantAdded,
    /// A node is about to leave the subtree (payload: the descendant)
    DescendantRemoving,
    /// The node itself is being destroyed (payload: the node)
    Destroying,
}

impl TreeEventKind {
    /// All kinds, in slot order
    pub const ALL: [TreeEventKind; 5] = [
        TreeEventKind::ChildAdded,
        TreeEventKind::ChildRemoving,
        TreeEventKind::DescendantAdded,
        TreeEventKind::DescendantRemoving,
        TreeEventKind::Destroying,
    ];

    pub(crate) fn slot(self) -> usize {
        match self {
            TreeEventKind::ChildAdded => 0,
            TreeEventKind::ChildRemoving => 1,
            TreeEventKind::DescendantAdded => 2,
            TreeEventKind::DescendantRemoving => 3,
            TreeEventKind::Destroying => 4,
        }
    }
}

type Listener = Rc<dyn Fn(NodeId)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

impl Listeners {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry, _)| *entry != id);
    }
}

/// Multicast signal carrying a node id
///
/// Cloning a signal yields another handle to the same listener list.
#[derive(Clone, Default)]
pub struct Signal {
    listeners: Rc<RefCell<Listeners>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn connect(&self, listener: impl Fn(NodeId) + 'static) -> Connection {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Rc::new(listener)));
        Connection {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Invoke every connected listener with `node`
    ///
    /// Listeners are snapshotted first and no borrow is held while they run,
    /// so a listener may connect or disconnect others. A listener
    /// disconnected earlier in the same dispatch is skipped.
    pub fn emit(&self, node: NodeId) {
        let snapshot: Vec<(u64, Listener)> = self.listeners.borrow().entries.clone();
        for (id, listener) in snapshot {
            if self.listeners.borrow().contains(id) {
                listener(node);
            }
        }
    }

    /// Number of connected listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    /// Drop every listener
    pub fn disconnect_all(&self) {
        self.listeners.borrow_mut().entries.clear();
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Subscription returned by [`Signal::connect`]
///
/// Dropping a connection does not disconnect it.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl Connection {
    /// A connection that is already disconnected
    pub fn detached() -> Self {
        Self {
            id: 0,
            listeners: Weak::new(),
        }
    }

    /// Remove the listener. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().remove(self.id);
        }
        self.listeners = Weak::new();
    }

    /// Check if the listener is still registered
    pub fn is_connected(&self) -> bool {
        self.listeners
            .upgrade()
            .is_some_and(|listeners| listeners.borrow().contains(self.id))
    }
}
