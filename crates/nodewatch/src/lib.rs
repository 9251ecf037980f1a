//! nodewatch - debounced named-node observers
//!
//! React to a uniquely named node appearing somewhere under a parent in a
//! live tree: a setup callback runs once the node has settled in place, and
//! the teardown it returns runs once the node departs or observation stops.
//! Group observers do the same for a set of named slots that must all be
//! present at once.
//!
//! # Example
//! ```rust
//! use nodewatch::Watcher;
//! use nodewatch::sched::EventLoop;
//! use nodewatch::tree::Tree;
//!
//! let tree = Tree::new();
//! let event_loop = EventLoop::new();
//! let watcher = Watcher::new(tree.clone(), event_loop.clone());
//!
//! let handle = watcher.observe_child(&tree.root(), "Head", |head| {
//!     println!("head settled: {:?}", head);
//!     move || println!("head gone")
//! });
//!
//! tree.create_child(tree.root(), "Head").unwrap();
//! event_loop.run_until_idle().unwrap();
//! handle.disconnect();
//! ```

mod deferred;
mod group;
mod handle;
mod host;
mod observer;

pub use group::{GroupNodeObserver, SlotMap};
pub use handle::{ObserverGuard, ObserverHandle};
pub use host::{Disconnect, Scheduler, TreeHost};
pub use observer::SingleNodeObserver;

// Re-export the bundled collaborators
pub use nodewatch_sched as sched;
pub use nodewatch_tree as tree;

use std::fmt;
use std::hash::Hash;

/// Cleanup returned by a settle callback
pub type Teardown = Box<dyn FnOnce()>;

/// Entry points bound to one tree host and one scheduler
#[derive(Debug, Clone)]
pub struct Watcher<H, S> {
    host: H,
    scheduler: S,
}

impl<H: TreeHost, S: Scheduler> Watcher<H, S> {
    pub fn new(host: H, scheduler: S) -> Self {
        Self { host, scheduler }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Observe a direct child of `parent` named `name`
    pub fn observe_child<F, T>(&self, parent: &H::Node, name: &str, on_settle: F) -> ObserverHandle
    where
        F: Fn(H::Node) -> T + 'static,
        T: FnOnce() + 'static,
    {
        SingleNodeObserver::observe(&self.host, &self.scheduler, parent, name, false, on_settle)
    }

    /// Observe a descendant of `parent` named `name`
    pub fn observe_descendant<F, T>(&self, parent: &H::Node, name: &str, on_settle: F) -> ObserverHandle
    where
        F: Fn(H::Node) -> T + 'static,
        T: FnOnce() + 'static,
    {
        SingleNodeObserver::observe(&self.host, &self.scheduler, parent, name, true, on_settle)
    }

    /// Observe a set of direct children, one per `(slot key, name)` pair
    pub fn observe_children<K, I, V, F, T>(&self, parent: &H::Node, slots: I, on_settle: F) -> ObserverHandle
    where
        K: Clone + Eq + Hash + fmt::Debug + 'static,
        I: IntoIterator<Item = (K, V)>,
        V: Into<String>,
        F: Fn(SlotMap<K, H::Node>) -> T + 'static,
        T: FnOnce() + 'static,
    {
        GroupNodeObserver::observe(&self.host, &self.scheduler, parent, slots, false, on_settle)
    }

    /// Observe a set of descendants, one per `(slot key, name)` pair
    pub fn observe_descendants<K, I, V, F, T>(&self, parent: &H::Node, slots: I, on_settle: F) -> ObserverHandle
    where
        K: Clone + Eq + Hash + fmt::Debug + 'static,
        I: IntoIterator<Item = (K, V)>,
        V: Into<String>,
        F: Fn(SlotMap<K, H::Node>) -> T + 'static,
        T: FnOnce() + 'static,
    {
        GroupNodeObserver::observe(&self.host, &self.scheduler, parent, slots, true, on_settle)
    }
}
