//! Single Node Observer
//!
//! Watches one parent for a child (or descendant) with a given name.
//! Arrivals settle one scheduler tick later, so a node that is added and
//! removed within the same tick never reaches the settle callback.

use crate::deferred::{DeferredSlot, Generation};
use crate::handle::{Dispose, ObserverHandle};
use crate::host::{Disconnect, Scheduler, TreeHost};
use crate::Teardown;
use std::cell::RefCell;
use std::rc::Rc;

type SettleFn<N> = Rc<dyn Fn(N) -> Teardown>;

/// Debounced observer for one uniquely named node
///
/// Only the first matching node is tracked; another node with the same name
/// is ignored until the tracked one departs.
pub struct SingleNodeObserver<H: TreeHost, S: Scheduler> {
    host: H,
    scheduler: S,
    name: String,
    state: RefCell<State<H, S>>,
}

struct State<H: TreeHost, S: Scheduler> {
    /// Most recently requested node, settled or not
    observed: Option<H::Node>,
    pending: DeferredSlot<S::Task>,
    /// Teardown of the settle call for the currently settled node
    teardown: Option<Teardown>,
    connections: Vec<H::Connection>,
    /// Released on dispose
    on_settle: Option<SettleFn<H::Node>>,
    disposed: bool,
}

impl<H: TreeHost, S: Scheduler> SingleNodeObserver<H, S> {
    /// Start observing `parent` for a node named `name`
    ///
    /// `on_settle` runs on a scheduler tick once a matching node has settled
    /// in place; the closure it returns runs in the background once that
    /// node departs or the observer is disconnected.
    pub fn observe<F, T>(
        host: &H,
        scheduler: &S,
        parent: &H::Node,
        name: &str,
        recursive: bool,
        on_settle: F,
    ) -> ObserverHandle
    where
        F: Fn(H::Node) -> T + 'static,
        T: FnOnce() + 'static,
    {
        let on_settle: SettleFn<H::Node> = Rc::new(move |node| Box::new(on_settle(node)) as Teardown);
        let observer = Rc::new(Self {
            host: host.clone(),
            scheduler: scheduler.clone(),
            name: name.to_string(),
            state: RefCell::new(State {
                observed: None,
                pending: DeferredSlot::new(),
                teardown: None,
                connections: Vec::with_capacity(3),
                on_settle: Some(on_settle),
                disposed: false,
            }),
        });

        if let Some(existing) = host.find_named_child(parent, name, recursive) {
            Self::arrived(&observer, existing);
        }

        let on_added = {
            let observer = observer.clone();
            host.on_added(
                parent,
                recursive,
                Box::new(move |node| Self::arrived(&observer, node)),
            )
        };
        let on_removing = {
            let observer = observer.clone();
            host.on_removing(
                parent,
                recursive,
                Box::new(move |node| observer.departed(&node)),
            )
        };
        let on_destroying = {
            let observer = observer.clone();
            host.on_destroying(parent, Box::new(move || observer.dispose()))
        };
        observer
            .state
            .borrow_mut()
            .connections
            .extend([on_added, on_removing, on_destroying]);

        tracing::debug!(
            "Observing {:?} for {} {:?}",
            parent,
            if recursive { "descendant" } else { "child" },
            name
        );
        ObserverHandle::new(observer)
    }

    /// Node arrived: track it if the slot is free and queue a settle
    fn arrived(this: &Rc<Self>, node: H::Node) {
        if !this.host.has_name(&node, &this.name) {
            return;
        }
        let mut state = this.state.borrow_mut();
        if state.disposed || state.observed.is_some() {
            return;
        }
        if let Some(task) = state.pending.invalidate() {
            this.scheduler.cancel(task);
        }
        tracing::trace!("{:?} arrived as {:?}", this.name, node);
        state.observed = Some(node.clone());

        let generation = state.pending.generation();
        let observer = this.clone();
        let task = this
            .scheduler
            .defer(Box::new(move || observer.settle(generation, node)));
        state.pending.arm(task);
    }

    /// Deferred settle: hand the node to the callback and keep its teardown
    fn settle(&self, generation: Generation, node: H::Node) {
        let on_settle = {
            let mut state = self.state.borrow_mut();
            if state.disposed || !state.pending.fire(generation) {
                return;
            }
            match state.on_settle.clone() {
                Some(on_settle) => on_settle,
                None => return,
            }
        };

        tracing::debug!("{:?} settled as {:?}", self.name, node);
        let teardown = on_settle(node);

        let mut state = self.state.borrow_mut();
        if state.disposed || state.pending.generation() != generation {
            // Departed or disconnected while the callback ran.
            drop(state);
            self.scheduler.spawn(teardown);
            return;
        }
        debug_assert!(state.teardown.is_none());
        state.teardown = Some(teardown);
    }

    /// Node is leaving: cancel any queued settle and tear down
    fn departed(&self, node: &H::Node) {
        let teardown = {
            let mut state = self.state.borrow_mut();
            if state.disposed || state.observed.as_ref() != Some(node) {
                return;
            }
            if let Some(task) = state.pending.invalidate() {
                self.scheduler.cancel(task);
            }
            state.observed = None;
            state.teardown.take()
        };

        tracing::debug!("{:?} departed ({:?})", self.name, node);
        if let Some(teardown) = teardown {
            self.scheduler.spawn(teardown);
        }
    }
}

impl<H: TreeHost, S: Scheduler> Dispose for SingleNodeObserver<H, S> {
    fn dispose(&self) {
        let (connections, teardown) = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            if let Some(task) = state.pending.invalidate() {
                self.scheduler.cancel(task);
            }
            state.observed = None;
            state.on_settle = None;
            (std::mem::take(&mut state.connections), state.teardown.take())
        };

        for mut connection in connections {
            connection.disconnect();
        }
        tracing::debug!("Stopped observing {:?}", self.name);
        if let Some(teardown) = teardown {
            self.scheduler.spawn(teardown);
        }
    }

    fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodewatch_sched::EventLoop;
    use nodewatch_tree::{NodeId, Tree, TreeEventKind};
    use std::cell::Cell;

    #[derive(Default)]
    struct Counts {
        setups: Cell<u32>,
        teardowns: Cell<u32>,
        last: Cell<Option<NodeId>>,
    }

    fn observe(tree: &Tree, event_loop: &EventLoop, parent: NodeId, name: &str, recursive: bool) -> (ObserverHandle, Rc<Counts>) {
        let counts = Rc::new(Counts::default());
        let c = counts.clone();
        let handle = SingleNodeObserver::observe(tree, event_loop, &parent, name, recursive, move |node| {
            c.setups.set(c.setups.get() + 1);
            c.last.set(Some(node));
            let c = c.clone();
            move || c.teardowns.set(c.teardowns.get() + 1)
        });
        (handle, counts)
    }

    #[test]
    fn test_existing_child_settles_next_tick() {
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let head = tree.create_child(tree.root(), "Head").unwrap();

        let (_handle, counts) = observe(&tree, &event_loop, tree.root(), "Head", false);
        assert_eq!(counts.setups.get(), 0);

        event_loop.run_tick();
        assert_eq!(counts.setups.get(), 1);
        assert_eq!(counts.last.get(), Some(head));
    }

    #[test]
    fn test_removed_before_settle_never_sets_up() {
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let (_handle, counts) = observe(&tree, &event_loop, tree.root(), "Head", false);

        let head = tree.create_child(tree.root(), "Head").unwrap();
        tree.detach(head).unwrap();
        event_loop.run_until_idle().unwrap();

        assert_eq!(counts.setups.get(), 0);
        assert_eq!(counts.teardowns.get(), 0);
    }

    #[test]
    fn test_other_names_ignored() {
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let (_handle, counts) = observe(&tree, &event_loop, tree.root(), "Head", false);

        tree.create_child(tree.root(), "Torso").unwrap();
        event_loop.run_until_idle().unwrap();
        assert_eq!(counts.setups.get(), 0);
    }

    #[test]
    fn test_disconnect_releases_listeners() {
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let root = tree.root();
        let (handle, _counts) = observe(&tree, &event_loop, root, "Head", true);

        assert_eq!(tree.listener_count(root, TreeEventKind::DescendantAdded), 1);
        assert_eq!(tree.listener_count(root, TreeEventKind::DescendantRemoving), 1);
        assert_eq!(tree.listener_count(root, TreeEventKind::Destroying), 1);

        handle.disconnect();
        for kind in TreeEventKind::ALL {
            assert_eq!(tree.listener_count(root, kind), 0);
        }
        assert!(!event_loop.has_pending_work());
    }

    #[test]
    fn test_departure_inside_settle_callback() {
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let counts = Rc::new(Counts::default());

        let t = tree.clone();
        let c = counts.clone();
        let _handle = SingleNodeObserver::observe(&tree, &event_loop, &tree.root(), "Flash", false, move |node| {
            c.setups.set(c.setups.get() + 1);
            t.detach(node).unwrap();
            let c = c.clone();
            move || c.teardowns.set(c.teardowns.get() + 1)
        });

        tree.create_child(tree.root(), "Flash").unwrap();
        event_loop.run_until_idle().unwrap();

        assert_eq!(counts.setups.get(), 1);
        assert_eq!(counts.teardowns.get(), 1);
    }

    #[test]
    fn test_parent_destroyed_stops_observer() {
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let model = tree.create_child(tree.root(), "Model").unwrap();
        let (handle, counts) = observe(&tree, &event_loop, model, "Part", false);

        tree.create_child(model, "Part").unwrap();
        event_loop.run_until_idle().unwrap();
        assert_eq!(counts.setups.get(), 1);

        tree.destroy(model).unwrap();
        assert!(!handle.is_connected());
        event_loop.run_until_idle().unwrap();
        assert_eq!(counts.teardowns.get(), 1);
    }

    #[test]
    fn test_destroyed_parent_never_fires() {
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let model = tree.create_child(tree.root(), "Model").unwrap();
        tree.destroy(model).unwrap();

        let (handle, counts) = observe(&tree, &event_loop, model, "Part", false);
        event_loop.run_until_idle().unwrap();
        assert_eq!(counts.setups.get(), 0);
        handle.disconnect();
    }
}
