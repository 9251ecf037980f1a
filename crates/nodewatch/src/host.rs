//! Host Collaborators
//!
//! Traits for the entity tree and the cooperative scheduler the observers
//! are wired to, plus implementations for [`Tree`] and [`EventLoop`].

use nodewatch_sched::{EventLoop, TaskId};
use nodewatch_tree::{Connection, NodeId, Tree, TreeEventKind};
use std::fmt;

/// Event subscription that can be severed
pub trait Disconnect {
    /// Stop delivering events. Idempotent.
    fn disconnect(&mut self);
}

/// Live entity tree that reports children and descendants coming and going
pub trait TreeHost: Clone + 'static {
    /// Identity-comparable node handle
    type Node: Clone + PartialEq + fmt::Debug + 'static;
    /// Subscription returned by the `on_*` methods
    type Connection: Disconnect + 'static;

    /// Current name of `node`
    fn node_name(&self, node: &Self::Node) -> Option<String>;

    /// Check if `node` is named `name`
    fn has_name(&self, node: &Self::Node, name: &str) -> bool {
        self.node_name(node).as_deref() == Some(name)
    }

    /// First child (or, with `recursive`, descendant) of `parent` named `name`
    fn find_named_child(&self, parent: &Self::Node, name: &str, recursive: bool) -> Option<Self::Node>;

    /// Fires with each node added as a child (or descendant) of `parent`
    fn on_added(&self, parent: &Self::Node, recursive: bool, handler: Box<dyn Fn(Self::Node)>) -> Self::Connection;

    /// Fires with each child (or descendant) about to leave `parent`
    fn on_removing(&self, parent: &Self::Node, recursive: bool, handler: Box<dyn Fn(Self::Node)>) -> Self::Connection;

    /// Fires once when `parent` itself is being destroyed
    fn on_destroying(&self, parent: &Self::Node, handler: Box<dyn Fn()>) -> Self::Connection;
}

/// Single-threaded cooperative scheduler
pub trait Scheduler: Clone + 'static {
    /// Handle to a deferred task
    type Task: 'static;

    /// Run `task` on a later tick, after the current one completes
    fn defer(&self, task: Box<dyn FnOnce()>) -> Self::Task;

    /// Drop a deferred task before it runs; no-op if it already ran
    fn cancel(&self, task: Self::Task);

    /// Run `task` off the current call stack without the caller waiting on it
    fn spawn(&self, task: Box<dyn FnOnce()>);
}

impl Disconnect for Connection {
    fn disconnect(&mut self) {
        Connection::disconnect(self);
    }
}

/// Listening on a missing or destroyed node yields a connection that never fires
fn connect_or_detached(tree: &Tree, node: NodeId, kind: TreeEventKind, handler: impl Fn(NodeId) + 'static) -> Connection {
    tree.connect(node, kind, handler).unwrap_or_else(|err| {
        tracing::debug!("Cannot listen for {:?}: {}", kind, err);
        Connection::detached()
    })
}

impl TreeHost for Tree {
    type Node = NodeId;
    type Connection = Connection;

    fn node_name(&self, node: &NodeId) -> Option<String> {
        self.name(*node)
    }

    fn has_name(&self, node: &NodeId, name: &str) -> bool {
        Tree::has_name(self, *node, name)
    }

    fn find_named_child(&self, parent: &NodeId, name: &str, recursive: bool) -> Option<NodeId> {
        Tree::find_named_child(self, *parent, name, recursive)
    }

    fn on_added(&self, parent: &NodeId, recursive: bool, handler: Box<dyn Fn(NodeId)>) -> Connection {
        let kind = if recursive {
            TreeEventKind::DescendantAdded
        } else {
            TreeEventKind::ChildAdded
        };
        connect_or_detached(self, *parent, kind, handler)
    }

    fn on_removing(&self, parent: &NodeId, recursive: bool, handler: Box<dyn Fn(NodeId)>) -> Connection {
        let kind = if recursive {
            TreeEventKind::DescendantRemoving
        } else {
            TreeEventKind::ChildRemoving
        };
        connect_or_detached(self, *parent, kind, handler)
    }

    fn on_destroying(&self, parent: &NodeId, handler: Box<dyn Fn()>) -> Connection {
        connect_or_detached(self, *parent, TreeEventKind::Destroying, move |_| handler())
    }
}

impl Scheduler for EventLoop {
    type Task = TaskId;

    fn defer(&self, task: Box<dyn FnOnce()>) -> TaskId {
        EventLoop::defer(self, task)
    }

    fn cancel(&self, task: TaskId) {
        EventLoop::cancel(self, task);
    }

    fn spawn(&self, task: Box<dyn FnOnce()>) {
        EventLoop::spawn(self, task);
    }
}
