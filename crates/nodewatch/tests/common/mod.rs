//! Shared fixtures for nodewatch integration tests

#![allow(dead_code)]

use nodewatch::sched::EventLoop;
use nodewatch::tree::{NodeId, Tree};
use nodewatch::{SlotMap, Watcher};
use std::cell::RefCell;
use std::rc::Rc;

/// Callback activity seen by a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Setup(NodeId),
    Teardown(NodeId),
    GroupSetup(Vec<(&'static str, NodeId)>),
    GroupTeardown,
}

/// Records setup/teardown calls in order
#[derive(Debug, Clone, Default)]
pub struct Probe {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn setups(&self) -> usize {
        self.count(|event| matches!(event, Event::Setup(_) | Event::GroupSetup(_)))
    }

    pub fn teardowns(&self) -> usize {
        self.count(|event| matches!(event, Event::Teardown(_) | Event::GroupTeardown))
    }

    /// True while a setup is live (more setups than teardowns)
    pub fn is_active(&self) -> bool {
        self.setups() > self.teardowns()
    }

    fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    /// Settle callback for single-node observers
    pub fn single(&self) -> impl Fn(NodeId) -> Box<dyn FnOnce()> + 'static {
        let events = self.events.clone();
        move |node: NodeId| -> Box<dyn FnOnce()> {
            events.borrow_mut().push(Event::Setup(node));
            let events = events.clone();
            Box::new(move || events.borrow_mut().push(Event::Teardown(node)))
        }
    }

    /// Settle callback for group observers
    pub fn group(&self) -> impl Fn(SlotMap<&'static str, NodeId>) -> Box<dyn FnOnce()> + 'static {
        let events = self.events.clone();
        move |members: SlotMap<&'static str, NodeId>| -> Box<dyn FnOnce()> {
            let mut sorted: Vec<(&'static str, NodeId)> = members.into_iter().collect();
            sorted.sort();
            events.borrow_mut().push(Event::GroupSetup(sorted));
            let events = events.clone();
            Box::new(move || events.borrow_mut().push(Event::GroupTeardown))
        }
    }
}

pub struct Fixture {
    pub tree: Tree,
    pub event_loop: EventLoop,
    pub watcher: Watcher<Tree, EventLoop>,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let tree = Tree::new();
        let event_loop = EventLoop::new();
        let watcher = Watcher::new(tree.clone(), event_loop.clone());
        Self {
            tree,
            event_loop,
            watcher,
        }
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Let every queued settle and teardown run
    pub fn settle(&self) {
        self.event_loop
            .run_until_idle()
            .expect("event loop should go idle");
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
