//! Tree Node
//!
//! Arena record for a single named node.

use crate::events::{Signal, TreeEventKind};
use crate::NodeId;

/// Arena node record
#[derive(Debug)]
pub(crate) struct Node {
    /// Lookup name (not unique)
    pub name: String,
    /// Parent node (None if detached or root)
    pub parent: Option<NodeId>,
    /// Children in insertion order
    pub children: Vec<NodeId>,
    /// Set once the node has been destroyed
    pub destroyed: bool,
    /// One signal per [`TreeEventKind`]
    signals: [Signal; 5],
}

impl Node {
    pub fn new(name: String) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            destroyed: false,
            signals: Default::default(),
        }
    }

    /// Handle to the signal for `kind`
    #[inline]
    pub fn signal(&self, kind: TreeEventKind) -> Signal {
        self.signals[kind.slot()].clone()
    }

    /// Drop every listener on every signal
    pub fn disconnect_all(&self) {
        for signal in &self.signals {
            signal.disconnect_all();
        }
    }
}
