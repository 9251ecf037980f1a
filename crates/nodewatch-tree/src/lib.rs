//! nodewatch tree - live entity tree
//!
//! Arena-backed tree of named nodes. Every node exposes lifecycle signals
//! (child/descendant added, child/descendant removing, destroying) that
//! fire synchronously while the tree is mutated.

mod node;
mod tree;
mod events;

pub use events::{Connection, Signal, TreeEventKind};
pub use tree::Tree;

/// Node identifier (index into the arena)
///
/// Slots are never reused, so two ids compare equal only if they name the
/// same node, even after it has been destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tree mutation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Node has been destroyed: {0:?}")]
    Destroyed(NodeId),

    #[error("Cannot append {child:?} under its own subtree {parent:?}")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("The root node cannot be moved or destroyed")]
    RootImmovable,

    #[error("Node ids exhausted")]
    CapacityExceeded,
}
