//! Tree (arena-based allocation)
//!
//! Mutations fire lifecycle signals synchronously. No arena borrow is held
//! while listeners run, so listeners may read or mutate the tree.

use crate::events::{Connection, Signal, TreeEventKind};
use crate::node::Node;
use crate::{NodeId, TreeError};
use std::cell::RefCell;
use std::rc::Rc;

/// Name given to the root created by [`Tree::new`]
const DEFAULT_ROOT_NAME: &str = "Root";

/// Shared handle to an arena of named nodes
///
/// Cloning is cheap; all clones address the same tree.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Rc<RefCell<Arena>>,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn live(&self, id: NodeId) -> Result<&Node, TreeError> {
        match self.get(id) {
            None => Err(TreeError::NodeNotFound(id)),
            Some(node) if node.destroyed => Err(TreeError::Destroyed(id)),
            Some(node) => Ok(node),
        }
    }

    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.get(next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Parent chain from the immediate parent up to the root
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = cursor {
            out.push(parent);
            cursor = self.get(parent).and_then(|node| node.parent);
        }
        out
    }

    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    fn signal(&self, id: NodeId, kind: TreeEventKind) -> Option<Signal> {
        self.get(id).map(|node| node.signal(kind))
    }

    /// Id for the node stored at arena index `len`
    fn next_id(len: usize) -> Result<NodeId, TreeError> {
        u32::try_from(len)
            .map(NodeId)
            .map_err(|_| TreeError::CapacityExceeded)
    }
}

impl Tree {
    /// Create a tree holding only a root node
    pub fn new() -> Self {
        Self::with_root_name(DEFAULT_ROOT_NAME)
    }

    /// Create a tree whose root carries `name`
    pub fn with_root_name(name: impl Into<String>) -> Self {
        let arena = Arena {
            nodes: vec![Node::new(name.into())],
        };
        Self {
            arena: Rc::new(RefCell::new(arena)),
        }
    }

    /// Root node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.arena
            .borrow()
            .nodes
            .iter()
            .filter(|node| !node.destroyed)
            .count()
    }

    /// Create a detached node
    ///
    /// Fails once every `u32` id has been handed out, since ids are never
    /// reused.
    pub fn create(&self, name: impl Into<String>) -> Result<NodeId, TreeError> {
        let mut arena = self.arena.borrow_mut();
        let id = Arena::next_id(arena.nodes.len())?;
        arena.nodes.push(Node::new(name.into()));
        Ok(id)
    }

    /// Create a node and attach it under `parent`
    pub fn create_child(&self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, TreeError> {
        self.arena.borrow().live(parent)?;
        let child = self.create(name)?;
        self.append_child(parent, child)?;
        Ok(child)
    }

    /// Attach `child` under `parent`, detaching it from its old parent first
    ///
    /// Fires `ChildAdded` on `parent`, then `DescendantAdded` on every
    /// ancestor for `child` and each of its descendants. If a removing
    /// listener moves `child` somewhere else, that move stands.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let old_parent = {
            let arena = self.arena.borrow();
            arena.live(parent)?;
            let node = arena.live(child)?;
            if child == NodeId::ROOT {
                return Err(TreeError::RootImmovable);
            }
            if child == parent || arena.is_ancestor(child, parent) {
                return Err(TreeError::CycleDetected { parent, child });
            }
            node.parent
        };

        match old_parent {
            Some(current) if current == parent => return Ok(()),
            Some(_) => self.detach(child)?,
            None => {}
        }

        let (added, descendant_signals, subtree) = {
            let mut arena = self.arena.borrow_mut();
            // A removing listener may have destroyed either side or moved
            // the child again.
            arena.live(parent)?;
            if let Some(moved_to) = arena.live(child)?.parent {
                tracing::debug!("{:?} was moved under {:?} while detaching", child, moved_to);
                return Ok(());
            }
            if arena.is_ancestor(child, parent) {
                return Err(TreeError::CycleDetected { parent, child });
            }
            arena.nodes[parent.index()].children.push(child);
            arena.nodes[child.index()].parent = Some(parent);

            let mut chain = vec![parent];
            chain.extend(arena.ancestors(parent));
            let descendant_signals: Vec<Signal> = chain
                .iter()
                .filter_map(|&id| arena.signal(id, TreeEventKind::DescendantAdded))
                .collect();
            let mut subtree = vec![child];
            subtree.extend(arena.descendants(child));
            (
                arena.nodes[parent.index()].signal(TreeEventKind::ChildAdded),
                descendant_signals,
                subtree,
            )
        };

        tracing::trace!("Attached {:?} under {:?}", child, parent);
        added.emit(child);
        for signal in &descendant_signals {
            for &node in &subtree {
                signal.emit(node);
            }
        }
        Ok(())
    }

    /// Detach `node` from its parent; no-op if already detached
    ///
    /// Fires `DescendantRemoving` on every ancestor for `node` and each of
    /// its descendants, then `ChildRemoving` on the parent, all before the
    /// link is cut.
    pub fn detach(&self, node: NodeId) -> Result<(), TreeError> {
        let (parent, removing, descendant_signals, subtree) = {
            let arena = self.arena.borrow();
            let record = arena.live(node)?;
            if node == NodeId::ROOT {
                return Err(TreeError::RootImmovable);
            }
            let Some(parent) = record.parent else {
                return Ok(());
            };
            let descendant_signals: Vec<Signal> = arena
                .ancestors(node)
                .iter()
                .filter_map(|&id| arena.signal(id, TreeEventKind::DescendantRemoving))
                .collect();
            let mut subtree = vec![node];
            subtree.extend(arena.descendants(node));
            (
                parent,
                arena.nodes[parent.index()].signal(TreeEventKind::ChildRemoving),
                descendant_signals,
                subtree,
            )
        };

        for signal in &descendant_signals {
            for &id in &subtree {
                signal.emit(id);
            }
        }
        removing.emit(node);

        let mut arena = self.arena.borrow_mut();
        if arena.get(node).and_then(|record| record.parent) == Some(parent) {
            arena.nodes[parent.index()].children.retain(|&id| id != node);
            arena.nodes[node.index()].parent = None;
        }
        tracing::trace!("Detached {:?} from {:?}", node, parent);
        Ok(())
    }

    /// Destroy `node` and its whole subtree
    ///
    /// Fires `Destroying` on the node and then on each descendant, detaches
    /// the node, and finally disconnects every listener in the subtree.
    /// Destroying an already destroyed node is a no-op.
    pub fn destroy(&self, node: NodeId) -> Result<(), TreeError> {
        let (subtree, destroying) = {
            let arena = self.arena.borrow();
            match arena.live(node) {
                Err(TreeError::Destroyed(_)) => return Ok(()),
                Err(err) => return Err(err),
                Ok(_) => {}
            }
            if node == NodeId::ROOT {
                return Err(TreeError::RootImmovable);
            }
            let mut subtree = vec![node];
            subtree.extend(arena.descendants(node));
            let destroying: Vec<(NodeId, Signal)> = subtree
                .iter()
                .filter_map(|&id| Some((id, arena.signal(id, TreeEventKind::Destroying)?)))
                .collect();
            (subtree, destroying)
        };

        tracing::debug!("Destroying {:?} ({} nodes)", node, subtree.len());
        for (id, signal) in &destroying {
            signal.emit(*id);
        }

        match self.detach(node) {
            Ok(()) | Err(TreeError::Destroyed(_)) => {}
            Err(err) => return Err(err),
        }

        let mut arena = self.arena.borrow_mut();
        for id in subtree {
            if let Some(record) = arena.nodes.get_mut(id.index()) {
                record.destroyed = true;
                record.parent = None;
                record.children.clear();
                record.disconnect_all();
            }
        }
        Ok(())
    }

    /// Node name, if the id exists
    pub fn name(&self, node: NodeId) -> Option<String> {
        self.arena.borrow().get(node).map(|record| record.name.clone())
    }

    /// Check whether a node carries `name` without cloning it
    pub fn has_name(&self, node: NodeId, name: &str) -> bool {
        self.arena
            .borrow()
            .get(node)
            .is_some_and(|record| record.name == name)
    }

    /// Current parent
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.borrow().get(node).and_then(|record| record.parent)
    }

    /// Direct children in insertion order
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.arena
            .borrow()
            .get(node)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    /// All descendants, pre-order
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.arena.borrow().descendants(node)
    }

    /// Check if the node exists and has not been destroyed
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.arena.borrow().live(node).is_ok()
    }

    /// Check if `node` lies strictly inside the subtree of `ancestor`
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.arena.borrow().is_ancestor(ancestor, node)
    }

    /// First child named `name`; with `recursive`, the first descendant in
    /// pre-order
    pub fn find_named_child(&self, parent: NodeId, name: &str, recursive: bool) -> Option<NodeId> {
        let arena = self.arena.borrow();
        let record = arena.live(parent).ok()?;
        let candidates = if recursive {
            arena.descendants(parent)
        } else {
            record.children.clone()
        };
        candidates
            .into_iter()
            .find(|&id| arena.get(id).is_some_and(|node| node.name == name))
    }

    /// Listen for `kind` on `node`
    pub fn connect(
        &self,
        node: NodeId,
        kind: TreeEventKind,
        listener: impl Fn(NodeId) + 'static,
    ) -> Result<Connection, TreeError> {
        let signal = self.arena.borrow().live(node)?.signal(kind);
        Ok(signal.connect(listener))
    }

    /// Number of listeners connected to `kind` on `node`
    pub fn listener_count(&self, node: NodeId, kind: TreeEventKind) -> usize {
        self.arena
            .borrow()
            .signal(node, kind)
            .map_or(0, |signal| signal.listener_count())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
