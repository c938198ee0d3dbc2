//! Scene graph arena.
//!
//! Nodes are stored by id; parent and children relations live next to each
//! node in a slot so the two directions can be updated together.

use std::collections::HashMap;

use thiserror::Error;

use crate::node::{Node, NodeId, NodeTree};

/// Scene graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node already in scene: {0}")]
    DuplicateNode(NodeId),

    #[error("the scene root cannot be moved or removed")]
    RootImmutable,

    #[error("cannot move {node} under its own descendant {parent}")]
    Cycle { node: NodeId, parent: NodeId },
}

#[derive(Clone, Debug)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Tree of addressable nodes under a single root.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    root: NodeId,
    slots: HashMap<NodeId, Slot>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create an empty scene with a group root named "Scene".
    pub fn new() -> Self {
        Self::with_root(Node::new("Scene"))
    }

    /// Create an empty scene around the given root node.
    pub fn with_root(root: Node) -> Self {
        let id = root.uuid;
        let mut slots = HashMap::new();
        slots.insert(
            id,
            Slot {
                node: root,
                parent: None,
                children: Vec::new(),
            },
        );
        Self { root: id, slots }
    }

    /// Rebuild a scene from a serialized tree; the tree's root becomes the scene root.
    pub fn from_tree(tree: NodeTree) -> Result<Self, SceneError> {
        let mut graph = Self::with_root(tree.node);
        let root = graph.root;
        for child in tree.children {
            graph.insert(child, Some(root), None)?;
        }
        Ok(graph)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        // The root slot is created in the constructor and never removed.
        &self.slots[&self.root].node
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(&id).map(|slot| &slot.node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(&id).map(|slot| &mut slot.node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Parent of a node. `None` for the root and unknown ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(&id).and_then(|slot| slot.parent)
    }

    /// Ordered children of a node. Empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slots
            .get(&id)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    /// Position of a node within its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Attach a detached subtree.
    ///
    /// `parent` defaults to the root. `index` defaults to appending and is
    /// clamped to the number of children.
    pub fn insert(
        &mut self,
        tree: NodeTree,
        parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<NodeId, SceneError> {
        let parent = parent.unwrap_or(self.root);
        if !self.slots.contains_key(&parent) {
            return Err(SceneError::NodeNotFound(parent));
        }

        let mut ids = tree.ids();
        if let Some(&taken) = ids.iter().find(|&&id| self.slots.contains_key(&id)) {
            return Err(SceneError::DuplicateNode(taken));
        }
        ids.sort();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(SceneError::DuplicateNode(pair[0]));
        }

        let id = tree.uuid();
        self.insert_slots(tree, parent);

        if let Some(slot) = self.slots.get_mut(&parent) {
            let at = index.unwrap_or(slot.children.len()).min(slot.children.len());
            slot.children.insert(at, id);
        }
        Ok(id)
    }

    fn insert_slots(&mut self, tree: NodeTree, parent: NodeId) {
        let id = tree.uuid();
        let children: Vec<NodeId> = tree.children.iter().map(NodeTree::uuid).collect();
        self.slots.insert(
            id,
            Slot {
                node: tree.node,
                parent: Some(parent),
                children,
            },
        );
        for child in tree.children {
            self.insert_slots(child, id);
        }
    }

    /// Remove a node and its descendants, returning them as a tree.
    pub fn detach(&mut self, id: NodeId) -> Result<NodeTree, SceneError> {
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        let parent = self
            .slots
            .get(&id)
            .ok_or(SceneError::NodeNotFound(id))?
            .parent;

        if let Some(parent) = parent.and_then(|p| self.slots.get_mut(&p)) {
            parent.children.retain(|&child| child != id);
        }
        self.take_slots(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn take_slots(&mut self, id: NodeId) -> Option<NodeTree> {
        let slot = self.slots.remove(&id)?;
        let children = slot
            .children
            .into_iter()
            .filter_map(|child| self.take_slots(child))
            .collect();
        Some(NodeTree {
            node: slot.node,
            children,
        })
    }

    /// Move a node under a new parent (root when `None`), placed before
    /// `before` when that is a child of the new parent, appended otherwise.
    pub fn reparent(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        before: Option<NodeId>,
    ) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        if !self.slots.contains_key(&id) {
            return Err(SceneError::NodeNotFound(id));
        }
        let parent = parent.unwrap_or(self.root);
        if !self.slots.contains_key(&parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        if self.is_ancestor(id, parent) {
            return Err(SceneError::Cycle { node: id, parent });
        }

        if let Some(old) = self.parent(id).and_then(|p| self.slots.get_mut(&p)) {
            old.children.retain(|&child| child != id);
        }
        if let Some(slot) = self.slots.get_mut(&parent) {
            let at = before
                .filter(|&b| b != id)
                .and_then(|b| slot.children.iter().position(|&child| child == b))
                .unwrap_or(slot.children.len());
            slot.children.insert(at, id);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.parent = Some(parent);
        }
        Ok(())
    }

    /// Clone a node and its descendants out as a tree.
    pub fn subtree(&self, id: NodeId) -> Option<NodeTree> {
        let slot = self.slots.get(&id)?;
        let children = slot
            .children
            .iter()
            .filter_map(|&child| self.subtree(child))
            .collect();
        Some(NodeTree {
            node: slot.node.clone(),
            children,
        })
    }

    /// The whole scene as a tree.
    pub fn to_tree(&self) -> NodeTree {
        self.subtree(self.root)
            .unwrap_or_else(|| NodeTree::new(self.root_node().clone()))
    }

    /// Visit every node in depth-first pre-order, starting at the root.
    pub fn traverse(&self, visit: &mut impl FnMut(&Node)) {
        self.traverse_from(self.root, visit);
    }

    fn traverse_from(&self, id: NodeId, visit: &mut impl FnMut(&Node)) {
        if let Some(slot) = self.slots.get(&id) {
            visit(&slot.node);
            for &child in &slot.children {
                self.traverse_from(child, visit);
            }
        }
    }

    /// Ids of every node in pre-order, root first.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.slots.len());
        self.traverse(&mut |node| ids.push(node.uuid));
        ids
    }

    /// Remove everything below the root.
    pub fn clear(&mut self) {
        let root = self.root;
        self.slots.retain(|&id, _| id == root);
        if let Some(slot) = self.slots.get_mut(&root) {
            slot.children.clear();
        }
    }

    /// Check that parent links and children lists agree and every node is
    /// reachable from the root.
    pub fn validate(&self) -> bool {
        for (&id, slot) in &self.slots {
            match slot.parent {
                None if id != self.root => return false,
                Some(parent) => {
                    let listed = self
                        .slots
                        .get(&parent)
                        .map(|p| p.children.iter().filter(|&&c| c == id).count());
                    if listed != Some(1) {
                        return false;
                    }
                }
                None => {}
            }
            for child in &slot.children {
                if self.parent(*child) != Some(id) {
                    return false;
                }
            }
        }
        self.ids().len() == self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> NodeTree {
        NodeTree::new(Node::new(name))
    }

    #[test]
    fn test_insert_appends_and_clamps_index() {
        let mut scene = SceneGraph::new();
        let a = scene.insert(leaf("a"), None, None).unwrap();
        let b = scene.insert(leaf("b"), None, Some(0)).unwrap();
        let c = scene.insert(leaf("c"), None, Some(99)).unwrap();

        assert_eq!(scene.children(scene.root()), &[b, a, c]);
        assert_eq!(scene.parent(a), Some(scene.root()));
        assert_eq!(scene.index_in_parent(c), Some(2));
        assert!(scene.validate());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut scene = SceneGraph::new();
        let tree = leaf("a");
        scene.insert(tree.clone(), None, None).unwrap();

        assert_eq!(
            scene.insert(tree.clone(), None, None),
            Err(SceneError::DuplicateNode(tree.uuid()))
        );

        let missing = NodeId::new();
        assert_eq!(
            scene.insert(leaf("b"), Some(missing), None),
            Err(SceneError::NodeNotFound(missing))
        );
    }

    #[test]
    fn test_detach_returns_subtree() {
        let mut scene = SceneGraph::new();
        let tree = leaf("parent").with_child(leaf("child"));
        let child = tree.children[0].uuid();
        let id = scene.insert(tree.clone(), None, None).unwrap();

        let detached = scene.detach(id).unwrap();
        assert_eq!(detached, tree);
        assert!(!scene.contains(child));
        assert_eq!(scene.node_count(), 1);
        assert!(scene.validate());

        assert_eq!(scene.detach(scene.root()), Err(SceneError::RootImmutable));
    }

    #[test]
    fn test_reparent_before_sibling() {
        let mut scene = SceneGraph::new();
        let group = scene.insert(leaf("group"), None, None).unwrap();
        let first = scene.insert(leaf("first"), Some(group), None).unwrap();
        let moved = scene.insert(leaf("moved"), None, None).unwrap();

        scene.reparent(moved, Some(group), Some(first)).unwrap();
        assert_eq!(scene.children(group), &[moved, first]);
        assert_eq!(scene.parent(moved), Some(group));
        assert!(scene.validate());
    }

    #[test]
    fn test_reparent_rejects_cycle() {
        let mut scene = SceneGraph::new();
        let outer = scene.insert(leaf("outer"), None, None).unwrap();
        let inner = scene.insert(leaf("inner"), Some(outer), None).unwrap();

        assert_eq!(
            scene.reparent(outer, Some(inner), None),
            Err(SceneError::Cycle {
                node: outer,
                parent: inner
            })
        );
        assert!(scene.validate());
    }

    #[test]
    fn test_tree_roundtrip() {
        let mut scene = SceneGraph::new();
        let group = scene.insert(leaf("group"), None, None).unwrap();
        scene.insert(leaf("child"), Some(group), None).unwrap();

        let rebuilt = SceneGraph::from_tree(scene.to_tree()).unwrap();
        assert_eq!(rebuilt.ids(), scene.ids());
        assert_eq!(rebuilt.root(), scene.root());
    }

    #[test]
    fn test_clear_keeps_root() {
        let mut scene = SceneGraph::new();
        scene.insert(leaf("a"), None, None).unwrap();
        scene.clear();

        assert_eq!(scene.node_count(), 1);
        assert!(scene.children(scene.root()).is_empty());
    }
}
