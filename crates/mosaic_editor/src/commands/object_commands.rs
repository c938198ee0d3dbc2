//! Object creation and removal commands.
//!
//! While a node is out of the scene the command owns it as a [`NodeTree`],
//! so undo/redo move the same node (same uuid, same children) in and out.

use std::any::Any;

use mosaic_scene::{NodeId, NodeTree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::command::{encode, CommandJson};
use super::{Command, CommandError, CommandRegistry, CommandResult};
use crate::core::EditorState;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddObjectData {
    #[serde(default)]
    object: Option<NodeTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_uuid: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

/// Command to add a node (and its descendants) to the scene.
#[derive(Debug)]
pub struct AddObjectCommand {
    name: String,
    target: Option<NodeId>,
    /// The subtree while it is not attached
    held: Option<NodeTree>,
    parent: Option<NodeId>,
    index: Option<usize>,
}

impl AddObjectCommand {
    pub const KIND: &'static str = "AddObjectCommand";

    pub fn new(tree: impl Into<NodeTree>) -> Self {
        let tree = tree.into();
        Self {
            name: format!("Add Object: {}", tree.node.name),
            target: Some(tree.uuid()),
            held: Some(tree),
            parent: None,
            index: None,
        }
    }

    /// Attach under `parent` instead of the scene root.
    pub fn with_parent(mut self, parent: NodeId, index: Option<usize>) -> Self {
        self.parent = Some(parent);
        self.index = index;
        self
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Rebuild from JSON. The live node is used when its uuid is in the
    /// scene; otherwise the embedded subtree is kept for the next execute.
    pub fn hydrate(
        json: &CommandJson,
        state: &EditorState,
        _registry: &CommandRegistry,
    ) -> Result<Box<dyn Command>, CommandError> {
        Ok(Box::new(Self::from_data(json.decode()?, state)))
    }

    fn from_data(data: AddObjectData, state: &EditorState) -> Self {
        let target = data.object.as_ref().map(NodeTree::uuid);
        let live = target.is_some_and(|id| state.scene.contains(id));
        let name = data
            .object
            .as_ref()
            .map(|tree| format!("Add Object: {}", tree.node.name))
            .unwrap_or_else(|| "Add Object".to_string());

        Self {
            name,
            target,
            held: if live { None } else { data.object },
            parent: data.parent_uuid.filter(|&p| state.scene.contains(p)),
            index: data.index,
        }
    }

    fn attach(&mut self, state: &mut EditorState) -> CommandResult {
        if let Some(tree) = self.held.take() {
            match state.add_object(tree.clone(), self.parent, self.index) {
                Ok(id) => self.target = Some(id),
                Err(e) => {
                    self.held = Some(tree);
                    return Err(e.into());
                }
            }
            return Ok(());
        }
        match self.target {
            Some(id) if state.scene.contains(id) => Ok(()),
            _ => Err(CommandError::MissingField("object")),
        }
    }

    fn detach(&mut self, state: &mut EditorState) -> CommandResult {
        let Some(id) = self.target else {
            return Ok(());
        };
        if !state.scene.contains(id) {
            return Ok(());
        }
        self.parent = state.scene.parent(id).filter(|&p| p != state.scene.root());
        self.index = state.scene.index_in_parent(id);
        self.held = Some(state.remove_object(id)?);
        Ok(())
    }

    fn data(&self, state: &EditorState) -> AddObjectData {
        let object = match (&self.held, self.target) {
            (Some(tree), _) => Some(tree.clone()),
            (None, Some(id)) => state.scene.subtree(id),
            (None, None) => None,
        };
        AddObjectData {
            object,
            parent_uuid: self.parent,
            index: self.index,
        }
    }
}

impl Command for AddObjectCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        self.attach(state)
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        self.detach(state)
    }

    fn to_json(&self, state: &EditorState) -> Result<Value, CommandError> {
        encode(&self.data(state))
    }

    fn self_check(&mut self, state: &mut EditorState) -> bool {
        self.execute(state).is_ok() && self.target.is_some_and(|id| state.scene.contains(id))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Command to add a streamed tileset root.
///
/// Adding behaves like [`AddObjectCommand`]. Undo does nothing: a tileset
/// stays in the scene once added.
#[derive(Debug)]
pub struct AddTilesetCommand {
    inner: AddObjectCommand,
}

impl AddTilesetCommand {
    pub const KIND: &'static str = "AddTilesetCommand";

    pub fn new(tree: impl Into<NodeTree>) -> Self {
        let tree = tree.into();
        let name = format!("Add Tileset: {}", tree.node.name);
        let mut inner = AddObjectCommand::new(tree);
        inner.name = name;
        Self { inner }
    }

    pub fn target(&self) -> Option<NodeId> {
        self.inner.target
    }

    pub fn hydrate(
        json: &CommandJson,
        state: &EditorState,
        _registry: &CommandRegistry,
    ) -> Result<Box<dyn Command>, CommandError> {
        let inner = AddObjectCommand::from_data(json.decode()?, state);
        Ok(Box::new(Self { inner }))
    }
}

impl Command for AddTilesetCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn set_name(&mut self, name: String) {
        self.inner.name = name;
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        self.inner.attach(state)
    }

    fn undo(&mut self, _state: &mut EditorState) -> CommandResult {
        log::debug!("Tileset add is not reversible; undo leaves it in place");
        Ok(())
    }

    fn to_json(&self, state: &EditorState) -> Result<Value, CommandError> {
        self.inner.to_json(state)
    }

    fn self_check(&mut self, state: &mut EditorState) -> bool {
        self.inner.self_check(state)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveObjectData {
    #[serde(default)]
    object: Option<NodeTree>,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    parent_uuid: Option<NodeId>,
}

/// Command to remove a node (and its descendants) from the scene.
///
/// Execute clears the selection; undo re-inserts the node at its old
/// position and selects it.
#[derive(Debug)]
pub struct RemoveObjectCommand {
    name: String,
    target: Option<NodeId>,
    held: Option<NodeTree>,
    parent: Option<NodeId>,
    index: Option<usize>,
}

impl RemoveObjectCommand {
    pub const KIND: &'static str = "RemoveObjectCommand";

    pub fn new(target: NodeId) -> Self {
        Self {
            name: "Remove Object".to_string(),
            target: Some(target),
            held: None,
            parent: None,
            index: None,
        }
    }

    /// Build with the node's name and current position recorded.
    pub fn for_node(state: &EditorState, target: NodeId) -> Self {
        let mut cmd = Self::new(target);
        if let Some(node) = state.scene.get(target) {
            cmd.name = format!("Remove Object: {}", node.name);
        }
        cmd.parent = state.scene.parent(target);
        cmd.index = state.scene.index_in_parent(target);
        cmd
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Rebuild from JSON. A parent that is no longer in the scene falls
    /// back to the root.
    pub fn hydrate(
        json: &CommandJson,
        state: &EditorState,
        _registry: &CommandRegistry,
    ) -> Result<Box<dyn Command>, CommandError> {
        let data: RemoveObjectData = json.decode()?;
        let target = data.object.as_ref().map(NodeTree::uuid);
        let live = target.is_some_and(|id| state.scene.contains(id));

        Ok(Box::new(Self {
            name: "Remove Object".to_string(),
            target,
            held: if live { None } else { data.object },
            parent: data.parent_uuid.filter(|&p| state.scene.contains(p)),
            index: data.index,
        }))
    }
}

impl Command for RemoveObjectCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        let id = self.target.ok_or(CommandError::MissingField("object"))?;
        if !state.scene.contains(id) {
            return Err(CommandError::NodeNotFound(id));
        }

        self.parent = state.scene.parent(id);
        self.index = state.scene.index_in_parent(id);
        self.held = Some(state.remove_object(id)?);
        state.deselect(None);
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let Some(tree) = self.held.take() else {
            return Ok(());
        };
        let parent = self.parent.filter(|&p| state.scene.contains(p));
        match state.add_object(tree.clone(), parent, self.index) {
            Ok(id) => {
                state.select(&[id]);
                Ok(())
            }
            Err(e) => {
                self.held = Some(tree);
                Err(e.into())
            }
        }
    }

    fn to_json(&self, state: &EditorState) -> Result<Value, CommandError> {
        let object = match (&self.held, self.target) {
            (Some(tree), _) => Some(tree.clone()),
            (None, Some(id)) => state.scene.subtree(id),
            (None, None) => None,
        };
        encode(&RemoveObjectData {
            object,
            index: self.index,
            parent_uuid: self.parent,
        })
    }

    fn self_check(&mut self, state: &mut EditorState) -> bool {
        self.execute(state).is_ok() && self.target.is_some_and(|id| !state.scene.contains(id))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_scene::Node;

    #[test]
    fn test_add_undo_keeps_identity() {
        let mut state = EditorState::default();
        let tree = NodeTree::new(Node::new("parent")).with_child(NodeTree::new(Node::new("child")));
        let id = tree.uuid();
        let mut cmd = AddObjectCommand::new(tree.clone());

        cmd.execute(&mut state).unwrap();
        assert!(state.scene.contains(id));

        cmd.undo(&mut state).unwrap();
        assert!(!state.scene.contains(id));
        assert_eq!(state.scene.node_count(), 1);

        cmd.execute(&mut state).unwrap();
        assert_eq!(state.scene.subtree(id), Some(tree));
    }

    #[test]
    fn test_remove_restores_position() {
        let mut state = EditorState::default();
        let a = state.add_object(Node::new("a").into(), None, None).unwrap();
        let b = state.add_object(Node::new("b").into(), None, None).unwrap();
        let c = state.add_object(Node::new("c").into(), None, None).unwrap();
        state.select(&[b]);

        let mut cmd = RemoveObjectCommand::for_node(&state, b);
        cmd.execute(&mut state).unwrap();
        assert_eq!(state.scene.children(state.scene.root()), &[a, c]);
        assert!(state.selector.is_empty());

        cmd.undo(&mut state).unwrap();
        assert_eq!(state.scene.children(state.scene.root()), &[a, b, c]);
        assert_eq!(state.selector.selected(), &[b]);
    }

    #[test]
    fn test_tileset_undo_is_noop() {
        let mut state = EditorState::default();
        let tree = NodeTree::new(Node::new("tiles"));
        let id = tree.uuid();
        let mut cmd = AddTilesetCommand::new(tree);

        cmd.execute(&mut state).unwrap();
        cmd.undo(&mut state).unwrap();
        assert!(state.scene.contains(id));
    }

    #[test]
    fn test_remove_missing_node_fails() {
        let mut state = EditorState::default();
        let mut cmd = RemoveObjectCommand::new(NodeId::new());
        assert!(matches!(cmd.execute(&mut state), Err(CommandError::NodeNotFound(_))));
        assert!(cmd.undo(&mut state).is_ok());
    }
}
