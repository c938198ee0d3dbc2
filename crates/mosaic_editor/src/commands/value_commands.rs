//! Generic attribute edit.

use std::any::Any;

use mosaic_scene::{Node, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::command::{downcast, encode, CommandJson};
use super::{Command, CommandError, CommandRegistry, CommandResult, MergeKey};
use crate::core::EditorState;

/// Editable node attributes.
pub const ATTRIBUTES: &[&str] = &["name", "visible"];

fn read_attribute(node: &Node, attribute: &str) -> Option<Value> {
    match attribute {
        "name" => Some(Value::String(node.name.clone())),
        "visible" => Some(Value::Bool(node.visible)),
        _ => None,
    }
}

fn write_attribute(node: &mut Node, attribute: &str, value: &Value) -> CommandResult {
    match (attribute, value) {
        ("name", Value::String(name)) => node.name = name.clone(),
        ("visible", Value::Bool(visible)) => node.visible = *visible,
        _ => {
            return Err(CommandError::InvalidOperation(format!(
                "cannot set '{}' to {}",
                attribute, value
            )))
        }
    }
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetValueData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_uuid: Option<NodeId>,
    #[serde(default)]
    attribute_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_value: Option<Value>,
}

/// Command to set a named attribute of a node.
///
/// Edits to the same attribute of the same node merge; edits to different
/// attributes never do.
#[derive(Debug)]
pub struct SetValueCommand {
    name: String,
    target: Option<NodeId>,
    attribute: String,
    old_value: Option<Value>,
    new_value: Option<Value>,
}

impl SetValueCommand {
    pub const KIND: &'static str = "SetValueCommand";

    pub fn new(target: NodeId, attribute: impl Into<String>, new_value: impl Into<Value>) -> Self {
        let attribute = attribute.into();
        Self {
            name: format!("Set {}", attribute),
            target: Some(target),
            attribute,
            old_value: None,
            new_value: Some(new_value.into()),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn hydrate(
        json: &CommandJson,
        state: &EditorState,
        _registry: &CommandRegistry,
    ) -> Result<Box<dyn Command>, CommandError> {
        let data: SetValueData = json.decode()?;
        Ok(Box::new(Self {
            name: format!("Set {}", data.attribute_name),
            target: data.object_uuid.filter(|&id| state.scene.contains(id)),
            attribute: data.attribute_name,
            old_value: data.old_value,
            new_value: data.new_value,
        }))
    }
}

impl Command for SetValueCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn updatable(&self) -> bool {
        true
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(MergeKey::new(Self::KIND, self.target).with_attribute(self.attribute.clone()))
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        let id = self.target.ok_or(CommandError::MissingField("objectUuid"))?;
        let new_value = self.new_value.as_ref().ok_or(CommandError::MissingField("newValue"))?;
        let node = state.node_mut(id).ok_or(CommandError::NodeNotFound(id))?;

        let previous = read_attribute(node, &self.attribute);
        write_attribute(node, &self.attribute, new_value)?;
        if self.old_value.is_none() {
            self.old_value = previous;
        }

        state.object_changed(id);
        state.signals.scene_graph_changed.notify();
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let (Some(id), Some(old_value)) = (self.target, self.old_value.as_ref()) else {
            return Ok(());
        };
        let Some(node) = state.node_mut(id) else {
            return Ok(());
        };
        write_attribute(node, &self.attribute, old_value)?;

        state.object_changed(id);
        state.signals.scene_graph_changed.notify();
        Ok(())
    }

    fn update(&mut self, newer: &dyn Command) {
        if let Some(newer) = downcast::<Self>(newer) {
            if newer.new_value.is_some() {
                self.new_value = newer.new_value.clone();
            }
        }
    }

    fn to_json(&self, _state: &EditorState) -> Result<Value, CommandError> {
        encode(&SetValueData {
            object_uuid: self.target,
            attribute_name: self.attribute.clone(),
            old_value: self.old_value.clone(),
            new_value: self.new_value.clone(),
        })
    }

    fn self_check(&mut self, state: &mut EditorState) -> bool {
        if self.execute(state).is_err() {
            return false;
        }
        let current = self
            .target
            .and_then(|id| state.scene.get(id))
            .and_then(|node| read_attribute(node, &self.attribute));
        current.is_some() && current == self.new_value
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
