//! Command trait, result types and the serialized command record.

use std::any::Any;

use mosaic_scene::{NodeId, SceneError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::EditorState;

/// Result type for command execution.
pub type CommandResult = Result<(), CommandError>;

/// Errors that can occur during command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Target node is not in the scene
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A value required to apply the command was never provided
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("command json: {0}")]
    Json(#[from] serde_json::Error),

    /// No factory registered for a serialized `type`
    #[error("unknown command type: {0}")]
    UnknownCommand(String),
}

/// Fields compared when deciding whether two updatable commands merge.
///
/// Two commands merge only when every field is equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeKey {
    pub kind: &'static str,
    pub target: Option<NodeId>,
    pub script: Option<String>,
    pub attribute: Option<String>,
}

impl MergeKey {
    pub fn new(kind: &'static str, target: Option<NodeId>) -> Self {
        Self {
            kind,
            target,
            script: None,
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

/// A command that can be executed, undone, and redone.
///
/// Commands are the only way to modify the scene. They capture both the
/// action and its inverse, enabling undo/redo, and can be written to JSON
/// and rebuilt through a [`CommandRegistry`](super::CommandRegistry).
///
/// # Example
///
/// ```ignore
/// let cmd = SetPositionCommand::new(node_id, [1.0, 0.0, 0.0]);
/// editor.execute(Box::new(cmd), None)?;
/// editor.undo();
/// ```
pub trait Command: Send + Sync {
    /// Serialized `type` discriminant.
    fn kind(&self) -> &'static str;

    /// Human-readable name for the undo/redo menu.
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// Whether successive commands of this kind on the same target may merge.
    fn updatable(&self) -> bool {
        false
    }

    fn merge_key(&self) -> Option<MergeKey> {
        None
    }

    /// Apply the forward mutation.
    fn execute(&mut self, state: &mut EditorState) -> CommandResult;

    /// Apply the inverse. Missing old state or target is a silent no-op.
    fn undo(&mut self, state: &mut EditorState) -> CommandResult;

    /// Absorb the "new" value of a newer command of the same kind.
    fn update(&mut self, _newer: &dyn Command) {}

    /// Variant fields as a JSON object.
    fn to_json(&self, state: &EditorState) -> Result<Value, CommandError>;

    /// Execute, then check the post-condition against the live scene.
    fn self_check(&mut self, state: &mut EditorState) -> bool {
        self.execute(state).is_ok()
    }

    fn as_any(&self) -> &dyn Any;
}

/// Serialized command: `{ type, id, name, ...variant fields }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandJson {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl CommandJson {
    /// Serialize a command under the given history id.
    pub fn from_command(id: u64, command: &dyn Command, state: &EditorState) -> Result<Self, CommandError> {
        let data = match command.to_json(state)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(CommandError::InvalidOperation(format!(
                    "{} serialized to a non-object: {}",
                    command.kind(),
                    other
                )))
            }
        };
        Ok(Self {
            kind: command.kind().to_string(),
            id,
            name: command.name().to_string(),
            data,
        })
    }

    /// Decode the variant fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }
}

/// Encode a typed record as variant fields.
pub(crate) fn encode<T: Serialize>(data: &T) -> Result<Value, CommandError> {
    Ok(serde_json::to_value(data)?)
}

/// Downcast a command to a concrete variant.
pub(crate) fn downcast<T: 'static>(command: &dyn Command) -> Option<&T> {
    command.as_any().downcast_ref::<T>()
}
