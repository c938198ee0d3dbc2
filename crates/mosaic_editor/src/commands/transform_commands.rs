//! Transform commands (position, rotation, scale).
//!
//! The three commands share one implementation parameterised by the
//! transform component they edit. All of them are updatable: a drag that
//! emits many small edits on one node collapses into a single entry.

use std::any::Any;
use std::marker::PhantomData;

use mosaic_scene::{NodeId, Transform};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::command::{downcast, CommandJson};
use super::{Command, CommandError, CommandRegistry, CommandResult, MergeKey};
use crate::core::EditorState;

/// A transform component a command can edit.
pub trait TransformChannel: Send + Sync + 'static {
    /// Serialized `type`
    const KIND: &'static str;
    /// Default display name
    const NAME: &'static str;
    /// JSON field holding the previous value
    const OLD_FIELD: &'static str;
    /// JSON field holding the new value
    const NEW_FIELD: &'static str;

    fn read(transform: &Transform) -> [f32; 3];
    fn write(transform: &mut Transform, value: [f32; 3]);
}

/// Local position.
#[derive(Debug)]
pub struct Position;

impl TransformChannel for Position {
    const KIND: &'static str = "SetPositionCommand";
    const NAME: &'static str = "Set Position";
    const OLD_FIELD: &'static str = "oldPosition";
    const NEW_FIELD: &'static str = "newPosition";

    fn read(transform: &Transform) -> [f32; 3] {
        transform.position
    }

    fn write(transform: &mut Transform, value: [f32; 3]) {
        transform.position = value;
    }
}

/// Euler rotation, radians.
#[derive(Debug)]
pub struct Rotation;

impl TransformChannel for Rotation {
    const KIND: &'static str = "SetRotationCommand";
    const NAME: &'static str = "Set Rotation";
    const OLD_FIELD: &'static str = "oldRotation";
    const NEW_FIELD: &'static str = "newRotation";

    fn read(transform: &Transform) -> [f32; 3] {
        transform.rotation
    }

    fn write(transform: &mut Transform, value: [f32; 3]) {
        transform.rotation = value;
    }
}

/// Per-axis scale.
#[derive(Debug)]
pub struct Scale;

impl TransformChannel for Scale {
    const KIND: &'static str = "SetScaleCommand";
    const NAME: &'static str = "Set Scale";
    const OLD_FIELD: &'static str = "oldScale";
    const NEW_FIELD: &'static str = "newScale";

    fn read(transform: &Transform) -> [f32; 3] {
        transform.scale
    }

    fn write(transform: &mut Transform, value: [f32; 3]) {
        transform.scale = value;
    }
}

pub type SetPositionCommand = SetTransformCommand<Position>;
pub type SetRotationCommand = SetTransformCommand<Rotation>;
pub type SetScaleCommand = SetTransformCommand<Scale>;

/// Command to set one transform component of a node.
#[derive(Debug)]
pub struct SetTransformCommand<C: TransformChannel> {
    name: String,
    target: Option<NodeId>,
    old_value: Option<[f32; 3]>,
    new_value: Option<[f32; 3]>,
    channel: PhantomData<C>,
}

impl<C: TransformChannel> SetTransformCommand<C> {
    pub const KIND: &'static str = C::KIND;

    /// The previous value is captured from the node on first execute.
    pub fn new(target: NodeId, new_value: [f32; 3]) -> Self {
        Self {
            name: C::NAME.to_string(),
            target: Some(target),
            old_value: None,
            new_value: Some(new_value),
            channel: PhantomData,
        }
    }

    /// Use an explicit previous value, e.g. the value at drag start.
    pub fn with_old(mut self, old_value: [f32; 3]) -> Self {
        self.old_value = Some(old_value);
        self
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn old_value(&self) -> Option<[f32; 3]> {
        self.old_value
    }

    pub fn new_value(&self) -> Option<[f32; 3]> {
        self.new_value
    }

    /// Rebuild from JSON. Absent fields stay unset: execute then fails and
    /// undo does nothing.
    pub fn hydrate(
        json: &CommandJson,
        state: &EditorState,
        _registry: &CommandRegistry,
    ) -> Result<Box<dyn Command>, CommandError> {
        let target: Option<NodeId> = field(&json.data, "objectUuid")?;
        let target = target.filter(|&id| state.scene.contains(id));

        Ok(Box::new(Self {
            name: C::NAME.to_string(),
            target,
            old_value: field(&json.data, C::OLD_FIELD)?,
            new_value: field(&json.data, C::NEW_FIELD)?,
            channel: PhantomData,
        }))
    }
}

fn field<T: for<'de> Deserialize<'de>>(data: &Map<String, Value>, key: &str) -> Result<Option<T>, CommandError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(T::deserialize(value)?)),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    object_uuid: Option<NodeId>,
}

impl<C: TransformChannel> Command for SetTransformCommand<C> {
    fn kind(&self) -> &'static str {
        C::KIND
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
        Some(MergeKey::new(C::KIND, self.target))
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        let id = self.target.ok_or(CommandError::MissingField("objectUuid"))?;
        let new_value = self.new_value.ok_or(CommandError::MissingField(C::NEW_FIELD))?;
        let node = state.node_mut(id).ok_or(CommandError::NodeNotFound(id))?;

        if self.old_value.is_none() {
            self.old_value = Some(C::read(&node.transform));
        }
        C::write(&mut node.transform, new_value);
        state.object_changed(id);
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let (Some(id), Some(old_value)) = (self.target, self.old_value) else {
            return Ok(());
        };
        let Some(node) = state.node_mut(id) else {
            return Ok(());
        };
        C::write(&mut node.transform, old_value);
        state.object_changed(id);
        Ok(())
    }

    fn update(&mut self, newer: &dyn Command) {
        if let Some(newer) = downcast::<Self>(newer) {
            if newer.new_value.is_some() {
                self.new_value = newer.new_value;
            }
        }
    }

    fn to_json(&self, _state: &EditorState) -> Result<Value, CommandError> {
        let mut data = match serde_json::to_value(ObjectRef {
            object_uuid: self.target,
        })? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(old) = self.old_value {
            data.insert(C::OLD_FIELD.to_string(), serde_json::to_value(old)?);
        }
        if let Some(new) = self.new_value {
            data.insert(C::NEW_FIELD.to_string(), serde_json::to_value(new)?);
        }
        Ok(Value::Object(data))
    }

    fn self_check(&mut self, state: &mut EditorState) -> bool {
        if self.execute(state).is_err() {
            return false;
        }
        match (self.target.and_then(|id| state.scene.get(id)), self.new_value) {
            (Some(node), Some(new_value)) => C::read(&node.transform) == new_value,
            _ => false,
        }
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
    fn test_execute_undo_restores_exact_value() {
        let mut state = EditorState::default();
        let start = Transform::new().with_position([0.1, 0.2, 0.3]);
        let id = state
            .add_object(Node::new("n").with_transform(start).into(), None, None)
            .unwrap();

        let mut cmd = SetPositionCommand::new(id, [1.0, 2.0, 3.0]);
        cmd.execute(&mut state).unwrap();
        assert_eq!(state.scene.get(id).unwrap().transform.position, [1.0, 2.0, 3.0]);

        cmd.undo(&mut state).unwrap();
        assert_eq!(state.scene.get(id).unwrap().transform, start);
    }

    #[test]
    fn test_update_absorbs_new_value() {
        let id = NodeId::new();
        let mut first = SetRotationCommand::new(id, [0.1, 0.0, 0.0]).with_old([0.0; 3]);
        let second = SetRotationCommand::new(id, [0.5, 0.0, 0.0]);

        first.update(&second);
        assert_eq!(first.new_value(), Some([0.5, 0.0, 0.0]));
        assert_eq!(first.old_value(), Some([0.0; 3]));

        let scale = SetScaleCommand::new(id, [2.0; 3]);
        first.update(&scale);
        assert_eq!(first.new_value(), Some([0.5, 0.0, 0.0]));
    }

    #[test]
    fn test_missing_fields() {
        let mut state = EditorState::default();
        let id = state.add_object(Node::new("n").into(), None, None).unwrap();
        let json = CommandJson {
            kind: SetScaleCommand::KIND.to_string(),
            id: 1,
            name: String::new(),
            data: serde_json::json!({ "objectUuid": id }).as_object().cloned().unwrap(),
        };

        let mut cmd = SetScaleCommand::hydrate(&json, &state, &CommandRegistry::new()).unwrap();
        assert!(matches!(cmd.execute(&mut state), Err(CommandError::MissingField("newScale"))));
        assert!(cmd.undo(&mut state).is_ok());
        assert_eq!(state.scene.get(id).unwrap().transform, Transform::new());
    }

    #[test]
    fn test_json_field_names() {
        let state = EditorState::default();
        let id = NodeId::new();
        let cmd = SetPositionCommand::new(id, [1.0, 0.0, 0.0]).with_old([0.0; 3]);
        let json = cmd.to_json(&state).unwrap();

        assert_eq!(json["objectUuid"], id.to_string());
        assert_eq!(json["oldPosition"], serde_json::json!([0.0, 0.0, 0.0]));
        assert_eq!(json["newPosition"], serde_json::json!([1.0, 0.0, 0.0]));
    }
}
