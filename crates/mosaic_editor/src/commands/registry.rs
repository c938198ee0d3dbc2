//! Command type registry used to rebuild commands from JSON.

use std::collections::HashMap;

use super::{
    AddObjectCommand, AddTilesetCommand, Command, CommandError, CommandJson, MultiCommandsCommand,
    RemoveObjectCommand, SetPositionCommand, SetRotationCommand, SetScaleCommand, SetValueCommand,
};
use crate::core::EditorState;

/// Builds a live command from its serialized form.
pub type HydrateFn =
    fn(&CommandJson, &EditorState, &CommandRegistry) -> Result<Box<dyn Command>, CommandError>;

/// Maps serialized `type` names to factories.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    factories: HashMap<String, HydrateFn>,
}

impl CommandRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command type.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(AddObjectCommand::KIND, AddObjectCommand::hydrate);
        registry.register(AddTilesetCommand::KIND, AddTilesetCommand::hydrate);
        registry.register(RemoveObjectCommand::KIND, RemoveObjectCommand::hydrate);
        registry.register(SetPositionCommand::KIND, SetPositionCommand::hydrate);
        registry.register(SetRotationCommand::KIND, SetRotationCommand::hydrate);
        registry.register(SetScaleCommand::KIND, SetScaleCommand::hydrate);
        registry.register(SetValueCommand::KIND, SetValueCommand::hydrate);
        registry.register(MultiCommandsCommand::KIND, MultiCommandsCommand::hydrate);
        registry
    }

    /// Register a factory, replacing any previous one for the same type.
    pub fn register(&mut self, kind: impl Into<String>, factory: HydrateFn) {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), factory).is_some() {
            log::warn!("Replaced command factory for '{}'", kind);
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Rebuild a command, restoring the serialized name.
    pub fn hydrate(&self, json: &CommandJson, state: &EditorState) -> Result<Box<dyn Command>, CommandError> {
        let factory = self
            .factories
            .get(&json.kind)
            .ok_or_else(|| CommandError::UnknownCommand(json.kind.clone()))?;

        let mut command = factory(json, state, self)?;
        if !json.name.is_empty() {
            command.set_name(json.name.clone());
        }
        Ok(command)
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.kinds().collect();
        kinds.sort_unstable();
        f.debug_struct("CommandRegistry").field("kinds", &kinds).finish()
    }
}
