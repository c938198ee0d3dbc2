//! Composite command.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::command::{encode, CommandJson};
use super::{Command, CommandError, CommandRegistry, CommandResult};
use crate::core::EditorState;

#[derive(Debug, Default, Serialize, Deserialize)]
struct MultiCommandsData {
    #[serde(default)]
    commands: Vec<CommandJson>,
}

/// Runs child commands as one undoable unit.
///
/// Children execute in order and undo in reverse order, with
/// `scene_graph_changed` held back until the whole batch is done.
pub struct MultiCommandsCommand {
    name: String,
    commands: Vec<Box<dyn Command>>,
}

impl MultiCommandsCommand {
    pub const KIND: &'static str = "MultiCommandsCommand";

    pub fn new(commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            name: "Multiple Changes".to_string(),
            commands,
        }
    }

    pub fn push(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn hydrate(
        json: &CommandJson,
        state: &EditorState,
        registry: &CommandRegistry,
    ) -> Result<Box<dyn Command>, CommandError> {
        let data: MultiCommandsData = json.decode()?;
        let mut commands = Vec::with_capacity(data.commands.len());
        for child in &data.commands {
            match registry.hydrate(child, state) {
                Ok(command) => commands.push(command),
                Err(CommandError::UnknownCommand(kind)) => {
                    log::warn!("Skipping batch child of unknown type {}", kind);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Box::new(Self::new(commands)))
    }

    /// Undo the first `count` children, most recent first. Failures are
    /// logged; the caller is already reporting an error.
    fn roll_back(&mut self, count: usize, state: &mut EditorState) {
        for command in self.commands[..count].iter_mut().rev() {
            if let Err(e) = command.undo(state) {
                log::error!("Rollback of '{}' failed: {}", command.name(), e);
            }
        }
    }

    /// Re-execute the children from `start` on, in order.
    fn roll_forward(&mut self, start: usize, state: &mut EditorState) {
        for command in &mut self.commands[start..] {
            if let Err(e) = command.execute(state) {
                log::error!("Rollforward of '{}' failed: {}", command.name(), e);
            }
        }
    }
}

impl Command for MultiCommandsCommand {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// A failing child rolls back the ones before it, so the batch either
    /// applies fully or not at all.
    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        let result = {
            let _batch = state.signals.scene_graph_changed.suppress();
            let failed = (0..self.commands.len())
                .find_map(|i| self.commands[i].execute(state).err().map(|e| (i, e)));
            match failed {
                Some((i, e)) => {
                    self.roll_back(i, state);
                    Err(e)
                }
                None => Ok(()),
            }
        };
        state.signals.scene_graph_changed.notify();
        result
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let result = {
            let _batch = state.signals.scene_graph_changed.suppress();
            let failed = (0..self.commands.len())
                .rev()
                .find_map(|i| self.commands[i].undo(state).err().map(|e| (i, e)));
            match failed {
                Some((i, e)) => {
                    self.roll_forward(i + 1, state);
                    Err(e)
                }
                None => Ok(()),
            }
        };
        state.signals.scene_graph_changed.notify();
        result
    }

    fn to_json(&self, state: &EditorState) -> Result<Value, CommandError> {
        let commands = self
            .commands
            .iter()
            .map(|child| CommandJson::from_command(0, child.as_ref(), state))
            .collect::<Result<Vec<_>, _>>()?;
        encode(&MultiCommandsData { commands })
    }

    fn self_check(&mut self, state: &mut EditorState) -> bool {
        {
            let _batch = state.signals.scene_graph_changed.suppress();
            for command in &mut self.commands {
                if !command.self_check(state) {
                    return false;
                }
            }
        }
        state.signals.scene_graph_changed.notify();
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for MultiCommandsCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self.commands.iter().map(|c| c.kind()).collect();
        f.debug_struct("MultiCommandsCommand")
            .field("name", &self.name)
            .field("commands", &kinds)
            .finish()
    }
}
