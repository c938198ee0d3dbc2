//! Command pattern implementation for undo/redo support.
//!
//! Every undoable edit of the editor state goes through a [`Command`] and
//! is recorded by [`History`](crate::core::History).

mod command;
mod multi_command;
mod object_commands;
mod registry;
mod transform_commands;
mod value_commands;

pub use command::{Command, CommandError, CommandJson, CommandResult, MergeKey};
pub use multi_command::MultiCommandsCommand;
pub use object_commands::{AddObjectCommand, AddTilesetCommand, RemoveObjectCommand};
pub use registry::{CommandRegistry, HydrateFn};
pub use transform_commands::{
    Position, Rotation, Scale, SetPositionCommand, SetRotationCommand, SetScaleCommand,
    SetTransformCommand, TransformChannel,
};
pub use value_commands::{SetValueCommand, ATTRIBUTES};
