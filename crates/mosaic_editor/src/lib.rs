//! Mosaic Scene Editor core
//!
//! Undoable editing of a 3D scene graph.
//!
//! ## Features
//!
//! - **Commands**: every scene mutation is a reversible, serializable command
//! - **Undo/Redo**: history with coalescing of rapid edits and state jumps
//! - **Persistence**: history and scene snapshots survive restarts
//! - **Selection**: ordered multi-select persisted in config
//! - **Signals**: typed change notifications for viewports and panels
//!
//! ## Architecture
//!
//! ```text
//! User Input → Command → History → EditorState → Signals → Viewport/Panels
//! ```
//!
//! Model loading and rendering are collaborators behind the [`Loader`] and
//! [`Renderer`] traits.

pub mod commands;
pub mod core;
pub mod editor;
pub mod loader;
pub mod renderer;
pub mod storage;

// Re-export commonly used types
pub use core::{
    Camera, CommandSummary, Config, ConfigError, Diagnostics, EditorSettings, EditorSignals,
    EditorState, History, HistoryJson, LogLevel, SelectionMode, Selector,
};

pub use commands::{
    AddObjectCommand, AddTilesetCommand, Command, CommandError, CommandJson, CommandRegistry,
    CommandResult, MultiCommandsCommand, RemoveObjectCommand, SetPositionCommand,
    SetRotationCommand, SetScaleCommand, SetValueCommand,
};

pub use editor::{Editor, EditorError, EditorJson};
pub use loader::{LoadError, LoadedModel, Loader, LoaderManager, NodeJsonLoader};
pub use renderer::{NullRenderer, RenderLoop, Renderer};
pub use storage::{Storage, StorageError};

pub use mosaic_scene::{MeshType, Node, NodeId, NodeKind, NodeTree, SceneGraph, Transform};

/// Editor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Editor name
pub const NAME: &str = "Mosaic Editor";
