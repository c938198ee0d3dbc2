//! Core editor types and state management.
//!
//! This module contains the central `EditorState` and supporting types
//! that form the foundation of the editor.

pub mod editor_state;
mod camera;
mod config;
mod diagnostics;
mod history;
mod selection;
mod signals;

pub use camera::Camera;
pub use config::{Config, ConfigError, EditorSettings};
pub use diagnostics::{DiagnosticEntry, Diagnostics, LogLevel};
pub use editor_state::{EditorState, SELECT_BY_ID_NOT_FOUND};
pub use history::{History, HistoryEntry, HistoryJson, HISTORY_STALE_ENTRY};
pub use selection::{SelectionMode, Selector, SELECTOR_OBJECT_NOT_FOUND};
pub use signals::{CommandSummary, EditorSignals};
