//! The editor: state, history and command registry behind one handle.
//!
//! Every undoable edit goes through [`Editor::execute`]. The direct scene
//! methods (`add_object`, `remove_object`, ...) are what commands use
//! internally and bypass history.

use mosaic_scene::{Node, NodeId, NodeTree, SceneError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::{Command, CommandError, CommandRegistry};
use crate::core::{Camera, CommandSummary, Config, EditorSettings, EditorState, History, HistoryJson};
use crate::storage::{Storage, StorageError};

/// Editor errors
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Snapshot of a whole editing session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditorJson {
    #[serde(default)]
    pub camera: Camera,
    pub scene: NodeTree,
    #[serde(default)]
    pub history: HistoryJson,
}

/// Editor context.
#[derive(Debug)]
pub struct Editor {
    pub state: EditorState,
    pub history: History,
    pub registry: CommandRegistry,
    settings: EditorSettings,
}

impl Editor {
    pub fn new(config: Config) -> Self {
        Self::with_settings(config, EditorSettings::default())
    }

    pub fn with_settings(config: Config, settings: EditorSettings) -> Self {
        log::info!("Editor created (language: {})", config.language());
        Self {
            state: EditorState::new(config, &settings),
            history: History::new(settings.time_difference_limit()),
            registry: CommandRegistry::with_builtin(),
            settings,
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Execute a command through history. Returns the id of its entry.
    pub fn execute(&mut self, command: Box<dyn Command>, name: Option<&str>) -> Result<u64, CommandError> {
        self.history.execute(command, name, &mut self.state)
    }

    pub fn undo(&mut self) -> Option<CommandSummary> {
        self.history.undo(&mut self.state, &self.registry)
    }

    pub fn redo(&mut self) -> Option<CommandSummary> {
        self.history.redo(&mut self.state, &self.registry)
    }

    pub fn go_to_state(&mut self, id: u64) {
        self.history.go_to_state(id, &mut self.state, &self.registry);
    }

    /// Turn on history persistence and serialize every existing entry.
    pub fn enable_history_persistence(&mut self) {
        self.state.config.set_key(Config::HISTORY, true);
        let current = self.history.current_id();
        self.history
            .enable_serialization(current, &mut self.state, &self.registry);
    }

    // ========================================================================
    // Scene
    // ========================================================================

    pub fn add_object(
        &mut self,
        tree: impl Into<NodeTree>,
        parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<NodeId, SceneError> {
        self.state.add_object(tree.into(), parent, index)
    }

    pub fn remove_object(&mut self, id: NodeId) -> Result<NodeTree, SceneError> {
        self.state.remove_object(id)
    }

    pub fn move_object(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        before: Option<NodeId>,
    ) -> Result<(), SceneError> {
        self.state.move_object(id, parent, before)
    }

    pub fn name_object(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        self.state.name_object(id, name)
    }

    pub fn set_scene(&mut self, tree: NodeTree) -> Result<(), SceneError> {
        self.state.set_scene(tree)
    }

    pub fn object_by_uuid(&self, id: NodeId) -> Option<&Node> {
        self.state.object_by_uuid(id)
    }

    pub fn focus(&self, id: NodeId) -> bool {
        self.state.focus(id)
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.state.set_camera(camera);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select(&mut self, ids: &[NodeId]) -> usize {
        self.state.select(ids)
    }

    pub fn select_by_uuid(&mut self, id: NodeId) -> bool {
        self.state.select_by_uuid(id)
    }

    pub fn deselect(&mut self, id: Option<NodeId>) -> bool {
        self.state.deselect(id)
    }

    pub fn selected(&self) -> &[NodeId] {
        self.state.selector.selected()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn to_json(&self) -> EditorJson {
        EditorJson {
            camera: self.state.camera,
            scene: self.state.scene.to_tree(),
            history: self.history.to_json(&self.state),
        }
    }

    /// Replace the session with a snapshot. The persisted selection is
    /// restored for nodes that exist in the new scene.
    pub fn from_json(&mut self, json: &EditorJson) -> Result<(), EditorError> {
        let persisted = self.state.config.selected();

        self.state.set_scene(json.scene.clone())?;
        self.state.set_camera(json.camera);
        self.history.from_json(&json.history, &mut self.state, &self.registry);

        if !persisted.is_empty() {
            self.state.config.set_selected(&persisted);
        }
        let restored = self.state.restore_selection();
        log::info!(
            "Loaded session: {} nodes, {} selected",
            self.state.scene.node_count(),
            restored
        );
        Ok(())
    }

    /// Drop history, selection and scene content, and reset the camera.
    pub fn clear(&mut self) {
        self.history.clear(&self.state);
        self.state.deselect(None);
        self.state.clear_scene();
        self.state.set_camera(Camera::default());
    }

    pub fn save(&self, storage: &Storage) -> Result<(), EditorError> {
        storage.set(&self.to_json())?;
        log::info!("Saved session to {:?}", storage.dir());
        Ok(())
    }

    /// Load the stored session. Returns `false` when nothing was stored.
    pub fn load(&mut self, storage: &Storage) -> Result<bool, EditorError> {
        match storage.get::<EditorJson>()? {
            Some(json) => {
                self.from_json(&json)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Save when the `autosave` config key is on.
    pub fn autosave(&self, storage: &Storage) -> Result<bool, EditorError> {
        if !self.state.config.autosave() {
            return Ok(false);
        }
        self.save(storage)?;
        Ok(true)
    }

    /// Consistency check of scene links, selection and history ordering.
    pub fn self_check(&self) -> bool {
        if !self.state.scene.validate() {
            log::warn!("Self check: scene links are inconsistent");
            return false;
        }
        if let Some(id) = self
            .state
            .selector
            .selected()
            .iter()
            .find(|&&id| !self.state.scene.contains(id))
        {
            log::warn!("Self check: selected node {} is not in the scene", id);
            return false;
        }

        let undos: Vec<u64> = self.history.undos().iter().map(|e| e.id()).collect();
        let redos: Vec<u64> = self.history.redos().iter().rev().map(|e| e.id()).collect();
        let timeline: Vec<u64> = undos.into_iter().chain(redos).collect();
        let ordered = timeline.windows(2).all(|pair| pair[0] < pair[1]);
        let bounded = timeline.last().map_or(true, |&last| last <= self.history.id_counter());
        if !(ordered && bounded) {
            log::warn!("Self check: history ids out of order: {:?}", timeline);
            return false;
        }
        true
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Config::in_memory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AddObjectCommand, SetPositionCommand};

    #[test]
    fn test_clear_resets_everything() {
        let mut editor = Editor::default();
        let tree = NodeTree::new(Node::new("box"));
        let id = tree.uuid();
        editor.execute(Box::new(AddObjectCommand::new(tree)), None).unwrap();
        editor.select(&[id]);
        editor.set_camera(Camera::default().with_position([1.0, 1.0, 1.0]));

        editor.clear();
        assert_eq!(editor.state.scene.node_count(), 1);
        assert!(editor.selected().is_empty());
        assert!(!editor.history.can_undo());
        assert_eq!(editor.state.camera, Camera::default());
        assert!(editor.self_check());
    }

    #[test]
    fn test_self_check_after_edits() {
        let mut editor = Editor::default();
        let tree = NodeTree::new(Node::new("box"));
        let id = tree.uuid();
        editor.execute(Box::new(AddObjectCommand::new(tree)), None).unwrap();
        editor.execute(Box::new(SetPositionCommand::new(id, [1.0, 0.0, 0.0])), None).unwrap();
        editor.undo();
        assert!(editor.self_check());
    }

    #[test]
    fn test_autosave_respects_config() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        let mut editor = Editor::default();

        assert!(editor.autosave(&storage).unwrap());
        editor.state.config.set_key(Config::AUTOSAVE, false);
        storage.clear().unwrap();
        assert!(!editor.autosave(&storage).unwrap());
        assert!(storage.get::<EditorJson>().unwrap().is_none());
    }
}
