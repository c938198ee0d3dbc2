//! Central editor state - single source of truth.
//!
//! Commands mutate the scene through the methods here so that every
//! structural change is announced on the matching signal.

use mosaic_scene::{Node, NodeId, NodeTree, SceneError, SceneGraph};

use super::{Camera, Config, Diagnostics, EditorSettings, EditorSignals, SelectionMode, Selector};

/// Diagnostics key for selecting a uuid that is not in the scene.
pub const SELECT_BY_ID_NOT_FOUND: &str = "error-editor-select-object-by-id-not-found";

/// Everything a command may read or mutate.
#[derive(Debug)]
pub struct EditorState {
    pub scene: SceneGraph,
    pub signals: EditorSignals,
    pub selector: Selector,
    pub config: Config,
    pub camera: Camera,
    pub diagnostics: Diagnostics,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Config::in_memory(), &EditorSettings::default())
    }
}

impl EditorState {
    pub fn new(config: Config, settings: &EditorSettings) -> Self {
        Self {
            scene: SceneGraph::new(),
            signals: EditorSignals::new(),
            selector: Selector::new(),
            config,
            camera: Camera::default(),
            diagnostics: Diagnostics::with_capacity(settings.diagnostics_capacity),
        }
    }

    pub fn object_by_uuid(&self, id: NodeId) -> Option<&Node> {
        self.scene.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.scene.get_mut(id)
    }

    /// Announce that a node's data changed.
    pub fn object_changed(&self, id: NodeId) {
        if let Some(node) = self.scene.get(id) {
            self.signals.object_changed.dispatch(node);
        }
    }

    // ========================================================================
    // Structural changes
    // ========================================================================

    /// Attach a subtree under `parent` (root when `None`) at `index`
    /// (appended when `None`).
    pub fn add_object(
        &mut self,
        tree: NodeTree,
        parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<NodeId, SceneError> {
        let id = self.scene.insert(tree, parent, index)?;
        if let Some(node) = self.scene.get(id) {
            log::debug!("Added object '{}' ({})", node.name, id);
            self.signals.object_added.dispatch(node);
        }
        self.signals.scene_graph_changed.notify();
        Ok(id)
    }

    /// Detach a node and its descendants. The scene root is refused.
    pub fn remove_object(&mut self, id: NodeId) -> Result<NodeTree, SceneError> {
        let tree = self.scene.detach(id)?;
        self.selector.prune(&tree.ids(), &mut self.config);

        log::debug!("Removed object '{}' ({})", tree.node.name, id);
        self.signals.object_removed.dispatch(&tree.node);
        self.signals.scene_graph_changed.notify();
        Ok(tree)
    }

    /// Reparent a node, placing it before `before` when that is a sibling
    /// under the new parent.
    pub fn move_object(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        before: Option<NodeId>,
    ) -> Result<(), SceneError> {
        self.scene.reparent(id, parent, before)?;
        self.signals.scene_graph_changed.notify();
        Ok(())
    }

    pub fn name_object(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        let node = self.scene.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.name = name.into();
        self.object_changed(id);
        self.signals.scene_graph_changed.notify();
        Ok(())
    }

    /// Replace the whole scene. `object_added` fires for each top-level node
    /// and `scene_graph_changed` fires once at the end.
    ///
    /// The new graph is built before anything is touched, so an invalid tree
    /// leaves the current scene and selection as they were.
    pub fn set_scene(&mut self, tree: NodeTree) -> Result<(), SceneError> {
        let graph = SceneGraph::from_tree(tree)?;

        self.selector.prune(&self.scene.ids(), &mut self.config);
        self.scene = graph;

        let root = self.scene.root();
        for &child in self.scene.children(root) {
            if let Some(node) = self.scene.get(child) {
                self.signals.object_added.dispatch(node);
            }
        }

        log::info!("Scene replaced ({} nodes)", self.scene.node_count());
        self.signals.scene_graph_changed.notify();
        Ok(())
    }

    /// Remove everything below the scene root.
    pub fn clear_scene(&mut self) {
        self.selector.prune(&self.scene.ids(), &mut self.config);
        self.scene.clear();
        log::info!("Scene cleared");
        self.signals.scene_graph_changed.notify();
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select(&mut self, ids: &[NodeId]) -> usize {
        self.selector.select(ids, &self.signals, &mut self.config)
    }

    pub fn select_with_mode(&mut self, id: NodeId, mode: SelectionMode) {
        self.selector
            .select_with_mode(id, mode, &self.signals, &mut self.config, &mut self.diagnostics);
    }

    /// Select a node by uuid. Unknown uuids are reported to diagnostics.
    pub fn select_by_uuid(&mut self, id: NodeId) -> bool {
        if !self.scene.contains(id) {
            self.diagnostics
                .error(SELECT_BY_ID_NOT_FOUND, format!("no object with uuid {}", id));
            return false;
        }
        self.select(&[id]);
        true
    }

    pub fn deselect(&mut self, id: Option<NodeId>) -> bool {
        self.selector
            .deselect(id, &self.signals, &mut self.config, &mut self.diagnostics)
    }

    /// Re-select the nodes persisted in config that still exist.
    pub fn restore_selection(&mut self) -> usize {
        self.selector
            .restore_from(&self.scene, &self.signals, &mut self.config)
    }

    // ========================================================================
    // Viewport notifications
    // ========================================================================

    /// Ask viewport collaborators to frame a node. Mutates nothing.
    pub fn focus(&self, id: NodeId) -> bool {
        match self.scene.get(id) {
            Some(node) => {
                self.signals.object_focused.dispatch(node);
                true
            }
            None => false,
        }
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.signals.camera_resetted.dispatch(&self.camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counter(channel: &mut mosaic_signal::Channel<()>) -> Arc<AtomicU32> {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();
        channel.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_remove_prunes_selection() {
        let mut state = EditorState::default();
        let tree = NodeTree::new(Node::new("parent")).with_child(NodeTree::new(Node::new("child")));
        let child = tree.children[0].uuid();
        let id = state.add_object(tree, None, None).unwrap();

        state.select(&[id, child]);
        state.remove_object(id).unwrap();

        assert!(state.selector.is_empty());
        assert!(state.config.selected().is_empty());
        assert_eq!(state.remove_object(state.scene.root()).unwrap_err(), SceneError::RootImmutable);
    }

    #[test]
    fn test_set_scene_fires_graph_change_once() {
        let mut state = EditorState::default();
        let changes = counter(&mut state.signals.scene_graph_changed);

        let tree = NodeTree::new(Node::new("Imported"))
            .with_child(NodeTree::new(Node::new("a")))
            .with_child(NodeTree::new(Node::new("b")))
            .with_child(NodeTree::new(Node::new("c")));
        let root = tree.uuid();
        state.set_scene(tree).unwrap();

        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(state.scene.root(), root);
        assert_eq!(state.scene.children(root).len(), 3);
        assert!(state.signals.scene_graph_changed.is_active());
    }

    #[test]
    fn test_set_scene_with_duplicate_uuids_keeps_scene() {
        let mut state = EditorState::default();
        let keep = state.add_object(Node::new("keep").into(), None, None).unwrap();
        state.select(&[keep]);
        let before = state.scene.to_tree();
        let changes = counter(&mut state.signals.scene_graph_changed);

        let twin = Node::new("twin");
        let tree = NodeTree::new(Node::new("Imported"))
            .with_child(NodeTree::new(twin.clone()))
            .with_child(NodeTree::new(twin));

        assert!(matches!(state.set_scene(tree), Err(SceneError::DuplicateNode(_))));
        assert_eq!(state.scene.to_tree(), before);
        assert_eq!(state.selector.selected(), &[keep]);
        assert_eq!(changes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_select_by_unknown_uuid_is_reported() {
        let mut state = EditorState::default();
        assert!(!state.select_by_uuid(NodeId::new()));
        assert!(state.diagnostics.contains_key(SELECT_BY_ID_NOT_FOUND));
        assert!(state.selector.is_empty());
    }

    #[test]
    fn test_focus_does_not_mutate() {
        let mut state = EditorState::default();
        let id = state.add_object(Node::new("a").into(), None, None).unwrap();
        let before = state.scene.to_tree();

        assert!(state.focus(id));
        assert!(!state.focus(NodeId::new()));
        assert_eq!(state.scene.to_tree(), before);
    }
}
