//! Integration tests for the editor facade
//!
//! Selection, per-command round trips, loading and session persistence.

use std::sync::Arc;

use mosaic_editor::core::{SELECTOR_OBJECT_NOT_FOUND, SELECT_BY_ID_NOT_FOUND};
use mosaic_editor::loader::LOADER_NOT_FOUND;
use mosaic_editor::*;
use parking_lot::Mutex;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scene with a parent holding two children.
fn populated() -> (Editor, NodeId, NodeId, NodeId) {
    let mut editor = Editor::default();
    let parent = editor.add_object(Node::new("parent"), None, None).unwrap();
    let a = editor.add_object(Node::new("a"), Some(parent), None).unwrap();
    let b = editor
        .add_object(Node::mesh("b", MeshType::Sphere), Some(parent), None)
        .unwrap();
    (editor, parent, a, b)
}

fn assert_round_trip(mut editor: Editor, mut command: Box<dyn Command>) {
    let before = editor.state.scene.to_tree();

    command.execute(&mut editor.state).unwrap();
    assert_ne!(editor.state.scene.to_tree(), before, "{} changed nothing", command.kind());

    command.undo(&mut editor.state).unwrap();
    assert_eq!(editor.state.scene.to_tree(), before, "{} undo is not exact", command.kind());
    assert!(editor.state.scene.validate());
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_select_is_idempotent() {
    init_logging();
    let (mut editor, _, a, b) = populated();
    let single = Arc::new(Mutex::new(Vec::new()));
    let many = Arc::new(Mutex::new(Vec::new()));
    let single_clone = single.clone();
    let many_clone = many.clone();
    editor.state.signals.object_selected.subscribe(move |id| single_clone.lock().push(*id));
    editor.state.signals.objects_selected.subscribe(move |ids| many_clone.lock().push(ids.clone()));

    assert_eq!(editor.select(&[a]), 1);
    assert_eq!(editor.select(&[a]), 0);
    assert_eq!(editor.select(&[a, b, b]), 1);

    assert_eq!(*single.lock(), vec![a, b]);
    assert!(many.lock().is_empty());
    assert_eq!(editor.selected(), &[a, b]);
}

#[test]
fn test_select_many_fires_once() {
    let (mut editor, parent, a, b) = populated();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let batches_clone = batches.clone();
    editor.state.signals.objects_selected.subscribe(move |ids| batches_clone.lock().push(ids.clone()));

    editor.select(&[parent, a, b]);
    assert_eq!(*batches.lock(), vec![vec![parent, a, b]]);
    assert_eq!(editor.state.config.selected(), vec![parent, a, b]);
}

#[test]
fn test_deselect_unknown_reports_diagnostic() {
    let (mut editor, _, a, b) = populated();
    editor.select(&[a]);

    assert!(!editor.deselect(Some(b)));
    assert_eq!(editor.selected(), &[a]);
    assert!(editor.state.diagnostics.contains_key(SELECTOR_OBJECT_NOT_FOUND));

    assert!(editor.deselect(Some(a)));
    assert!(editor.selected().is_empty());
}

#[test]
fn test_select_by_unknown_uuid() {
    let (mut editor, ..) = populated();
    assert!(!editor.select_by_uuid(NodeId::new()));
    assert!(editor.selected().is_empty());
    assert!(editor.state.diagnostics.contains_key(SELECT_BY_ID_NOT_FOUND));
}

#[test]
fn test_selection_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("editor.toml");
    let storage = Storage::new(dir.path());

    let mut editor = Editor::new(Config::open(&config_path).unwrap());
    let id = editor.add_object(Node::new("keep"), None, None).unwrap();
    editor.select(&[id]);
    editor.save(&storage).unwrap();
    drop(editor);

    let mut reopened = Editor::new(Config::open(&config_path).unwrap());
    assert!(reopened.load(&storage).unwrap());
    assert_eq!(reopened.selected(), &[id]);
    assert!(reopened.self_check());
}

// ============================================================================
// Command round trips
// ============================================================================

/// One command of every kind, built against a `populated` scene.
fn every_command(editor: &Editor, parent: NodeId, a: NodeId, b: NodeId) -> Vec<Box<dyn Command>> {
    let mut multi = MultiCommandsCommand::new(Vec::new());
    multi.push(Box::new(SetPositionCommand::new(a, [1.0, 0.0, 0.0])));
    multi.push(Box::new(RemoveObjectCommand::new(b)));

    let mut commands: Vec<Box<dyn Command>> = Vec::new();
    commands.push(Box::new(AddObjectCommand::new(Node::new("added"))));
    commands.push(Box::new(AddObjectCommand::new(Node::new("nested")).with_parent(parent, Some(0))));
    commands.push(Box::new(RemoveObjectCommand::for_node(&editor.state, a)));
    commands.push(Box::new(RemoveObjectCommand::new(parent)));
    commands.push(Box::new(SetPositionCommand::new(b, [1.5, -2.0, 0.25])));
    commands.push(Box::new(SetRotationCommand::new(b, [0.0, 1.0, 0.0])));
    commands.push(Box::new(SetScaleCommand::new(a, [3.0, 3.0, 3.0])));
    commands.push(Box::new(SetValueCommand::new(a, "name", "renamed")));
    commands.push(Box::new(SetValueCommand::new(b, "visible", false)));
    commands.push(Box::new(multi));
    commands
}

#[test]
fn test_each_command_undoes_exactly() {
    init_logging();
    let count = {
        let (editor, parent, a, b) = populated();
        every_command(&editor, parent, a, b).len()
    };

    for index in 0..count {
        let (editor, parent, a, b) = populated();
        let command = every_command(&editor, parent, a, b).swap_remove(index);
        assert_round_trip(editor, command);
    }
}

#[test]
fn test_tileset_undo_leaves_tileset() {
    let manager = LoaderManager::with_builtin();
    let mut editor = Editor::default();
    manager
        .load_tileset(&mut editor, "https://tiles.example.com/city/")
        .unwrap();
    assert_eq!(editor.state.scene.node_count(), 2);

    assert!(editor.undo().is_some());
    assert_eq!(editor.state.scene.node_count(), 2);
    assert!(editor.redo().is_some());
    assert_eq!(editor.state.scene.node_count(), 2);
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_loader_miss_touches_nothing() {
    let manager = LoaderManager::with_builtin();
    let mut editor = Editor::default();

    let result = manager.load_file(&mut editor, "model.FBX", b"binary");
    assert!(matches!(result, Err(LoadError::ExtensionNotFound(ext)) if ext == "fbx"));
    assert_eq!(editor.state.scene.node_count(), 1);
    assert!(!editor.history.can_undo());
    assert!(editor.state.diagnostics.contains_key(LOADER_NOT_FOUND));
}

#[test]
fn test_load_json_model_is_undoable() {
    let manager = LoaderManager::with_builtin();
    let mut editor = Editor::default();
    let model = NodeTree::new(Node::new("robot")).with_child(NodeTree::new(Node::new("arm")));
    let bytes = serde_json::to_vec(&model).unwrap();

    let id = manager.load_file(&mut editor, "robot.json", &bytes).unwrap();
    assert_eq!(id, Some(1));
    assert_eq!(editor.state.scene.node_count(), 3);
    assert_eq!(editor.state.scene.subtree(model.uuid()), Some(model));

    editor.undo();
    assert_eq!(editor.state.scene.node_count(), 1);
}

// ============================================================================
// Session
// ============================================================================

#[test]
fn test_set_scene_notifies_once() {
    let (mut editor, ..) = populated();
    let count = Arc::new(Mutex::new(0u32));
    let count_clone = count.clone();
    editor.state.signals.scene_graph_changed.subscribe(move |_| *count_clone.lock() += 1);

    let tree = NodeTree::new(Node::new("Scene"))
        .with_child(NodeTree::new(Node::new("x")))
        .with_child(NodeTree::new(Node::new("y")))
        .with_child(NodeTree::new(Node::new("z")));
    editor.set_scene(tree).unwrap();

    assert_eq!(*count.lock(), 1);
    assert_eq!(editor.state.scene.node_count(), 4);
}

#[test]
fn test_save_and_load_session() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path()).with_debug(true);

    let (mut editor, parent, a, _) = populated();
    editor.state.config.set_key(Config::HISTORY, true);
    editor
        .execute(Box::new(SetPositionCommand::new(a, [0.0, 9.0, 0.0])), None)
        .unwrap();
    editor.set_camera(Camera::default().with_position([3.0, 3.0, 3.0]));
    editor.save(&storage).unwrap();

    let mut other = Editor::default();
    other.state.config.set_key(Config::HISTORY, true);
    assert!(other.load(&storage).unwrap());

    assert_eq!(other.state.scene.to_tree(), editor.state.scene.to_tree());
    assert_eq!(other.state.camera.position, [3.0, 3.0, 3.0]);
    assert_eq!(other.state.scene.parent(a), Some(parent));
    assert_eq!(other.history.undo_count(), 1);

    other.undo();
    assert_eq!(other.object_by_uuid(a).map(|n| n.transform.position), Some([0.0; 3]));
}

#[test]
fn test_load_empty_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut editor = Editor::default();
    assert!(!editor.load(&Storage::new(dir.path())).unwrap());
}

#[test]
fn test_focus_is_notification_only() {
    let (mut editor, _, a, _) = populated();
    let focused = Arc::new(Mutex::new(Vec::new()));
    let focused_clone = focused.clone();
    editor.state.signals.object_focused.subscribe(move |node| focused_clone.lock().push(node.uuid));
    let before = editor.state.scene.to_tree();

    assert!(editor.focus(a));
    assert!(!editor.focus(NodeId::new()));
    assert_eq!(*focused.lock(), vec![a]);
    assert_eq!(editor.state.scene.to_tree(), before);
}

#[test]
fn test_render_loop_follows_edits() {
    let mut editor = Editor::default();
    let mut render_loop = RenderLoop::new(NullRenderer::default());
    render_loop.attach(&mut editor.state.signals);
    assert!(render_loop.frame(&editor.state));

    let tree = NodeTree::new(Node::new("box"));
    let id = tree.uuid();
    editor.execute(Box::new(AddObjectCommand::new(tree)), None).unwrap();
    assert!(render_loop.frame(&editor.state));

    render_loop.renderer_mut().set_freeze(true);
    editor
        .execute(Box::new(SetPositionCommand::new(id, [1.0, 0.0, 0.0])), None)
        .unwrap();
    assert!(!render_loop.frame(&editor.state));
    assert_eq!(editor.object_by_uuid(id).map(|n| n.transform.position), Some([1.0, 0.0, 0.0]));
}

#[test]
fn test_failed_load_keeps_session() {
    let (mut editor, _, a, _) = populated();
    editor
        .execute(Box::new(SetPositionCommand::new(a, [1.0, 0.0, 0.0])), None)
        .unwrap();
    editor.select(&[a]);
    let before = editor.state.scene.to_tree();

    let twin = Node::new("twin");
    let mut snapshot = editor.to_json();
    snapshot.scene = NodeTree::new(Node::new("Scene"))
        .with_child(NodeTree::new(twin.clone()))
        .with_child(NodeTree::new(twin));
    snapshot.camera = Camera::default().with_position([9.0, 9.0, 9.0]);

    assert!(editor.from_json(&snapshot).is_err());
    assert_eq!(editor.state.scene.to_tree(), before);
    assert_ne!(editor.state.camera.position, [9.0, 9.0, 9.0]);
    assert_eq!(editor.history.undo_count(), 1);
    assert_eq!(editor.selected(), &[a]);
    assert!(editor.self_check());

    editor.undo();
    assert_eq!(editor.object_by_uuid(a).map(|n| n.transform.position), Some([0.0; 3]));
}
