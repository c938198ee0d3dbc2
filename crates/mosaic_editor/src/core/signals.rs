//! The editor's signal channels.

use std::fmt;

use mosaic_scene::{Node, NodeId};
use mosaic_signal::Channel;

use super::Camera;

/// Payload of `history_changed`: the entry that was executed, undone or redone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSummary {
    pub id: u64,
    pub kind: String,
    pub name: String,
}

/// One channel per editor event.
pub struct EditorSignals {
    pub object_added: Channel<Node>,
    pub object_changed: Channel<Node>,
    pub object_removed: Channel<Node>,
    pub object_selected: Channel<NodeId>,
    pub objects_selected: Channel<Vec<NodeId>>,
    pub object_deselected: Channel<NodeId>,
    pub objects_deselected: Channel<()>,
    pub object_focused: Channel<Node>,
    pub scene_graph_changed: Channel<()>,
    pub history_changed: Channel<Option<CommandSummary>>,
    pub camera_resetted: Channel<Camera>,
}

impl Default for EditorSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSignals {
    pub fn new() -> Self {
        Self {
            object_added: Channel::new("objectAdded"),
            object_changed: Channel::new("objectChanged"),
            object_removed: Channel::new("objectRemoved"),
            object_selected: Channel::new("objectSelected"),
            objects_selected: Channel::new("objectsSelected"),
            object_deselected: Channel::new("objectDeselected"),
            objects_deselected: Channel::new("objectsDeselected"),
            object_focused: Channel::new("objectFocused"),
            scene_graph_changed: Channel::new("sceneGraphChanged"),
            history_changed: Channel::new("historyChanged"),
            camera_resetted: Channel::new("cameraResetted"),
        }
    }
}

impl fmt::Debug for EditorSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSignals")
            .field("scene_graph_changed", &self.scene_graph_changed)
            .field("history_changed", &self.history_changed)
            .finish_non_exhaustive()
    }
}
