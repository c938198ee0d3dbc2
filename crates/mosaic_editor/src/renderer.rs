//! Viewport rendering hook.
//!
//! The editor core does not draw. A [`Renderer`] is driven by a
//! [`RenderLoop`], which watches the editor signals and renders a frame
//! only when something visible changed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mosaic_scene::SceneGraph;
use mosaic_signal::SubscriberId;

use crate::core::{Camera, EditorSignals, EditorState};

/// Trait for viewport renderers
pub trait Renderer: Send {
    /// Draw the scene from the camera
    fn render(&mut self, scene: &SceneGraph, camera: &Camera);

    /// Resize the output surface
    fn set_size(&mut self, width: u32, height: u32);

    /// Switch to a different camera
    fn set_camera(&mut self, camera: &Camera);

    /// Whether rendering is paused
    fn frozen(&self) -> bool;

    /// Pause or resume rendering
    fn set_freeze(&mut self, freeze: bool);
}

/// Renderer that counts frames and draws nothing.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames: u64,
    pub size: (u32, u32),
    pub camera: Camera,
    frozen: bool,
}

impl Renderer for NullRenderer {
    fn render(&mut self, _scene: &SceneGraph, camera: &Camera) {
        self.camera = *camera;
        self.frames += 1;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn set_camera(&mut self, camera: &Camera) {
        self.camera = *camera;
    }

    fn frozen(&self) -> bool {
        self.frozen
    }

    fn set_freeze(&mut self, freeze: bool) {
        self.frozen = freeze;
    }
}

/// Redraws a renderer on demand.
pub struct RenderLoop<R: Renderer> {
    renderer: R,
    dirty: Arc<AtomicBool>,
    subscriptions: Vec<(&'static str, SubscriberId)>,
}

impl<R: Renderer> RenderLoop<R> {
    /// The first frame always renders.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            dirty: Arc::new(AtomicBool::new(true)),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to the signals that invalidate the viewport.
    pub fn attach(&mut self, signals: &mut EditorSignals) {
        let mark = |dirty: &Arc<AtomicBool>| {
            let dirty = dirty.clone();
            move || dirty.store(true, Ordering::Release)
        };

        let on_graph = mark(&self.dirty);
        let on_changed = mark(&self.dirty);
        let on_added = mark(&self.dirty);
        let on_removed = mark(&self.dirty);
        let on_camera = mark(&self.dirty);

        self.subscriptions = vec![
            ("sceneGraphChanged", signals.scene_graph_changed.subscribe(move |_| on_graph())),
            ("objectChanged", signals.object_changed.subscribe(move |_| on_changed())),
            ("objectAdded", signals.object_added.subscribe(move |_| on_added())),
            ("objectRemoved", signals.object_removed.subscribe(move |_| on_removed())),
            ("cameraResetted", signals.camera_resetted.subscribe(move |_| on_camera())),
        ];
        log::debug!("Render loop attached to {} signals", self.subscriptions.len());
    }

    /// Remove the subscriptions made by [`attach`](Self::attach).
    pub fn detach(&mut self, signals: &mut EditorSignals) {
        for (name, id) in self.subscriptions.drain(..) {
            let removed = match name {
                "sceneGraphChanged" => signals.scene_graph_changed.unsubscribe(id),
                "objectChanged" => signals.object_changed.unsubscribe(id),
                "objectAdded" => signals.object_added.unsubscribe(id),
                "objectRemoved" => signals.object_removed.unsubscribe(id),
                "cameraResetted" => signals.camera_resetted.unsubscribe(id),
                _ => false,
            };
            if !removed {
                log::warn!("Render loop subscription on '{}' was already gone", name);
            }
        }
    }

    pub fn request_redraw(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Render if anything changed since the last frame and the renderer is
    /// not frozen. Returns whether a frame was drawn.
    pub fn frame(&mut self, state: &EditorState) -> bool {
        if self.renderer.frozen() || !self.dirty.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.renderer.render(&state.scene, &state.camera);
        true
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
