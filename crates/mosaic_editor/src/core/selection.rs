//! Selection tracking with multi-select support.
//!
//! Selection modes map to the usual modifiers:
//! - Click: Replace selection
//! - Shift+Click: Add to selection
//! - Ctrl+Click: Remove from selection
//! - Ctrl+Shift+Click: Toggle selection
//!
//! Every change is announced on the editor signals and persisted to the
//! `selected` config key.

use mosaic_scene::{NodeId, SceneGraph};

use super::{Config, Diagnostics, EditorSignals};

/// Diagnostics key for deselecting a node that is not selected.
pub const SELECTOR_OBJECT_NOT_FOUND: &str = "selector-object-not-found";

/// Selection mode based on modifier keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Replace current selection (normal click)
    #[default]
    Replace,
    /// Add to current selection (Shift+click)
    Add,
    /// Remove from current selection (Ctrl+click)
    Remove,
    /// Toggle selection state (Ctrl+Shift+click)
    Toggle,
}

impl SelectionMode {
    /// Determine selection mode from modifier keys.
    pub fn from_modifiers(shift: bool, ctrl: bool) -> Self {
        match (shift, ctrl) {
            (true, true) => Self::Toggle,
            (true, false) => Self::Add,
            (false, true) => Self::Remove,
            (false, false) => Self::Replace,
        }
    }
}

/// Ordered set of selected nodes.
#[derive(Clone, Debug, Default)]
pub struct Selector {
    /// Currently selected nodes (in selection order)
    selected: Vec<NodeId>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary (last selected) node.
    pub fn primary(&self) -> Option<NodeId> {
        self.selected.last().copied()
    }

    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    /// Add nodes to the selection.
    ///
    /// Nodes that are already selected, and repeats within the batch, are
    /// dropped first. One new node fires `object_selected`, several fire
    /// `objects_selected`, none fires nothing. Returns the number added.
    pub fn select(&mut self, ids: &[NodeId], signals: &EditorSignals, config: &mut Config) -> usize {
        let mut fresh: Vec<NodeId> = Vec::with_capacity(ids.len());
        for &id in ids {
            if !self.selected.contains(&id) && !fresh.contains(&id) {
                fresh.push(id);
            }
        }

        match fresh.as_slice() {
            [] => return 0,
            [single] => {
                self.selected.push(*single);
                self.persist(config);
                signals.object_selected.dispatch(single);
            }
            many => {
                self.selected.extend_from_slice(many);
                self.persist(config);
                signals.objects_selected.dispatch(&fresh);
            }
        }
        fresh.len()
    }

    /// Deselect one node, or everything when `id` is `None`.
    ///
    /// Deselecting a node that is not selected is reported to diagnostics
    /// and leaves the selection untouched. Returns whether anything changed.
    pub fn deselect(
        &mut self,
        id: Option<NodeId>,
        signals: &EditorSignals,
        config: &mut Config,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        match id {
            None => {
                self.selected.clear();
                self.persist(config);
                signals.objects_deselected.notify();
                true
            }
            Some(id) => match self.selected.iter().position(|&s| s == id) {
                Some(index) => {
                    self.selected.remove(index);
                    self.persist(config);
                    signals.object_deselected.dispatch(&id);
                    true
                }
                None => {
                    diagnostics.error(
                        SELECTOR_OBJECT_NOT_FOUND,
                        format!("cannot deselect {}: not selected", id),
                    );
                    false
                }
            },
        }
    }

    /// Select a node with the given mode.
    pub fn select_with_mode(
        &mut self,
        id: NodeId,
        mode: SelectionMode,
        signals: &EditorSignals,
        config: &mut Config,
        diagnostics: &mut Diagnostics,
    ) {
        match mode {
            SelectionMode::Replace => {
                if self.selected == [id] {
                    return;
                }
                if !self.selected.is_empty() {
                    self.deselect(None, signals, config, diagnostics);
                }
                self.select(&[id], signals, config);
            }
            SelectionMode::Add => {
                self.select(&[id], signals, config);
            }
            SelectionMode::Remove => {
                if self.is_selected(id) {
                    self.deselect(Some(id), signals, config, diagnostics);
                }
            }
            SelectionMode::Toggle => {
                if self.is_selected(id) {
                    self.deselect(Some(id), signals, config, diagnostics);
                } else {
                    self.select(&[id], signals, config);
                }
            }
        }
    }

    /// Drop nodes that left the scene. No signals fire.
    pub fn prune(&mut self, ids: &[NodeId], config: &mut Config) {
        let before = self.selected.len();
        self.selected.retain(|id| !ids.contains(id));
        if self.selected.len() != before {
            self.persist(config);
        }
    }

    /// Re-select persisted nodes that still exist in the scene.
    pub fn restore_from(&mut self, scene: &SceneGraph, signals: &EditorSignals, config: &mut Config) -> usize {
        let stored: Vec<NodeId> = config
            .selected()
            .into_iter()
            .filter(|&id| scene.contains(id))
            .collect();
        self.select(&stored, signals, config)
    }

    fn persist(&self, config: &mut Config) {
        config.set_selected(&self.selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Fixture {
        selector: Selector,
        signals: EditorSignals,
        config: Config,
        diagnostics: Diagnostics,
    }

    fn fixture() -> Fixture {
        Fixture {
            selector: Selector::new(),
            signals: EditorSignals::new(),
            config: Config::in_memory(),
            diagnostics: Diagnostics::new(),
        }
    }

    #[test]
    fn test_select_filters_already_selected() {
        let mut f = fixture();
        let single = Arc::new(AtomicU32::new(0));
        let batch = Arc::new(AtomicU32::new(0));
        let single_clone = single.clone();
        let batch_clone = batch.clone();
        f.signals.object_selected.subscribe(move |_| {
            single_clone.fetch_add(1, Ordering::SeqCst);
        });
        f.signals.objects_selected.subscribe(move |ids: &Vec<NodeId>| {
            batch_clone.fetch_add(ids.len() as u32, Ordering::SeqCst);
        });

        let (a, b) = (NodeId::new(), NodeId::new());
        assert_eq!(f.selector.select(&[a], &f.signals, &mut f.config), 1);
        assert_eq!(f.selector.select(&[a, b, b], &f.signals, &mut f.config), 1);
        assert_eq!(f.selector.select(&[a, b], &f.signals, &mut f.config), 0);

        assert_eq!(f.selector.selected(), &[a, b]);
        assert_eq!(single.load(Ordering::SeqCst), 2);
        assert_eq!(batch.load(Ordering::SeqCst), 0);
        assert_eq!(f.config.selected(), vec![a, b]);
    }

    #[test]
    fn test_deselect_absent_is_reported() {
        let mut f = fixture();
        let a = NodeId::new();
        f.selector.select(&[a], &f.signals, &mut f.config);

        let changed = f.selector.deselect(Some(NodeId::new()), &f.signals, &mut f.config, &mut f.diagnostics);
        assert!(!changed);
        assert_eq!(f.selector.selected(), &[a]);
        assert!(f.diagnostics.contains_key(SELECTOR_OBJECT_NOT_FOUND));
    }

    #[test]
    fn test_selection_modes() {
        let mut f = fixture();
        let (a, b) = (NodeId::new(), NodeId::new());

        f.selector.select_with_mode(a, SelectionMode::Replace, &f.signals, &mut f.config, &mut f.diagnostics);
        f.selector.select_with_mode(b, SelectionMode::Replace, &f.signals, &mut f.config, &mut f.diagnostics);
        assert_eq!(f.selector.selected(), &[b]);

        f.selector.select_with_mode(a, SelectionMode::Add, &f.signals, &mut f.config, &mut f.diagnostics);
        assert_eq!(f.selector.count(), 2);
        assert_eq!(f.selector.primary(), Some(a));

        f.selector.select_with_mode(a, SelectionMode::Toggle, &f.signals, &mut f.config, &mut f.diagnostics);
        f.selector.select_with_mode(a, SelectionMode::Remove, &f.signals, &mut f.config, &mut f.diagnostics);
        assert_eq!(f.selector.selected(), &[b]);
        assert!(f.diagnostics.is_empty());
    }

    #[test]
    fn test_modifiers() {
        assert_eq!(SelectionMode::from_modifiers(true, true), SelectionMode::Toggle);
        assert_eq!(SelectionMode::from_modifiers(false, false), SelectionMode::Replace);
    }
}
