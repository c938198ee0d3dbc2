//! Undo/Redo history.
//!
//! Every scene modification goes through [`History::execute`]. Consecutive
//! updatable commands on the same target merge into one entry when they
//! arrive within the configured time window. Entries restored from JSON are
//! stubs until they are undone or redone, at which point the command is
//! rebuilt through the [`CommandRegistry`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{CommandSummary, EditorState};
use crate::commands::{Command, CommandError, CommandJson, CommandRegistry};

/// Diagnostics key for restored entries skipped because their node is gone.
pub const HISTORY_STALE_ENTRY: &str = "history-stale-entry";

/// Serialized undo/redo stacks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryJson {
    #[serde(default)]
    pub undos: Vec<CommandJson>,
    #[serde(default)]
    pub redos: Vec<CommandJson>,
}

/// One undo/redo stack slot.
pub struct HistoryEntry {
    id: u64,
    kind: String,
    name: String,
    /// `None` while the entry only exists as JSON
    command: Option<Box<dyn Command>>,
    /// Loaded from a snapshot rather than executed in this session
    restored: bool,
}

impl HistoryEntry {
    fn live(id: u64, command: Box<dyn Command>) -> Self {
        Self {
            id,
            kind: command.kind().to_string(),
            name: command.name().to_string(),
            command: Some(command),
            restored: false,
        }
    }

    fn stub(json: &CommandJson) -> Self {
        Self {
            id: json.id,
            kind: json.kind.clone(),
            name: json.name.clone(),
            command: None,
            restored: true,
        }
    }

    /// A restored entry whose node no longer exists is stepped over instead
    /// of blocking its stack.
    fn is_stale(&self, error: &CommandError) -> bool {
        self.restored
            && matches!(
                error,
                CommandError::NodeNotFound(_) | CommandError::MissingField(_)
            )
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the command is live rather than a JSON stub.
    pub fn in_memory(&self) -> bool {
        self.command.is_some()
    }

    pub fn summary(&self) -> CommandSummary {
        CommandSummary {
            id: self.id,
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }
}

impl std::fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("in_memory", &self.in_memory())
            .field("restored", &self.restored)
            .finish()
    }
}

/// Undo/redo history stacks.
#[derive(Debug)]
pub struct History {
    /// Applied entries, most recent last
    undos: Vec<HistoryEntry>,
    /// Undone entries, most recent last
    redos: Vec<HistoryEntry>,
    id_counter: u64,
    last_cmd_time: Option<Instant>,
    time_difference_limit: Duration,
    disabled: bool,
    /// Cached serialized commands, keyed by entry id
    json: HashMap<u64, CommandJson>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIME_DIFFERENCE_LIMIT)
    }
}

impl History {
    pub const DEFAULT_TIME_DIFFERENCE_LIMIT: Duration = Duration::from_millis(500);

    pub fn new(time_difference_limit: Duration) -> Self {
        Self {
            undos: Vec::new(),
            redos: Vec::new(),
            id_counter: 0,
            last_cmd_time: None,
            time_difference_limit,
            disabled: false,
            json: HashMap::new(),
        }
    }

    pub fn time_difference_limit(&self) -> Duration {
        self.time_difference_limit
    }

    pub fn set_time_difference_limit(&mut self, limit: Duration) {
        self.time_difference_limit = limit;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Disabled history refuses undo, redo and state jumps.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn can_undo(&self) -> bool {
        !self.disabled && !self.undos.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.disabled && !self.redos.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undos.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redos.len()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undos.last().map(HistoryEntry::name)
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redos.last().map(HistoryEntry::name)
    }

    pub fn undos(&self) -> &[HistoryEntry] {
        &self.undos
    }

    pub fn redos(&self) -> &[HistoryEntry] {
        &self.redos
    }

    /// Timeline for a history panel: applied entries oldest first, then the
    /// undone ones in the order redo would reapply them.
    pub fn entries(&self) -> Vec<CommandSummary> {
        self.undos
            .iter()
            .chain(self.redos.iter().rev())
            .map(HistoryEntry::summary)
            .collect()
    }

    /// Id of the most recently applied entry, 0 when nothing is applied.
    pub fn current_id(&self) -> u64 {
        self.undos.last().map_or(0, HistoryEntry::id)
    }

    pub fn id_counter(&self) -> u64 {
        self.id_counter
    }

    pub fn cached_json(&self, id: u64) -> Option<&CommandJson> {
        self.json.get(&id)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute a command and record it. Returns the id of the entry that
    /// now holds it.
    pub fn execute(
        &mut self,
        command: Box<dyn Command>,
        name: Option<&str>,
        state: &mut EditorState,
    ) -> Result<u64, CommandError> {
        self.execute_at(command, name, state, Instant::now())
    }

    /// [`execute`](Self::execute) with an explicit clock reading.
    pub fn execute_at(
        &mut self,
        mut command: Box<dyn Command>,
        name: Option<&str>,
        state: &mut EditorState,
        now: Instant,
    ) -> Result<u64, CommandError> {
        if let Some(name) = name {
            command.set_name(name.to_string());
        }

        let id = if self.should_merge(command.as_ref(), now) {
            let Some(last) = self.undos.last_mut() else {
                return Err(CommandError::InvalidOperation("no entry to merge into".into()));
            };
            let Some(target) = last.command.as_mut() else {
                return Err(CommandError::InvalidOperation("merge into a stub entry".into()));
            };

            // The entry absorbs the newer value only once it has applied.
            if let Err(e) = command.execute(state) {
                log::error!("Command failed: {}", e);
                return Err(e);
            }
            target.update(command.as_ref());
            if let Some(name) = name {
                target.set_name(name.to_string());
                last.name = name.to_string();
            }
            log::debug!("Merged '{}' into entry {}", command.name(), last.id);
            last.id
        } else {
            if let Err(e) = command.execute(state) {
                log::error!("Command failed: {}", e);
                return Err(e);
            }
            self.id_counter += 1;
            let id = self.id_counter;
            log::debug!("Executed '{}' as entry {}", command.name(), id);
            self.undos.push(HistoryEntry::live(id, command));
            id
        };

        if state.config.history_enabled() {
            self.serialize_entry(id, state);
        }

        self.last_cmd_time = Some(now);
        self.clear_redos();

        let summary = self.undos.last().map(HistoryEntry::summary);
        state.signals.history_changed.dispatch(&summary);
        Ok(id)
    }

    fn should_merge(&self, command: &dyn Command, now: Instant) -> bool {
        let Some(last) = self.undos.last().and_then(|e| e.command.as_deref()) else {
            return false;
        };
        let Some(last_time) = self.last_cmd_time else {
            return false;
        };

        last.updatable()
            && command.updatable()
            && last.merge_key().is_some()
            && last.merge_key() == command.merge_key()
            && now.saturating_duration_since(last_time) < self.time_difference_limit
    }

    /// Undo the most recent entry.
    ///
    /// Returns `None` when there is nothing to undo, history is disabled, or
    /// the command failed (the entry then stays on the undo stack). A
    /// restored entry whose node is gone moves to the redo stack unapplied.
    pub fn undo(&mut self, state: &mut EditorState, registry: &CommandRegistry) -> Option<CommandSummary> {
        if self.disabled {
            return None;
        }
        let mut entry = self.undos.pop()?;
        self.hydrate(&mut entry, state, registry);

        let result = entry.command.as_mut().map_or(Ok(()), |command| command.undo(state));
        if let Err(e) = result {
            if entry.is_stale(&e) {
                log::warn!("Undo of restored entry {} skipped: {}", entry.id, e);
                state.diagnostics.warn(HISTORY_STALE_ENTRY, format!("{}: {}", entry.name, e));
            } else {
                log::error!("Undo failed: {}", e);
                state.diagnostics.error("history-undo-failed", format!("{}: {}", entry.name, e));
                self.undos.push(entry);
                return None;
            }
        }

        log::debug!("Undo: {} ({})", entry.name, entry.id);
        let summary = entry.summary();
        self.redos.push(entry);
        state.signals.history_changed.dispatch(&Some(summary.clone()));
        Some(summary)
    }

    /// Redo the most recently undone entry.
    pub fn redo(&mut self, state: &mut EditorState, registry: &CommandRegistry) -> Option<CommandSummary> {
        if self.disabled {
            return None;
        }
        let mut entry = self.redos.pop()?;
        self.hydrate(&mut entry, state, registry);

        let result = entry.command.as_mut().map_or(Ok(()), |command| command.execute(state));
        if let Err(e) = result {
            if entry.is_stale(&e) {
                log::warn!("Redo of restored entry {} skipped: {}", entry.id, e);
                state.diagnostics.warn(HISTORY_STALE_ENTRY, format!("{}: {}", entry.name, e));
            } else {
                log::error!("Redo failed: {}", e);
                state.diagnostics.error("history-redo-failed", format!("{}: {}", entry.name, e));
                self.redos.push(entry);
                return None;
            }
        }

        log::debug!("Redo: {} ({})", entry.name, entry.id);
        let summary = entry.summary();
        self.undos.push(entry);
        state.signals.history_changed.dispatch(&Some(summary.clone()));
        Some(summary)
    }

    /// Rebuild a stub entry from its cached JSON. Failures are logged and
    /// leave the entry as a stub, which is then moved without being applied.
    fn hydrate(&self, entry: &mut HistoryEntry, state: &mut EditorState, registry: &CommandRegistry) {
        if entry.command.is_some() {
            return;
        }
        let Some(json) = self.json.get(&entry.id) else {
            log::warn!("No serialized form for history entry {}", entry.id);
            return;
        };
        match registry.hydrate(json, state) {
            Ok(command) => entry.command = Some(command),
            Err(e) => {
                log::warn!("Could not rehydrate entry {} ({}): {}", entry.id, entry.kind, e);
                state
                    .diagnostics
                    .warn("history-rehydration-failed", format!("{} ({}): {}", entry.id, entry.kind, e));
            }
        }
    }

    // ========================================================================
    // Replay
    // ========================================================================

    /// Undo or redo until the entry with `id` is the most recent applied one.
    /// `0` rewinds to before the first entry.
    ///
    /// `scene_graph_changed` and `history_changed` fire once at the end.
    pub fn go_to_state(&mut self, id: u64, state: &mut EditorState, registry: &CommandRegistry) {
        if self.disabled {
            return;
        }
        {
            let _graph = state.signals.scene_graph_changed.suppress();
            let _history = state.signals.history_changed.suppress();
            self.replay_to(id, state, registry);
        }

        state.signals.scene_graph_changed.notify();
        let summary = self.undos.last().map(HistoryEntry::summary);
        state.signals.history_changed.dispatch(&summary);
    }

    fn replay_to(&mut self, id: u64, state: &mut EditorState, registry: &CommandRegistry) {
        if id > self.current_id() {
            while self.redos.last().is_some_and(|next| next.id <= id) {
                if self.redo(state, registry).is_none() {
                    break;
                }
            }
        } else {
            while self.undos.last().is_some_and(|top| top.id > id) {
                if self.undo(state, registry).is_none() {
                    break;
                }
            }
        }
    }

    /// Serialize every entry, then return to `id`.
    ///
    /// Commands executed while history persistence was off have no cached
    /// JSON; replaying from the start fills the gaps.
    pub fn enable_serialization(&mut self, id: u64, state: &mut EditorState, registry: &CommandRegistry) {
        if self.disabled {
            return;
        }
        {
            let _graph = state.signals.scene_graph_changed.suppress();
            let _history = state.signals.history_changed.suppress();

            self.replay_to(0, state, registry);
            while !self.redos.is_empty() {
                if self.redo(state, registry).is_none() {
                    break;
                }
                let current = self.current_id();
                if !self.json.contains_key(&current) {
                    self.serialize_entry(current, state);
                }
            }
        }
        self.go_to_state(id, state, registry);
    }

    fn serialize_entry(&mut self, id: u64, state: &EditorState) {
        let Some(command) = self
            .undos
            .iter()
            .chain(self.redos.iter())
            .find(|e| e.id == id)
            .and_then(|e| e.command.as_deref())
        else {
            return;
        };
        match CommandJson::from_command(id, command, state) {
            Ok(json) => {
                self.json.insert(id, json);
            }
            Err(e) => log::warn!("Failed to serialize history entry {}: {}", id, e),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Cached JSON of both stacks. Empty when history persistence is off.
    pub fn to_json(&self, state: &EditorState) -> HistoryJson {
        let mut history = HistoryJson::default();
        if !state.config.history_enabled() {
            return history;
        }

        history.undos = self.undos.iter().filter_map(|e| self.json.get(&e.id).cloned()).collect();
        history.redos = self.redos.iter().filter_map(|e| self.json.get(&e.id).cloned()).collect();
        history
    }

    /// Replace both stacks with stubs built from JSON.
    ///
    /// Entries whose `type` has no registered factory are skipped. The id
    /// counter continues after the highest restored id.
    pub fn from_json(&mut self, json: &HistoryJson, state: &mut EditorState, registry: &CommandRegistry) {
        self.undos.clear();
        self.redos.clear();
        self.json.clear();
        self.id_counter = 0;

        for (items, stack) in [(&json.undos, &mut self.undos), (&json.redos, &mut self.redos)] {
            for item in items {
                if !registry.contains(&item.kind) {
                    state.diagnostics.warn(
                        "history-unknown-command",
                        format!("skipping entry {} of unknown type {}", item.id, item.kind),
                    );
                    continue;
                }
                stack.push(HistoryEntry::stub(item));
                self.json.insert(item.id, item.clone());
                self.id_counter = self.id_counter.max(item.id);
            }
        }

        log::info!(
            "Restored history: {} undos, {} redos",
            self.undos.len(),
            self.redos.len()
        );
        let summary = self.undos.last().map(HistoryEntry::summary);
        state.signals.history_changed.dispatch(&summary);
    }

    /// Drop every entry and reset the id counter.
    pub fn clear(&mut self, state: &EditorState) {
        self.undos.clear();
        self.redos.clear();
        self.json.clear();
        self.id_counter = 0;
        self.last_cmd_time = None;
        log::info!("History cleared");
        state.signals.history_changed.dispatch(&None);
    }

    /// Drop the redo stack.
    pub fn clear_redos(&mut self) {
        for entry in self.redos.drain(..) {
            self.json.remove(&entry.id);
        }
    }
}
