//! Per-node state ownership and the runtime that drives stabilize passes.
//!
//! A [`SwitchNode`] owns its slot store, label cache and selection controls.
//! The [`SwitchRuntime`] maps host node handles to nodes, funnels host change
//! notifications into the debounce scheduler, and runs the consolidated
//! stabilize pipeline when a deadline fires. All mutation happens on one
//! control thread; the only suspension point is the scheduler's deadline.

use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::host::HostGraph;
use crate::infer::infer_type;
use crate::lifecycle::stabilize_slots;
use crate::reorder::move_slot;
use crate::resolve::{full_slot_range, resolve, ConnectivitySnapshot};
use crate::schedule::StabilizationScheduler;
use crate::store::{LabelCache, LabelEvent, SlotStore};
use crate::types::{
    DropdownValue, NodeHandle, SelectMode, SelectionState, SlotId, SwitchError, TypeLabel,
    NONE_CONNECTED, OVERRIDE_MAX, OVERRIDE_MIN,
};

/// State the host persists with the node and hands back on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub selection: SelectionState,
    #[serde(default)]
    pub labels: Vec<(SlotId, String)>,
}

/// One switch node: slot storage, remembered labels, selection controls, and
/// the widget-facing state the stabilize pipeline rebuilds.
#[derive(Debug)]
pub struct SwitchNode {
    handle: NodeHandle,
    store: SlotStore,
    cache: LabelCache,
    selection: SelectionState,
    options: Vec<String>,
    inferred: TypeLabel,
}

impl SwitchNode {
    pub fn new(handle: NodeHandle) -> Self {
        SwitchNode {
            handle,
            store: SlotStore::new(),
            cache: LabelCache::new(),
            selection: SelectionState::default(),
            options: vec![NONE_CONNECTED.to_string()],
            inferred: TypeLabel::Wildcard,
        }
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SlotStore {
        &mut self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Current dropdown option list (display labels, or the "(none connected)"
    /// sentinel when nothing is connected).
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Advertised output type. Advisory display information only.
    pub fn inferred_type(&self) -> &TypeLabel {
        &self.inferred
    }

    pub fn set_mode(&mut self, mode: SelectMode) {
        self.selection.mode = mode;
    }

    /// Set the numeric override, clamped to the declared control range.
    pub fn set_override(&mut self, value: i32) {
        self.selection.override_index = value.clamp(OVERRIDE_MIN, OVERRIDE_MAX);
    }

    pub fn set_dropdown(&mut self, value: DropdownValue) {
        self.selection.dropdown = value;
    }

    pub fn take_label_events(&mut self) -> Vec<LabelEvent> {
        self.store.take_label_events()
    }

    /// Run the consolidated stabilize pipeline, in fixed phase order:
    /// slot lifecycle → label-watch refresh → dropdown rebuild → type
    /// inference. Runs to completion synchronously once started.
    pub fn stabilize(&mut self, graph: &impl HostGraph) {
        stabilize_slots(&mut self.store, &mut self.cache);
        self.store.refresh_watches();
        self.rebuild_options();
        self.inferred = self.infer_output_type(graph);
        debug!(
            "[{}] stabilized: {} slots, {} options, output type {}",
            self.handle,
            self.store.len(),
            self.options.len(),
            self.inferred.token()
        );
    }

    /// Relocate a slot. The owning runtime wraps this with scheduler
    /// cancellation and a re-triggered stabilize.
    pub fn reorder_slot(
        &mut self,
        graph: &mut impl HostGraph,
        from: usize,
        to: usize,
    ) -> Result<(), SwitchError> {
        move_slot(&mut self.store, &mut self.cache, graph, from, to)
    }

    /// Resolve which slot's value to forward for one execution request.
    /// Translates the dropdown's display label into a slot identity at this
    /// boundary; the resolver only ever sees identities.
    pub fn resolve_selection<'a, V>(
        &self,
        connected: &'a ConnectivitySnapshot<V>,
    ) -> (Option<&'a V>, usize) {
        let state = self.execution_state();
        let mut requested = Vec::new();
        if state.override_index > 0 {
            requested.push(SlotId::new(state.override_index as u32));
        }
        if let DropdownValue::Choice(token) = &state.dropdown {
            if let Ok(id) = token.parse() {
                requested.push(id);
            }
        }
        if let Some(id) = self.store.highest_id() {
            requested.push(id);
        }
        let range = full_slot_range(connected, requested);
        resolve(connected, &range, &state)
    }

    pub fn save(&self) -> PersistedState {
        PersistedState {
            selection: self.selection.clone(),
            labels: self
                .store
                .slots()
                .iter()
                .filter_map(|slot| slot.label.clone().map(|label| (slot.id, label)))
                .collect(),
        }
    }

    pub fn load(&mut self, state: PersistedState) {
        self.selection = state.selection;
        self.selection.override_index = self
            .selection
            .override_index
            .clamp(OVERRIDE_MIN, OVERRIDE_MAX);
        for (id, label) in state.labels {
            if self.store.get(id).is_some() {
                self.store.set_label(id, label);
            } else {
                // Slot not materialized yet; growth restores it from the cache.
                self.cache.store(id, label);
            }
        }
    }

    /// Rebuild the dropdown's option list from current connectivity. A stored
    /// choice that no longer names a connected slot resets to no-preference;
    /// with nothing connected the options collapse to the sentinel.
    fn rebuild_options(&mut self) {
        self.options = self
            .store
            .connected_slots()
            .map(|slot| slot.display_label())
            .collect();
        if self.options.is_empty() {
            self.options.push(NONE_CONNECTED.to_string());
            if matches!(self.selection.dropdown, DropdownValue::Choice(_)) {
                self.selection.dropdown = DropdownValue::NoneConnected;
            }
            return;
        }
        match &self.selection.dropdown {
            DropdownValue::Choice(label) if !self.options.contains(label) => {
                debug!("[{}] dropdown choice {label:?} gone, resetting", self.handle);
                self.selection.dropdown = DropdownValue::NoPreference;
            }
            DropdownValue::NoneConnected => {
                self.selection.dropdown = DropdownValue::NoPreference;
            }
            _ => {}
        }
    }

    /// Edit-time view of connectivity, for inferring the advertised type from
    /// the slot the current controls would select.
    fn edit_time_snapshot(&self) -> ConnectivitySnapshot<()> {
        self.store.connected_slots().map(|slot| (slot.id, ())).collect()
    }

    fn infer_output_type(&self, graph: &impl HostGraph) -> TypeLabel {
        let snapshot = self.edit_time_snapshot();
        let (_, index) = self.resolve_selection(&snapshot);
        if index == 0 {
            return TypeLabel::Wildcard;
        }
        infer_type(graph, self.handle, SlotId::new(index as u32))
    }

    fn execution_state(&self) -> SelectionState {
        let mut state = self.selection.clone();
        if let DropdownValue::Choice(label) = &state.dropdown {
            if let Some(slot) = self
                .store
                .slots()
                .iter()
                .find(|slot| slot.display_label() == *label)
            {
                state.dropdown = DropdownValue::Choice(slot.id.to_string());
            }
            // An unknown label stays as-is; it cannot parse as an identity and
            // resolves as a plain miss.
        }
        state
    }
}

/// Owns every live switch node and the shared debounce scheduler.
#[derive(Debug, Default)]
pub struct SwitchRuntime {
    nodes: HashMap<NodeHandle, SwitchNode>,
    scheduler: StabilizationScheduler,
}

impl SwitchRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, handle: NodeHandle) -> &mut SwitchNode {
        self.nodes
            .entry(handle)
            .or_insert_with(|| SwitchNode::new(handle))
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SwitchNode> {
        self.nodes.get(&handle)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut SwitchNode> {
        self.nodes.get_mut(&handle)
    }

    /// Drop a node and any pending timer for it. No timer fires after the
    /// owning node is destroyed.
    pub fn destroy_node(&mut self, handle: NodeHandle) -> bool {
        self.scheduler.cancel(handle);
        self.nodes.remove(&handle).is_some()
    }

    /// Host callback: a connection on `handle` changed.
    pub fn notify_connection_changed(&mut self, handle: NodeHandle, now: u64) {
        if self.nodes.contains_key(&handle) {
            self.scheduler.schedule(handle, now);
        }
    }

    /// Host callback: a slot label on `handle` changed.
    pub fn notify_label_changed(&mut self, handle: NodeHandle, now: u64) {
        if self.nodes.contains_key(&handle) {
            self.scheduler.schedule(handle, now);
        }
    }

    /// Write a slot label and arm the debounce if it actually changed.
    pub fn write_label(
        &mut self,
        handle: NodeHandle,
        slot: SlotId,
        label: impl Into<String>,
        now: u64,
    ) -> Result<bool, SwitchError> {
        let node = self
            .nodes
            .get_mut(&handle)
            .ok_or(SwitchError::UnknownNode(handle))?;
        let changed = node.store_mut().set_label(slot, label);
        if !node.take_label_events().is_empty() {
            self.scheduler.schedule(handle, now);
        }
        Ok(changed)
    }

    pub fn is_pending(&self, handle: NodeHandle) -> bool {
        self.scheduler.is_pending(handle)
    }

    /// Pump the cooperative clock: drain label events written directly to
    /// stores into debounce triggers, then run the stabilize pipeline for
    /// every node whose quiet period has elapsed. Returns how many fired.
    pub fn tick(&mut self, now: u64, graph: &impl HostGraph) -> usize {
        let mut dirty = Vec::new();
        for (handle, node) in self.nodes.iter_mut() {
            if !node.take_label_events().is_empty() {
                dirty.push(*handle);
            }
        }
        for handle in dirty {
            self.scheduler.schedule(handle, now);
        }

        let mut fired = 0;
        for handle in self.scheduler.due(now) {
            if let Some(node) = self.nodes.get_mut(&handle) {
                node.stabilize(graph);
                fired += 1;
            }
        }
        fired
    }

    /// Relocate a slot on `handle`. Cancels any pending stabilize first so it
    /// cannot observe a half-moved store, and re-triggers one after the move
    /// since renumbering can change which slot is the trailing buffer.
    ///
    /// Positions are validated before the cancellation; a rejected reorder
    /// leaves any already pending pass armed.
    pub fn reorder(
        &mut self,
        handle: NodeHandle,
        graph: &mut impl HostGraph,
        from: usize,
        to: usize,
        now: u64,
    ) -> Result<(), SwitchError> {
        let node = self
            .nodes
            .get_mut(&handle)
            .ok_or(SwitchError::UnknownNode(handle))?;
        let len = node.store().len();
        for position in [from, to] {
            if position >= len {
                return Err(SwitchError::PositionOutOfRange { position, len });
            }
        }
        self.scheduler.cancel(handle);
        node.reorder_slot(graph, from, to)?;
        self.scheduler.schedule(handle, now);
        Ok(())
    }
}
