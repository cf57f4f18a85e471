//! Slot count stabilization: shrink trailing dead slots, keep one buffer.

use log::debug;

use crate::store::{LabelCache, Slot, SlotStore};
use crate::types::SlotId;

/// Floor on the slot count once the first stabilize pass has run.
pub const MIN_SLOTS: usize = 3;

/// Bring the store back to its steady shape: at least [`MIN_SLOTS`] slots and
/// exactly one unconnected slot at the tail.
///
/// Shrink runs first, scanning backward from the highest position and removing
/// unconnected slots until it hits a connection or the floor; a removed slot's
/// label is spilled into the cache under its identity. Growth then appends a
/// single buffer slot whenever the tail is connected, restoring any cached
/// label for the recreated identity.
pub fn stabilize_slots(store: &mut SlotStore, cache: &mut LabelCache) {
    let before = store.len();

    // Shrink: never remove through a connection, never go below the floor.
    while store.len() > MIN_SLOTS && !store.last().map_or(true, Slot::connected) {
        if let Some(slot) = store.remove_last() {
            if let Some(label) = slot.label {
                debug!("spilling label {label:?} for removed {}", slot.id);
                cache.store(slot.id, label);
            }
        }
    }

    // Host-driven loads may start below the floor.
    while store.len() < MIN_SLOTS {
        grow_one(store, cache);
    }

    // Keep exactly one trailing buffer slot. Growth is one slot per pass; a
    // burst of connections catches up across successive passes.
    if store.last().map_or(true, Slot::connected) {
        grow_one(store, cache);
    }

    if store.len() != before {
        debug!("stabilized slot count {before} -> {}", store.len());
    }
}

fn grow_one(store: &mut SlotStore, cache: &mut LabelCache) {
    let id = SlotId::from_position(store.len());
    let label = cache.recall(id).map(str::to_string);
    store.append(label);
}
