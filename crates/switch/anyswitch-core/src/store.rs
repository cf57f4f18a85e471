//! Slot storage and the label cache.
//!
//! `SlotStore` owns the ordered slot sequence for one node and raises explicit
//! [`LabelEvent`]s on watched label writes; the runtime drains those events
//! into debounce triggers. `LabelCache` outlives individual slots so a label
//! survives the shrink/grow cycle of the trailing buffer.

use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::types::{LinkId, SlotId, NONE_CONNECTED, NO_PREFERENCE};

/// One addressable input connection point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: SlotId,
    /// External link terminating here, if any.
    pub link: Option<LinkId>,
    /// User-assigned display label; the identity is shown when absent.
    pub label: Option<String>,
}

impl Slot {
    pub fn new(id: SlotId) -> Self {
        Slot {
            id,
            link: None,
            label: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// Raised when a watched slot's label is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEvent {
    pub slot: SlotId,
    pub label: String,
}

/// Ordered slot sequence owned exclusively by one node.
#[derive(Debug, Default)]
pub struct SlotStore {
    slots: Vec<Slot>,
    watched: HashSet<SlotId>,
    label_events: Vec<LabelEvent>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn position_of(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    pub fn last(&self) -> Option<&Slot> {
        self.slots.last()
    }

    pub fn highest_id(&self) -> Option<SlotId> {
        self.slots.last().map(|slot| slot.id)
    }

    pub fn connected_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|slot| slot.connected())
    }

    /// Append a slot with the next sequential identity.
    pub fn append(&mut self, label: Option<String>) -> SlotId {
        let id = SlotId::from_position(self.slots.len());
        let mut slot = Slot::new(id);
        slot.label = label;
        self.slots.push(slot);
        id
    }

    pub fn remove_last(&mut self) -> Option<Slot> {
        let slot = self.slots.pop()?;
        self.watched.remove(&slot.id);
        Some(slot)
    }

    pub fn connect(&mut self, id: SlotId, link: LinkId) -> bool {
        match self.slots.iter_mut().find(|slot| slot.id == id) {
            Some(slot) => {
                slot.link = Some(link);
                true
            }
            None => false,
        }
    }

    pub fn disconnect(&mut self, id: SlotId) -> Option<LinkId> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)?
            .link
            .take()
    }

    /// Write a user label. Labels colliding with a dropdown sentinel are
    /// rejected so sentinels stay distinct from every possible label.
    /// Returns whether the label changed; watched slots additionally queue a
    /// [`LabelEvent`].
    pub fn set_label(&mut self, id: SlotId, label: impl Into<String>) -> bool {
        let label = label.into();
        if label == NO_PREFERENCE || label == NONE_CONNECTED {
            debug!("rejected label {label:?} for {id}: reserved sentinel token");
            return false;
        }
        let Some(position) = self.position_of(id) else {
            return false;
        };
        if self.slots[position].label.as_deref() == Some(label.as_str()) {
            return false;
        }
        self.slots[position].label = Some(label.clone());
        if self.watched.contains(&id) {
            self.label_events.push(LabelEvent { slot: id, label });
        }
        true
    }

    pub fn clear_label(&mut self, id: SlotId) -> Option<String> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)?
            .label
            .take()
    }

    /// Install label watches on every current slot and drop stale ones.
    /// Run once per stabilize pass, after the lifecycle phase.
    pub fn refresh_watches(&mut self) {
        self.watched = self.slots.iter().map(|slot| slot.id).collect();
    }

    pub fn take_label_events(&mut self) -> Vec<LabelEvent> {
        std::mem::take(&mut self.label_events)
    }

    /// Array-splice relocation: remove the slot at `from`, insert it at `to`.
    /// Identities are left stale; callers must follow with [`renumber`].
    ///
    /// [`renumber`]: SlotStore::renumber
    pub fn splice(&mut self, from: usize, to: usize) {
        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);
    }

    /// Re-establish contiguous sequential identities after a splice.
    /// Returns the (old, new) identity pairs that changed; the watch set is
    /// rebuilt to match.
    pub fn renumber(&mut self) -> Vec<(SlotId, SlotId)> {
        let mut renames = Vec::new();
        for (position, slot) in self.slots.iter_mut().enumerate() {
            let id = SlotId::from_position(position);
            if slot.id != id {
                renames.push((slot.id, id));
                slot.id = id;
            }
        }
        if !renames.is_empty() {
            self.watched = self.slots.iter().map(|slot| slot.id).collect();
        }
        renames
    }
}

/// Labels remembered for removed slots, keyed by slot identity.
///
/// Entries are written when a labeled slot is shrunk away and read back (left
/// in place) when the same identity is recreated, so a reconnect restores the
/// user's label. Entries are never expired; identities are reused
/// deterministically by position so staleness is bounded.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    entries: HashMap<SlotId, String>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, id: SlotId, label: String) {
        self.entries.insert(id, label);
    }

    pub fn recall(&self, id: SlotId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Apply identity renames as a simultaneous permutation: all old keys are
    /// taken before any new key is written, so chains like 1→2→3 cannot
    /// clobber each other.
    pub fn rename(&mut self, renames: &[(SlotId, SlotId)]) {
        let moved: Vec<(SlotId, String)> = renames
            .iter()
            .filter_map(|(old, new)| self.entries.remove(old).map(|label| (*new, label)))
            .collect();
        for (id, label) in moved {
            self.entries.insert(id, label);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_events_fire_only_for_watched_slots() {
        let mut store = SlotStore::new();
        store.append(None);
        store.append(None);
        let first = SlotId::new(1);

        assert!(store.set_label(first, "A"));
        assert!(store.take_label_events().is_empty(), "not watched yet");

        store.refresh_watches();
        assert!(store.set_label(first, "B"));
        assert!(!store.set_label(first, "B"), "unchanged label is a no-op");
        let events = store.take_label_events();
        assert_eq!(
            events,
            vec![LabelEvent {
                slot: first,
                label: "B".to_string()
            }]
        );
        assert!(store.take_label_events().is_empty(), "events drain once");
    }

    #[test]
    fn sentinel_labels_are_rejected() {
        let mut store = SlotStore::new();
        store.append(None);
        assert!(!store.set_label(SlotId::new(1), NO_PREFERENCE));
        assert!(!store.set_label(SlotId::new(1), NONE_CONNECTED));
        assert_eq!(store.get(SlotId::new(1)).unwrap().label, None);
    }

    #[test]
    fn cache_rename_is_a_simultaneous_permutation() {
        let mut cache = LabelCache::new();
        cache.store(SlotId::new(1), "A".to_string());
        cache.store(SlotId::new(2), "B".to_string());
        cache.store(SlotId::new(3), "C".to_string());

        // Rotate 1→2, 2→3, 3→1.
        cache.rename(&[
            (SlotId::new(1), SlotId::new(2)),
            (SlotId::new(2), SlotId::new(3)),
            (SlotId::new(3), SlotId::new(1)),
        ]);
        assert_eq!(cache.recall(SlotId::new(2)), Some("A"));
        assert_eq!(cache.recall(SlotId::new(3)), Some("B"));
        assert_eq!(cache.recall(SlotId::new(1)), Some("C"));
    }
}
