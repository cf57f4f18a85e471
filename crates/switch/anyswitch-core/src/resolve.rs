//! Request-time selection resolution.
//!
//! The resolver is a pure function of a sparse connectivity snapshot, the
//! reconstructed full slot range, and the node's selection controls. It never
//! touches slot storage, so the execution engine may call it concurrently for
//! different nodes as long as each call reads one consistent snapshot.

use hashbrown::HashMap;
use log::debug;

use crate::types::{DropdownValue, SelectMode, SelectionState, SlotId};

/// Sparse mapping of *connected* slots to their payload values. Disconnected
/// slots are absent, not null; gap-aware scans must therefore walk the full
/// slot range rather than the snapshot keys.
pub type ConnectivitySnapshot<V> = HashMap<SlotId, V>;

/// Rebuild the contiguous identity sequence `slot_01..=slot_NN` where `NN` is
/// the highest ordinal among the snapshot keys and any additionally requested
/// identities (override target, dropdown target, highest known slot).
///
/// The snapshot alone omits disconnected slots; without this reconstruction a
/// sequential scan would treat "next slot" as the next populated map entry
/// instead of the next physical position.
pub fn full_slot_range<V>(
    connected: &ConnectivitySnapshot<V>,
    requested: impl IntoIterator<Item = SlotId>,
) -> Vec<SlotId> {
    let mut highest = connected.keys().map(|id| id.ordinal()).max().unwrap_or(0);
    for id in requested {
        highest = highest.max(id.ordinal());
    }
    (1..=highest).map(SlotId::new).collect()
}

/// Resolve which slot's value to forward.
///
/// The chain is override → dropdown → mode fallback, each step consulted only
/// when the previous one yields nothing. In `sequential` mode the override and
/// dropdown do not select directly; they anchor the scan, which starts just
/// after the anchored position and wraps gap-aware through `full_range` (the
/// anchored position itself is reconsidered last, after a full lap).
///
/// Returns the selected value and its 1-based position in `full_range`, or
/// `(None, 0)` when nothing qualifies. A resolution miss is a defined outcome,
/// not an error.
pub fn resolve<'a, V>(
    connected: &'a ConnectivitySnapshot<V>,
    full_range: &[SlotId],
    state: &SelectionState,
) -> (Option<&'a V>, usize) {
    if connected.is_empty() {
        debug!("nothing connected, resolving to absent");
        return (None, 0);
    }

    let sequential = matches!(state.mode, SelectMode::Sequential);
    // 1-based position the sequential scan starts after.
    let mut anchor: Option<u32> = None;

    // Override: positive indexes the declared position directly; negative
    // counts back through the ascending sorted connected identities.
    if state.override_index != 0 {
        if let Some(target) = override_target(connected, state.override_index) {
            if !sequential {
                if let Some(value) = connected.get(&target) {
                    debug!("override {} selected {target}", state.override_index);
                    return (Some(value), target.ordinal() as usize);
                }
                debug!(
                    "override {} target {target} disconnected, falling through",
                    state.override_index
                );
            }
            anchor = Some(target.ordinal());
        }
    }

    // Dropdown: sentinels skip this step without anchoring anything. In
    // sequential mode an override anchor already in place wins.
    if let DropdownValue::Choice(token) = &state.dropdown {
        if let Ok(target) = token.parse::<SlotId>() {
            if !sequential {
                if let Some(value) = connected.get(&target) {
                    debug!("dropdown selected {target}");
                    return (Some(value), target.ordinal() as usize);
                }
                debug!("dropdown target {target} disconnected, falling through");
            }
            if anchor.is_none() {
                anchor = Some(target.ordinal());
            }
        }
    }

    match state.mode {
        SelectMode::Priority => {
            for id in full_range {
                if let Some(value) = connected.get(id) {
                    debug!("priority fallback selected {id}");
                    return (Some(value), id.ordinal() as usize);
                }
            }
            (None, 0)
        }
        SelectMode::Strict => {
            debug!("strict mode: no fallback, resolving to absent");
            (None, 0)
        }
        SelectMode::Sequential => {
            let len = full_range.len();
            if len == 0 {
                return (None, 0);
            }
            // An anchor at 1-based position p sits at index p-1, so index p
            // is the first position after it.
            let start = anchor.unwrap_or(0) as usize;
            for step in 0..len {
                let id = full_range[(start + step) % len];
                if let Some(value) = connected.get(&id) {
                    debug!("sequential scan selected {id} (anchor {anchor:?})");
                    return (Some(value), id.ordinal() as usize);
                }
            }
            (None, 0)
        }
    }
}

fn override_target<V>(connected: &ConnectivitySnapshot<V>, index: i32) -> Option<SlotId> {
    if index > 0 {
        return Some(SlotId::new(index as u32));
    }
    let mut keys: Vec<SlotId> = connected.keys().copied().collect();
    keys.sort_unstable();
    let back = index.unsigned_abs() as usize;
    if back == 0 || back > keys.len() {
        return None;
    }
    Some(keys[keys.len() - back])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ordinals: &[u32]) -> ConnectivitySnapshot<String> {
        ordinals
            .iter()
            .map(|&n| (SlotId::new(n), format!("value_{n:02}")))
            .collect()
    }

    fn state(mode: SelectMode, override_index: i32, dropdown: DropdownValue) -> SelectionState {
        SelectionState {
            dropdown,
            override_index,
            mode,
        }
    }

    fn range_for(connected: &ConnectivitySnapshot<String>, state: &SelectionState) -> Vec<SlotId> {
        let mut requested = Vec::new();
        if state.override_index > 0 {
            requested.push(SlotId::new(state.override_index as u32));
        }
        if let DropdownValue::Choice(token) = &state.dropdown {
            if let Ok(id) = token.parse() {
                requested.push(id);
            }
        }
        full_slot_range(connected, requested)
    }

    #[test]
    fn empty_snapshot_resolves_to_absent() {
        let connected: ConnectivitySnapshot<String> = ConnectivitySnapshot::default();
        let st = state(SelectMode::Priority, 5, DropdownValue::Choice("slot_01".into()));
        assert_eq!(resolve(&connected, &[], &st), (None, 0));
    }

    #[test]
    fn it_should_prefer_the_override_over_the_dropdown() {
        let connected = snapshot(&[1, 2]);
        let st = state(
            SelectMode::Priority,
            2,
            DropdownValue::Choice("slot_01".into()),
        );
        let range = range_for(&connected, &st);
        let (value, index) = resolve(&connected, &range, &st);
        assert_eq!(value.map(String::as_str), Some("value_02"));
        assert_eq!(index, 2);
    }

    #[test]
    fn disconnected_override_falls_through_to_the_dropdown() {
        let connected = snapshot(&[1, 2]);
        let st = state(
            SelectMode::Priority,
            4,
            DropdownValue::Choice("slot_02".into()),
        );
        let range = range_for(&connected, &st);
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_02".to_string()), 2)
        );
    }

    #[test]
    fn negative_override_counts_from_the_end_of_connected() {
        let connected = snapshot(&[1, 2, 4]);
        let st = state(SelectMode::Priority, -1, DropdownValue::NoPreference);
        let range = range_for(&connected, &st);
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_04".to_string()), 4)
        );

        let st = state(SelectMode::Priority, -3, DropdownValue::NoPreference);
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_01".to_string()), 1)
        );
    }

    #[test]
    fn out_of_range_negative_override_falls_through() {
        let connected = snapshot(&[2, 3]);
        let st = state(SelectMode::Priority, -5, DropdownValue::NoPreference);
        let range = range_for(&connected, &st);
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_02".to_string()), 2)
        );
    }

    #[test]
    fn priority_mode_picks_the_first_connected_slot() {
        let connected = snapshot(&[1, 3]);
        let st = state(SelectMode::Priority, 0, DropdownValue::NoPreference);
        let range = range_for(&connected, &st);
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_01".to_string()), 1)
        );
    }

    #[test]
    fn strict_mode_never_falls_back() {
        let connected = snapshot(&[1, 2, 3]);
        let st = state(SelectMode::Strict, 0, DropdownValue::NoPreference);
        let range = range_for(&connected, &st);
        assert_eq!(resolve(&connected, &range, &st), (None, 0));
    }

    #[test]
    fn sequential_scan_starts_after_the_requested_slot_and_skips_gaps() {
        let connected = snapshot(&[1, 3]);
        let st = state(
            SelectMode::Sequential,
            0,
            DropdownValue::Choice("slot_01".into()),
        );
        let range = range_for(&connected, &st);
        // Anchor at position 1; position 2 is a gap; position 3 is next.
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_03".to_string()), 3)
        );
    }

    #[test]
    fn sequential_scan_wraps_around_the_range() {
        let connected = snapshot(&[1, 3]);
        let st = state(SelectMode::Sequential, 3, DropdownValue::NoPreference);
        let range = range_for(&connected, &st);
        // Anchor at position 3 (the tail): wraps to position 1.
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_01".to_string()), 1)
        );
    }

    #[test]
    fn sequential_reconsiders_the_anchor_after_a_full_lap() {
        let connected = snapshot(&[2]);
        let st = state(SelectMode::Sequential, 2, DropdownValue::NoPreference);
        let range = range_for(&connected, &st);
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_02".to_string()), 2)
        );
    }

    #[test]
    fn sequential_without_a_request_scans_from_the_start() {
        let connected = snapshot(&[2, 4]);
        let st = state(SelectMode::Sequential, 0, DropdownValue::NoPreference);
        let range = range_for(&connected, &st);
        assert_eq!(
            resolve(&connected, &range, &st),
            (Some(&"value_02".to_string()), 2)
        );
    }

    #[test]
    fn full_range_covers_requested_identities_beyond_connected() {
        let connected = snapshot(&[2]);
        let range = full_slot_range(&connected, [SlotId::new(5)]);
        assert_eq!(range.len(), 5);
        assert_eq!(range[0], SlotId::new(1));
        assert_eq!(range[4], SlotId::new(5));
    }
}
