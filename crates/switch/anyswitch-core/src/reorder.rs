//! Slot relocation with identity, cache and link bookkeeping repair.

use log::debug;

use crate::host::HostGraph;
use crate::store::{LabelCache, SlotStore};
use crate::types::SwitchError;

/// Relocate the slot at position `from` to position `to` (splice semantics:
/// remove then insert, not a pairwise swap), then renumber every identity to
/// match its new position. Renames are mirrored into the label cache and the
/// recorded target-slot index of every connected link is recomputed.
///
/// Callers owning a scheduler must cancel any pending stabilize before this
/// mutation and re-trigger one afterwards; renumbering can change which slot
/// is the trailing buffer.
pub fn move_slot(
    store: &mut SlotStore,
    cache: &mut LabelCache,
    graph: &mut impl HostGraph,
    from: usize,
    to: usize,
) -> Result<(), SwitchError> {
    let len = store.len();
    if from >= len {
        return Err(SwitchError::PositionOutOfRange {
            position: from,
            len,
        });
    }
    if to >= len {
        return Err(SwitchError::PositionOutOfRange { position: to, len });
    }
    if from == to {
        return Ok(());
    }

    store.splice(from, to);
    let renames = store.renumber();
    cache.rename(&renames);
    for (position, slot) in store.slots().iter().enumerate() {
        if let Some(link) = slot.link {
            graph.set_link_target(link, position);
        }
    }
    debug!(
        "moved slot {from} -> {to}, renumbered {} identities",
        renames.len()
    );
    Ok(())
}
