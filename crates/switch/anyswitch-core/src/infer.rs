//! Backward type inference over the host connection graph.
//!
//! Starting from one of our slots, follow its link upstream. A concretely
//! typed producer ends the walk; a wildcard producer (a pass-through, or
//! another switch) is walked through via its own inputs. The result is
//! advisory display information only and must never gate resolution or
//! execution.

use hashbrown::HashSet;

use crate::host::HostGraph;
use crate::types::{LinkId, NodeHandle, SlotId, TypeLabel};

/// Depth bound on the backward walk, counted in links traversed. The
/// per-call visited set already breaks cycles; the depth cap is a second,
/// independent bound.
pub const MAX_INFER_DEPTH: usize = 10;

/// Infer the nearest concrete type reachable backward from `slot` on `node`.
/// Returns [`TypeLabel::Wildcard`] when the slot is disconnected, a structural
/// lookup fails, or the whole reachable chain is wildcards.
pub fn infer_type(graph: &impl HostGraph, node: NodeHandle, slot: SlotId) -> TypeLabel {
    infer_type_bounded(graph, node, slot, MAX_INFER_DEPTH)
}

pub fn infer_type_bounded(
    graph: &impl HostGraph,
    node: NodeHandle,
    slot: SlotId,
    max_depth: usize,
) -> TypeLabel {
    let Some(link) = graph.link_at(node, slot) else {
        return TypeLabel::Wildcard;
    };
    let mut visited = HashSet::new();
    follow(graph, link, max_depth, &mut visited)
}

fn follow(
    graph: &impl HostGraph,
    link: LinkId,
    depth: usize,
    visited: &mut HashSet<LinkId>,
) -> TypeLabel {
    if depth == 0 || !visited.insert(link) {
        return TypeLabel::Wildcard;
    }
    let Some((source, output)) = graph.link_source(link) else {
        return TypeLabel::Wildcard;
    };
    match graph.output_type(source, output) {
        Some(label) if !label.is_wildcard() => return label,
        Some(_) => {}
        None => return TypeLabel::Wildcard,
    }
    // The producer is itself a wildcard: keep walking through its inputs
    // until one of them reaches something concrete.
    for upstream in graph.input_links(source) {
        let label = follow(graph, upstream, depth - 1, visited);
        if !label.is_wildcard() {
            return label;
        }
    }
    TypeLabel::Wildcard
}
