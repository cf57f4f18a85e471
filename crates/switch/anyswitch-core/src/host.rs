//! Boundary to the host graph editor.

use crate::types::{LinkId, NodeHandle, SlotId, TypeLabel};

/// Capabilities the host editor exposes to the engine. Every lookup returns
/// `Option`: a missing link or node is a recoverable structural failure the
/// callers degrade from (type inference reports the wildcard), never an error
/// surfaced to the user.
pub trait HostGraph {
    /// The link terminating at `slot` on `node`, if one is connected.
    fn link_at(&self, node: NodeHandle, slot: SlotId) -> Option<LinkId>;

    /// Source endpoint of `link`: the producing node and its output index.
    fn link_source(&self, link: LinkId) -> Option<(NodeHandle, usize)>;

    /// Declared type of an output port.
    fn output_type(&self, node: NodeHandle, output: usize) -> Option<TypeLabel>;

    /// Links terminating at any of `node`'s input slots, in slot order.
    fn input_links(&self, node: NodeHandle) -> Vec<LinkId>;

    /// Update the recorded target-slot index of `link` after a reorder.
    fn set_link_target(&mut self, link: LinkId, slot_index: usize);
}
