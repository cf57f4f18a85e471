//! AnySwitch core: the slot/selection engine behind a variadic multiplexer
//! node embedded in a host node-graph editor.
//!
//! The host wires any number of heterogeneous producers into one node; this
//! crate keeps the node's slot count, labels and dropdown consistent under
//! asynchronous connect/disconnect/reorder/rename events, and resolves which
//! slot's value is forwarded at execution time (override → dropdown → mode
//! fallback). Payload values are routed, never interpreted.

pub mod engine;
pub mod host;
pub mod infer;
pub mod lifecycle;
pub mod reorder;
pub mod resolve;
pub mod schedule;
pub mod store;
pub mod types;

pub use engine::{PersistedState, SwitchNode, SwitchRuntime};
pub use host::HostGraph;
pub use infer::{infer_type, infer_type_bounded, MAX_INFER_DEPTH};
pub use lifecycle::{stabilize_slots, MIN_SLOTS};
pub use reorder::move_slot;
pub use resolve::{full_slot_range, resolve, ConnectivitySnapshot};
pub use schedule::{StabilizationScheduler, QUIET_PERIOD};
pub use store::{LabelCache, LabelEvent, Slot, SlotStore};
pub use types::{
    DropdownValue, LinkId, NodeHandle, SelectMode, SelectionState, SlotId, SwitchError, TypeLabel,
    NONE_CONNECTED, NO_PREFERENCE, OVERRIDE_MAX, OVERRIDE_MIN, WILDCARD_TOKEN,
};
