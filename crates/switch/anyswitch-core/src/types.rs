//! Core identities, type labels and selection state for the switch engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Handle the host editor uses to identify a node instance.
pub type NodeHandle = u64;

/// Opaque identity of an external link, valid only while the connection exists.
pub type LinkId = u64;

/// Token the wildcard type serializes as.
pub const WILDCARD_TOKEN: &str = "*";

/// Dropdown sentinel: defer to the mode fallback.
pub const NO_PREFERENCE: &str = "(no preference)";

/// Dropdown sentinel: the node has no connected slots to offer.
pub const NONE_CONNECTED: &str = "(none connected)";

/// Lower bound of the numeric override control.
pub const OVERRIDE_MIN: i32 = -50;

/// Upper bound of the numeric override control.
pub const OVERRIDE_MAX: i32 = 50;

/// Ordinal identity of a slot, rendered as `slot_01`, `slot_02`, ...
///
/// Identities are 1-based and stay contiguous with slot positions: the slot at
/// position `i` carries identity `slot_{i+1}` outside of an in-flight reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SlotId(u32);

impl SlotId {
    pub fn new(ordinal: u32) -> Self {
        assert!(ordinal >= 1, "slot ordinals are 1-based");
        SlotId(ordinal)
    }

    /// Identity of the slot at a 0-based position.
    pub fn from_position(position: usize) -> Self {
        SlotId(position as u32 + 1)
    }

    pub fn ordinal(self) -> u32 {
        self.0
    }

    /// 0-based position implied by this identity.
    pub fn position(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot_{:02}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a slot identity: {0:?}")]
pub struct ParseSlotIdError(pub String);

impl FromStr for SlotId {
    type Err = ParseSlotIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ordinal = s
            .strip_prefix("slot_")
            .and_then(|tail| tail.parse::<u32>().ok())
            .filter(|&n| n >= 1)
            .ok_or_else(|| ParseSlotIdError(s.to_string()))?;
        Ok(SlotId(ordinal))
    }
}

impl From<SlotId> for String {
    fn from(id: SlotId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SlotId {
    type Error = ParseSlotIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Declared type of a port: either a concrete host type label or the
/// universal wildcard that accepts every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TypeLabel {
    Wildcard,
    Concrete(String),
}

impl TypeLabel {
    pub fn concrete(label: impl Into<String>) -> Self {
        let label = label.into();
        if label == WILDCARD_TOKEN {
            TypeLabel::Wildcard
        } else {
            TypeLabel::Concrete(label)
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TypeLabel::Wildcard)
    }

    /// Whether a value of type `other` may flow into a port of this type.
    /// The wildcard is compatible in both directions.
    pub fn accepts(&self, other: &TypeLabel) -> bool {
        self.is_wildcard() || other.is_wildcard() || self == other
    }

    pub fn token(&self) -> &str {
        match self {
            TypeLabel::Wildcard => WILDCARD_TOKEN,
            TypeLabel::Concrete(label) => label,
        }
    }
}

impl Default for TypeLabel {
    fn default() -> Self {
        TypeLabel::Wildcard
    }
}

impl From<String> for TypeLabel {
    fn from(s: String) -> Self {
        TypeLabel::concrete(s)
    }
}

impl From<TypeLabel> for String {
    fn from(label: TypeLabel) -> Self {
        label.token().to_string()
    }
}

/// Fallback policy applied when neither the override nor the dropdown selects
/// a connected slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectMode {
    #[default]
    Priority,
    Strict,
    Sequential,
}

/// Persisted value of the dropdown control. The two sentinels serialize as
/// stable literal tokens distinct from every identity and label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DropdownValue {
    NoPreference,
    NoneConnected,
    Choice(String),
}

impl Default for DropdownValue {
    fn default() -> Self {
        DropdownValue::NoneConnected
    }
}

impl From<String> for DropdownValue {
    fn from(s: String) -> Self {
        match s.as_str() {
            NO_PREFERENCE => DropdownValue::NoPreference,
            NONE_CONNECTED => DropdownValue::NoneConnected,
            _ => DropdownValue::Choice(s),
        }
    }
}

impl From<DropdownValue> for String {
    fn from(value: DropdownValue) -> Self {
        match value {
            DropdownValue::NoPreference => NO_PREFERENCE.to_string(),
            DropdownValue::NoneConnected => NONE_CONNECTED.to_string(),
            DropdownValue::Choice(label) => label,
        }
    }
}

/// Per-node selection controls, serialized with the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    #[serde(default)]
    pub dropdown: DropdownValue,
    #[serde(default)]
    pub override_index: i32,
    #[serde(default)]
    pub mode: SelectMode,
}

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState {
            dropdown: DropdownValue::default(),
            override_index: 0,
            mode: SelectMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchError {
    #[error("slot position {position} out of range for {len} slots")]
    PositionOutOfRange { position: usize, len: usize },
    #[error("unknown node handle {0}")]
    UnknownNode(NodeHandle),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_id_formats_with_two_digits() {
        assert_eq!(SlotId::new(1).to_string(), "slot_01");
        assert_eq!(SlotId::new(12).to_string(), "slot_12");
        assert_eq!(SlotId::new(104).to_string(), "slot_104");
    }

    #[test]
    fn slot_id_parses_its_own_rendering() {
        for ordinal in [1u32, 2, 9, 10, 42] {
            let id = SlotId::new(ordinal);
            assert_eq!(id.to_string().parse::<SlotId>().unwrap(), id);
        }
        assert!("slot_00".parse::<SlotId>().is_err());
        assert!("input_01".parse::<SlotId>().is_err());
        assert!("slot_".parse::<SlotId>().is_err());
    }

    #[test]
    #[should_panic(expected = "1-based")]
    fn slot_id_rejects_ordinal_zero() {
        let _ = SlotId::new(0);
    }

    #[test]
    fn wildcard_accepts_everything() {
        let wild = TypeLabel::Wildcard;
        let image = TypeLabel::concrete("IMAGE");
        let mask = TypeLabel::concrete("MASK");
        assert!(wild.accepts(&image));
        assert!(image.accepts(&wild));
        assert!(image.accepts(&image));
        assert!(!image.accepts(&mask));
        assert_eq!(TypeLabel::concrete(WILDCARD_TOKEN), TypeLabel::Wildcard);
    }

    #[test]
    fn dropdown_sentinels_round_trip_as_tokens() {
        let json = serde_json::to_string(&DropdownValue::NoPreference).unwrap();
        assert_eq!(json, format!("{NO_PREFERENCE:?}"));
        let back: DropdownValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DropdownValue::NoPreference);

        let choice: DropdownValue = serde_json::from_str("\"Background\"").unwrap();
        assert_eq!(choice, DropdownValue::Choice("Background".to_string()));
    }
}
