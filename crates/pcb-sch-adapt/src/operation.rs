use std::fmt;

use pcb_netlist::Side;
use serde::{Deserialize, Serialize};

/// A typed, replayable mutation of a schematic working graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EditOperation {
    AddPinsToSide {
        chip_id: String,
        side: Side,
        old_pin_count: u32,
        new_pin_count: u32,
    },
    RemovePinsFromSide {
        chip_id: String,
        side: Side,
        old_pin_count: u32,
        new_pin_count: u32,
    },
    /// Insert one pin on `side` after position `after_index` (0 = first).
    AddPinToSide {
        chip_id: String,
        side: Side,
        after_index: u32,
    },
    RemovePinFromSide {
        chip_id: String,
        pin_number: u32,
    },
    AddLabelToPin {
        chip_id: String,
        pin_number: u32,
        net_id: String,
    },
    ClearLabel {
        chip_id: String,
        pin_number: u32,
    },
    /// `passive_id` of `None` takes the first free `R{n}`. `entry_pin` is
    /// the passive pin joined to the chip pin; `None` uses the one facing
    /// the wire.
    AddPassiveToPin {
        chip_id: String,
        pin_number: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passive_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entry_pin: Option<u32>,
    },
    AddPassiveWithLabelToPin {
        chip_id: String,
        pin_number: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passive_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entry_pin: Option<u32>,
        net_id: String,
    },
    ChangePassiveOrientation {
        chip_id: String,
    },
    ClearPin {
        chip_id: String,
        pin_number: u32,
    },
    RemoveChip {
        chip_id: String,
    },
}

impl EditOperation {
    pub fn chip_id(&self) -> &str {
        match self {
            EditOperation::AddPinsToSide { chip_id, .. }
            | EditOperation::RemovePinsFromSide { chip_id, .. }
            | EditOperation::AddPinToSide { chip_id, .. }
            | EditOperation::RemovePinFromSide { chip_id, .. }
            | EditOperation::AddLabelToPin { chip_id, .. }
            | EditOperation::ClearLabel { chip_id, .. }
            | EditOperation::AddPassiveToPin { chip_id, .. }
            | EditOperation::AddPassiveWithLabelToPin { chip_id, .. }
            | EditOperation::ChangePassiveOrientation { chip_id }
            | EditOperation::ClearPin { chip_id, .. }
            | EditOperation::RemoveChip { chip_id } => chip_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditOperation::AddPinsToSide { .. } => "add_pins_to_side",
            EditOperation::RemovePinsFromSide { .. } => "remove_pins_from_side",
            EditOperation::AddPinToSide { .. } => "add_pin_to_side",
            EditOperation::RemovePinFromSide { .. } => "remove_pin_from_side",
            EditOperation::AddLabelToPin { .. } => "add_label_to_pin",
            EditOperation::ClearLabel { .. } => "clear_label",
            EditOperation::AddPassiveToPin { .. } => "add_passive_to_pin",
            EditOperation::AddPassiveWithLabelToPin { .. } => "add_passive_with_label_to_pin",
            EditOperation::ChangePassiveOrientation { .. } => "change_passive_orientation",
            EditOperation::ClearPin { .. } => "clear_pin",
            EditOperation::RemoveChip { .. } => "remove_chip",
        }
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match self {
            EditOperation::AddPinsToSide {
                chip_id,
                side,
                old_pin_count,
                new_pin_count,
            }
            | EditOperation::RemovePinsFromSide {
                chip_id,
                side,
                old_pin_count,
                new_pin_count,
            } => write!(f, " {chip_id} {side} {old_pin_count}->{new_pin_count}"),
            EditOperation::AddPinToSide {
                chip_id,
                side,
                after_index,
            } => write!(f, " {chip_id} {side} after {after_index}"),
            EditOperation::AddLabelToPin {
                chip_id,
                pin_number,
                net_id,
            } => write!(f, " {chip_id}.{pin_number} {net_id}"),
            EditOperation::AddPassiveToPin {
                chip_id,
                pin_number,
                passive_id,
                ..
            } => write!(
                f,
                " {chip_id}.{pin_number} {}",
                passive_id.as_deref().unwrap_or("*")
            ),
            EditOperation::AddPassiveWithLabelToPin {
                chip_id,
                pin_number,
                passive_id,
                net_id,
                ..
            } => write!(
                f,
                " {chip_id}.{pin_number} {} {net_id}",
                passive_id.as_deref().unwrap_or("*")
            ),
            EditOperation::RemovePinFromSide {
                chip_id,
                pin_number,
            }
            | EditOperation::ClearLabel {
                chip_id,
                pin_number,
            }
            | EditOperation::ClearPin {
                chip_id,
                pin_number,
            } => write!(f, " {chip_id}.{pin_number}"),
            EditOperation::ChangePassiveOrientation { chip_id }
            | EditOperation::RemoveChip { chip_id } => write!(f, " {chip_id}"),
        }
    }
}
