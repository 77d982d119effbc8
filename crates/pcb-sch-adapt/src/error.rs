use pcb_netlist::{NetlistError, Side};
use pcb_sch::SchError;
use thiserror::Error;

/// Invariant violations while applying an edit operation. Not-found
/// conditions are not errors; see [`crate::Applied::Skipped`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdaptError {
    #[error("cannot resize {side} side of '{chip_id}' from {old_pin_count} to {new_pin_count} pins with this operation")]
    InvalidResize {
        chip_id: String,
        side: Side,
        old_pin_count: u32,
        new_pin_count: u32,
    },

    #[error(transparent)]
    Schematic(#[from] SchError),

    #[error(transparent)]
    Netlist(#[from] NetlistError),
}
