use thiserror::Error;

use crate::Side;

/// Invariant violations in the netlist model. These indicate a caller or
/// data bug and are never silently corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetlistError {
    #[error("pin {pin_number} is out of bounds (box has {total} pins)")]
    PinOutOfBounds { pin_number: u32, total: u32 },

    #[error("index {index} is out of bounds on {side} side ({count} pins)")]
    SideIndexOutOfBounds { side: Side, index: u32, count: u32 },

    #[error("unknown box '{0}'")]
    UnknownBox(String),

    #[error("unknown net '{0}'")]
    UnknownNet(String),

    #[error("port {0} appears in more than one connection")]
    DuplicatePort(String),
}
