use pcb_netlist::NetlistError;
use thiserror::Error;

/// Hard errors raised while building or editing a [`crate::Circuit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchError {
    #[error("unknown chip '{0}'")]
    UnknownChip(String),

    #[error("chip '{0}' already exists")]
    DuplicateChip(String),

    #[error("chip '{0}' is not a passive")]
    NotPassive(String),

    #[error("chip '{chip_id}' has {pin_count} pins, expected 2")]
    NotTwoPins { chip_id: String, pin_count: u32 },

    #[error(transparent)]
    Netlist(#[from] NetlistError),
}
