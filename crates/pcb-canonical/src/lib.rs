//! Canonical forms for structural netlist comparison.
//!
//! [`normalize_netlist`] rewrites a [`pcb_netlist::Netlist`] so that two
//! netlists differing only in box/net naming or list ordering produce equal
//! [`NormalizedNetlist`]s. [`get_pin_shape_signature`] applies the same
//! normalization to the one-hop neighbourhood of a single pin.

pub mod normalize;
pub mod subset;

pub use normalize::{
    Normalization, NormalizationTransform, NormalizedBox, NormalizedConnection, NormalizedNet,
    NormalizedNetlist, NormalizedPort, denormalize, normalize_netlist, synthetic_box_id,
    synthetic_net_id,
};
pub use subset::{
    get_pin_shape_signature, get_pin_subset_netlist, pin_connection_count, render_signature,
};
