//! Adapting a schematic template to a target netlist.
//!
//! Adaptation is a diff/patch loop: the target's boxes are renamed to the
//! template ids they match ([`align_target_to_template`]), then fixup passes
//! compare the working circuit's netlist with the target and emit typed
//! [`EditOperation`]s, which [`apply_edit_operation`] applies. Rounds repeat
//! until one changes nothing. The applied operations form a log that
//! [`replay_operations`] can re-apply to a fresh copy of the template.

mod adapter;
mod align;
mod apply;
mod error;
pub mod fixup;
mod operation;

pub use adapter::{AdaptOptions, AdaptResult, TemplateAdapter, adapt_template_to_target};
pub use align::align_target_to_template;
pub use apply::{Applied, apply_edit_operation, replay_operations};
pub use error::AdaptError;
pub use operation::EditOperation;
