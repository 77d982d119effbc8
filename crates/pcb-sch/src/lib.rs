//! Schematic working graph and template library.
//!
//! A [`Circuit`] holds chips with per-pin drawing state plus the wires,
//! net labels and connection points drawn between them. All topology is
//! carried by [`pcb_netlist::PortReference`] values, so
//! [`Circuit::get_netlist`] can rebuild the [`pcb_netlist::Netlist`] at any
//! time and pin renumbering is a reference rewrite.
//!
//! Templates are authored with the fluent builders in [`builder`] and
//! collected in a [`TemplateLibrary`].

pub mod builder;
pub mod circuit;
mod edit;
mod error;
pub mod geometry;
pub mod natural_string;
pub mod templates;

pub use builder::{ChipBuilder, PinDrawer};
pub use circuit::{Chip, Circuit, ConnectionPoint, Line, NetLabel, PinBuilder};
pub use error::SchError;
pub use geometry::{Direction, Point};
pub use templates::{BUILTIN_TEMPLATES, Template, TemplateFactory, TemplateLibrary};
