//! Fluent authoring API for templates.
//!
//! ```
//! use pcb_sch::Circuit;
//!
//! # fn main() -> Result<(), pcb_sch::SchError> {
//! let mut circuit = Circuit::new();
//! circuit.add_chip("U1").left_pins(2).right_pins(2).add()?;
//! circuit.pin("U1", 3)?.line(1, 0)?.passive("R1")?.line(1, 0)?.label("OUT")?;
//! circuit.pin("U1", 1)?.label("VCC")?;
//! assert_eq!(circuit.get_netlist().boxes.len(), 2);
//! # Ok(())
//! # }
//! ```

use pcb_netlist::{PinCounts, PortReference};

use crate::SchError;
use crate::circuit::{Chip, Circuit};
use crate::geometry::Point;

#[must_use]
pub struct ChipBuilder<'a> {
    circuit: &'a mut Circuit,
    chip_id: String,
    pin_counts: PinCounts,
    position: Point,
    is_passive: bool,
}

impl ChipBuilder<'_> {
    pub fn left_pins(mut self, count: u32) -> Self {
        self.pin_counts.left = count;
        self
    }

    pub fn bottom_pins(mut self, count: u32) -> Self {
        self.pin_counts.bottom = count;
        self
    }

    pub fn right_pins(mut self, count: u32) -> Self {
        self.pin_counts.right = count;
        self
    }

    pub fn top_pins(mut self, count: u32) -> Self {
        self.pin_counts.top = count;
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Point::new(x, y);
        self
    }

    pub fn passive(mut self) -> Self {
        self.is_passive = true;
        self
    }

    pub fn add(self) -> Result<(), SchError> {
        self.circuit.insert_chip(Chip::new(
            self.chip_id,
            self.pin_counts,
            self.position,
            self.is_passive,
        ))
    }
}

/// Draws from one pin. Every method continues from the pin's cursor.
#[must_use]
pub struct PinDrawer<'a> {
    circuit: &'a mut Circuit,
    chip_id: String,
    pin_number: u32,
}

impl<'a> PinDrawer<'a> {
    pub fn pin_ref(&self) -> PortReference {
        PortReference::pin(self.chip_id.clone(), self.pin_number)
    }

    pub fn line(self, dx: i32, dy: i32) -> Result<Self, SchError> {
        self.circuit
            .draw_line(&self.chip_id, self.pin_number, dx, dy)?;
        Ok(self)
    }

    pub fn label(self, net_id: &str) -> Result<Self, SchError> {
        self.circuit
            .add_label(&self.chip_id, self.pin_number, net_id)?;
        Ok(self)
    }

    /// Insert a passive in series and continue drawing from its exit pin.
    pub fn passive(self, passive_id: &str) -> Result<PinDrawer<'a>, SchError> {
        let pin_number = self
            .circuit
            .insert_passive(&self.chip_id, self.pin_number, passive_id, None)?;
        Ok(PinDrawer {
            circuit: self.circuit,
            chip_id: passive_id.to_owned(),
            pin_number,
        })
    }

    pub fn join(self, chip_id: &str, pin_number: u32) -> Result<Self, SchError> {
        self.circuit
            .join_pins((&self.chip_id, self.pin_number), (chip_id, pin_number))?;
        Ok(self)
    }
}

impl Circuit {
    pub fn add_chip(&mut self, chip_id: impl Into<String>) -> ChipBuilder<'_> {
        ChipBuilder {
            circuit: self,
            chip_id: chip_id.into(),
            pin_counts: PinCounts::default(),
            position: Point::default(),
            is_passive: false,
        }
    }

    pub fn pin(&mut self, chip_id: &str, pin_number: u32) -> Result<PinDrawer<'_>, SchError> {
        self.pin_builder(chip_id, pin_number)?;
        Ok(PinDrawer {
            circuit: self,
            chip_id: chip_id.to_owned(),
            pin_number,
        })
    }
}
