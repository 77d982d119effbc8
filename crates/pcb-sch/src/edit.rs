//! Drawing and editing primitives on a [`Circuit`].
//!
//! These are shared by the fluent template builders and by the edit
//! operations of the adaptation engine.

use std::collections::BTreeMap;

use pcb_netlist::{
    NetlistError, PinCounts, PinRenumberMap, PortReference, Side, build_pin_insert_map, build_pin_remove_map,
    build_pin_renumber_map, get_pin_number, get_pin_side_index, is_passive_shape,
};

use crate::circuit::{Chip, Circuit, ConnectionPoint, Line, NetLabel};
use crate::geometry::{Direction, Point};
use crate::natural_string::first_free_id;
use crate::SchError;

const HORIZONTAL_PASSIVE: PinCounts = PinCounts::new(1, 0, 1, 0);
const VERTICAL_PASSIVE: PinCounts = PinCounts::new(0, 1, 0, 1);

impl Circuit {
    /// First free `R{n}` id in natural order.
    pub fn next_passive_id(&self) -> String {
        first_free_id("R", self.chip_ids())
    }

    fn next_label_id(&self) -> String {
        first_free_id("L", self.net_labels.iter().map(|l| l.label_id.as_str()))
    }

    /// Extend the pin's wire by `(dx, dy)` from its cursor.
    pub fn draw_line(&mut self, chip_id: &str, pin_number: u32, dx: i32, dy: i32) -> Result<(), SchError> {
        let pin = self.pin_builder_mut(chip_id, pin_number)?;
        let start = pin.cursor;
        let end = start.offset(dx, dy);
        if let Some(direction) = Direction::from_delta(dx, dy) {
            pin.last_direction = Some(direction);
        }
        pin.cursor = end;
        if start != end {
            self.lines.push(Line {
                start,
                end,
                pin_ref: PortReference::pin(chip_id, pin_number),
            });
        }
        Ok(())
    }

    /// The pin's drawing direction, drawing a one-unit outward stub first
    /// when nothing has been drawn yet.
    fn ensure_stub(&mut self, chip_id: &str, pin_number: u32) -> Result<Direction, SchError> {
        let pin = self.pin_builder(chip_id, pin_number)?;
        if let Some(direction) = pin.last_direction {
            return Ok(direction);
        }
        let direction = Direction::outward(pin.side);
        let (dx, dy) = direction.delta();
        self.draw_line(chip_id, pin_number, dx, dy)?;
        Ok(direction)
    }

    /// Terminate the pin's wire with a label for `net_id`. Returns the new
    /// label's id.
    pub fn add_label(&mut self, chip_id: &str, pin_number: u32, net_id: &str) -> Result<String, SchError> {
        self.ensure_stub(chip_id, pin_number)?;
        let position = self.pin_builder(chip_id, pin_number)?.cursor;
        let label_id = self.next_label_id();
        self.net_labels.push(NetLabel {
            label_id: label_id.clone(),
            net_id: net_id.to_owned(),
            position,
            from_ref: PortReference::pin(chip_id, pin_number),
        });
        Ok(label_id)
    }

    /// Remove the pin's labels. Returns how many were removed.
    pub fn clear_labels(&mut self, chip_id: &str, pin_number: u32) -> Result<usize, SchError> {
        self.pin_builder(chip_id, pin_number)?;
        let pin_ref = PortReference::pin(chip_id, pin_number);
        let before = self.net_labels.len();
        self.net_labels.retain(|l| l.from_ref != pin_ref);
        Ok(before - self.net_labels.len())
    }

    /// Route the wire of `from` to the pin `to` (horizontal leg first) and
    /// mark the junction with a connection point.
    pub fn join_pins(&mut self, from: (&str, u32), to: (&str, u32)) -> Result<(), SchError> {
        let target = self.pin_builder(to.0, to.1)?.position;
        let cursor = self.pin_builder(from.0, from.1)?.cursor;
        self.draw_line(from.0, from.1, target.x - cursor.x, 0)?;
        self.draw_line(from.0, from.1, 0, target.y - cursor.y)?;
        self.connection_points.push(ConnectionPoint {
            position: target,
            pin_ref: PortReference::pin(from.0, from.1),
            joined_ref: PortReference::pin(to.0, to.1),
        });
        Ok(())
    }

    /// Insert a two-pin passive in series on the pin's wire.
    ///
    /// The passive is oriented along the last drawn direction and placed one
    /// unit past the cursor. Whatever the pin was joined to (labels and
    /// connection points) is handed over to the passive's exit pin, and the
    /// pin itself is joined to the entry pin. Returns the exit pin number.
    ///
    /// `entry_pin` picks which passive pin faces the wire. Without one, the
    /// pin nearest the cursor is used (pin 1 heading `+x`/`+y`, pin 2
    /// heading `-x`/`-y`).
    pub fn insert_passive(
        &mut self,
        chip_id: &str,
        pin_number: u32,
        passive_id: &str,
        entry_pin: Option<u32>,
    ) -> Result<u32, SchError> {
        if self.has_chip(passive_id) {
            return Err(SchError::DuplicateChip(passive_id.to_owned()));
        }
        if let Some(pin_number) = entry_pin
            && !(1..=2).contains(&pin_number)
        {
            return Err(NetlistError::PinOutOfBounds { pin_number, total: 2 }.into());
        }
        let direction = self.ensure_stub(chip_id, pin_number)?;
        let cursor = self.pin_builder(chip_id, pin_number)?.cursor;
        let entry_at = cursor.step(direction);

        let (counts, nearest) = match direction {
            Direction::PosX => (HORIZONTAL_PASSIVE, 1),
            Direction::NegX => (HORIZONTAL_PASSIVE, 2),
            Direction::PosY => (VERTICAL_PASSIVE, 1),
            Direction::NegY => (VERTICAL_PASSIVE, 2),
        };
        let entry_pin = entry_pin.unwrap_or(nearest);
        let exit_pin = if entry_pin == 1 { 2 } else { 1 };
        let origin = Chip::new(passive_id, counts, Point::default(), true);
        let entry_offset = origin.pin_position(entry_pin)?;
        let mut passive = Chip::new(passive_id, counts, entry_at - entry_offset, true);
        let exit_at = passive.pin_position(exit_pin)?;
        if let Some(exit) = passive.pin_mut(exit_pin) {
            exit.last_direction = Some(direction);
        }

        let pin_ref = PortReference::pin(chip_id, pin_number);
        let entry_ref = PortReference::pin(passive_id, entry_pin);
        let exit_ref = PortReference::pin(passive_id, exit_pin);
        let shift = exit_at - cursor;
        for label in self.net_labels.iter_mut().filter(|l| l.from_ref == pin_ref) {
            label.from_ref = exit_ref.clone();
            label.position = label.position + shift;
        }
        for point in &mut self.connection_points {
            if point.pin_ref == pin_ref {
                point.pin_ref = exit_ref.clone();
            }
            if point.joined_ref == pin_ref {
                point.joined_ref = exit_ref.clone();
            }
        }

        self.chips.push(passive);
        let (dx, dy) = direction.delta();
        self.draw_line(chip_id, pin_number, dx, dy)?;
        self.connection_points.push(ConnectionPoint {
            position: entry_at,
            pin_ref,
            joined_ref: entry_ref,
        });
        log::trace!("inserted {passive_id} after {chip_id}.{pin_number} heading {direction:?}");
        Ok(exit_pin)
    }

    /// Delete every line, label and connection point naming the pin and
    /// reset its drawing state. Returns the number of removed elements.
    pub fn clear_pin(&mut self, chip_id: &str, pin_number: u32) -> Result<usize, SchError> {
        let pin_ref = PortReference::pin(chip_id, pin_number);
        let pin = self.pin_builder_mut(chip_id, pin_number)?;
        pin.cursor = pin.position;
        pin.last_direction = None;
        Ok(self.retain_elements(|r| r != &pin_ref))
    }

    /// Delete the chip and everything referencing its pins.
    pub fn remove_chip(&mut self, chip_id: &str) -> Result<usize, SchError> {
        let index = self
            .chips
            .iter()
            .position(|c| c.chip_id == chip_id)
            .ok_or_else(|| SchError::UnknownChip(chip_id.to_owned()))?;
        self.chips.remove(index);
        Ok(self.retain_elements(|r| !r.is_pin_of(chip_id)))
    }

    /// Change a chip's pin counts, keeping each pin's side and index.
    pub fn resize_chip(&mut self, chip_id: &str, new_counts: PinCounts) -> Result<(), SchError> {
        let old = self.chip_counts(chip_id)?;
        let map = build_pin_renumber_map(&old, &new_counts)?;
        self.renumber_chip(chip_id, new_counts, &map)
    }

    /// Insert one pin on `side` after position `after_index` (0 = first).
    /// Returns the new pin's number.
    pub fn insert_pin(&mut self, chip_id: &str, side: Side, after_index: u32) -> Result<u32, SchError> {
        let old = self.chip_counts(chip_id)?;
        let (new_counts, map) = build_pin_insert_map(&old, side, after_index)?;
        self.renumber_chip(chip_id, new_counts, &map)?;
        Ok(get_pin_number(side, after_index + 1, &new_counts)?)
    }

    /// Remove one pin; later pins on its side close the gap.
    pub fn remove_pin(&mut self, chip_id: &str, pin_number: u32) -> Result<(), SchError> {
        let old = self.chip_counts(chip_id)?;
        let position = get_pin_side_index(pin_number, &old)?;
        let (new_counts, map) = build_pin_remove_map(&old, position.side, position.index)?;
        self.renumber_chip(chip_id, new_counts, &map)
    }

    /// Swap a two-pin passive between `L1R1` and `B1T1`. Pin numbers keep
    /// their meaning, so only the chip outline changes; drawn wires stay.
    pub fn toggle_passive_orientation(&mut self, chip_id: &str) -> Result<PinCounts, SchError> {
        let chip = self
            .chip_mut(chip_id)
            .ok_or_else(|| SchError::UnknownChip(chip_id.to_owned()))?;
        let pin_count = chip.total_pins();
        if pin_count != 2 {
            return Err(SchError::NotTwoPins {
                chip_id: chip_id.to_owned(),
                pin_count,
            });
        }
        if !chip.is_passive || !is_passive_shape(&chip.pin_counts) {
            return Err(SchError::NotPassive(chip_id.to_owned()));
        }
        let new_counts = if chip.pin_counts == HORIZONTAL_PASSIVE {
            VERTICAL_PASSIVE
        } else {
            HORIZONTAL_PASSIVE
        };
        let mut reoriented = Chip::new(chip_id, new_counts, chip.position, chip.is_passive);
        for (pin, old) in reoriented.pins.iter_mut().zip(&chip.pins) {
            pin.cursor = old.cursor;
            pin.last_direction = old.last_direction;
        }
        *chip = reoriented;
        Ok(new_counts)
    }

    fn chip_counts(&self, chip_id: &str) -> Result<PinCounts, SchError> {
        self.chip(chip_id)
            .map(|c| c.pin_counts)
            .ok_or_else(|| SchError::UnknownChip(chip_id.to_owned()))
    }

    /// Apply a pin renumbering to a chip and to every reference naming it.
    ///
    /// Elements of removed pins are dropped. Elements of surviving pins are
    /// translated by how far their pin moved on the re-derived outline.
    fn renumber_chip(&mut self, chip_id: &str, new_counts: PinCounts, map: &PinRenumberMap) -> Result<(), SchError> {
        let index = self
            .chips
            .iter()
            .position(|c| c.chip_id == chip_id)
            .ok_or_else(|| SchError::UnknownChip(chip_id.to_owned()))?;
        let old_chip = &self.chips[index];
        let mut resized = Chip::new(chip_id, new_counts, old_chip.position, old_chip.is_passive);

        let mut deltas: BTreeMap<u32, Point> = BTreeMap::new();
        for old_pin in &old_chip.pins {
            let Some(Some(new_number)) = map.get(&old_pin.pin_number) else {
                continue;
            };
            if let Some(pin) = resized.pin_mut(*new_number) {
                let delta = pin.position - old_pin.position;
                pin.cursor = old_pin.cursor + delta;
                pin.last_direction = old_pin.last_direction;
                deltas.insert(*new_number, delta);
            }
        }
        let old_counts = old_chip.pin_counts;
        self.chips[index] = resized;

        let dropped = self.retain_elements(|r| match r {
            PortReference::Pin { box_id, pin_number } if box_id == chip_id => {
                !matches!(map.get(pin_number), Some(None))
            }
            _ => true,
        });
        self.for_each_ref_mut(|r| {
            if let PortReference::Pin { box_id, pin_number } = r
                && box_id == chip_id
                && let Some(Some(new_number)) = map.get(&*pin_number)
            {
                *pin_number = *new_number;
            }
        });
        for (pin_number, delta) in deltas {
            self.translate_owned(&PortReference::pin(chip_id, pin_number), delta);
        }
        log::debug!("resized {chip_id} {old_counts} -> {new_counts}, dropped {dropped} elements");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip_with_wires() -> Circuit {
        let mut circuit = Circuit::new();
        circuit
            .insert_chip(Chip::new("U1", PinCounts::new(1, 0, 1, 0), Point::default(), false))
            .unwrap();
        circuit
            .insert_chip(Chip::new("U2", PinCounts::new(1, 0, 1, 0), Point::new(6, 0), false))
            .unwrap();
        circuit.add_label("U1", 1, "VCC").unwrap();
        circuit.join_pins(("U1", 2), ("U2", 1)).unwrap();
        circuit
    }

    #[test]
    fn label_draws_minimal_stub() {
        let circuit = chip_with_wires();
        let pin = circuit.pin_builder("U1", 1).unwrap();
        assert_eq!(pin.last_direction, Some(Direction::NegX));
        assert_eq!(pin.cursor, Point::new(-1, 1));
        assert_eq!(circuit.net_labels[0].position, Point::new(-1, 1));
        assert_eq!(circuit.net_labels[0].label_id, "L1");
    }

    #[test]
    fn join_routes_to_target_pin() {
        let circuit = chip_with_wires();
        let point = &circuit.connection_points[0];
        assert_eq!(point.position, Point::new(6, 1));
        assert_eq!(point.joined_ref, PortReference::pin("U2", 1));
        let netlist = circuit.get_netlist();
        assert!(
            netlist
                .connection_for(&PortReference::pin("U1", 2))
                .is_some_and(|c| c.contains(&PortReference::pin("U2", 1)))
        );
    }

    #[test]
    fn passive_is_spliced_in_series() {
        let mut circuit = chip_with_wires();
        let exit = circuit.insert_passive("U1", 1, "R1", None).unwrap();
        // Heading -x: entry is the right pin (2), exit the left pin (1).
        assert_eq!(exit, 1);
        let passive = circuit.chip("R1").unwrap();
        assert_eq!(passive.pin_counts, HORIZONTAL_PASSIVE);
        assert_eq!(passive.pin_position(2).unwrap(), Point::new(-2, 1));
        assert_eq!(passive.pin_position(1).unwrap(), Point::new(-3, 1));

        let netlist = circuit.get_netlist();
        let entry = netlist.connection_for(&PortReference::pin("U1", 1)).unwrap();
        assert!(entry.contains(&PortReference::pin("R1", 2)));
        assert!(!entry.contains(&PortReference::net("VCC")));
        let exit = netlist.connection_for(&PortReference::pin("R1", 1)).unwrap();
        assert!(exit.contains(&PortReference::net("VCC")));
        assert_eq!(circuit.net_labels[0].position, Point::new(-3, 1));
    }

    #[test]
    fn explicit_entry_pin_overrides_direction() {
        let mut circuit = chip_with_wires();
        let exit = circuit.insert_passive("U1", 1, "R1", Some(1)).unwrap();
        assert_eq!(exit, 2);
        let netlist = circuit.get_netlist();
        let entry = netlist.connection_for(&PortReference::pin("U1", 1)).unwrap();
        assert!(entry.contains(&PortReference::pin("R1", 1)));
        assert!(!entry.contains(&PortReference::pin("R1", 2)));
        let exit = netlist.connection_for(&PortReference::pin("R1", 2)).unwrap();
        assert!(exit.contains(&PortReference::net("VCC")));
        assert!(!exit.touches_box("U1"));
        assert_eq!(
            circuit.insert_passive("U1", 2, "R2", Some(3)),
            Err(SchError::Netlist(NetlistError::PinOutOfBounds { pin_number: 3, total: 2 }))
        );
    }

    #[test]
    fn vertical_passive_follows_wire_direction() {
        let mut circuit = Circuit::new();
        circuit
            .insert_chip(Chip::new("U1", PinCounts::new(0, 1, 0, 0), Point::default(), false))
            .unwrap();
        circuit.draw_line("U1", 1, 0, -2).unwrap();
        let exit = circuit.insert_passive("U1", 1, "C1", None).unwrap();
        assert_eq!(exit, 1);
        assert_eq!(circuit.chip("C1").unwrap().pin_counts, VERTICAL_PASSIVE);
        let exit_pin = circuit.pin_builder("C1", 1).unwrap();
        assert_eq!(exit_pin.last_direction, Some(Direction::NegY));
    }

    #[test]
    fn passive_ids_allocate_in_natural_order() {
        let mut circuit = chip_with_wires();
        assert_eq!(circuit.next_passive_id(), "R1");
        circuit.insert_passive("U1", 1, "R1", None).unwrap();
        circuit.insert_passive("U1", 2, "R10", None).unwrap();
        assert_eq!(circuit.next_passive_id(), "R2");
        assert!(matches!(
            circuit.insert_passive("U2", 2, "R1", None),
            Err(SchError::DuplicateChip(_))
        ));
    }

    #[test]
    fn clear_pin_removes_everything_naming_it() {
        let mut circuit = chip_with_wires();
        let removed = circuit.clear_pin("U1", 2).unwrap();
        // The horizontal route segment and the connection point.
        assert_eq!(removed, 2);
        assert!(!circuit.is_pin_wired(&PortReference::pin("U1", 2)));
        assert!(!circuit.is_pin_wired(&PortReference::pin("U2", 1)));
        assert!(circuit.is_pin_wired(&PortReference::pin("U1", 1)));
    }

    #[test]
    fn remove_chip_drops_its_references() {
        let mut circuit = chip_with_wires();
        circuit.remove_chip("U2").unwrap();
        assert!(circuit.connection_points.is_empty());
        assert!(circuit.dangling_refs().is_empty());
        assert!(matches!(
            circuit.remove_chip("U2"),
            Err(SchError::UnknownChip(_))
        ));
    }

    #[test]
    fn growing_a_side_renumbers_and_moves_wires() {
        let mut circuit = chip_with_wires();
        circuit.resize_chip("U1", PinCounts::new(2, 0, 2, 0)).unwrap();
        assert!(circuit.dangling_refs().is_empty());
        // Old right pin 2 is now pin 3 (left grew by one).
        assert_eq!(
            circuit.connection_points[0].pin_ref,
            PortReference::pin("U1", 3)
        );
        // Left pin 1 moved up one row with the taller outline; its label followed.
        assert_eq!(circuit.chip("U1").unwrap().pin_position(1).unwrap(), Point::new(0, 2));
        assert_eq!(circuit.net_labels[0].position, Point::new(-1, 2));
        let netlist = circuit.get_netlist();
        assert!(netlist.connection_for(&PortReference::pin("U1", 3)).is_some());
        assert!(netlist.connection_for(&PortReference::pin("U1", 2)).is_none());
    }

    #[test]
    fn shrinking_a_side_drops_removed_pin_wiring() {
        let mut circuit = chip_with_wires();
        circuit.resize_chip("U1", PinCounts::new(0, 0, 1, 0)).unwrap();
        assert!(circuit.net_labels.is_empty());
        assert!(circuit.dangling_refs().is_empty());
        assert_eq!(
            circuit.connection_points[0].pin_ref,
            PortReference::pin("U1", 1)
        );
    }

    #[test]
    fn single_pin_insert_and_remove() {
        let mut circuit = chip_with_wires();
        let new_pin = circuit.insert_pin("U1", Side::Left, 0).unwrap();
        assert_eq!(new_pin, 1);
        assert_eq!(circuit.net_labels[0].from_ref, PortReference::pin("U1", 2));
        circuit.remove_pin("U1", 1).unwrap();
        assert_eq!(circuit.net_labels[0].from_ref, PortReference::pin("U1", 1));
        assert!(circuit.dangling_refs().is_empty());
    }

    #[test]
    fn orientation_toggle_checks_shape() {
        let mut circuit = chip_with_wires();
        assert_eq!(
            circuit.toggle_passive_orientation("U1"),
            Err(SchError::NotPassive("U1".into()))
        );
        assert_eq!(circuit.chip("U1").unwrap().pin_counts, HORIZONTAL_PASSIVE);
        circuit
            .insert_chip(Chip::new("R1", HORIZONTAL_PASSIVE, Point::new(0, 6), true))
            .unwrap();
        assert_eq!(
            circuit.toggle_passive_orientation("R1").unwrap(),
            VERTICAL_PASSIVE
        );
        assert_eq!(
            circuit.toggle_passive_orientation("R1").unwrap(),
            HORIZONTAL_PASSIVE
        );
        circuit
            .insert_chip(Chip::new("U3", PinCounts::new(2, 0, 0, 0), Point::default(), true))
            .unwrap();
        assert_eq!(
            circuit.toggle_passive_orientation("U3"),
            Err(SchError::NotPassive("U3".into()))
        );
        circuit
            .insert_chip(Chip::new("U4", PinCounts::new(2, 0, 1, 0), Point::default(), true))
            .unwrap();
        assert!(matches!(
            circuit.toggle_passive_orientation("U4"),
            Err(SchError::NotTwoPins { pin_count: 3, .. })
        ));
    }
}
