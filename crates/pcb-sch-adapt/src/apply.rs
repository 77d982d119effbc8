//! Applying [`EditOperation`]s to a working [`Circuit`].
//!
//! Operations that name a chip which no longer exists are skipped, since an
//! earlier operation in the same pass may legitimately have removed it.
//! Everything else that does not fit the circuit (pin out of range, wrong
//! resize direction, non-passive orientation change) is a hard error.

use pcb_netlist::{PortReference, Side};
use pcb_sch::{Circuit, SchError};

use crate::error::AdaptError;
use crate::operation::EditOperation;

/// Outcome of a single [`apply_edit_operation`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Changed,
    /// Nothing to do; the circuit is untouched.
    Skipped(String),
}

impl Applied {
    pub fn is_changed(&self) -> bool {
        matches!(self, Applied::Changed)
    }
}

pub fn apply_edit_operation(circuit: &mut Circuit, op: &EditOperation) -> Result<Applied, AdaptError> {
    let applied = match op {
        EditOperation::AddPinsToSide {
            chip_id,
            side,
            old_pin_count,
            new_pin_count,
        } => {
            if new_pin_count <= old_pin_count {
                return Err(invalid_resize(chip_id, *side, *old_pin_count, *new_pin_count));
            }
            resize_side(circuit, chip_id, *side, *old_pin_count, *new_pin_count)?
        }
        EditOperation::RemovePinsFromSide {
            chip_id,
            side,
            old_pin_count,
            new_pin_count,
        } => {
            if new_pin_count >= old_pin_count {
                return Err(invalid_resize(chip_id, *side, *old_pin_count, *new_pin_count));
            }
            resize_side(circuit, chip_id, *side, *old_pin_count, *new_pin_count)?
        }
        EditOperation::AddPinToSide {
            chip_id,
            side,
            after_index,
        } => {
            if !circuit.has_chip(chip_id) {
                return Ok(missing_chip(op));
            }
            circuit.insert_pin(chip_id, *side, *after_index)?;
            Applied::Changed
        }
        EditOperation::RemovePinFromSide {
            chip_id,
            pin_number,
        } => {
            if !pin_exists(circuit, chip_id, *pin_number)? {
                return Ok(missing_chip(op));
            }
            circuit.remove_pin(chip_id, *pin_number)?;
            Applied::Changed
        }
        EditOperation::AddLabelToPin {
            chip_id,
            pin_number,
            net_id,
        } => {
            if !pin_exists(circuit, chip_id, *pin_number)? {
                return Ok(missing_chip(op));
            }
            if has_label(circuit, chip_id, *pin_number) {
                Applied::Skipped(format!("{chip_id}.{pin_number} is already labelled"))
            } else {
                circuit.add_label(chip_id, *pin_number, net_id)?;
                Applied::Changed
            }
        }
        EditOperation::ClearLabel {
            chip_id,
            pin_number,
        } => {
            if !pin_exists(circuit, chip_id, *pin_number)? {
                return Ok(missing_chip(op));
            }
            match circuit.clear_labels(chip_id, *pin_number)? {
                0 => Applied::Skipped(format!("{chip_id}.{pin_number} has no label")),
                _ => Applied::Changed,
            }
        }
        EditOperation::AddPassiveToPin {
            chip_id,
            pin_number,
            passive_id,
            entry_pin,
        } => {
            if !pin_exists(circuit, chip_id, *pin_number)? {
                return Ok(missing_chip(op));
            }
            insert_passive(circuit, chip_id, *pin_number, passive_id.as_deref(), *entry_pin)?;
            Applied::Changed
        }
        EditOperation::AddPassiveWithLabelToPin {
            chip_id,
            pin_number,
            passive_id,
            entry_pin,
            net_id,
        } => {
            if !pin_exists(circuit, chip_id, *pin_number)? {
                return Ok(missing_chip(op));
            }
            let (passive, exit_pin) =
                insert_passive(circuit, chip_id, *pin_number, passive_id.as_deref(), *entry_pin)?;
            if !has_label(circuit, &passive, exit_pin) {
                circuit.add_label(&passive, exit_pin, net_id)?;
            }
            Applied::Changed
        }
        EditOperation::ChangePassiveOrientation { chip_id } => {
            if !circuit.has_chip(chip_id) {
                return Ok(missing_chip(op));
            }
            circuit.toggle_passive_orientation(chip_id)?;
            Applied::Changed
        }
        EditOperation::ClearPin {
            chip_id,
            pin_number,
        } => {
            if !pin_exists(circuit, chip_id, *pin_number)? {
                return Ok(missing_chip(op));
            }
            match circuit.clear_pin(chip_id, *pin_number)? {
                0 => Applied::Skipped(format!("{chip_id}.{pin_number} has no wiring")),
                _ => Applied::Changed,
            }
        }
        EditOperation::RemoveChip { chip_id } => {
            if !circuit.has_chip(chip_id) {
                return Ok(missing_chip(op));
            }
            circuit.remove_chip(chip_id)?;
            Applied::Changed
        }
    };
    match &applied {
        Applied::Changed => log::trace!("applied {op}"),
        Applied::Skipped(reason) => log::debug!("skipped {op}: {reason}"),
    }
    Ok(applied)
}

/// Re-apply an operation log to a fresh copy of `template`.
pub fn replay_operations(template: &Circuit, ops: &[EditOperation]) -> Result<Circuit, AdaptError> {
    let mut circuit = template.clone();
    for op in ops {
        apply_edit_operation(&mut circuit, op)?;
    }
    Ok(circuit)
}

fn invalid_resize(chip_id: &str, side: Side, old_pin_count: u32, new_pin_count: u32) -> AdaptError {
    AdaptError::InvalidResize {
        chip_id: chip_id.to_owned(),
        side,
        old_pin_count,
        new_pin_count,
    }
}

fn missing_chip(op: &EditOperation) -> Applied {
    let applied = Applied::Skipped(format!("chip '{}' not found", op.chip_id()));
    log::debug!("skipped {op}: chip not found");
    applied
}

/// `Ok(false)` when the chip is gone; an error when the chip exists but the
/// pin does not.
fn pin_exists(circuit: &Circuit, chip_id: &str, pin_number: u32) -> Result<bool, AdaptError> {
    match circuit.pin_builder(chip_id, pin_number) {
        Ok(_) => Ok(true),
        Err(SchError::UnknownChip(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn has_label(circuit: &Circuit, chip_id: &str, pin_number: u32) -> bool {
    let pin_ref = PortReference::pin(chip_id, pin_number);
    circuit.labels_on(&pin_ref).next().is_some()
}

fn resize_side(
    circuit: &mut Circuit,
    chip_id: &str,
    side: Side,
    old_pin_count: u32,
    new_pin_count: u32,
) -> Result<Applied, AdaptError> {
    let Some(chip) = circuit.chip(chip_id) else {
        return Ok(Applied::Skipped(format!("chip '{chip_id}' not found")));
    };
    let current = chip.pin_counts.get(side);
    if current != old_pin_count {
        return Ok(Applied::Skipped(format!(
            "{chip_id} has {current} pins on its {side} side, expected {old_pin_count}"
        )));
    }
    let counts = chip.pin_counts.with(side, new_pin_count);
    circuit.resize_chip(chip_id, counts)?;
    Ok(Applied::Changed)
}

fn insert_passive(
    circuit: &mut Circuit,
    chip_id: &str,
    pin_number: u32,
    passive_id: Option<&str>,
    entry_pin: Option<u32>,
) -> Result<(String, u32), AdaptError> {
    let passive = match passive_id {
        Some(id) => id.to_owned(),
        None => circuit.next_passive_id(),
    };
    let exit_pin = circuit.insert_passive(chip_id, pin_number, &passive, entry_pin)?;
    Ok((passive, exit_pin))
}

#[cfg(test)]
mod tests {
    use pcb_netlist::PinCounts;

    use super::*;

    fn circuit() -> Circuit {
        let mut circuit = Circuit::new();
        circuit.add_chip("U1").left_pins(2).right_pins(2).add().unwrap();
        circuit.pin("U1", 1).unwrap().line(-1, 0).unwrap().label("VCC").unwrap();
        circuit.pin("U1", 3).unwrap().line(1, 0).unwrap().label("OUT").unwrap();
        circuit
    }

    fn apply(circuit: &mut Circuit, op: EditOperation) -> Applied {
        apply_edit_operation(circuit, &op).unwrap()
    }

    #[test]
    fn growing_a_side_renumbers_later_pins() {
        let mut circuit = circuit();
        let applied = apply(
            &mut circuit,
            EditOperation::AddPinsToSide {
                chip_id: "U1".into(),
                side: Side::Left,
                old_pin_count: 2,
                new_pin_count: 3,
            },
        );
        assert!(applied.is_changed());
        assert_eq!(circuit.chip("U1").unwrap().pin_counts, PinCounts::new(3, 0, 2, 0));
        let netlist = circuit.get_netlist();
        let out = netlist.connection_for(&PortReference::net("OUT")).unwrap();
        assert!(out.contains(&PortReference::pin("U1", 4)));
        assert!(circuit.dangling_refs().is_empty());
    }

    #[test]
    fn resize_direction_is_checked() {
        let mut circuit = circuit();
        let op = EditOperation::AddPinsToSide {
            chip_id: "U1".into(),
            side: Side::Left,
            old_pin_count: 2,
            new_pin_count: 1,
        };
        assert!(matches!(
            apply_edit_operation(&mut circuit, &op),
            Err(AdaptError::InvalidResize { .. })
        ));
    }

    #[test]
    fn stale_resize_is_skipped() {
        let mut circuit = circuit();
        let applied = apply(
            &mut circuit,
            EditOperation::RemovePinsFromSide {
                chip_id: "U1".into(),
                side: Side::Right,
                old_pin_count: 5,
                new_pin_count: 1,
            },
        );
        assert!(!applied.is_changed());
        assert_eq!(circuit.chip("U1").unwrap().pin_counts, PinCounts::new(2, 0, 2, 0));
    }

    #[test]
    fn missing_chip_is_skipped_but_bad_pin_is_an_error() {
        let mut circuit = circuit();
        let applied = apply(
            &mut circuit,
            EditOperation::ClearPin {
                chip_id: "U9".into(),
                pin_number: 1,
            },
        );
        assert!(matches!(applied, Applied::Skipped(_)));

        let op = EditOperation::AddLabelToPin {
            chip_id: "U1".into(),
            pin_number: 9,
            net_id: "GND".into(),
        };
        assert!(matches!(
            apply_edit_operation(&mut circuit, &op),
            Err(AdaptError::Schematic(SchError::Netlist(_)))
        ));
    }

    #[test]
    fn labelled_pin_is_not_labelled_twice() {
        let mut circuit = circuit();
        let applied = apply(
            &mut circuit,
            EditOperation::AddLabelToPin {
                chip_id: "U1".into(),
                pin_number: 1,
                net_id: "GND".into(),
            },
        );
        assert!(!applied.is_changed());
        assert_eq!(circuit.net_labels.len(), 2);
    }

    #[test]
    fn clear_label_keeps_wire() {
        let mut circuit = circuit();
        assert!(
            apply(
                &mut circuit,
                EditOperation::ClearLabel {
                    chip_id: "U1".into(),
                    pin_number: 3,
                },
            )
            .is_changed()
        );
        assert_eq!(circuit.net_labels.len(), 1);
        assert!(circuit.lines.iter().any(|l| l.pin_ref == PortReference::pin("U1", 3)));
    }

    #[test]
    fn passive_without_id_takes_next_free() {
        let mut circuit = circuit();
        apply(
            &mut circuit,
            EditOperation::AddPassiveWithLabelToPin {
                chip_id: "U1".into(),
                pin_number: 2,
                passive_id: None,
                entry_pin: None,
                net_id: "GND".into(),
            },
        );
        let netlist = circuit.get_netlist();
        let gnd = netlist.connection_for(&PortReference::net("GND")).unwrap();
        assert!(gnd.touches_box("R1"));
        let entry = netlist.connection_for(&PortReference::pin("U1", 2)).unwrap();
        assert!(entry.touches_box("R1"));
        assert!(!entry.contains(&PortReference::net("GND")));
    }

    #[test]
    fn passive_keeps_existing_label_on_exit() {
        let mut circuit = circuit();
        apply(
            &mut circuit,
            EditOperation::AddPassiveToPin {
                chip_id: "U1".into(),
                pin_number: 3,
                passive_id: Some("R7".into()),
                entry_pin: None,
            },
        );
        let netlist = circuit.get_netlist();
        let out = netlist.connection_for(&PortReference::net("OUT")).unwrap();
        assert!(out.contains(&PortReference::pin("R7", 2)));
        assert!(!out.touches_box("U1"));
    }

    #[test]
    fn orientation_change_requires_a_passive() {
        let mut circuit = circuit();
        let op = EditOperation::ChangePassiveOrientation { chip_id: "U1".into() };
        assert!(apply_edit_operation(&mut circuit, &op).is_err());

        circuit.add_chip("U2").left_pins(1).right_pins(1).at(10, 0).add().unwrap();
        let op = EditOperation::ChangePassiveOrientation { chip_id: "U2".into() };
        assert_eq!(
            apply_edit_operation(&mut circuit, &op),
            Err(AdaptError::Schematic(SchError::NotPassive("U2".into())))
        );
        assert_eq!(circuit.chip("U2").unwrap().pin_counts, PinCounts::new(1, 0, 1, 0));
    }

    #[test]
    fn remove_chip_twice_skips_second() {
        let mut circuit = circuit();
        let op = EditOperation::RemoveChip { chip_id: "U1".into() };
        assert!(apply(&mut circuit, op.clone()).is_changed());
        assert!(!apply(&mut circuit, op).is_changed());
        assert!(circuit.net_labels.is_empty());
        assert!(circuit.lines.is_empty());
    }

    #[test]
    fn single_pin_edits() {
        let mut circuit = circuit();
        apply(
            &mut circuit,
            EditOperation::AddPinToSide {
                chip_id: "U1".into(),
                side: Side::Right,
                after_index: 0,
            },
        );
        // OUT moved from pin 3 to pin 4.
        let netlist = circuit.get_netlist();
        assert!(
            netlist
                .connection_for(&PortReference::net("OUT"))
                .unwrap()
                .contains(&PortReference::pin("U1", 4))
        );
        apply(
            &mut circuit,
            EditOperation::RemovePinFromSide {
                chip_id: "U1".into(),
                pin_number: 1,
            },
        );
        assert_eq!(circuit.chip("U1").unwrap().pin_counts, PinCounts::new(1, 0, 3, 0));
        assert!(circuit.labels_on(&PortReference::pin("U1", 1)).next().is_none());
        assert!(circuit.dangling_refs().is_empty());
    }
}
