//! Fixup passes: pure `(current, target) -> operations` functions.
//!
//! Each pass compares the working netlist with the aligned target and emits
//! the operations that bring one aspect closer. The adapter applies a pass's
//! operations before running the next pass on a fresh snapshot.

use std::collections::BTreeSet;

use pcb_netlist::{Connection, Netlist, NetlistBox, PortReference, Side};

use crate::adapter::AdaptOptions;
use crate::operation::EditOperation;

/// Make every shared chip's side counts equal to the target's. Passives in
/// `passives` that only differ in orientation are turned instead of resized.
pub fn side_count_pass(
    current: &Netlist,
    target: &Netlist,
    passives: &BTreeSet<&str>,
    options: &AdaptOptions,
) -> Vec<EditOperation> {
    let mut ops = Vec::new();
    for chip in &current.boxes {
        let Some(wanted) = target.box_by_id(&chip.box_id) else {
            continue;
        };
        if chip.pin_counts == wanted.pin_counts {
            continue;
        }
        if passives.contains(chip.box_id.as_str()) && chip.is_passive_shape() && wanted.is_passive_shape() {
            ops.push(EditOperation::ChangePassiveOrientation {
                chip_id: chip.box_id.clone(),
            });
            continue;
        }
        for side in Side::ALL_CCW {
            let have = chip.pin_counts.get(side);
            let want = wanted.pin_counts.get(side);
            if have < want {
                ops.push(EditOperation::AddPinsToSide {
                    chip_id: chip.box_id.clone(),
                    side,
                    old_pin_count: have,
                    new_pin_count: want,
                });
            } else if have > want && options.shrink_sides {
                ops.push(EditOperation::RemovePinsFromSide {
                    chip_id: chip.box_id.clone(),
                    side,
                    old_pin_count: have,
                    new_pin_count: want,
                });
            }
        }
    }
    ops
}

/// Remove chips the target has no counterpart for.
pub fn chip_removal_pass(current: &Netlist, target: &Netlist, options: &AdaptOptions) -> Vec<EditOperation> {
    if !options.remove_unmatched_chips {
        return Vec::new();
    }
    current
        .boxes
        .iter()
        .filter(|chip| target.box_by_id(&chip.box_id).is_none())
        .map(|chip| EditOperation::RemoveChip {
            chip_id: chip.box_id.clone(),
        })
        .collect()
}

/// Per-pin wiring fixes, at most one operation per pin.
///
/// In priority order: clear a pin the target leaves unconnected, insert a
/// passive the target has on the pin but the circuit lacks, label a pin whose
/// target connection carries a net and whose current wiring is part of that
/// connection. Chips whose side counts still differ from the target are left
/// for a later round.
pub fn pin_level_pass(current: &Netlist, target: &Netlist) -> Vec<EditOperation> {
    let mut ops = Vec::new();
    let mut scheduled_passives: BTreeSet<&str> = BTreeSet::new();

    for chip in &current.boxes {
        let Some(wanted) = target.box_by_id(&chip.box_id) else {
            continue;
        };
        if chip.pin_counts != wanted.pin_counts {
            continue;
        }
        for pin_number in 1..=chip.total_pins() {
            let port = PortReference::pin(chip.box_id.clone(), pin_number);
            let have = meaningful_connection(current, &port);
            let Some(want) = meaningful_connection(target, &port) else {
                if have.is_some() {
                    ops.push(EditOperation::ClearPin {
                        chip_id: chip.box_id.clone(),
                        pin_number,
                    });
                }
                continue;
            };

            let current_net = have.and_then(|c| c.nets().next());
            if let Some((passive, passive_pin)) = missing_passive(current, target, want, &port, &scheduled_passives) {
                scheduled_passives.insert(&passive.box_id);
                let far_pin = PortReference::pin(passive.box_id.clone(), if passive_pin == 1 { 2 } else { 1 });
                let far_net = meaningful_connection(target, &far_pin).and_then(|c| c.nets().next());
                let op = match far_net {
                    Some(net_id) if current_net.is_none() => EditOperation::AddPassiveWithLabelToPin {
                        chip_id: chip.box_id.clone(),
                        pin_number,
                        passive_id: Some(passive.box_id.clone()),
                        entry_pin: Some(passive_pin),
                        net_id: net_id.to_owned(),
                    },
                    _ => EditOperation::AddPassiveToPin {
                        chip_id: chip.box_id.clone(),
                        pin_number,
                        passive_id: Some(passive.box_id.clone()),
                        entry_pin: Some(passive_pin),
                    },
                };
                ops.push(op);
                continue;
            }

            // A label joins everything already on the pin to the net, so the
            // pin's current wiring must belong on that net too.
            let wiring_fits = have.is_none_or(|c| c.connected_ports.iter().all(|p| want.contains(p)));
            if current_net.is_none()
                && wiring_fits
                && let Some(net_id) = want.nets().next()
            {
                ops.push(EditOperation::AddLabelToPin {
                    chip_id: chip.box_id.clone(),
                    pin_number,
                    net_id: net_id.to_owned(),
                });
            }
        }
    }
    ops
}

fn meaningful_connection<'a>(netlist: &'a Netlist, port: &PortReference) -> Option<&'a Connection> {
    netlist.connection_for(port).filter(|c| c.is_meaningful())
}

/// First two-pin passive on `want` (other than `port` itself) that the
/// current circuit does not have yet, with the pin it touches.
fn missing_passive<'a>(
    current: &Netlist,
    target: &'a Netlist,
    want: &'a Connection,
    port: &PortReference,
    scheduled: &BTreeSet<&str>,
) -> Option<(&'a NetlistBox, u32)> {
    want.connected_ports.iter().find_map(|other| {
        let PortReference::Pin { box_id, pin_number } = other else {
            return None;
        };
        if other == port || current.box_by_id(box_id).is_some() || scheduled.contains(box_id.as_str()) {
            return None;
        }
        let passive = target.box_by_id(box_id)?;
        passive.is_passive_shape().then_some((passive, *pin_number))
    })
}

#[cfg(test)]
mod tests {
    use pcb_test_utils::NetlistFixture;

    use super::*;

    fn options() -> AdaptOptions {
        AdaptOptions::default()
    }

    fn render(ops: &[EditOperation]) -> String {
        ops.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn sides_grow_in_numbering_order() {
        let current = NetlistFixture::new().chip("U1", 1, 0, 1, 3).build();
        let target = NetlistFixture::new().chip("U1", 2, 1, 2, 0).build();
        insta::assert_snapshot!(render(&side_count_pass(&current, &target, &BTreeSet::new(), &options())), @r"
        add_pins_to_side U1 left 1->2
        add_pins_to_side U1 bottom 0->1
        add_pins_to_side U1 right 1->2
        remove_pins_from_side U1 top 3->0
        ");
    }

    #[test]
    fn shrinking_can_be_disabled() {
        let current = NetlistFixture::new().chip("U1", 3, 0, 1, 0).build();
        let target = NetlistFixture::new().chip("U1", 1, 0, 1, 0).build();
        let options = AdaptOptions {
            shrink_sides: false,
            ..AdaptOptions::default()
        };
        assert!(side_count_pass(&current, &target, &BTreeSet::new(), &options).is_empty());
    }

    #[test]
    fn rotated_passive_is_turned() {
        let current = NetlistFixture::new().resistor("R1").build();
        let target = NetlistFixture::new().vertical_resistor("R1").build();
        insta::assert_snapshot!(
            render(&side_count_pass(&current, &target, &BTreeSet::from(["R1"]), &options())),
            @"change_passive_orientation R1"
        );
    }

    #[test]
    fn two_pin_chip_is_resized_not_turned() {
        let current = NetlistFixture::new().chip("U1", 1, 0, 1, 0).build();
        let target = NetlistFixture::new().chip("U1", 0, 1, 0, 1).build();
        insta::assert_snapshot!(render(&side_count_pass(&current, &target, &BTreeSet::new(), &options())), @r"
        remove_pins_from_side U1 left 1->0
        add_pins_to_side U1 bottom 0->1
        remove_pins_from_side U1 right 1->0
        add_pins_to_side U1 top 0->1
        ");
    }

    #[test]
    fn removal_respects_option() {
        let current = NetlistFixture::new().chip("U1", 1, 0, 1, 0).chip("U9", 2, 0, 0, 0).build();
        let target = NetlistFixture::new().chip("U1", 1, 0, 1, 0).build();
        insta::assert_snapshot!(render(&chip_removal_pass(&current, &target, &options())), @"remove_chip U9");
        let keep = AdaptOptions {
            remove_unmatched_chips: false,
            ..AdaptOptions::default()
        };
        assert!(chip_removal_pass(&current, &target, &keep).is_empty());
    }

    #[test]
    fn pin_rules_in_priority_order() {
        let current = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .label(("U1", 1), "VCC")
            .label(("U1", 4), "SPARE")
            .build();
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .resistor("R1")
            .label(("U1", 1), "VCC")
            .label(("U1", 2), "GND")
            .wire(("U1", 3), ("R1", 1))
            .label(("R1", 2), "LED")
            .build();
        insta::assert_snapshot!(render(&pin_level_pass(&current, &target)), @r"
        add_label_to_pin U1.2 GND
        add_passive_with_label_to_pin U1.3 R1 LED
        clear_pin U1.4
        ");
    }

    #[test]
    fn passive_is_scheduled_once() {
        let current = NetlistFixture::new().chip("U1", 2, 0, 2, 0).build();
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .resistor("R1")
            .wire(("U1", 3), ("R1", 1))
            .wire(("U1", 4), ("R1", 2))
            .build();
        insta::assert_snapshot!(render(&pin_level_pass(&current, &target)), @"add_passive_to_pin U1.3 R1");
    }

    #[test]
    fn passive_op_carries_target_entry_pin() {
        let current = NetlistFixture::new().chip("U1", 2, 0, 2, 0).build();
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .resistor("R1")
            .wire(("U1", 1), ("R1", 1))
            .label(("R1", 2), "VCC")
            .build();
        assert_eq!(
            pin_level_pass(&current, &target),
            vec![EditOperation::AddPassiveWithLabelToPin {
                chip_id: "U1".into(),
                pin_number: 1,
                passive_id: Some("R1".into()),
                entry_pin: Some(1),
                net_id: "VCC".into(),
            }]
        );
    }

    #[test]
    fn label_never_shorts_existing_wiring() {
        // R1 went in backwards: U1.1 sits on R1.2, which the target labels.
        let current = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .resistor("R1")
            .wire(("U1", 1), ("R1", 2))
            .label(("R1", 1), "VCC")
            .build();
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .resistor("R1")
            .wire(("U1", 1), ("R1", 1))
            .label(("R1", 2), "VCC")
            .build();
        assert!(pin_level_pass(&current, &target).is_empty());
    }

    #[test]
    fn label_joins_wiring_already_on_the_net() {
        let current = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .chip("U2", 1, 0, 1, 0)
            .wire(("U1", 3), ("U2", 1))
            .build();
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .chip("U2", 1, 0, 1, 0)
            .wire(("U1", 3), ("U2", 1))
            .label(("U2", 1), "OUT")
            .build();
        insta::assert_snapshot!(render(&pin_level_pass(&current, &target)), @r"
        add_label_to_pin U1.3 OUT
        add_label_to_pin U2.1 OUT
        ");
    }

    #[test]
    fn resized_chip_waits_for_side_pass() {
        let current = NetlistFixture::new().chip("U1", 1, 0, 1, 0).build();
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .label(("U1", 1), "VCC")
            .build();
        assert!(pin_level_pass(&current, &target).is_empty());
    }
}
