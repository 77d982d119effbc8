use std::collections::{BTreeSet, HashMap};

use pcb_netlist::{Netlist, NetlistBox, PortReference};
use pcb_sch::natural_string::first_free_id;
use pcb_sch_match::{Matcher, PreparedNetlist};

/// Rename the target's boxes to the template ids they are matched to, so
/// the two netlists can be compared id by id.
///
/// Unmatched target boxes keep their id unless it collides with a template
/// box, in which case they get a fresh `{id}_{n}` id. Net ids are untouched.
pub fn align_target_to_template(template: &Netlist, target: &Netlist, matcher: &Matcher) -> Netlist {
    let candidate = PreparedNetlist::new(template);
    let prepared = PreparedNetlist::new(target);
    let matched = matcher.get_matched_boxes(&candidate, &prepared);

    let mut renames: HashMap<String, String> = matched.id_pairs(&candidate, &prepared).into_iter().collect();
    let mut taken: BTreeSet<String> = template
        .boxes
        .iter()
        .chain(&target.boxes)
        .map(|b| b.box_id.clone())
        .collect();
    for target_box in &target.boxes {
        if renames.contains_key(&target_box.box_id) || template.box_by_id(&target_box.box_id).is_none() {
            continue;
        }
        let fresh = first_free_id(&format!("{}_", target_box.box_id), taken.iter().map(String::as_str));
        taken.insert(fresh.clone());
        renames.insert(target_box.box_id.clone(), fresh);
    }

    for (from, to) in renames.iter().filter(|(from, to)| from != to) {
        log::trace!("aligned target box {from} -> {to}");
    }
    rename_boxes(target, &renames)
}

fn rename_boxes(netlist: &Netlist, renames: &HashMap<String, String>) -> Netlist {
    let rename = |id: &str| renames.get(id).cloned().unwrap_or_else(|| id.to_owned());
    let mut renamed = Netlist::new();
    for netlist_box in &netlist.boxes {
        renamed.add_box(NetlistBox::new(rename(&netlist_box.box_id), netlist_box.pin_counts));
    }
    renamed.nets = netlist.nets.clone();
    renamed.connections = netlist.connections.clone();
    for connection in &mut renamed.connections {
        for port in &mut connection.connected_ports {
            if let PortReference::Pin { box_id, .. } = port {
                *box_id = rename(box_id);
            }
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use pcb_test_utils::NetlistFixture;

    use super::*;

    #[test]
    fn matched_boxes_take_template_ids() {
        let template = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .resistor("R1")
            .wire(("U1", 3), ("R1", 1))
            .build();
        let target = NetlistFixture::new()
            .resistor("RX")
            .chip("IC", 2, 0, 2, 0)
            .wire(("IC", 3), ("RX", 1))
            .build();
        let aligned = align_target_to_template(&template, &target, &Matcher::default());
        assert!(aligned.box_by_id("U1").is_some());
        assert!(aligned.box_by_id("R1").is_some());
        assert!(
            aligned
                .connection_for(&PortReference::pin("U1", 3))
                .unwrap()
                .contains(&PortReference::pin("R1", 1))
        );
    }

    #[test]
    fn unmatched_target_box_avoids_template_ids() {
        let template = NetlistFixture::new().chip("U1", 2, 0, 2, 0).build();
        let target = NetlistFixture::new()
            .chip("U2", 2, 0, 2, 0)
            .chip("U1", 0, 0, 0, 3)
            .label(("U1", 1), "EN")
            .build();
        let aligned = align_target_to_template(&template, &target, &Matcher::default());
        let ids: Vec<_> = aligned.boxes.iter().map(|b| b.box_id.as_str()).collect();
        assert_eq!(ids, ["U1", "U1_1"]);
        assert!(
            aligned
                .connection_for(&PortReference::net("EN"))
                .unwrap()
                .contains(&PortReference::pin("U1_1", 1))
        );
    }
}
