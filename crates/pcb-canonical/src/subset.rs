//! Pin subset netlists and pin-shape signatures.
//!
//! The subset netlist of a pin keeps only that pin (as a single-pin box) and
//! the connection touching it, together with the boxes and nets on the other
//! end. Its normalized rendering is the pin's *shape*: two pins have the same
//! signature exactly when their one-hop wiring neighbourhoods match.

use itertools::Itertools;
use pcb_netlist::{Connection, Net, Netlist, NetlistBox, PinCounts, PortReference};

use crate::normalize::{NormalizedNetlist, normalize_netlist};

/// Suffix given to a box that shows up on both ends of a pin's connection
/// (a pin shorted to other pins of its own box).
const SELF_BOX_SUFFIX: &str = "'";

/// Build the subset netlist for pin `pin_number` of `box_id`.
///
/// The focus pin becomes pin 1 of a `L1B0R0T0` box that keeps the original
/// id. Other boxes in the connection keep their full pin counts.
pub fn get_pin_subset_netlist(netlist: &Netlist, box_id: &str, pin_number: u32) -> Netlist {
    let mut subset = Netlist::new();
    subset.add_box(NetlistBox::new(box_id, PinCounts::new(1, 0, 0, 0)));

    let focus = PortReference::pin(box_id, pin_number);
    let Some(connection) = netlist.connection_for(&focus) else {
        return subset;
    };

    let mut ports = vec![PortReference::pin(box_id, 1)];
    for port in &connection.connected_ports {
        match port {
            PortReference::Pin {
                box_id: other,
                pin_number: other_pin,
            } => {
                if port == &focus {
                    continue;
                }
                let Some(other_box) = netlist.box_by_id(other) else {
                    continue;
                };
                let subset_id = if other == box_id {
                    format!("{other}{SELF_BOX_SUFFIX}")
                } else {
                    other.clone()
                };
                subset.add_box(NetlistBox::new(subset_id.clone(), other_box.pin_counts));
                ports.push(PortReference::pin(subset_id, *other_pin));
            }
            PortReference::Net { net_id } => {
                subset.add_net(Net::new(net_id.clone()));
                ports.push(port.clone());
            }
        }
    }
    if ports.len() >= 2 {
        subset.connections.push(Connection::new(ports));
    }
    subset
}

/// Render a normalized netlist as `L{l}B{b}R{r}T{t}` per box (comma
/// separated) followed by `|C[...]` per connection.
pub fn render_signature(normalized: &NormalizedNetlist) -> String {
    let boxes = normalized
        .boxes
        .iter()
        .map(|b| b.pin_counts.shape())
        .join(",");
    let connections: String = normalized
        .connections
        .iter()
        .map(|c| format!("|C[{}]", c.signature()))
        .collect();
    format!("{boxes}{connections}")
}

/// Pin-shape signature of pin `pin_number` on `box_id`.
pub fn get_pin_shape_signature(netlist: &Netlist, box_id: &str, pin_number: u32) -> String {
    let subset = get_pin_subset_netlist(netlist, box_id, pin_number);
    render_signature(&normalize_netlist(&subset).netlist)
}

/// Number of ports joined to the pin (0 when it is unconnected).
pub fn pin_connection_count(netlist: &Netlist, box_id: &str, pin_number: u32) -> usize {
    netlist
        .connection_for(&PortReference::pin(box_id, pin_number))
        .map(|c| c.connected_ports.len().saturating_sub(1))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netlist() -> Netlist {
        let mut netlist = Netlist::new();
        netlist
            .add_box(NetlistBox::new("U1", PinCounts::new(2, 0, 2, 0)))
            .add_box(NetlistBox::new("R1", PinCounts::new(1, 0, 1, 0)))
            .add_box(NetlistBox::new("U2", PinCounts::new(1, 0, 1, 0)))
            .add_net(Net::new("GND"));
        netlist
            .connect(PortReference::pin("U1", 1), PortReference::pin("R1", 1))
            .connect(PortReference::pin("U1", 4), PortReference::net("GND"))
            .connect(PortReference::pin("U2", 2), PortReference::pin("R1", 1));
        netlist
    }

    #[test]
    fn subset_keeps_only_the_touching_connection() {
        let subset = get_pin_subset_netlist(&netlist(), "U1", 1);
        assert_eq!(subset.boxes.len(), 3);
        assert_eq!(subset.boxes[0].pin_counts, PinCounts::new(1, 0, 0, 0));
        assert!(subset.nets.is_empty());
        assert_eq!(subset.connections.len(), 1);
        assert_eq!(subset.connections[0].connected_ports.len(), 3);
    }

    #[test]
    fn unconnected_pin_is_a_lone_box() {
        insta::assert_snapshot!(get_pin_shape_signature(&netlist(), "U1", 2), @"L1B0R0T0");
    }

    #[test]
    fn label_pin_signature() {
        insta::assert_snapshot!(get_pin_shape_signature(&netlist(), "U1", 4), @"L1B0R0T0|C[b0.1,n0]");
    }

    #[test]
    fn passive_pin_signature() {
        // Both passives tie with two pins; "R1" < "U2" so R1 is the root and
        // U1 is reached through the smaller pin.
        insta::assert_snapshot!(
            get_pin_shape_signature(&netlist(), "U1", 1),
            @"L1B0R1T0,L1B0R0T0,L1B0R1T0|C[b0.1,b1.1,b2.2]"
        );
    }

    #[test]
    fn identical_neighbourhoods_share_a_signature() {
        let mut netlist = netlist();
        netlist
            .add_net(Net::new("VCC"))
            .connect(PortReference::pin("U1", 2), PortReference::net("VCC"));
        assert_eq!(
            get_pin_shape_signature(&netlist, "U1", 2),
            get_pin_shape_signature(&netlist, "U1", 4)
        );
    }

    #[test]
    fn pin_shorted_to_own_box() {
        let mut netlist = netlist();
        netlist.connect(PortReference::pin("U1", 2), PortReference::pin("U1", 3));
        let subset = get_pin_subset_netlist(&netlist, "U1", 2);
        assert_eq!(subset.boxes[1].box_id, "U1'");
        assert_eq!(subset.boxes[1].pin_counts, PinCounts::new(2, 0, 2, 0));
    }

    #[test]
    fn connection_count_excludes_self() {
        let netlist = netlist();
        assert_eq!(pin_connection_count(&netlist, "U1", 1), 2);
        assert_eq!(pin_connection_count(&netlist, "U1", 2), 0);
    }
}
