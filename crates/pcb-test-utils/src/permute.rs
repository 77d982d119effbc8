use std::collections::HashMap;

use pcb_netlist::{Connection, Net, Netlist, NetlistBox, PortReference};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Rename every box and net through the given maps. Ids missing from a map
/// are kept as-is.
pub fn relabel_netlist(
    netlist: &Netlist,
    box_ids: &HashMap<&str, &str>,
    net_ids: &HashMap<&str, &str>,
) -> Netlist {
    let rename_box = |id: &str| box_ids.get(id).copied().unwrap_or(id).to_owned();
    let rename_net = |id: &str| net_ids.get(id).copied().unwrap_or(id).to_owned();

    Netlist {
        boxes: netlist
            .boxes
            .iter()
            .map(|b| NetlistBox::new(rename_box(&b.box_id), b.pin_counts))
            .collect(),
        nets: netlist
            .nets
            .iter()
            .map(|n| Net::new(rename_net(&n.net_id)))
            .collect(),
        connections: netlist
            .connections
            .iter()
            .map(|c| {
                Connection::new(c.connected_ports.iter().map(|port| match port {
                    PortReference::Pin { box_id, pin_number } => {
                        PortReference::pin(rename_box(box_id), *pin_number)
                    }
                    PortReference::Net { net_id } => PortReference::net(rename_net(net_id)),
                }))
            })
            .collect(),
    }
}

/// Shuffle the box, net and connection lists and the ports inside each
/// connection. Deterministic for a given `seed`.
pub fn shuffle_netlist(netlist: &Netlist, seed: u64) -> Netlist {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = netlist.clone();
    shuffled.boxes.shuffle(&mut rng);
    shuffled.nets.shuffle(&mut rng);
    shuffled.connections.shuffle(&mut rng);
    for connection in &mut shuffled.connections {
        connection.connected_ports.shuffle(&mut rng);
    }
    log::trace!("shuffled netlist with seed {seed}");
    shuffled
}
