use pcb_canonical::{NormalizedNetlist, get_pin_shape_signature, synthetic_box_id};
use pcb_netlist::Netlist;

/// Pin-shape signatures for every pin of a normalized netlist, computed once
/// and looked up by the detectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinShapeTable {
    /// `shapes[box_index][pin_number - 1]`
    shapes: Vec<Vec<String>>,
    /// Whether the pin shares a connection with at least one other port.
    connected: Vec<Vec<bool>>,
}

impl PinShapeTable {
    pub fn new(normalized: &NormalizedNetlist) -> Self {
        let netlist: Netlist = normalized.to_netlist();
        let mut table = Self::default();
        for b in &normalized.boxes {
            let box_id = synthetic_box_id(b.box_index);
            let pins = 1..=b.pin_counts.total();
            table.shapes.push(
                pins.clone()
                    .map(|pin| get_pin_shape_signature(&netlist, &box_id, pin))
                    .collect(),
            );
            table.connected.push(
                pins.map(|pin| {
                    normalized
                        .connection_for_pin(b.box_index, pin)
                        .is_some_and(|c| c.connected_ports.len() >= 2)
                })
                .collect(),
            );
        }
        table
    }

    pub fn signature(&self, box_index: usize, pin_number: u32) -> Option<&str> {
        let pin = pin_number.checked_sub(1)? as usize;
        self.shapes.get(box_index)?.get(pin).map(String::as_str)
    }

    pub fn box_signatures(&self, box_index: usize) -> &[String] {
        self.shapes
            .get(box_index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_connected(&self, box_index: usize, pin_number: u32) -> bool {
        pin_number
            .checked_sub(1)
            .and_then(|pin| self.connected.get(box_index)?.get(pin as usize))
            .copied()
            .unwrap_or(false)
    }

    /// `(pin_number, signature)` for each connected pin of a box.
    pub fn connected_pins(&self, box_index: usize) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.box_signatures(box_index)
            .iter()
            .zip(1..)
            .filter(move |(_, pin)| self.is_connected(box_index, *pin))
            .map(|(signature, pin)| (pin, signature.as_str()))
    }
}
