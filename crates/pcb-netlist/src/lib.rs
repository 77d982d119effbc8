//! Structural netlist model shared by the schematic template pipeline.
//!
//! A [`Netlist`] is three flat lists:
//!
//! * `boxes` – components with four-sided pin counts ([`NetlistBox`]),
//! * `nets` – named signals with no geometry ([`Net`]),
//! * `connections` – sets of [`PortReference`]s that are electrically
//!   identical ([`Connection`]).
//!
//! A port reference appears in at most one connection. [`Netlist::connect`]
//! enforces this by merging connections as ports are joined, which makes the
//! connection list a materialised union-find over ports.

mod error;
pub mod pins;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::NetlistError;
pub use pins::{
    PinCounts, PinRenumberMap, PinSideIndex, Side, build_pin_insert_map, build_pin_remove_map,
    build_pin_renumber_map, get_pin_number, get_pin_side_index, iter_pins,
};

/// A component footprint: an id plus per-side pin counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetlistBox {
    pub box_id: String,
    #[serde(flatten)]
    pub pin_counts: PinCounts,
}

impl NetlistBox {
    pub fn new(box_id: impl Into<String>, pin_counts: PinCounts) -> Self {
        Self {
            box_id: box_id.into(),
            pin_counts,
        }
    }

    pub fn total_pins(&self) -> u32 {
        self.pin_counts.total()
    }

    /// Two pins on opposite sides: the footprint of a series passive.
    pub fn is_passive_shape(&self) -> bool {
        is_passive_shape(&self.pin_counts)
    }
}

/// `L1R1` or `B1T1`.
pub fn is_passive_shape(counts: &PinCounts) -> bool {
    *counts == PinCounts::new(1, 0, 1, 0) || *counts == PinCounts::new(0, 1, 0, 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Net {
    pub net_id: String,
}

impl Net {
    pub fn new(net_id: impl Into<String>) -> Self {
        Self {
            net_id: net_id.into(),
        }
    }
}

/// Pointer-free reference to either a box pin or a net.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortReference {
    #[serde(rename_all = "camelCase")]
    Pin { box_id: String, pin_number: u32 },
    #[serde(rename_all = "camelCase")]
    Net { net_id: String },
}

impl PortReference {
    pub fn pin(box_id: impl Into<String>, pin_number: u32) -> Self {
        PortReference::Pin {
            box_id: box_id.into(),
            pin_number,
        }
    }

    pub fn net(net_id: impl Into<String>) -> Self {
        PortReference::Net {
            net_id: net_id.into(),
        }
    }

    pub fn box_id(&self) -> Option<&str> {
        match self {
            PortReference::Pin { box_id, .. } => Some(box_id),
            PortReference::Net { .. } => None,
        }
    }

    pub fn net_id(&self) -> Option<&str> {
        match self {
            PortReference::Net { net_id } => Some(net_id),
            PortReference::Pin { .. } => None,
        }
    }

    pub fn pin_number(&self) -> Option<u32> {
        match self {
            PortReference::Pin { pin_number, .. } => Some(*pin_number),
            PortReference::Net { .. } => None,
        }
    }

    pub fn is_pin_of(&self, chip: &str) -> bool {
        self.box_id() == Some(chip)
    }

    pub fn is_pin(&self, chip: &str, pin: u32) -> bool {
        matches!(self, PortReference::Pin { box_id, pin_number } if box_id == chip && *pin_number == pin)
    }
}

impl fmt::Display for PortReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortReference::Pin { box_id, pin_number } => write!(f, "{box_id}.{pin_number}"),
            PortReference::Net { net_id } => write!(f, "net:{net_id}"),
        }
    }
}

/// A deduplicated set of mutually joined ports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub connected_ports: Vec<PortReference>,
}

impl Connection {
    pub fn new(ports: impl IntoIterator<Item = PortReference>) -> Self {
        let mut connection = Self::default();
        for port in ports {
            connection.insert(port);
        }
        connection
    }

    pub fn contains(&self, port: &PortReference) -> bool {
        self.connected_ports.contains(port)
    }

    fn insert(&mut self, port: PortReference) {
        if !self.contains(&port) {
            self.connected_ports.push(port);
        }
    }

    pub fn touches_box(&self, box_id: &str) -> bool {
        self.connected_ports.iter().any(|p| p.is_pin_of(box_id))
    }

    pub fn nets(&self) -> impl Iterator<Item = &str> {
        self.connected_ports.iter().filter_map(PortReference::net_id)
    }

    /// A connection only carries information once it joins two ports.
    pub fn is_meaningful(&self) -> bool {
        self.connected_ports.len() >= 2
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Netlist {
    pub boxes: Vec<NetlistBox>,
    pub nets: Vec<Net>,
    pub connections: Vec<Connection>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a box unless one with the same id already exists.
    pub fn add_box(&mut self, netlist_box: NetlistBox) -> &mut Self {
        if self.box_by_id(&netlist_box.box_id).is_none() {
            self.boxes.push(netlist_box);
        }
        self
    }

    /// Adds a net unless one with the same id already exists.
    pub fn add_net(&mut self, net: Net) -> &mut Self {
        if !self.nets.iter().any(|n| n.net_id == net.net_id) {
            self.nets.push(net);
        }
        self
    }

    /// Declare two ports electrically identical, merging connections as
    /// needed so every port stays in at most one connection.
    pub fn connect(&mut self, a: PortReference, b: PortReference) -> &mut Self {
        if a == b {
            return self;
        }
        let a_index = self.connection_index(&a);
        let b_index = self.connection_index(&b);
        match (a_index, b_index) {
            (Some(i), Some(j)) if i == j => {}
            (Some(i), Some(j)) => {
                let (keep, discard) = if i < j { (i, j) } else { (j, i) };
                let merged = self.connections.remove(discard);
                for port in merged.connected_ports {
                    self.connections[keep].insert(port);
                }
            }
            (Some(i), None) => self.connections[i].insert(b),
            (None, Some(j)) => self.connections[j].insert(a),
            (None, None) => self.connections.push(Connection::new([a, b])),
        }
        self
    }

    pub fn box_by_id(&self, box_id: &str) -> Option<&NetlistBox> {
        self.boxes.iter().find(|b| b.box_id == box_id)
    }

    pub fn has_net(&self, net_id: &str) -> bool {
        self.nets.iter().any(|n| n.net_id == net_id)
    }

    pub fn net_ids(&self) -> impl Iterator<Item = &str> {
        self.nets.iter().map(|n| n.net_id.as_str())
    }

    fn connection_index(&self, port: &PortReference) -> Option<usize> {
        self.connections.iter().position(|c| c.contains(port))
    }

    /// The connection containing `port`, if any.
    pub fn connection_for(&self, port: &PortReference) -> Option<&Connection> {
        self.connections.iter().find(|c| c.contains(port))
    }

    /// Connections that include at least one pin of `box_id`.
    pub fn connections_of_box<'a>(&'a self, box_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.touches_box(box_id))
    }

    /// Validate the structural invariants: referenced boxes/nets exist, pin
    /// numbers are in bounds, and no port appears in two connections.
    pub fn validate(&self) -> Result<(), NetlistError> {
        let mut seen: HashSet<&PortReference> = HashSet::new();
        for connection in &self.connections {
            for port in &connection.connected_ports {
                match port {
                    PortReference::Pin { box_id, pin_number } => {
                        let netlist_box = self
                            .box_by_id(box_id)
                            .ok_or_else(|| NetlistError::UnknownBox(box_id.clone()))?;
                        get_pin_side_index(*pin_number, &netlist_box.pin_counts)?;
                    }
                    PortReference::Net { net_id } => {
                        if !self.has_net(net_id) {
                            return Err(NetlistError::UnknownNet(net_id.clone()));
                        }
                    }
                }
                if !seen.insert(port) {
                    return Err(NetlistError::DuplicatePort(port.to_string()));
                }
            }
        }
        Ok(())
    }
}
