//! Naming- and order-independent normal form of a [`Netlist`].
//!
//! Boxes are labelled by the order a deterministic traversal first reaches
//! them, starting at the box with the most pins. This is a heuristic
//! canonical labelling rather than graph-isomorphism canonicalization:
//! symmetric structures may be labelled differently depending on ids used as
//! final tie-breakers, but a given input always produces the same output.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use itertools::Itertools;
use pcb_netlist::{Connection, Net, Netlist, NetlistBox, PinCounts, PortReference};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBox {
    pub box_index: usize,
    #[serde(flatten)]
    pub pin_counts: PinCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedNet {
    pub net_index: usize,
}

/// Port reference with ids replaced by indices. The derived ordering puts
/// pins before nets, pins by `(box_index, pin_number)`, nets by index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedPort {
    #[serde(rename_all = "camelCase")]
    Pin { box_index: usize, pin_number: u32 },
    #[serde(rename_all = "camelCase")]
    Net { net_index: usize },
}

impl fmt::Display for NormalizedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedPort::Pin {
                box_index,
                pin_number,
            } => write!(f, "b{box_index}.{pin_number}"),
            NormalizedPort::Net { net_index } => write!(f, "n{net_index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedConnection {
    pub connected_ports: Vec<NormalizedPort>,
}

impl NormalizedConnection {
    /// Comma-joined port list, the sort key for connections.
    pub fn signature(&self) -> String {
        self.connected_ports.iter().join(",")
    }

    pub fn touches_box(&self, box_index: usize) -> bool {
        self.connected_ports
            .iter()
            .any(|p| matches!(p, NormalizedPort::Pin { box_index: b, .. } if *b == box_index))
    }

    pub fn has_net(&self) -> bool {
        self.connected_ports
            .iter()
            .any(|p| matches!(p, NormalizedPort::Net { .. }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedNetlist {
    pub boxes: Vec<NormalizedBox>,
    pub nets: Vec<NormalizedNet>,
    pub connections: Vec<NormalizedConnection>,
}

impl NormalizedNetlist {
    /// The connection containing the given pin, if any.
    pub fn connection_for_pin(&self, box_index: usize, pin_number: u32) -> Option<&NormalizedConnection> {
        let port = NormalizedPort::Pin {
            box_index,
            pin_number,
        };
        self.connections
            .iter()
            .find(|c| c.connected_ports.contains(&port))
    }

    /// Re-materialise as a plain [`Netlist`] with synthetic ids that sort in
    /// index order, so normalizing the result reproduces `self`.
    pub fn to_netlist(&self) -> Netlist {
        self.materialize(synthetic_box_id, synthetic_net_id)
    }

    fn materialize(
        &self,
        box_id: impl Fn(usize) -> String,
        net_id: impl Fn(usize) -> String,
    ) -> Netlist {
        let mut netlist = Netlist::new();
        for b in &self.boxes {
            netlist.add_box(NetlistBox::new(box_id(b.box_index), b.pin_counts));
        }
        for n in &self.nets {
            netlist.add_net(Net::new(net_id(n.net_index)));
        }
        for connection in &self.connections {
            let ports: Vec<PortReference> = connection
                .connected_ports
                .iter()
                .map(|port| match port {
                    NormalizedPort::Pin {
                        box_index,
                        pin_number,
                    } => PortReference::pin(box_id(*box_index), *pin_number),
                    NormalizedPort::Net { net_index } => PortReference::net(net_id(*net_index)),
                })
                .collect();
            netlist.connections.push(Connection::new(ports));
        }
        netlist
    }
}

/// Map a normalized netlist back to the original ids recorded in
/// `transform`. Indices the transform does not know keep a synthetic id.
pub fn denormalize(normalized: &NormalizedNetlist, transform: &NormalizationTransform) -> Netlist {
    normalized.materialize(
        |index| {
            transform
                .box_id(index)
                .map_or_else(|| synthetic_box_id(index), str::to_owned)
        },
        |index| {
            transform
                .net_id(index)
                .map_or_else(|| synthetic_net_id(index), str::to_owned)
        },
    )
}

pub fn synthetic_box_id(index: usize) -> String {
    format!("box{index:06}")
}

pub fn synthetic_net_id(index: usize) -> String {
    format!("net{index:06}")
}

/// Side table mapping original ids to normalized indices (and back).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationTransform {
    pub box_id_to_index: BTreeMap<String, usize>,
    pub net_id_to_index: BTreeMap<String, usize>,
    pub box_index_to_id: Vec<String>,
    pub net_index_to_id: Vec<String>,
}

impl NormalizationTransform {
    pub fn box_index(&self, box_id: &str) -> Option<usize> {
        self.box_id_to_index.get(box_id).copied()
    }

    pub fn net_index(&self, net_id: &str) -> Option<usize> {
        self.net_id_to_index.get(net_id).copied()
    }

    pub fn box_id(&self, box_index: usize) -> Option<&str> {
        self.box_index_to_id.get(box_index).map(String::as_str)
    }

    pub fn net_id(&self, net_index: usize) -> Option<&str> {
        self.net_index_to_id.get(net_index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalization {
    pub netlist: NormalizedNetlist,
    pub transform: NormalizationTransform,
}

/// Traversal order keys. `None` sorts after every reached element.
fn encounter_cmp(a: (Option<usize>, &str), b: (Option<usize>, &str)) -> Ordering {
    let key = |(encounter, id): (Option<usize>, &str)| (encounter.unwrap_or(usize::MAX), id.to_owned());
    key(a).cmp(&key(b))
}

/// Normalize `netlist` into a canonical, index-labelled form.
#[tracing::instrument(level = "trace", skip_all, fields(boxes = netlist.boxes.len()))]
pub fn normalize_netlist(netlist: &Netlist) -> Normalization {
    let (box_encounter, net_encounter) = traverse(netlist);

    let mut box_order: Vec<&NetlistBox> = netlist.boxes.iter().collect();
    box_order.sort_by(|a, b| {
        encounter_cmp(
            (box_encounter.get(a.box_id.as_str()).copied(), a.box_id.as_str()),
            (box_encounter.get(b.box_id.as_str()).copied(), b.box_id.as_str()),
        )
    });
    let mut net_order: Vec<&Net> = netlist.nets.iter().collect();
    net_order.sort_by(|a, b| {
        encounter_cmp(
            (net_encounter.get(a.net_id.as_str()).copied(), a.net_id.as_str()),
            (net_encounter.get(b.net_id.as_str()).copied(), b.net_id.as_str()),
        )
    });

    let mut transform = NormalizationTransform::default();
    let boxes = box_order
        .iter()
        .enumerate()
        .map(|(box_index, b)| {
            transform.box_id_to_index.insert(b.box_id.clone(), box_index);
            transform.box_index_to_id.push(b.box_id.clone());
            NormalizedBox {
                box_index,
                pin_counts: b.pin_counts,
            }
        })
        .collect();
    let nets = net_order
        .iter()
        .enumerate()
        .map(|(net_index, n)| {
            transform.net_id_to_index.insert(n.net_id.clone(), net_index);
            transform.net_index_to_id.push(n.net_id.clone());
            NormalizedNet { net_index }
        })
        .collect();

    let mut connections: Vec<NormalizedConnection> = netlist
        .connections
        .iter()
        .map(|connection| {
            let ports = connection
                .connected_ports
                .iter()
                .filter_map(|port| normalize_port(port, &transform))
                .sorted()
                .dedup()
                .collect();
            NormalizedConnection {
                connected_ports: ports,
            }
        })
        .collect();
    connections.sort_by_cached_key(NormalizedConnection::signature);

    Normalization {
        netlist: NormalizedNetlist {
            boxes,
            nets,
            connections,
        },
        transform,
    }
}

fn normalize_port(port: &PortReference, transform: &NormalizationTransform) -> Option<NormalizedPort> {
    let normalized = match port {
        PortReference::Pin { box_id, pin_number } => transform.box_index(box_id).map(|box_index| {
            NormalizedPort::Pin {
                box_index,
                pin_number: *pin_number,
            }
        }),
        PortReference::Net { net_id } => transform
            .net_index(net_id)
            .map(|net_index| NormalizedPort::Net { net_index }),
    };
    if normalized.is_none() {
        log::warn!("Dropping port {port} that references an undeclared box or net");
    }
    normalized
}

/// Assign encounter indices to boxes and nets.
///
/// Starts at the box with the most pins (smallest id on ties) and expands
/// pins from a stack, smallest pin first. Each expanded pin visits the boxes
/// sharing its connection, ordered by the smallest pin through which they
/// connect.
fn traverse(netlist: &Netlist) -> (HashMap<&str, usize>, HashMap<&str, usize>) {
    let mut box_encounter: HashMap<&str, usize> = HashMap::new();
    let mut net_encounter: HashMap<&str, usize> = HashMap::new();

    let Some(root) = netlist.boxes.iter().min_by(|a, b| {
        b.total_pins()
            .cmp(&a.total_pins())
            .then_with(|| a.box_id.cmp(&b.box_id))
    }) else {
        return (box_encounter, net_encounter);
    };

    let mut connection_of: HashMap<&PortReference, usize> = HashMap::new();
    for (index, connection) in netlist.connections.iter().enumerate() {
        for port in &connection.connected_ports {
            connection_of.entry(port).or_insert(index);
        }
    }
    let pin_count: HashMap<&str, u32> = netlist
        .boxes
        .iter()
        .map(|b| (b.box_id.as_str(), b.total_pins()))
        .collect();

    let mut stack: Vec<(&str, u32)> = Vec::new();
    box_encounter.insert(root.box_id.as_str(), 0);
    for pin in (1..=root.total_pins()).rev() {
        stack.push((root.box_id.as_str(), pin));
    }

    let mut expanded: HashSet<(&str, u32)> = HashSet::new();
    while let Some((box_id, pin)) = stack.pop() {
        if !expanded.insert((box_id, pin)) {
            continue;
        }
        let port = PortReference::pin(box_id, pin);
        let Some(&connection_index) = connection_of.get(&port) else {
            continue;
        };
        let connection = &netlist.connections[connection_index];
        log::trace!("expanding {box_id}.{pin} (connection #{connection_index})");

        for net_id in connection.nets().sorted().dedup() {
            if !net_encounter.contains_key(net_id) {
                let next = net_encounter.len();
                net_encounter.insert(net_id, next);
            }
        }

        let mut neighbors: BTreeMap<&str, u32> = BTreeMap::new();
        for other in &connection.connected_ports {
            if let PortReference::Pin {
                box_id: other_box,
                pin_number,
            } = other
                && other_box != box_id
                && !box_encounter.contains_key(other_box.as_str())
                && pin_count.contains_key(other_box.as_str())
            {
                let smallest = neighbors.entry(other_box.as_str()).or_insert(*pin_number);
                *smallest = (*smallest).min(*pin_number);
            }
        }
        let ordered: Vec<(&str, u32)> = neighbors
            .into_iter()
            .sorted_by(|(a_id, a_pin), (b_id, b_pin)| a_pin.cmp(b_pin).then_with(|| a_id.cmp(b_id)))
            .collect();

        for &(neighbor, _) in &ordered {
            let next = box_encounter.len();
            box_encounter.insert(neighbor, next);
        }
        // Push in reverse so the first-visited neighbour is expanded first.
        for &(neighbor, _) in ordered.iter().rev() {
            let total = pin_count.get(neighbor).copied().unwrap_or(0);
            for pin in (1..=total).rev() {
                stack.push((neighbor, pin));
            }
        }
    }

    (box_encounter, net_encounter)
}
