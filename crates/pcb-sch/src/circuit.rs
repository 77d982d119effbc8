//! The mutable working graph behind a schematic.
//!
//! A [`Circuit`] is an arena of chips, wire segments, net labels and
//! connection points. Geometry lives on the elements, topology lives only in
//! their [`PortReference`]s: a [`Line`] belongs to the pin in its `pin_ref`,
//! a [`NetLabel`] joins `from_ref` to its net and a [`ConnectionPoint`] joins
//! `pin_ref` to `joined_ref`. Renumbering a chip's pins is therefore a pass
//! that rewrites references, never a geometric search.

use std::collections::BTreeSet;

use pcb_netlist::{
    Net, NetlistError, Netlist, NetlistBox, PinCounts, PinSideIndex, PortReference, Side,
    get_pin_side_index, iter_pins,
};
use serde::{Deserialize, Serialize};

use crate::SchError;
use crate::geometry::{Direction, Point};

/// Per-pin drawing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinBuilder {
    pub pin_number: u32,
    pub side: Side,
    pub index_on_side: u32,
    /// Absolute position of the pin on the chip outline.
    pub position: Point,
    /// End of the wire drawn from this pin so far.
    pub cursor: Point,
    pub last_direction: Option<Direction>,
}

impl PinBuilder {
    fn fresh(pin_number: u32, side_index: PinSideIndex, position: Point) -> Self {
        Self {
            pin_number,
            side: side_index.side,
            index_on_side: side_index.index,
            position,
            cursor: position,
            last_direction: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chip {
    pub chip_id: String,
    #[serde(flatten)]
    pub pin_counts: PinCounts,
    /// Bottom-left corner.
    pub position: Point,
    #[serde(default)]
    pub is_passive: bool,
    pub pins: Vec<PinBuilder>,
}

impl Chip {
    pub fn new(chip_id: impl Into<String>, pin_counts: PinCounts, position: Point, is_passive: bool) -> Self {
        let mut chip = Self {
            chip_id: chip_id.into(),
            pin_counts,
            position,
            is_passive,
            pins: Vec::new(),
        };
        chip.pins = iter_pins(&pin_counts)
            .map(|(number, side_index)| PinBuilder::fresh(number, side_index, chip.position_of(side_index)))
            .collect();
        chip
    }

    pub fn width(&self) -> i32 {
        self.pin_counts.bottom.max(self.pin_counts.top) as i32 + 1
    }

    pub fn height(&self) -> i32 {
        self.pin_counts.left.max(self.pin_counts.right) as i32 + 1
    }

    fn position_of(&self, side_index: PinSideIndex) -> Point {
        let Point { x, y } = self.position;
        let (w, h) = (self.width(), self.height());
        let k = side_index.index as i32;
        match side_index.side {
            Side::Left => Point::new(x, y + h - k),
            Side::Bottom => Point::new(x + k, y),
            Side::Right => Point::new(x + w, y + k),
            Side::Top => Point::new(x + w - k, y + h),
        }
    }

    /// Absolute position of a pin derived from the current counts.
    pub fn pin_position(&self, pin_number: u32) -> Result<Point, NetlistError> {
        Ok(self.position_of(get_pin_side_index(pin_number, &self.pin_counts)?))
    }

    pub fn pin(&self, pin_number: u32) -> Option<&PinBuilder> {
        self.pins.get(pin_number.checked_sub(1)? as usize)
    }

    pub(crate) fn pin_mut(&mut self, pin_number: u32) -> Option<&mut PinBuilder> {
        self.pins.get_mut(pin_number.checked_sub(1)? as usize)
    }

    pub fn total_pins(&self) -> u32 {
        self.pin_counts.total()
    }

    pub fn to_box(&self) -> NetlistBox {
        NetlistBox::new(self.chip_id.clone(), self.pin_counts)
    }
}

/// A wire segment drawn from a pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub pin_ref: PortReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetLabel {
    pub label_id: String,
    pub net_id: String,
    pub position: Point,
    pub from_ref: PortReference,
}

/// Marks the spot where the wire of `pin_ref` lands on `joined_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPoint {
    pub position: Point,
    pub pin_ref: PortReference,
    pub joined_ref: PortReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub chips: Vec<Chip>,
    pub lines: Vec<Line>,
    pub net_labels: Vec<NetLabel>,
    pub connection_points: Vec<ConnectionPoint>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chip(&self, chip_id: &str) -> Option<&Chip> {
        self.chips.iter().find(|c| c.chip_id == chip_id)
    }

    pub(crate) fn chip_mut(&mut self, chip_id: &str) -> Option<&mut Chip> {
        self.chips.iter_mut().find(|c| c.chip_id == chip_id)
    }

    pub fn has_chip(&self, chip_id: &str) -> bool {
        self.chip(chip_id).is_some()
    }

    pub fn chip_ids(&self) -> impl Iterator<Item = &str> {
        self.chips.iter().map(|c| c.chip_id.as_str())
    }

    /// Ids of the chips flagged as passives.
    pub fn passive_ids(&self) -> BTreeSet<&str> {
        self.chips
            .iter()
            .filter(|c| c.is_passive)
            .map(|c| c.chip_id.as_str())
            .collect()
    }

    pub fn insert_chip(&mut self, chip: Chip) -> Result<(), SchError> {
        if self.has_chip(&chip.chip_id) {
            return Err(SchError::DuplicateChip(chip.chip_id));
        }
        self.chips.push(chip);
        Ok(())
    }

    /// Resolve a pin, failing on an unknown chip or an out-of-range number.
    pub fn pin_builder(&self, chip_id: &str, pin_number: u32) -> Result<&PinBuilder, SchError> {
        let chip = self
            .chip(chip_id)
            .ok_or_else(|| SchError::UnknownChip(chip_id.to_owned()))?;
        chip.pin(pin_number).ok_or_else(|| {
            NetlistError::PinOutOfBounds {
                pin_number,
                total: chip.total_pins(),
            }
            .into()
        })
    }

    pub(crate) fn pin_builder_mut(&mut self, chip_id: &str, pin_number: u32) -> Result<&mut PinBuilder, SchError> {
        let chip = self
            .chip_mut(chip_id)
            .ok_or_else(|| SchError::UnknownChip(chip_id.to_owned()))?;
        let total = chip.total_pins();
        chip.pin_mut(pin_number)
            .ok_or_else(|| NetlistError::PinOutOfBounds { pin_number, total }.into())
    }

    /// Snapshot the topology as a [`Netlist`]. Every chip becomes a box,
    /// every label a net, and labels and connection points are joined with
    /// [`Netlist::connect`].
    pub fn get_netlist(&self) -> Netlist {
        let mut netlist = Netlist::new();
        for chip in &self.chips {
            netlist.add_box(chip.to_box());
        }
        for label in &self.net_labels {
            netlist.add_net(Net::new(label.net_id.clone()));
        }
        for label in &self.net_labels {
            netlist.connect(label.from_ref.clone(), PortReference::net(label.net_id.clone()));
        }
        for point in &self.connection_points {
            netlist.connect(point.pin_ref.clone(), point.joined_ref.clone());
        }
        netlist
    }

    pub fn labels_on<'a>(&'a self, pin_ref: &'a PortReference) -> impl Iterator<Item = &'a NetLabel> + 'a {
        self.net_labels.iter().filter(move |l| &l.from_ref == pin_ref)
    }

    /// Whether any line, label or connection point names the pin.
    pub fn is_pin_wired(&self, pin_ref: &PortReference) -> bool {
        self.lines.iter().any(|l| &l.pin_ref == pin_ref)
            || self.net_labels.iter().any(|l| &l.from_ref == pin_ref)
            || self
                .connection_points
                .iter()
                .any(|p| &p.pin_ref == pin_ref || &p.joined_ref == pin_ref)
    }

    /// Visit every reference held by a line, label or connection point.
    pub fn for_each_ref_mut(&mut self, mut f: impl FnMut(&mut PortReference)) {
        for line in &mut self.lines {
            f(&mut line.pin_ref);
        }
        for label in &mut self.net_labels {
            f(&mut label.from_ref);
        }
        for point in &mut self.connection_points {
            f(&mut point.pin_ref);
            f(&mut point.joined_ref);
        }
    }

    /// Drop every element holding a reference for which `keep` is false.
    /// Returns the number of removed elements.
    pub fn retain_elements(&mut self, keep: impl Fn(&PortReference) -> bool) -> usize {
        let before = self.element_count();
        self.lines.retain(|l| keep(&l.pin_ref));
        self.net_labels.retain(|l| keep(&l.from_ref));
        self.connection_points
            .retain(|p| keep(&p.pin_ref) && keep(&p.joined_ref));
        before - self.element_count()
    }

    fn element_count(&self) -> usize {
        self.lines.len() + self.net_labels.len() + self.connection_points.len()
    }

    /// Translate every element owned by `pin_ref` by `delta`.
    pub(crate) fn translate_owned(&mut self, pin_ref: &PortReference, delta: Point) {
        if delta == Point::default() {
            return;
        }
        for line in self.lines.iter_mut().filter(|l| &l.pin_ref == pin_ref) {
            line.start = line.start + delta;
            line.end = line.end + delta;
        }
        for label in self.net_labels.iter_mut().filter(|l| &l.from_ref == pin_ref) {
            label.position = label.position + delta;
        }
        for point in self
            .connection_points
            .iter_mut()
            .filter(|p| &p.pin_ref == pin_ref)
        {
            point.position = point.position + delta;
        }
    }

    /// Pin references that name a missing chip or a pin beyond its count.
    pub fn dangling_refs(&self) -> Vec<PortReference> {
        let lines = self.lines.iter().map(|l| &l.pin_ref);
        let labels = self.net_labels.iter().map(|l| &l.from_ref);
        let points = self
            .connection_points
            .iter()
            .flat_map(|p| [&p.pin_ref, &p.joined_ref]);
        lines
            .chain(labels)
            .chain(points)
            .filter(|r| match r {
                PortReference::Pin { box_id, pin_number } => self
                    .chip(box_id)
                    .is_none_or(|c| *pin_number == 0 || *pin_number > c.total_pins()),
                PortReference::Net { .. } => false,
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_walk_the_outline_counter_clockwise() {
        let chip = Chip::new("U1", PinCounts::new(2, 1, 2, 1), Point::new(10, 20), false);
        assert_eq!((chip.width(), chip.height()), (2, 3));
        let positions: Vec<Point> = chip.pins.iter().map(|p| p.position).collect();
        assert_eq!(
            positions,
            [
                Point::new(10, 22),
                Point::new(10, 21),
                Point::new(11, 20),
                Point::new(12, 21),
                Point::new(12, 22),
                Point::new(11, 23),
            ]
        );
        assert_eq!(chip.pin(4).map(|p| p.side), Some(Side::Right));
        assert!(chip.pin(0).is_none());
        assert!(chip.pin(7).is_none());
    }

    #[test]
    fn netlist_joins_labels_and_connection_points() {
        let mut circuit = Circuit::new();
        circuit
            .insert_chip(Chip::new("U1", PinCounts::new(1, 0, 1, 0), Point::default(), false))
            .unwrap();
        circuit
            .insert_chip(Chip::new("U2", PinCounts::new(1, 0, 1, 0), Point::new(4, 0), false))
            .unwrap();
        circuit.net_labels.push(NetLabel {
            label_id: "L1".into(),
            net_id: "GND".into(),
            position: Point::new(-1, 1),
            from_ref: PortReference::pin("U1", 1),
        });
        circuit.connection_points.push(ConnectionPoint {
            position: Point::new(4, 1),
            pin_ref: PortReference::pin("U1", 2),
            joined_ref: PortReference::pin("U2", 1),
        });

        let netlist = circuit.get_netlist();
        assert_eq!(netlist.boxes.len(), 2);
        assert!(netlist.has_net("GND"));
        assert_eq!(netlist.connections.len(), 2);
        netlist.validate().unwrap();
    }

    #[test]
    fn duplicate_chip_is_rejected() {
        let mut circuit = Circuit::new();
        let chip = Chip::new("U1", PinCounts::new(1, 0, 0, 0), Point::default(), false);
        circuit.insert_chip(chip.clone()).unwrap();
        assert_eq!(
            circuit.insert_chip(chip),
            Err(SchError::DuplicateChip("U1".into()))
        );
    }

    #[test]
    fn dangling_refs_reports_missing_pins() {
        let mut circuit = Circuit::new();
        circuit
            .insert_chip(Chip::new("U1", PinCounts::new(1, 0, 0, 0), Point::default(), false))
            .unwrap();
        circuit.lines.push(Line {
            start: Point::default(),
            end: Point::new(-1, 0),
            pin_ref: PortReference::pin("U1", 2),
        });
        circuit.lines.push(Line {
            start: Point::default(),
            end: Point::new(-1, 0),
            pin_ref: PortReference::pin("U9", 1),
        });
        assert_eq!(
            circuit.dangling_refs(),
            [PortReference::pin("U1", 2), PortReference::pin("U9", 1)]
        );
    }
}
