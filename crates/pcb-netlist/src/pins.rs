//! Pin numbering for four-sided boxes.
//!
//! Pins are numbered `1..=N` by walking the sides counter-clockwise starting
//! at the top of the left side: `left` (top to bottom), `bottom` (left to
//! right), `right` (bottom to top), `top` (right to left). Pin `k` on a side
//! is `(sum of preceding side counts) + k`.
//!
//! Everything that translates between a global pin number and a position on
//! a side goes through [`get_pin_side_index`] / [`get_pin_number`]. Do not
//! re-derive the arithmetic elsewhere.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::NetlistError;

/// One of the four sides of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Bottom,
    Right,
    Top,
}

impl Side {
    /// Sides in pin-numbering order.
    pub const ALL_CCW: [Side; 4] = [Side::Left, Side::Bottom, Side::Right, Side::Top];

    pub const fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Bottom => Side::Top,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
        }
    }

    /// Unit vector pointing away from the box on this side (y grows upward).
    pub const fn outward(self) -> (i32, i32) {
        match self {
            Side::Left => (-1, 0),
            Side::Bottom => (0, -1),
            Side::Right => (1, 0),
            Side::Top => (0, 1),
        }
    }

    pub const fn is_horizontal_edge(self) -> bool {
        matches!(self, Side::Bottom | Side::Top)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Bottom => "bottom",
            Side::Right => "right",
            Side::Top => "top",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-side pin counts of a box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinCounts {
    #[serde(rename = "leftPinCount")]
    pub left: u32,
    #[serde(rename = "bottomPinCount")]
    pub bottom: u32,
    #[serde(rename = "rightPinCount")]
    pub right: u32,
    #[serde(rename = "topPinCount")]
    pub top: u32,
}

impl PinCounts {
    pub const fn new(left: u32, bottom: u32, right: u32, top: u32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    pub const fn total(&self) -> u32 {
        self.left + self.bottom + self.right + self.top
    }

    pub const fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Bottom => self.bottom,
            Side::Right => self.right,
            Side::Top => self.top,
        }
    }

    pub fn set(&mut self, side: Side, count: u32) {
        match side {
            Side::Left => self.left = count,
            Side::Bottom => self.bottom = count,
            Side::Right => self.right = count,
            Side::Top => self.top = count,
        }
    }

    /// Copy of `self` with one side replaced.
    pub fn with(mut self, side: Side, count: u32) -> Self {
        self.set(side, count);
        self
    }

    /// Compact `L{l}B{b}R{r}T{t}` form used in signatures and log lines.
    pub fn shape(&self) -> String {
        format!(
            "L{}B{}R{}T{}",
            self.left, self.bottom, self.right, self.top
        )
    }
}

impl fmt::Display for PinCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shape())
    }
}

/// Position of a pin on its side. `index` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinSideIndex {
    pub side: Side,
    #[serde(rename = "indexOnSide")]
    pub index: u32,
}

/// Map a 1-indexed global pin number to its side and index on that side.
pub fn get_pin_side_index(pin_number: u32, counts: &PinCounts) -> Result<PinSideIndex, NetlistError> {
    if pin_number == 0 {
        return Err(NetlistError::PinOutOfBounds {
            pin_number,
            total: counts.total(),
        });
    }
    let mut remaining = pin_number;
    for side in Side::ALL_CCW {
        let count = counts.get(side);
        if remaining <= count {
            return Ok(PinSideIndex {
                side,
                index: remaining,
            });
        }
        remaining -= count;
    }
    Err(NetlistError::PinOutOfBounds {
        pin_number,
        total: counts.total(),
    })
}

/// Inverse of [`get_pin_side_index`].
pub fn get_pin_number(side: Side, index: u32, counts: &PinCounts) -> Result<u32, NetlistError> {
    let count = counts.get(side);
    if index == 0 || index > count {
        return Err(NetlistError::SideIndexOutOfBounds { side, index, count });
    }
    let preceding: u32 = Side::ALL_CCW
        .iter()
        .take_while(|s| **s != side)
        .map(|s| counts.get(*s))
        .sum();
    Ok(preceding + index)
}

/// Iterate every pin of a box as `(pin_number, side, index_on_side)`.
pub fn iter_pins(counts: &PinCounts) -> impl Iterator<Item = (u32, PinSideIndex)> + '_ {
    Side::ALL_CCW
        .into_iter()
        .flat_map(move |side| (1..=counts.get(side)).map(move |index| PinSideIndex { side, index }))
        .zip(1..)
        .map(|(position, number)| (number, position))
}

/// Old pin number to new pin number (`None` when the pin was removed).
pub type PinRenumberMap = BTreeMap<u32, Option<u32>>;

/// Build the renumbering caused by changing a box from `old` to `new` counts.
///
/// Every pin keeps its side and index; pins whose index no longer fits on a
/// shrunk side are removed. Pins on untouched sides are still renumbered when
/// an earlier side changed size.
pub fn build_pin_renumber_map(old: &PinCounts, new: &PinCounts) -> Result<PinRenumberMap, NetlistError> {
    renumber_pins(old, new, |position| Some(position.index))
}

/// Renumbering for inserting a single pin on `side` directly after the pin at
/// `after_index` (0 inserts before the first pin). Returns the new counts too.
pub fn build_pin_insert_map(
    old: &PinCounts,
    side: Side,
    after_index: u32,
) -> Result<(PinCounts, PinRenumberMap), NetlistError> {
    let count = old.get(side);
    if after_index > count {
        return Err(NetlistError::SideIndexOutOfBounds {
            side,
            index: after_index,
            count,
        });
    }
    let new = old.with(side, count + 1);
    let map = renumber_pins(old, &new, |position| {
        if position.side == side && position.index > after_index {
            Some(position.index + 1)
        } else {
            Some(position.index)
        }
    })?;
    Ok((new, map))
}

/// Renumbering for removing the single pin at `index` on `side`; later pins on
/// that side close the gap. Returns the new counts too.
pub fn build_pin_remove_map(
    old: &PinCounts,
    side: Side,
    index: u32,
) -> Result<(PinCounts, PinRenumberMap), NetlistError> {
    let count = old.get(side);
    if index == 0 || index > count {
        return Err(NetlistError::SideIndexOutOfBounds { side, index, count });
    }
    let new = old.with(side, count - 1);
    let map = renumber_pins(old, &new, |position| {
        if position.side != side {
            Some(position.index)
        } else if position.index == index {
            None
        } else if position.index > index {
            Some(position.index - 1)
        } else {
            Some(position.index)
        }
    })?;
    Ok((new, map))
}

fn renumber_pins(
    old: &PinCounts,
    new: &PinCounts,
    mut new_index: impl FnMut(PinSideIndex) -> Option<u32>,
) -> Result<PinRenumberMap, NetlistError> {
    let mut map = PinRenumberMap::new();
    for pin in 1..=old.total() {
        let position = get_pin_side_index(pin, old)?;
        let renumbered = match new_index(position) {
            Some(index) if index >= 1 && index <= new.get(position.side) => {
                Some(get_pin_number(position.side, index, new)?)
            }
            _ => None,
        };
        map.insert(pin, renumbered);
    }
    Ok(map)
}
