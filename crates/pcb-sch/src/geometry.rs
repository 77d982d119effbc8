//! Integer grid geometry. `y` grows upward.

use std::fmt;
use std::ops::{Add, Sub};

use pcb_netlist::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned drawing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "x+")]
    PosX,
    #[serde(rename = "x-")]
    NegX,
    #[serde(rename = "y+")]
    PosY,
    #[serde(rename = "y-")]
    NegY,
}

impl Direction {
    /// Direction of a segment. Diagonal deltas take the dominant axis,
    /// horizontal on ties. `None` for a zero-length delta.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        if dx == 0 && dy == 0 {
            None
        } else if dx.abs() >= dy.abs() {
            Some(if dx > 0 { Direction::PosX } else { Direction::NegX })
        } else {
            Some(if dy > 0 { Direction::PosY } else { Direction::NegY })
        }
    }

    pub fn outward(side: Side) -> Self {
        match side {
            Side::Left => Direction::NegX,
            Side::Bottom => Direction::NegY,
            Side::Right => Direction::PosX,
            Side::Top => Direction::PosY,
        }
    }

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::PosX => (1, 0),
            Direction::NegX => (-1, 0),
            Direction::PosY => (0, 1),
            Direction::NegY => (0, -1),
        }
    }

    pub const fn is_horizontal(self) -> bool {
        matches!(self, Direction::PosX | Direction::NegX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_delta() {
        assert_eq!(Direction::from_delta(3, 0), Some(Direction::PosX));
        assert_eq!(Direction::from_delta(-1, 0), Some(Direction::NegX));
        assert_eq!(Direction::from_delta(1, -4), Some(Direction::NegY));
        assert_eq!(Direction::from_delta(0, 0), None);
    }

    #[test]
    fn outward_matches_side_vector() {
        for side in Side::ALL_CCW {
            assert_eq!(Direction::outward(side).delta(), side.outward());
        }
    }
}
