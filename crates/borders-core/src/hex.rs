//! Hex coordinate system for sector maps.
//!
//! Two coordinate forms are used and are kept as distinct types so they
//! cannot be mixed by accident:
//! - `OffsetHex`: 1-based `(column, row)` storage indexing, as printed in
//!   hex labels such as `"0101"`. Hex 0101 sits "above" hex 0201, so even
//!   columns are shifted half a hex down.
//! - `DoubledHex`: `(column, 2 * row + parity(column))`. In this form the six
//!   neighbour steps are the same integer deltas in every column, which is
//!   what the border path geometry relies on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Neighbour steps in doubled form, clockwise starting at north-west.
///
/// ```text
///         1
///     0       2
///         *
///     5       3
///         4
/// ```
pub const DOUBLED_STEPS: [(i32, i32); 6] = [(-1, -1), (0, -2), (1, -1), (1, 1), (0, 2), (-1, 1)];

/// `(|column| + 1) mod 2`: 1 for even columns, 0 for odd ones.
pub const fn column_parity(column: i32) -> i32 {
    (column.abs() + 1) % 2
}

/// Direction of a neighbouring hex in offset form.
///
/// ```text
///       N
///   NW     NE
///       *
///   SW     SE
///       S
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    SouthWest,
    NorthWest,
    North,
    NorthEast,
    SouthEast,
    South,
}

impl Direction {
    /// All directions in index order (0 = south-west, clockwise).
    pub const ALL: [Direction; 6] = [
        Direction::SouthWest,
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::South,
    ];

    /// Direction for an index; any integer is reduced mod 6.
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 6]
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Rotate clockwise by `steps` sixths of a turn.
    pub const fn rotate(self, steps: usize) -> Self {
        Self::from_index(self.index() + steps)
    }

    pub const fn opposite(self) -> Self {
        self.rotate(3)
    }

    /// Index of the same step in [`DOUBLED_STEPS`].
    pub const fn doubled_index(self) -> usize {
        (self.index() + 5) % 6
    }
}

/// Errors produced while parsing hex labels
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("Malformed hex label: {0:?}")]
    Malformed(String),
}

/// Offset coordinate: 1-based column and row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct OffsetHex {
    /// Column (increases going east)
    pub x: i32,
    /// Row (increases going south)
    pub y: i32,
}

impl OffsetHex {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn to_doubled(self) -> DoubledHex {
        DoubledHex::new(self.x, 2 * self.y + column_parity(self.x))
    }

    /// The neighbouring hex in `direction`.
    pub const fn neighbor(self, direction: Direction) -> OffsetHex {
        self.to_doubled().step(direction.doubled_index()).to_offset()
    }

    /// The six neighbouring hexes in direction index order
    pub fn neighbors(self) -> [OffsetHex; 6] {
        Direction::ALL.map(|dir| self.neighbor(dir))
    }

    /// Distance to another hex in hex steps
    pub fn distance_to(&self, other: &OffsetHex) -> u32 {
        self.to_doubled().distance_to(&other.to_doubled())
    }

    /// Four character `"CCRR"` label
    pub fn label(&self) -> String {
        format_hex_label(*self)
    }
}

impl std::fmt::Display for OffsetHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Doubled coordinate, used for border path geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DoubledHex {
    pub x: i32,
    pub y: i32,
}

impl DoubledHex {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Back to offset form. `y - parity` is always even for a valid doubled
    /// coordinate, so the floor division is exact.
    pub const fn to_offset(self) -> OffsetHex {
        OffsetHex::new(self.x, (self.y - column_parity(self.x)).div_euclid(2))
    }

    /// Move one hex along `DOUBLED_STEPS[edge % 6]`.
    pub const fn step(self, edge: usize) -> DoubledHex {
        let (dx, dy) = DOUBLED_STEPS[edge % 6];
        DoubledHex::new(self.x + dx, self.y + dy)
    }

    /// Raw coordinate difference `other - self`
    pub const fn delta_to(&self, other: &DoubledHex) -> (i32, i32) {
        (other.x - self.x, other.y - self.y)
    }

    /// Index into [`DOUBLED_STEPS`] of the step from `self` to `other`, or
    /// `None` if the two hexes are not adjacent.
    pub fn edge_to(&self, other: &DoubledHex) -> Option<usize> {
        edge_index(self.delta_to(other))
    }

    pub fn distance_to(&self, other: &DoubledHex) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx + dy.saturating_sub(dx) / 2
    }
}

/// Look up a raw delta in [`DOUBLED_STEPS`].
pub fn edge_index(delta: (i32, i32)) -> Option<usize> {
    DOUBLED_STEPS.iter().position(|&step| step == delta)
}

/// Parse a `"CCRR"` hex label. Short labels are left-padded with zeros.
pub fn parse_hex_label(label: &str) -> Result<OffsetHex, LabelError> {
    let trimmed = label.trim();
    let padded = format!("{:0>4}", trimmed);
    if padded.len() != 4 || !padded.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LabelError::Malformed(label.to_string()));
    }

    // Both halves are ASCII digits at this point
    let x = padded[0..2].parse().map_err(|_| LabelError::Malformed(label.to_string()))?;
    let y = padded[2..4].parse().map_err(|_| LabelError::Malformed(label.to_string()))?;
    Ok(OffsetHex::new(x, y))
}

/// Format a hex as `"CCRR"`, keeping the last two characters of each
/// zero-padded field.
pub fn format_hex_label(hex: OffsetHex) -> String {
    fn pad2(n: i32) -> String {
        let s = format!("0{}", n);
        s[s.len() - 2..].to_string()
    }
    format!("{}{}", pad2(hex.x), pad2(hex.y))
}
