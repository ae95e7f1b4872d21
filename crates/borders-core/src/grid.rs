//! Per-hex allegiance state for a rectangular block of hexes.

use crate::hex::OffsetHex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allegiance of a hex nobody has claimed
pub const UNALIGNED: &str = "--";

/// Allegiance of worlds that belong to no polity
pub const NON_ALIGNED: &str = "Na";

/// Errors raised by grid operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GridError {
    #[error("Coordinates out of bounds: ({x}, {y})")]
    OutOfBounds { x: i32, y: i32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// State of a single hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexCell {
    /// Whether a world sits in this hex
    pub occupied: bool,
    /// Effective allegiance used by the border algorithms
    pub allegiance: String,
    /// Allegiance code as originally recorded, before normalization
    pub true_allegiance: Option<String>,
    /// Scratch flag used while walking regions
    pub mark: bool,
}

impl Default for HexCell {
    fn default() -> Self {
        Self {
            occupied: false,
            allegiance: UNALIGNED.to_string(),
            true_allegiance: None,
            mark: false,
        }
    }
}

/// Inclusive coordinate bounds of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A `width` x `height` block of hexes whose top-left hex is `origin`.
///
/// Every accessor is bounds checked and fails with [`GridError::OutOfBounds`]
/// rather than clamping. Cells are stored column by column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllegianceGrid {
    width: i32,
    height: i32,
    origin: OffsetHex,
    cells: Vec<HexCell>,
}

impl AllegianceGrid {
    /// Grid with the conventional 1-based origin
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_origin(width, height, OffsetHex::new(1, 1))
    }

    pub fn with_origin(width: i32, height: i32, origin: OffsetHex) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            origin,
            cells: vec![HexCell::default(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn origin(&self) -> OffsetHex {
        self.origin
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            left: self.origin.x,
            top: self.origin.y,
            right: self.origin.x + self.width - 1,
            bottom: self.origin.y + self.height - 1,
        }
    }

    pub fn in_bounds(&self, hex: OffsetHex) -> bool {
        let dx = hex.x - self.origin.x;
        let dy = hex.y - self.origin.y;
        dx >= 0 && dx < self.width && dy >= 0 && dy < self.height
    }

    fn index(&self, hex: OffsetHex) -> Result<usize, GridError> {
        if !self.in_bounds(hex) {
            return Err(GridError::OutOfBounds { x: hex.x, y: hex.y });
        }
        let dx = hex.x - self.origin.x;
        let dy = hex.y - self.origin.y;
        Ok((dx * self.height + dy) as usize)
    }

    pub fn cell(&self, hex: OffsetHex) -> Result<&HexCell, GridError> {
        let idx = self.index(hex)?;
        Ok(&self.cells[idx])
    }

    fn cell_mut(&mut self, hex: OffsetHex) -> Result<&mut HexCell, GridError> {
        let idx = self.index(hex)?;
        Ok(&mut self.cells[idx])
    }

    pub fn is_occupied(&self, hex: OffsetHex) -> Result<bool, GridError> {
        Ok(self.cell(hex)?.occupied)
    }

    pub fn set_occupied(&mut self, hex: OffsetHex, occupied: bool) -> Result<(), GridError> {
        self.cell_mut(hex)?.occupied = occupied;
        Ok(())
    }

    pub fn allegiance(&self, hex: OffsetHex) -> Result<&str, GridError> {
        Ok(&self.cell(hex)?.allegiance)
    }

    /// Original allegiance code, falling back to the effective one when
    /// nothing else was recorded.
    pub fn true_allegiance(&self, hex: OffsetHex) -> Result<&str, GridError> {
        let cell = self.cell(hex)?;
        Ok(cell.true_allegiance.as_deref().unwrap_or(&cell.allegiance))
    }

    /// Set both allegiances of a hex. Passing `None` for the true allegiance
    /// clears any previously recorded code.
    pub fn set_allegiance(
        &mut self,
        hex: OffsetHex,
        effective: &str,
        true_allegiance: Option<&str>,
    ) -> Result<(), GridError> {
        let cell = self.cell_mut(hex)?;
        cell.allegiance = effective.to_string();
        cell.true_allegiance = true_allegiance.map(str::to_string);
        Ok(())
    }

    pub fn is_marked(&self, hex: OffsetHex) -> Result<bool, GridError> {
        Ok(self.cell(hex)?.mark)
    }

    pub fn set_marked(&mut self, hex: OffsetHex, mark: bool) -> Result<(), GridError> {
        self.cell_mut(hex)?.mark = mark;
        Ok(())
    }

    pub fn clear_marks(&mut self) {
        for cell in &mut self.cells {
            cell.mark = false;
        }
    }

    /// Every in-bounds hex, column by column and top to bottom within a column.
    pub fn hexes(&self) -> impl Iterator<Item = OffsetHex> {
        let Bounds { left, top, right, bottom } = self.bounds();
        (left..=right).flat_map(move |x| (top..=bottom).map(move |y| OffsetHex::new(x, y)))
    }

    /// Call `f` for every in-bounds hex in [`hexes`](Self::hexes) order,
    /// stopping at the first error.
    pub fn for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(OffsetHex) -> Result<(), E>,
    {
        for hex in self.hexes() {
            f(hex)?;
        }
        Ok(())
    }

    /// Number of occupied hexes with the given effective allegiance
    pub fn occupied_count(&self, allegiance: &str) -> usize {
        self.cells
            .iter()
            .filter(|c| c.occupied && c.allegiance == allegiance)
            .count()
    }

    /// Reset every cell to unoccupied and unaligned
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            *cell = HexCell::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_unaligned() {
        let grid = AllegianceGrid::new(4, 3);
        assert_eq!(grid.hexes().count(), 12);
        for hex in grid.hexes() {
            assert_eq!(grid.allegiance(hex).unwrap(), UNALIGNED);
            assert!(!grid.is_occupied(hex).unwrap());
            assert!(!grid.is_marked(hex).unwrap());
        }
    }

    #[test]
    fn test_bounds_with_origin() {
        let grid = AllegianceGrid::with_origin(34, 42, OffsetHex::new(0, 0));
        assert_eq!(
            grid.bounds(),
            Bounds { left: 0, top: 0, right: 33, bottom: 41 }
        );
        assert!(grid.in_bounds(OffsetHex::new(0, 0)));
        assert!(grid.in_bounds(OffsetHex::new(33, 41)));
        assert!(!grid.in_bounds(OffsetHex::new(34, 41)));
        assert!(!grid.in_bounds(OffsetHex::new(-1, 5)));
    }

    #[test]
    fn test_out_of_bounds_is_error() {
        let mut grid = AllegianceGrid::new(2, 2);
        let outside = OffsetHex::new(3, 1);
        assert_eq!(
            grid.allegiance(outside),
            Err(GridError::OutOfBounds { x: 3, y: 1 })
        );
        assert!(grid.set_occupied(outside, true).is_err());
        assert!(grid.set_allegiance(OffsetHex::new(0, 1), "Im", None).is_err());
        assert!(grid.is_marked(OffsetHex::new(1, 0)).is_err());
    }

    #[test]
    fn test_true_allegiance_falls_back() {
        let mut grid = AllegianceGrid::new(2, 2);
        let hex = OffsetHex::new(1, 2);
        grid.set_allegiance(hex, "As", Some("A3")).unwrap();
        assert_eq!(grid.allegiance(hex).unwrap(), "As");
        assert_eq!(grid.true_allegiance(hex).unwrap(), "A3");

        grid.set_allegiance(hex, "Im", None).unwrap();
        assert_eq!(grid.true_allegiance(hex).unwrap(), "Im");
    }

    #[test]
    fn test_iteration_order_is_column_major() {
        let grid = AllegianceGrid::new(2, 2);
        let order: Vec<_> = grid.hexes().collect();
        assert_eq!(
            order,
            vec![
                OffsetHex::new(1, 1),
                OffsetHex::new(1, 2),
                OffsetHex::new(2, 1),
                OffsetHex::new(2, 2),
            ]
        );
    }

    #[test]
    fn test_for_each_stops_on_error() {
        let grid = AllegianceGrid::new(3, 3);
        let mut seen = 0;
        let result: Result<(), &str> = grid.for_each(|hex| {
            seen += 1;
            if hex == OffsetHex::new(1, 2) {
                Err("stop")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_occupied_count_and_marks() {
        let mut grid = AllegianceGrid::new(3, 3);
        for hex in [OffsetHex::new(1, 1), OffsetHex::new(2, 2)] {
            grid.set_occupied(hex, true).unwrap();
            grid.set_allegiance(hex, "Zh", None).unwrap();
            grid.set_marked(hex, true).unwrap();
        }
        grid.set_allegiance(OffsetHex::new(3, 3), "Zh", None).unwrap();
        assert_eq!(grid.occupied_count("Zh"), 2);

        grid.clear_marks();
        assert!(grid.hexes().all(|h| !grid.is_marked(h).unwrap()));
    }
}
