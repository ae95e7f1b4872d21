//! Sector-level authoring: loading worlds into a grid, manual claim
//! editing, and extracting the final border loops.

use crate::allegiance::AllegianceRules;
use crate::grid::{AllegianceGrid, GridError, NON_ALIGNED, UNALIGNED};
use crate::hex::{parse_hex_label, Direction, LabelError, OffsetHex};
use crate::output::BorderRecord;
use crate::walker::walk;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Columns in a sector
pub const SECTOR_WIDTH: i32 = 32;

/// Rows in a sector
pub const SECTOR_HEIGHT: i32 = 40;

/// Errors from sector-level operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectorError {
    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("Missing column {0:?} in world data header")]
    MissingColumn(String),
}

/// A world as read from sector data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldRecord {
    /// `"CCRR"` hex label
    pub hex: String,
    /// Raw allegiance code
    pub allegiance: String,
}

impl WorldRecord {
    pub fn new(hex: impl Into<String>, allegiance: impl Into<String>) -> Self {
        Self {
            hex: hex.into(),
            allegiance: allegiance.into(),
        }
    }
}

/// Grid covering one sector plus a one-hex margin on every side, so
/// borders can run off the sector edge.
pub fn sector_grid() -> AllegianceGrid {
    AllegianceGrid::with_origin(SECTOR_WIDTH + 2, SECTOR_HEIGHT + 2, OffsetHex::new(0, 0))
}

/// Whether a hex lies inside the sector proper, excluding the margin
pub fn in_sector(hex: OffsetHex) -> bool {
    (1..=SECTOR_WIDTH).contains(&hex.x) && (1..=SECTOR_HEIGHT).contains(&hex.y)
}

/// Parse tab-delimited sector data. The header row names the columns; only
/// letters of each header are significant and case is ignored, so `Hex`,
/// `hex` and `{Hex}` all name the hex column. A missing allegiance column
/// leaves every allegiance blank.
pub fn parse_tab_delimited(text: &str) -> Result<Vec<WorldRecord>, SectorError> {
    let mut lines = text.lines();
    let header: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split('\t')
        .map(|h| h.to_lowercase().chars().filter(char::is_ascii_lowercase).collect())
        .collect();

    let hex_col = header
        .iter()
        .position(|h| h == "hex")
        .ok_or_else(|| SectorError::MissingColumn("hex".to_string()))?;
    let alleg_col = header.iter().position(|h| h == "allegiance");

    Ok(lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            let field = |i: usize| fields.get(i).copied().unwrap_or_default();
            WorldRecord::new(field(hex_col), alleg_col.map(field).unwrap_or_default())
        })
        .collect())
}

/// Reset `grid` and place every world in it, recording both the effective
/// allegiance from `rules` and the raw code.
pub fn load_worlds(
    grid: &mut AllegianceGrid,
    worlds: &[WorldRecord],
    rules: &AllegianceRules,
) -> Result<(), SectorError> {
    grid.reset();

    for world in worlds {
        let hex = parse_hex_label(&world.hex)?;
        let effective = rules.normalize(&world.allegiance);
        grid.set_occupied(hex, true)?;
        grid.set_allegiance(hex, &effective, Some(&world.allegiance))?;
    }

    debug!(worlds = worlds.len(), "worlds loaded");
    Ok(())
}

/// Manual edit of a single hex. Occupied hexes never change; a claimed hex
/// is released; an unclaimed hex is claimed by neighbour vote.
pub fn toggle_allegiance(grid: &mut AllegianceGrid, hex: OffsetHex) -> Result<bool, GridError> {
    if grid.is_occupied(hex)? {
        return Ok(false);
    }

    if grid.allegiance(hex)? != UNALIGNED {
        grid.set_allegiance(hex, UNALIGNED, None)?;
        return Ok(true);
    }

    claim_by_votes(grid, hex, false)
}

/// Give `hex` the most common allegiance among its claimed neighbours.
///
/// Neighbours outside the grid are ignored, as are neighbours outside the
/// sector proper when `ignore_out_of_sector` is set. On a tie the allegiance
/// seen first (in direction order) wins. Occupied hexes are left alone.
pub fn claim_by_votes(
    grid: &mut AllegianceGrid,
    hex: OffsetHex,
    ignore_out_of_sector: bool,
) -> Result<bool, GridError> {
    if grid.is_occupied(hex)? {
        return Ok(false);
    }

    let mut votes: Vec<(&str, usize)> = Vec::new();
    for dir in Direction::ALL {
        let neighbor = hex.neighbor(dir);
        if ignore_out_of_sector && !in_sector(neighbor) {
            continue;
        }
        if !grid.in_bounds(neighbor) {
            continue;
        }
        let allegiance = grid.allegiance(neighbor)?;
        if allegiance == UNALIGNED {
            continue;
        }
        match votes.iter_mut().find(|(a, _)| *a == allegiance) {
            Some((_, count)) => *count += 1,
            None => votes.push((allegiance, 1)),
        }
    }

    let mut top: Option<(&str, usize)> = None;
    for &(allegiance, count) in &votes {
        if top.map_or(true, |(_, best)| count > best) {
            top = Some((allegiance, count));
        }
    }

    let Some((winner, _)) = top else {
        return Ok(false);
    };
    if grid.allegiance(hex)? == winner {
        return Ok(false);
    }
    let winner = winner.to_string();
    grid.set_allegiance(hex, &winner, None)?;
    Ok(true)
}

/// Vote-claim every margin hex of a [`sector_grid`] from its in-sector
/// neighbours, so borders continue off the edge of the sector.
pub fn claim_edges(grid: &mut AllegianceGrid) -> Result<bool, GridError> {
    let mut changed = false;
    for x in 0..=SECTOR_WIDTH + 1 {
        changed |= claim_by_votes(grid, OffsetHex::new(x, 0), true)?;
        changed |= claim_by_votes(grid, OffsetHex::new(x, SECTOR_HEIGHT + 1), true)?;
    }
    for y in 0..=SECTOR_HEIGHT + 1 {
        changed |= claim_by_votes(grid, OffsetHex::new(0, y), true)?;
        changed |= claim_by_votes(grid, OffsetHex::new(SECTOR_WIDTH + 1, y), true)?;
    }
    Ok(changed)
}

/// Options for [`extract_borders`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Drop loops that trace the inside of a hole in a region
    pub filter_holes: bool,
}

/// A closed border loop of one allegiance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderLoop {
    pub allegiance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub hexes: Vec<OffsetHex>,
}

impl BorderLoop {
    pub fn labels(&self) -> Vec<String> {
        self.hexes.iter().map(OffsetHex::label).collect()
    }

    pub fn to_record(&self) -> BorderRecord {
        let record = BorderRecord::new(&self.allegiance, self.labels());
        match &self.label {
            Some(label) => record.with_label(label, false),
            None => record,
        }
    }

    /// Hole loops are walked so that their closing step heads east, or
    /// straight south.
    fn is_hole(&self) -> bool {
        match self.hexes.as_slice() {
            [.., a, b] => a.x < b.x || (a.x == b.x && a.y < b.y),
            _ => false,
        }
    }
}

/// Walk every region of the grid and return its border loops, sorted by
/// allegiance. Sentinel allegiances are not bordered, and loops of two
/// hexes or fewer are dropped.
pub fn extract_borders(grid: &AllegianceGrid, options: ExtractOptions) -> Result<Vec<BorderLoop>, GridError> {
    let mut borders = Vec::new();
    let mut visited: HashSet<OffsetHex> = HashSet::new();
    let mut last_allegiance = UNALIGNED.to_string();

    for hex in grid.hexes() {
        let allegiance = grid.allegiance(hex)?;

        if allegiance != UNALIGNED
            && allegiance != NON_ALIGNED
            && allegiance != last_allegiance
            && !visited.contains(&hex)
        {
            let hexes = walk(grid, hex, allegiance)?;
            visited.extend(hexes.iter().copied());

            let border = BorderLoop {
                allegiance: allegiance.to_string(),
                label: None,
                hexes,
            };
            if !(options.filter_holes && border.is_hole()) {
                borders.push(border);
            }
        }

        last_allegiance.clear();
        last_allegiance.push_str(allegiance);
    }

    borders.sort_by(|a, b| a.allegiance.cmp(&b.allegiance));
    borders.retain(|b| b.hexes.len() > 2);

    debug!(borders = borders.len(), "borders extracted");
    Ok(borders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn claim(grid: &mut AllegianceGrid, hexes: &[(i32, i32)], allegiance: &str) {
        for &(x, y) in hexes {
            grid.set_allegiance(OffsetHex::new(x, y), allegiance, None).unwrap();
        }
    }

    #[test]
    fn test_sector_grid_extent() {
        let grid = sector_grid();
        let bounds = grid.bounds();
        assert_eq!((bounds.left, bounds.top, bounds.right, bounds.bottom), (0, 0, 33, 41));
        assert!(in_sector(OffsetHex::new(1, 1)));
        assert!(in_sector(OffsetHex::new(32, 40)));
        assert!(!in_sector(OffsetHex::new(0, 5)));
        assert!(!in_sector(OffsetHex::new(5, 41)));
    }

    #[test]
    fn test_parse_tab_delimited() {
        let text = "Hex\tName\t{Allegiance}\n0101\tRegina\tImDd\n\n0202\tEfate\t\n";
        let worlds = parse_tab_delimited(text).unwrap();
        assert_eq!(
            worlds,
            vec![WorldRecord::new("0101", "ImDd"), WorldRecord::new("0202", "")]
        );
    }

    #[test]
    fn test_parse_tab_delimited_needs_hex() {
        assert_eq!(
            parse_tab_delimited("Name\tAllegiance\nRegina\tIm\n"),
            Err(SectorError::MissingColumn("hex".into()))
        );
    }

    #[test]
    fn test_load_worlds_normalizes() {
        let mut grid = sector_grid();
        grid.set_allegiance(OffsetHex::new(9, 9), "Zh", None).unwrap();

        let worlds = vec![WorldRecord::new("0101", "ImDd"), WorldRecord::new("3240", "A3")];
        load_worlds(&mut grid, &worlds, &AllegianceRules::default()).unwrap();

        let regina = OffsetHex::new(1, 1);
        assert!(grid.is_occupied(regina).unwrap());
        assert_eq!(grid.allegiance(regina).unwrap(), "Im");
        assert_eq!(grid.true_allegiance(regina).unwrap(), "ImDd");
        assert_eq!(grid.allegiance(OffsetHex::new(32, 40)).unwrap(), "As");
        // Previous state is wiped
        assert_eq!(grid.allegiance(OffsetHex::new(9, 9)).unwrap(), UNALIGNED);
    }

    #[test]
    fn test_load_worlds_errors() {
        let mut grid = sector_grid();
        let rules = AllegianceRules::default();

        let bad_label = load_worlds(&mut grid, &[WorldRecord::new("01x1", "Im")], &rules);
        assert!(matches!(bad_label, Err(SectorError::Label(_))));

        let outside = load_worlds(&mut grid, &[WorldRecord::new("9999", "Im")], &rules);
        assert_eq!(outside, Err(SectorError::Grid(GridError::OutOfBounds { x: 99, y: 99 })));
    }

    #[test]
    fn test_toggle_allegiance() {
        let mut grid = AllegianceGrid::new(8, 8);
        let world = OffsetHex::new(4, 4);
        grid.set_occupied(world, true).unwrap();
        grid.set_allegiance(world, "Im", None).unwrap();

        // Occupied hexes are fixed
        assert!(!toggle_allegiance(&mut grid, world).unwrap());

        // Unclaimed next to Im gets claimed
        let empty = world.neighbor(Direction::North);
        assert!(toggle_allegiance(&mut grid, empty).unwrap());
        assert_eq!(grid.allegiance(empty).unwrap(), "Im");

        // Claimed gets released
        assert!(toggle_allegiance(&mut grid, empty).unwrap());
        assert_eq!(grid.allegiance(empty).unwrap(), UNALIGNED);

        // Nothing to vote for
        assert!(!toggle_allegiance(&mut grid, OffsetHex::new(1, 8)).unwrap());
    }

    #[test]
    fn test_claim_by_votes_plurality() {
        let mut grid = AllegianceGrid::new(8, 8);
        let target = OffsetHex::new(4, 4);
        let n = target.neighbors();
        claim(&mut grid, &[(n[0].x, n[0].y)], "Zh");
        claim(&mut grid, &[(n[2].x, n[2].y), (n[4].x, n[4].y)], "Im");

        assert!(claim_by_votes(&mut grid, target, false).unwrap());
        assert_eq!(grid.allegiance(target).unwrap(), "Im");
    }

    #[test]
    fn test_claim_by_votes_tie_goes_to_first_seen() {
        let mut grid = AllegianceGrid::new(8, 8);
        let target = OffsetHex::new(4, 4);
        let n = target.neighbors();
        claim(&mut grid, &[(n[1].x, n[1].y)], "Zh");
        claim(&mut grid, &[(n[3].x, n[3].y)], "Im");

        assert!(claim_by_votes(&mut grid, target, false).unwrap());
        assert_eq!(grid.allegiance(target).unwrap(), "Zh");
    }

    #[test]
    fn test_claim_edges_uses_sector_neighbours_only() {
        let mut grid = sector_grid();
        claim(&mut grid, &[(1, 5), (1, 6)], "Im");
        // A margin claim must not spread along the margin
        claim(&mut grid, &[(0, 20)], "Zh");

        assert!(claim_edges(&mut grid).unwrap());
        assert_eq!(grid.allegiance(OffsetHex::new(0, 5)).unwrap(), "Im");
        assert_eq!(grid.allegiance(OffsetHex::new(0, 21)).unwrap(), UNALIGNED);
        assert_eq!(grid.allegiance(OffsetHex::new(0, 30)).unwrap(), UNALIGNED);

        // Nothing left to claim
        assert!(!claim_edges(&mut grid).unwrap());
    }

    #[test]
    fn test_extract_borders_sorted_and_filtered() {
        let mut grid = AllegianceGrid::new(12, 12);
        claim(&mut grid, &[(8, 2), (8, 3), (9, 3)], "Zh");
        claim(&mut grid, &[(2, 2), (2, 3), (3, 2), (3, 3)], "Im");
        // Single-hex loop is dropped
        claim(&mut grid, &[(6, 9)], "As");
        // Sentinel is never bordered
        claim(&mut grid, &[(10, 10), (10, 11), (11, 10)], NON_ALIGNED);

        let borders = extract_borders(&grid, ExtractOptions::default()).unwrap();
        let names: Vec<_> = borders.iter().map(|b| b.allegiance.as_str()).collect();
        assert_eq!(names, vec!["Im", "Zh"]);

        for border in &borders {
            assert_eq!(border.hexes.first(), border.hexes.last());
            for pair in border.hexes.windows(2) {
                assert_eq!(pair[0].distance_to(&pair[1]), 1);
            }
        }
    }

    #[test]
    fn test_extract_visits_each_region_once() {
        let mut grid = AllegianceGrid::new(10, 10);
        claim(&mut grid, &[(3, 3), (3, 4), (3, 5), (4, 3), (4, 4), (5, 4), (6, 5), (5, 5)], "Im");

        let borders = extract_borders(&grid, ExtractOptions::default()).unwrap();
        assert_eq!(borders.len(), 1);
        assert_eq!(borders[0].labels()[0], "0303");
    }

    #[test]
    fn test_hole_filter() {
        let hole = BorderLoop {
            allegiance: "Im".into(),
            label: None,
            hexes: vec![OffsetHex::new(4, 4), OffsetHex::new(5, 4), OffsetHex::new(6, 4)],
        };
        assert!(hole.is_hole());

        let outer = BorderLoop {
            allegiance: "Im".into(),
            label: None,
            hexes: vec![OffsetHex::new(3, 3), OffsetHex::new(3, 4), OffsetHex::new(3, 3)],
        };
        assert!(!outer.is_hole());
    }

    #[test]
    fn test_to_record() {
        let border = BorderLoop {
            allegiance: "Im".into(),
            label: None,
            hexes: vec![OffsetHex::new(1, 1), OffsetHex::new(1, 2), OffsetHex::new(1, 1)],
        };
        let record = border.to_record();
        assert_eq!(record.allegiance, "Im");
        assert_eq!(record.path, vec!["0101", "0102", "0101"]);
        assert_eq!(record.label, None);
    }
}
