//! Perimeter tracing of contiguous same-allegiance regions.
//!
//! The walk follows the wall of a region: from each hex it scans the six
//! neighbours clockwise, starting just past the hex it came from, and moves
//! to the first one that shares the allegiance. It stops once it is back on
//! the start hex and about to re-test a direction already tested there.

use crate::grid::{AllegianceGrid, GridError};
use crate::hex::{Direction, OffsetHex};
use serde::{Deserialize, Serialize};

/// One hex visited by a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStep {
    pub hex: OffsetHex,
    /// Direction moved to reach this hex; `None` for the start hex
    pub direction: Option<Direction>,
}

/// Walk the perimeter of the region containing `start` and return the
/// visited hexes in order.
///
/// A start hex with no same-allegiance neighbour yields a single-hex loop.
pub fn walk(
    grid: &AllegianceGrid,
    start: OffsetHex,
    allegiance: &str,
) -> Result<Vec<OffsetHex>, GridError> {
    walk_with(grid, start, allegiance, |_| {})
}

/// Like [`walk`], invoking `on_step` once per visited hex in walk order.
pub fn walk_with<F>(
    grid: &AllegianceGrid,
    start: OffsetHex,
    allegiance: &str,
    mut on_step: F,
) -> Result<Vec<OffsetHex>, GridError>
where
    F: FnMut(WalkStep),
{
    Ok(walk_steps(grid, start, allegiance)?
        .into_iter()
        .map(|step| {
            on_step(step);
            step.hex
        })
        .collect())
}

/// The full walk, including the direction each hex was entered from.
pub fn walk_steps(
    grid: &AllegianceGrid,
    start: OffsetHex,
    allegiance: &str,
) -> Result<Vec<WalkStep>, GridError> {
    if !grid.in_bounds(start) {
        return Err(GridError::OutOfBounds { x: start.x, y: start.y });
    }

    let mut steps = vec![WalkStep { hex: start, direction: None }];

    // South-west, north-west and north of the start hex were already scanned
    // by whoever found it, so the first direction to try is north-east.
    let mut checked = [true, true, true, false, false, false];
    let mut check_first = Direction::NorthEast.index();
    let mut current = start;

    loop {
        let mut found = None;

        for i in check_first..check_first + 6 {
            let dir = Direction::from_index(i);

            if current == start {
                if checked[dir.index()] {
                    break;
                }
                checked[dir.index()] = true;
            }

            let next = current.neighbor(dir);
            if !grid.in_bounds(next) {
                continue;
            }
            if grid.allegiance(next)? == allegiance {
                found = Some((next, dir));
                break;
            }
        }

        let Some((next, dir)) = found else {
            break;
        };

        steps.push(WalkStep { hex: next, direction: Some(dir) });
        check_first = dir.rotate(4).index();
        current = next;
    }

    Ok(steps)
}

/// First hex owned by `allegiance`, scanning column by column from the
/// top-left corner of the grid.
pub fn find_top_left(grid: &AllegianceGrid, allegiance: &str) -> Option<OffsetHex> {
    grid.hexes()
        .find(|&hex| grid.allegiance(hex).map(|a| a == allegiance).unwrap_or(false))
}
