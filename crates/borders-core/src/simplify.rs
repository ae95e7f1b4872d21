//! Region simplification.
//!
//! Turns a raw per-hex claim map into a clean political silhouette for one
//! allegiance: claim everything unclaimed, then alternately erode thin
//! outliers and break long empty spans until nothing changes, then bridge
//! single-hex gaps.

use crate::grid::{AllegianceGrid, GridError, NON_ALIGNED, UNALIGNED};
use crate::hex::{Direction, OffsetHex};
use crate::walker::walk_steps;
use tracing::trace;

/// How far back from the end of a straight empty run the break is placed.
/// Also the minimum straight run length before a break is allowed.
pub const BREAK_OFFSET: usize = 2;

/// Neighbour run length used by [`process_allegiance`] when eroding
pub const ERODE_THRESHOLD: usize = 3;

/// Empty span length used by [`process_allegiance`] when breaking spans
pub const SPAN_THRESHOLD: usize = 4;

/// Claim every `UNALIGNED` hex for `allegiance`. Returns whether anything
/// changed.
pub fn claim_all_unclaimed(grid: &mut AllegianceGrid, allegiance: &str) -> Result<bool, GridError> {
    let unclaimed: Vec<OffsetHex> = grid
        .hexes()
        .filter(|&hex| grid.allegiance(hex).map(|a| a == UNALIGNED).unwrap_or(false))
        .collect();

    for &hex in &unclaimed {
        grid.set_allegiance(hex, allegiance, None)?;
    }
    Ok(!unclaimed.is_empty())
}

/// Unclaim empty hexes of `allegiance` that have `n` consecutive neighbours,
/// going clockwise around the hex from any starting direction, that are off
/// the grid or owned by someone else. Occupied hexes are never touched.
///
/// All candidates are found before any is unclaimed, so the result does not
/// depend on scan order.
pub fn erode(grid: &mut AllegianceGrid, allegiance: &str, n: usize) -> Result<bool, GridError> {
    let mut erode_list = Vec::new();

    for hex in grid.hexes() {
        if grid.is_occupied(hex)? || grid.allegiance(hex)? != allegiance {
            continue;
        }

        for dir in Direction::ALL {
            let mut count = 0;
            for offset in 0..n {
                let next = hex.neighbor(dir.rotate(offset));
                if !grid.in_bounds(next) || grid.allegiance(next)? != allegiance {
                    count += 1;
                }
            }

            if count >= n {
                erode_list.push(hex);
                break;
            }
        }
    }

    for &hex in &erode_list {
        grid.set_allegiance(hex, UNALIGNED, None)?;
    }

    trace!(allegiance, n, eroded = erode_list.len(), "erode pass");
    Ok(!erode_list.is_empty())
}

/// Running state of the span search along one perimeter
#[derive(Debug, Default)]
struct SpanTracker {
    /// Consecutive empty hexes along the perimeter
    span: Vec<OffsetHex>,
    /// Tail of `span` entered in the same direction
    straight: Vec<OffsetHex>,
    last_dir: Option<Direction>,
}

impl SpanTracker {
    /// Feed one perimeter step; returns a hex to break, if any.
    fn visit(&mut self, hex: OffsetHex, direction: Option<Direction>, occupied: bool, n: usize) -> Option<OffsetHex> {
        // Only break along straight runs so concave turns between worlds
        // are left alone.
        if self.last_dir != direction {
            self.straight.clear();
        }
        self.last_dir = direction;

        if occupied {
            self.span.clear();
            self.straight.clear();
            return None;
        }

        self.span.push(hex);
        self.straight.push(hex);

        if self.span.len() >= n && self.straight.len() >= BREAK_OFFSET {
            let target = self.straight[self.straight.len() - BREAK_OFFSET];
            self.span.clear();
            self.straight.clear();
            return Some(target);
        }
        None
    }
}

/// Walk the perimeter of every region of `allegiance` and unclaim a hex in
/// each run of `n` consecutive empty perimeter hexes that ends in a straight
/// line of at least [`BREAK_OFFSET`] hexes.
///
/// `n` must be at least [`BREAK_OFFSET`].
pub fn break_spans(grid: &mut AllegianceGrid, allegiance: &str, n: usize) -> Result<bool, GridError> {
    if n < BREAK_OFFSET {
        return Err(GridError::InvalidArgument(format!(
            "span length {} is shorter than the break offset {}",
            n, BREAK_OFFSET
        )));
    }

    let mut break_list = Vec::new();
    let mut tracker = SpanTracker::default();
    let bounds = grid.bounds();

    for x in bounds.left..=bounds.right {
        // Each column starts fresh: its first hex is not adjacent to the
        // last hex of the previous column.
        let mut previous: Option<String> = None;

        for y in bounds.top..=bounds.bottom {
            let hex = OffsetHex::new(x, y);
            let current = grid.allegiance(hex)?;

            // Same region as the hex above, which was already considered
            if previous.as_deref() == Some(current) {
                continue;
            }
            previous = Some(current.to_string());

            if grid.is_marked(hex)?
                || current != allegiance
                || current == UNALIGNED
                || current == NON_ALIGNED
            {
                continue;
            }

            let steps = walk_steps(grid, hex, allegiance)?;
            for step in &steps {
                let occupied = grid.is_occupied(step.hex)?;
                if let Some(target) = tracker.visit(step.hex, step.direction, occupied, n) {
                    break_list.push(target);
                }
            }
            for step in &steps {
                grid.set_marked(step.hex, true)?;
            }
        }
    }

    grid.clear_marks();

    for &hex in &break_list {
        grid.set_allegiance(hex, UNALIGNED, None)?;
    }

    trace!(allegiance, n, broken = break_list.len(), "break spans pass");
    Ok(!break_list.is_empty())
}

/// Claim unclaimed hexes that sit in a one-hex gap of `allegiance`: some
/// neighbour `i` and `i + 2` belong to it while `i + 1` does not.
///
/// Hexes are claimed as the scan reaches them, so an earlier bridge can
/// enable a later one.
pub fn build_bridges(grid: &mut AllegianceGrid, allegiance: &str) -> Result<bool, GridError> {
    let mut bridged = 0;
    let hexes: Vec<OffsetHex> = grid.hexes().collect();

    for hex in hexes {
        if grid.allegiance(hex)? != UNALIGNED {
            continue;
        }

        let mut owned = [false; 6];
        for dir in Direction::ALL {
            let next = hex.neighbor(dir);
            owned[dir.index()] = grid.in_bounds(next) && grid.allegiance(next)? == allegiance;
        }

        let is_gap = (0..6).any(|i| owned[i] && !owned[(i + 1) % 6] && owned[(i + 2) % 6]);
        if is_gap {
            grid.set_allegiance(hex, allegiance, None)?;
            bridged += 1;
        }
    }

    trace!(allegiance, bridged, "build bridges pass");
    Ok(bridged > 0)
}

/// Simplify the claim of one allegiance in place.
///
/// Erosion and span breaking alternate until neither changes the grid; span
/// breaking only runs on rounds where erosion changed nothing. Bridges are
/// built once afterwards. Returns whether the grid differs from its state
/// before the call.
pub fn process_allegiance(grid: &mut AllegianceGrid, allegiance: &str) -> Result<bool, GridError> {
    let before = grid.clone();

    claim_all_unclaimed(grid, allegiance)?;

    let mut rounds = 0;
    loop {
        rounds += 1;
        let dirty = erode(grid, allegiance, ERODE_THRESHOLD)?
            || break_spans(grid, allegiance, SPAN_THRESHOLD)?;
        if !dirty {
            break;
        }
    }

    build_bridges(grid, allegiance)?;

    trace!(allegiance, rounds, "allegiance simplified");
    Ok(*grid != before)
}
