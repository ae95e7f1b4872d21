//! Whole-map processing.
//!
//! Every allegiance with more than one world is simplified in turn, smallest
//! first, so small polities settle their borders before larger ones absorb
//! whatever is still unclaimed.
//!
//! [`MapProcessor`] exposes this one allegiance at a time through
//! [`MapProcessor::step`], so interactive callers can yield between
//! allegiances. [`process_map`] runs every step back to back.

use crate::grid::{AllegianceGrid, GridError, NON_ALIGNED, UNALIGNED};
use crate::simplify::process_allegiance;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

/// Number of occupied hexes held by one allegiance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllegianceCount {
    pub allegiance: String,
    pub count: usize,
}

/// Result of one [`MapProcessor::step`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStep {
    /// The allegiance was simplified
    Processed {
        allegiance: String,
        count: usize,
        changed: bool,
    },
    /// Sentinel allegiances and single-world polities are left as they are
    Skipped { allegiance: String, count: usize },
}

impl ProcessStep {
    pub fn allegiance(&self) -> &str {
        match self {
            ProcessStep::Processed { allegiance, .. } | ProcessStep::Skipped { allegiance, .. } => allegiance,
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self, ProcessStep::Processed { changed: true, .. })
    }
}

/// Occupied-hex counts per allegiance, in ascending count order.
///
/// Allegiances with equal counts keep the order in which they were first
/// found scanning the grid column by column.
pub fn allegiance_counts(grid: &AllegianceGrid) -> Result<Vec<AllegianceCount>, GridError> {
    let mut counts: Vec<AllegianceCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for hex in grid.hexes() {
        if !grid.is_occupied(hex)? {
            continue;
        }
        let allegiance = grid.allegiance(hex)?;
        match index.get(allegiance) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(allegiance.to_string(), counts.len());
                counts.push(AllegianceCount {
                    allegiance: allegiance.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by_key(|c| c.count);
    Ok(counts)
}

/// Step-wise driver over every allegiance of a grid.
///
/// The processor only holds the work queue; the grid is passed to each
/// [`step`](Self::step) so the caller keeps ownership between steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapProcessor {
    queue: VecDeque<AllegianceCount>,
    total: usize,
}

impl MapProcessor {
    /// Snapshot the allegiance counts of `grid` and queue them.
    pub fn new(grid: &AllegianceGrid) -> Result<Self, GridError> {
        let queue: VecDeque<_> = allegiance_counts(grid)?.into();
        let total = queue.len();
        debug!(allegiances = total, "map processing queued");
        Ok(Self { queue, total })
    }

    /// Allegiances not yet stepped through
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// The allegiance the next step will handle
    pub fn peek(&self) -> Option<&AllegianceCount> {
        self.queue.front()
    }

    /// Handle the next allegiance. Returns `None` once every allegiance has
    /// been handled.
    pub fn step(&mut self, grid: &mut AllegianceGrid) -> Result<Option<ProcessStep>, GridError> {
        let Some(AllegianceCount { allegiance, count }) = self.queue.pop_front() else {
            return Ok(None);
        };

        if allegiance == NON_ALIGNED || allegiance == UNALIGNED || count <= 1 {
            return Ok(Some(ProcessStep::Skipped { allegiance, count }));
        }

        debug!(%allegiance, worlds = count, "processing allegiance");
        let changed = process_allegiance(grid, &allegiance)?;
        Ok(Some(ProcessStep::Processed {
            allegiance,
            count,
            changed,
        }))
    }
}

/// Process every allegiance of `grid` in one go, reporting each step to
/// `on_progress`. Returns whether any step changed the grid.
pub fn process_map<F>(grid: &mut AllegianceGrid, mut on_progress: F) -> Result<bool, GridError>
where
    F: FnMut(&ProcessStep),
{
    let mut processor = MapProcessor::new(grid)?;
    let mut changed = false;

    while let Some(step) = processor.step(grid)? {
        changed |= step.changed();
        on_progress(&step);
    }

    info!(allegiances = processor.total(), changed, "map processing complete");
    Ok(changed)
}
