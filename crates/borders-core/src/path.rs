//! Border path geometry.
//!
//! Converts an ordered hex loop (in doubled coordinates) into polylines that
//! trace the outer edge of the hexes, ready to be stroked or filled.
//!
//! At each hex the walk either bends back 60 degrees, goes straight on,
//! bends clockwise 60 or 120 degrees, or doubles back on itself. That turn
//! decides how many of the hex's corners are emitted: 1, 2, 3, 4 or 5. A
//! 120 degree bend backwards cannot happen, because the walk would have gone
//! straight from the previous hex to the next one.
//!
//! Points are normalized to the map extent and centred, so a point inside
//! the extent lies in `[-0.5, 0.5]` on both axes.

use crate::hex::{edge_index, parse_hex_label, DoubledHex, LabelError, OffsetHex, DOUBLED_STEPS};
use crate::sector::{SECTOR_HEIGHT, SECTOR_WIDTH};
use serde::{Deserialize, Serialize};

/// Hex corner offsets from the hex centre, in units of one column width and
/// one row height. Corner `i` lies clockwise after edge `i - 1`.
const CORNER_OFFSETS: [(f64, f64); 6] = [
    (1.0 / 3.0, 0.5),
    (-1.0 / 3.0, 0.5),
    (-2.0 / 3.0, 0.0),
    (-1.0 / 3.0, -0.5),
    (1.0 / 3.0, -0.5),
    (2.0 / 3.0, 0.0),
];

/// Direction along which the ends of a stroked run are pulled in so the
/// stroke stays inside its own hexes.
const END_OFFSETS: [(f64, f64); 6] = [
    (-0.25, 0.5),
    (-std::f64::consts::FRAC_1_SQRT_2, 0.0),
    (-0.25, -0.5),
    (0.25, -0.5),
    (std::f64::consts::FRAC_1_SQRT_2, 0.0),
    (0.25, 0.5),
];

/// A point in normalized map space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Drawable output of the builder: one point list per contiguous sub-path.
///
/// A single-point sub-path marks a hex that was skipped, i.e. where the
/// border leaves the visible area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RenderPath {
    pub segments: Vec<Vec<Point>>,
}

impl RenderPath {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total number of points over all segments
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Copy with every coordinate clamped into `[-0.5, 0.5]`, for fills.
    pub fn clamped(&self) -> RenderPath {
        let clamp = |v: f64| v.clamp(-0.5, 0.5);
        RenderPath {
            segments: self
                .segments
                .iter()
                .map(|seg| seg.iter().map(|p| Point::new(clamp(p.x), clamp(p.y))).collect())
                .collect(),
        }
    }
}

/// Which end of a corner run a point sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CornerEnd {
    Start,
    Middle,
    End,
}

/// Skips hexes whose doubled coordinate falls outside a `width` x `height`
/// block of 1-based offset hexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorViewport {
    pub width: i32,
    pub height: i32,
}

impl Default for SectorViewport {
    fn default() -> Self {
        Self {
            width: SECTOR_WIDTH,
            height: SECTOR_HEIGHT,
        }
    }
}

impl SectorViewport {
    pub fn should_skip(&self, hex: DoubledHex) -> bool {
        hex.x < 1 || hex.x > self.width || hex.y < 2 || hex.y > 2 * self.height + 1
    }
}

/// Builds [`RenderPath`]s from hex loops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderPathBuilder {
    /// Stroke width as a fraction of the map extent
    pub line_width: f64,
    /// Map extent in columns and rows used to normalize points
    pub extent: (f64, f64),
}

impl Default for BorderPathBuilder {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl BorderPathBuilder {
    /// Builder normalizing to a single sector
    pub fn new(line_width: f64) -> Self {
        Self {
            line_width,
            extent: (SECTOR_WIDTH as f64, SECTOR_HEIGHT as f64),
        }
    }

    pub fn with_extent(mut self, width: f64, height: f64) -> Self {
        self.extent = (width, height);
        self
    }

    /// Build the path for a loop of doubled hexes. Hexes for which `skip`
    /// returns true produce a single-point segment instead of corners.
    ///
    /// Triples whose steps are not single hex moves are ignored.
    pub fn build<S>(&self, hexes: &[DoubledHex], skip: S) -> RenderPath
    where
        S: Fn(DoubledHex) -> bool,
    {
        let Some((&first, rest)) = hexes.split_first() else {
            return RenderPath::default();
        };
        let Some((&second, rest)) = rest.split_first() else {
            return self.single_hex(first, &skip);
        };

        let mut segments: Vec<Vec<Point>> = Vec::new();
        let mut open: Option<usize> = None;
        let mut last_corner: Option<Point> = None;

        let mut last_step = first.delta_to(&second);
        let mut current = second;

        // The loop is closed by revisiting the second hex at the end
        for &next in rest.iter().chain(std::iter::once(&second)) {
            let next_step = current.delta_to(&next);

            if let (Some(edge), Some(next_edge)) = (edge_index(last_step), edge_index(next_step)) {
                if skip(current) {
                    segments.push(vec![self.centre(current)]);
                } else {
                    let start = self.corner(current, edge, CornerEnd::Start);
                    let target = match open {
                        Some(i) if last_corner == Some(start) => i,
                        _ => {
                            segments.push(vec![start]);
                            segments.len() - 1
                        }
                    };
                    open = Some(target);

                    let count = edge_count(edge, next_edge);
                    for idx in 0..count {
                        let end = if idx + 1 == count { CornerEnd::End } else { CornerEnd::Middle };
                        let corner = self.corner(current, (edge + idx + 1) % 6, end);
                        segments[target].push(corner);
                        last_corner = Some(corner);
                    }
                }
                last_step = next_step;
            }

            current = next;
        }

        RenderPath { segments }
    }

    /// Parse hex labels, convert them to doubled form and build the path.
    pub fn build_labels<L, S>(&self, labels: &[L], skip: S) -> Result<RenderPath, LabelError>
    where
        L: AsRef<str>,
        S: Fn(DoubledHex) -> bool,
    {
        let hexes = labels
            .iter()
            .map(|l| parse_hex_label(l.as_ref()).map(OffsetHex::to_doubled))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.build(&hexes, skip))
    }

    /// A region of one hex: the closed outline of that hex.
    fn single_hex<S>(&self, hex: DoubledHex, skip: &S) -> RenderPath
    where
        S: Fn(DoubledHex) -> bool,
    {
        if skip(hex) {
            return RenderPath::default();
        }
        let mut outline = vec![self.corner(hex, 5, CornerEnd::Middle)];
        outline.extend((0..6).map(|i| self.corner(hex, i, CornerEnd::Middle)));
        RenderPath {
            segments: vec![outline],
        }
    }

    fn centre(&self, hex: DoubledHex) -> Point {
        self.normalize(hex, 0.0, 0.0)
    }

    fn corner(&self, hex: DoubledHex, index: usize, end: CornerEnd) -> Point {
        let (width, height) = self.extent;
        let lw = self.line_width;

        let (cx, cy) = CORNER_OFFSETS[index];
        let mut dx = cx * (1.0 - lw * width);
        let mut dy = cy * (1.0 - lw * height);

        match end {
            CornerEnd::End => {
                let (ex, ey) = END_OFFSETS[index];
                dx += width * lw * ex;
                dy += height * lw * ey;
            }
            CornerEnd::Start => {
                let (ex, ey) = END_OFFSETS[(index + 1) % 6];
                dx -= width * lw * ex;
                dy -= height * lw * ey;
            }
            CornerEnd::Middle => {}
        }

        self.normalize(hex, dx, dy)
    }

    fn normalize(&self, hex: DoubledHex, dx: f64, dy: f64) -> Point {
        let (width, height) = self.extent;
        Point::new(
            (hex.x as f64 - 0.5 + dx) / width - 0.5,
            (hex.y as f64 / 2.0 - 0.5 + dy) / height - 0.5,
        )
    }
}

/// Path for a border given as hex labels, clipped to a single sector.
pub fn border_path_for_labels<L: AsRef<str>>(labels: &[L], line_width: f64) -> Result<RenderPath, LabelError> {
    let viewport = SectorViewport::default();
    BorderPathBuilder::new(line_width).build_labels(labels, |hex| viewport.should_skip(hex))
}

/// Number of corners a hex contributes given the edges the walk enters and
/// leaves it by: 2 going straight, one more per 60 degrees of clockwise turn.
fn edge_count(edge: usize, next_edge: usize) -> usize {
    let mut turn = (next_edge as i32 - edge as i32) % 6;
    if turn <= -3 {
        turn += 6;
    } else if turn > 3 {
        turn -= 6;
    }
    (turn + 2).max(0) as usize
}

/// Every hex exactly `radius` steps from `center`, or every hex within
/// `radius` steps when `fill` is set.
///
/// The ring starts at the hex `radius` steps north of `center` and runs
/// clockwise.
pub fn hex_radius(center: OffsetHex, radius: u32, fill: bool) -> Vec<OffsetHex> {
    if radius == 0 {
        return vec![center];
    }

    let mut ring = Vec::with_capacity(6 * radius as usize);
    let mut coords = OffsetHex::new(center.x, center.y - radius as i32).to_doubled();

    for side in 0..DOUBLED_STEPS.len() {
        for _ in 0..radius {
            coords = coords.step(side + 3);
            ring.push(coords.to_offset());
        }
    }

    if fill {
        ring.extend(hex_radius(center, radius - 1, fill));
    }
    ring
}
