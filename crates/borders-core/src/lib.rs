//! Hexborders - political border generation for hex star maps
//!
//! This crate turns a sector of worlds, each tagged with an allegiance, into
//! simplified border regions and drawable border outlines:
//! - Hex coordinate systems (offset and doubled) with neighbour lookup
//! - A bounds-checked per-hex allegiance grid
//! - Region simplification passes (claim, erode, span breaking, bridging)
//! - Perimeter walking that yields closed border loops
//! - Path geometry for rendering those loops
//!
//! # Architecture
//!
//! The engine is platform-agnostic and synchronous. It can be compiled to:
//! - Native Rust for the authoring server
//! - WebAssembly for in-browser authoring
//!
//! # Modules
//!
//! - [`hex`]: Coordinate systems, directions and `"CCRR"` hex labels
//! - [`grid`]: Per-hex allegiance state
//! - [`walker`]: Perimeter walking
//! - [`simplify`]: Region simplification passes for one allegiance
//! - [`process`]: Whole-map processing, one allegiance at a time
//! - [`path`]: Border outline geometry
//! - [`allegiance`]: Raw allegiance code normalization
//! - [`sector`]: Sector loading, manual edits and border extraction
//! - [`output`]: XML, MSEC and JSON border output

pub mod allegiance;
pub mod grid;
pub mod hex;
pub mod output;
pub mod path;
pub mod process;
pub mod sector;
pub mod simplify;
pub mod walker;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use allegiance::{AllegianceRule, AllegianceRules, RulesError};
pub use grid::{AllegianceGrid, Bounds, GridError, HexCell, NON_ALIGNED, UNALIGNED};
pub use hex::{format_hex_label, parse_hex_label, Direction, DoubledHex, LabelError, OffsetHex};
pub use output::{to_json, to_msec, to_xml, BorderFormat, BorderRecord};
pub use path::{border_path_for_labels, hex_radius, BorderPathBuilder, Point, RenderPath, SectorViewport};
pub use process::{process_map, AllegianceCount, MapProcessor, ProcessStep};
pub use sector::{
    claim_by_votes, claim_edges, extract_borders, load_worlds, sector_grid, toggle_allegiance, BorderLoop,
    ExtractOptions, SectorError, WorldRecord, SECTOR_HEIGHT, SECTOR_WIDTH,
};
pub use simplify::{build_bridges, break_spans, claim_all_unclaimed, erode, process_allegiance};
pub use walker::{find_top_left, walk};
