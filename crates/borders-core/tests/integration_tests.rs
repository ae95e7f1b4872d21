//! Integration tests for the border engine.
//!
//! These tests drive complete flows from loading worlds through
//! simplification to extracted and rendered borders, plus randomized checks
//! of the invariants every pass must keep.

use borders_core::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALLEGIANCES: [&str; 3] = ["Im", "Zh", "As"];

fn hex(x: i32, y: i32) -> OffsetHex {
    OffsetHex::new(x, y)
}

/// A grid with randomly placed worlds of random allegiance
fn random_grid(rng: &mut StdRng, width: i32, height: i32, density: f64) -> AllegianceGrid {
    let mut grid = AllegianceGrid::new(width, height);
    for h in grid.hexes().collect::<Vec<_>>() {
        if rng.gen_bool(density) {
            let allegiance = ALLEGIANCES[rng.gen_range(0..ALLEGIANCES.len())];
            grid.set_occupied(h, true).unwrap();
            grid.set_allegiance(h, allegiance, None).unwrap();
        }
    }
    grid
}

fn occupied_snapshot(grid: &AllegianceGrid) -> Vec<(OffsetHex, String)> {
    grid.hexes()
        .filter(|&h| grid.is_occupied(h).unwrap())
        .map(|h| (h, grid.allegiance(h).unwrap().to_string()))
        .collect()
}

// ==================== Engine scenarios ====================

#[test]
fn test_erode_trims_ends_of_thin_run() {
    let mut grid = AllegianceGrid::new(5, 7);
    for y in 2..=6 {
        grid.set_allegiance(hex(3, y), "Im", None).unwrap();
    }

    assert!(erode(&mut grid, "Im", 3).unwrap());

    let remaining: Vec<_> = grid
        .hexes()
        .filter(|&h| grid.allegiance(h).unwrap() == "Im")
        .collect();
    assert_eq!(remaining, vec![hex(3, 3), hex(3, 4), hex(3, 5)]);
}

#[test]
fn test_bridge_fills_single_gap() {
    let mut grid = AllegianceGrid::new(6, 6);
    grid.set_allegiance(hex(2, 3), "Im", None).unwrap();
    grid.set_allegiance(hex(4, 3), "Im", None).unwrap();

    assert!(build_bridges(&mut grid, "Im").unwrap());
    assert_eq!(grid.allegiance(hex(3, 3)).unwrap(), "Im");
}

#[test]
fn test_isolated_world_walks_to_itself() {
    let mut grid = AllegianceGrid::new(10, 10);
    grid.set_occupied(hex(5, 5), true).unwrap();
    grid.set_allegiance(hex(5, 5), "Zh", None).unwrap();

    assert_eq!(walk(&grid, hex(5, 5), "Zh").unwrap(), vec![hex(5, 5)]);
}

#[test]
fn test_radius_one_ring() {
    let ring = hex_radius(hex(0, 0), 1, false);
    assert_eq!(ring.len(), 6);

    let mut expected: Vec<_> = hex(0, 0).neighbors().to_vec();
    let mut actual = ring.clone();
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);
}

#[test]
fn test_break_spans_rejects_short_span() {
    let mut grid = AllegianceGrid::new(4, 4);
    let before = grid.clone();
    assert!(matches!(break_spans(&mut grid, "Im", 1), Err(GridError::InvalidArgument(_))));
    assert_eq!(grid, before);
}

// ==================== Full pipeline ====================

#[test]
fn test_sector_pipeline() {
    let worlds = vec![
        WorldRecord::new("0303", "ImDd"),
        WorldRecord::new("0304", "ImDd"),
        WorldRecord::new("0404", "ImSy"),
        WorldRecord::new("0405", "ImDd"),
        WorldRecord::new("2020", "Zh"),
        WorldRecord::new("2021", "Zh"),
        WorldRecord::new("2121", "Zh"),
        WorldRecord::new("1530", "CsIm"),
        WorldRecord::new("1010", "A4"),
    ];

    let mut grid = sector_grid();
    load_worlds(&mut grid, &worlds, &AllegianceRules::default()).unwrap();
    let before = occupied_snapshot(&grid);

    let mut steps = Vec::new();
    let changed = process_map(&mut grid, |step| steps.push(step.clone())).unwrap();
    assert!(changed);

    // Smallest first: the single As world, then Na, then the two 3+ polities
    let order: Vec<_> = steps.iter().map(|s| s.allegiance().to_string()).collect();
    assert_eq!(order, vec!["As", "Na", "Zh", "Im"]);
    assert!(matches!(steps[0], ProcessStep::Skipped { .. }));
    assert!(matches!(steps[1], ProcessStep::Skipped { .. }));

    assert_eq!(occupied_snapshot(&grid), before);
    assert_eq!(grid.true_allegiance(hex(4, 4)).unwrap(), "ImSy");

    let borders = extract_borders(&grid, ExtractOptions::default()).unwrap();
    assert!(!borders.is_empty());
    assert!(borders.windows(2).all(|w| w[0].allegiance <= w[1].allegiance));
    assert!(borders.iter().any(|b| b.allegiance == "Im"));
    assert!(borders.iter().any(|b| b.allegiance == "Zh"));

    let records: Vec<_> = borders.iter().map(BorderLoop::to_record).collect();
    let xml = to_xml(&records);
    assert!(xml.starts_with("<Borders>"));
    assert!(xml.contains("<Border Allegiance=\"Im\">"));
    let msec = to_msec(&records);
    assert_eq!(msec.lines().filter(|l| l.starts_with("border ")).count(), records.len());

    for record in &records {
        let path = border_path_for_labels(&record.path, 0.0).unwrap();
        assert!(!path.is_empty());
    }
}

#[test]
fn test_step_wise_matches_one_shot() {
    let mut rng = StdRng::seed_from_u64(11);
    let original = random_grid(&mut rng, 14, 14, 0.25);

    let mut one_shot = original.clone();
    process_map(&mut one_shot, |_| {}).unwrap();

    let mut stepped = original.clone();
    let mut processor = MapProcessor::new(&stepped).unwrap();
    let total = processor.total();
    let mut seen = 0;
    while processor.step(&mut stepped).unwrap().is_some() {
        seen += 1;
        assert_eq!(processor.remaining(), total - seen);
    }

    assert_eq!(stepped, one_shot);
}

#[test]
fn test_edit_then_reprocess() {
    let mut grid = sector_grid();
    let worlds = vec![
        WorldRecord::new("1010", "Im"),
        WorldRecord::new("1011", "Im"),
        WorldRecord::new("1111", "Im"),
    ];
    load_worlds(&mut grid, &worlds, &AllegianceRules::default()).unwrap();
    process_map(&mut grid, |_| {}).unwrap();

    // Release an empty claimed hex, then take it back by vote
    let target = grid
        .hexes()
        .find(|&h| !grid.is_occupied(h).unwrap() && grid.allegiance(h).unwrap() == "Im")
        .unwrap();
    assert!(toggle_allegiance(&mut grid, target).unwrap());
    assert_eq!(grid.allegiance(target).unwrap(), UNALIGNED);

    claim_edges(&mut grid).unwrap();
    let borders = extract_borders(&grid, ExtractOptions { filter_holes: true }).unwrap();
    for border in &borders {
        assert_eq!(border.hexes.first(), border.hexes.last());
    }
}

// ==================== Randomized invariants ====================

#[test]
fn test_occupied_hexes_never_change() {
    let mut rng = StdRng::seed_from_u64(42);
    for round in 0..40 {
        let density = [0.05, 0.2, 0.5][round % 3];
        let mut grid = random_grid(&mut rng, 16, 16, density);
        let before = occupied_snapshot(&grid);

        for allegiance in ALLEGIANCES {
            erode(&mut grid, allegiance, 3).unwrap();
            break_spans(&mut grid, allegiance, 4).unwrap();
            build_bridges(&mut grid, allegiance).unwrap();
        }
        assert_eq!(occupied_snapshot(&grid), before);

        process_map(&mut grid, |_| {}).unwrap();
        assert_eq!(occupied_snapshot(&grid), before);
    }
}

#[test]
fn test_process_allegiance_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    for round in 0..60 {
        let density = [0.05, 0.1, 0.3, 0.5, 0.7][round % 5];
        let mut grid = random_grid(&mut rng, 16, 16, density);
        let allegiance = ALLEGIANCES[round % ALLEGIANCES.len()];

        process_allegiance(&mut grid, allegiance).unwrap();
        let settled = grid.clone();
        let changed = process_allegiance(&mut grid, allegiance).unwrap();

        assert!(!changed, "round {round} changed on second pass");
        assert_eq!(grid, settled);
    }
}

#[test]
fn test_border_loops_are_closed_and_adjacent() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..20 {
        let mut grid = random_grid(&mut rng, 20, 20, 0.15);
        process_map(&mut grid, |_| {}).unwrap();

        for border in extract_borders(&grid, ExtractOptions::default()).unwrap() {
            assert!(border.hexes.len() > 2);
            assert_eq!(border.hexes.first(), border.hexes.last());
            for pair in border.hexes.windows(2) {
                assert_eq!(pair[0].distance_to(&pair[1]), 1);
            }
            for h in &border.hexes {
                assert_eq!(grid.allegiance(*h).unwrap(), border.allegiance);
            }

            // Replaying the walk's directions from the start lands on every
            // hex in turn and finishes back at the start
            let start = border.hexes[0];
            let steps = walker::walk_steps(&grid, start, &border.allegiance).unwrap();
            let mut at = start;
            for step in &steps[1..] {
                at = at.neighbor(step.direction.unwrap());
                assert_eq!(at, step.hex);
            }
            assert_eq!(at, start);

            let doubled: Vec<_> = border.hexes.iter().map(|h| h.to_doubled()).collect();
            let path = BorderPathBuilder::new(0.0).build(&doubled, |_| false);
            for segment in &path.segments {
                assert!(segment.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
            }
        }
    }
}

#[test]
fn test_coordinate_and_label_round_trip() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..500 {
        let h = hex(rng.gen_range(-20..60), rng.gen_range(-20..60));
        assert_eq!(h.to_doubled().to_offset(), h);

        for dir in Direction::ALL {
            assert_eq!(h.neighbor(dir).neighbor(dir.opposite()), h);
            assert_eq!(h.distance_to(&h.neighbor(dir)), 1);
        }

        let labelled = hex(rng.gen_range(0..100), rng.gen_range(0..100));
        assert_eq!(parse_hex_label(&format_hex_label(labelled)).unwrap(), labelled);
    }
}
