//! Tests for the incremental maintenance engine.
//!
//! These exercise the wall-toggle case dispatch end to end: every scenario
//! builds a small map, mutates it, and checks both the reported
//! classification and the structural invariants afterwards.

use super::*;

fn build(text: &str, sector_size: usize) -> AbstractedMap {
    AbstractedMap::build(GridMap::from_ascii(text), sector_size).unwrap()
}

/// Structural snapshot of the region graph: sorted id → sorted neighbor ids.
/// Conservation tests compare these for exact equality.
fn neighbor_snapshot(map: &AbstractedMap) -> Vec<(u32, Vec<u32>)> {
    let mut snapshot: Vec<(u32, Vec<u32>)> = map
        .regions()
        .map(|region| {
            let mut neighbors: Vec<u32> = region.neighbors.iter().map(|n| n.0).collect();
            neighbors.sort_unstable();
            (region.id.0, neighbors)
        })
        .collect();
    snapshot.sort_unstable();
    snapshot
}

#[test]
fn test_single_cell_map_eliminate_and_restore() {
    let mut map = build(".", 16);
    assert_eq!(map.region_count(), 1);

    let outcome = map.add_wall(0).unwrap();
    let WallAddOutcome::Elimination { removed } = outcome else {
        panic!("expected elimination, got {outcome:?}");
    };
    assert_eq!(map.region_count(), 0);
    assert!(map.grid().is_wall(0));
    map.check_invariants().unwrap();

    let outcome = map.remove_wall(0).unwrap();
    let WallRemoveOutcome::NewIsolated { region } = outcome else {
        panic!("expected new isolated region, got {outcome:?}");
    };
    assert_eq!(region, removed, "free pool must hand the id back");
    let restored = map.region(region).unwrap();
    assert_eq!(restored.cell_count, 1);
    assert_eq!(restored.representative, 0);
    map.check_invariants().unwrap();
}

#[test]
fn test_center_wall_partitions_seven_cell_region() {
    // One 7-cell region; walling the center leaves two 3-cell columns with
    // no contact (the connecting diagonals lose both cardinal supports).
    let mut map = build(
        ".#.\n\
         ...\n\
         .#.",
        4,
    );
    assert_eq!(map.region_count(), 1);
    let center = map.grid().cell_id(1, 1);

    let outcome = map.add_wall(center).unwrap();
    let WallAddOutcome::Partition {
        replaced: _,
        new_regions,
    } = outcome
    else {
        panic!("expected partition, got {outcome:?}");
    };
    assert_eq!(new_regions.len(), 2);
    assert_eq!(map.region_count(), 2);
    for &id in &new_regions {
        let region = map.region(id).unwrap();
        assert_eq!(region.cell_count, 3);
        assert!(region.neighbors.is_empty(), "split halves must not touch");
    }
    map.check_invariants().unwrap();
}

#[test]
fn test_removing_wall_column_gap_merges_regions() {
    // The inverse of the partition scenario: two 3-cell columns and a wall
    // column between them; opening the middle wall merges everything.
    let mut map = build(
        ".#.\n\
         .#.\n\
         .#.",
        4,
    );
    assert_eq!(map.region_count(), 2);
    let middle = map.grid().cell_id(1, 1);

    let outcome = map.remove_wall(middle).unwrap();
    let WallRemoveOutcome::Merge {
        merged,
        new_regions,
    } = outcome
    else {
        panic!("expected merge, got {outcome:?}");
    };
    assert_eq!(merged.len(), 2);
    assert_eq!(new_regions.len(), 1);
    assert_eq!(map.region(new_regions[0]).unwrap().cell_count, 7);
    map.check_invariants().unwrap();
}

#[test]
fn test_plain_shrink_and_grow_round_trip() {
    let mut map = build("....\n....\n....\n....", 4);
    let before = neighbor_snapshot(&map);
    let cell = map.grid().cell_id(0, 0);

    let outcome = map.add_wall(cell).unwrap();
    assert!(matches!(outcome, WallAddOutcome::Shrunk { .. }));
    assert_eq!(map.regions().next().unwrap().cell_count, 15);
    map.check_invariants().unwrap();

    let outcome = map.remove_wall(cell).unwrap();
    assert!(matches!(outcome, WallRemoveOutcome::Grown { .. }));
    assert_eq!(neighbor_snapshot(&map), before);
    map.check_invariants().unwrap();
}

#[test]
fn test_walling_representative_moves_it() {
    let mut map = build("...\n...\n...", 4);
    let region = map.regions().next().unwrap();
    let rep = region.representative;
    assert_eq!(rep, map.grid().cell_id(1, 1));
    let id = region.id;

    map.add_wall(rep).unwrap();
    let moved = map.region(id).unwrap().representative;
    assert_ne!(moved, rep);
    assert_eq!(map.region_id_at(moved), Some(id));
    map.check_invariants().unwrap();
}

#[test]
fn test_sector_corner_pathblocker_round_trip() {
    // Four sectors meet at rows 3|4, cols 3|4. The top-left and bottom-right
    // singletons touch only diagonally, supported by the open (3,4); the
    // opposite support (4,3) is a wall. Walling (3,4) must sever that edge
    // without any re-abstraction, and reopening it must restore everything.
    let mut map = build(
        "########\n\
         ########\n\
         ####.###\n\
         ###..###\n\
         ####.###\n\
         ########\n\
         ########\n\
         ########",
        4,
    );
    let a = map.region_id_at(map.grid().cell_id(3, 3)).unwrap();
    let b = map.region_id_at(map.grid().cell_id(4, 4)).unwrap();
    let c = map.region_id_at(map.grid().cell_id(3, 4)).unwrap();
    assert!(map.neighbor_regions(a).unwrap().contains(&b));
    let before = neighbor_snapshot(&map);

    let support = map.grid().cell_id(3, 4);
    let outcome = map.add_wall(support).unwrap();
    let WallAddOutcome::PathBlocked { region, severed } = outcome else {
        panic!("expected pathblocker, got {outcome:?}");
    };
    assert_eq!(region, c);
    assert!(severed.contains(&(a.min(b), a.max(b))));
    assert!(!map.neighbor_regions(a).unwrap().contains(&b));
    assert!(map.neighbor_regions(a).unwrap().is_empty());
    map.check_invariants().unwrap();

    let outcome = map.remove_wall(support).unwrap();
    assert!(matches!(outcome, WallRemoveOutcome::Unblocked { .. }));
    assert_eq!(neighbor_snapshot(&map), before);
    map.check_invariants().unwrap();
}

#[test]
fn test_new_connected_region_bridges_foreign_sectors() {
    // Opening a wall cell whose own sector holds no regions at all: every
    // connected neighbor lives in a foreign sector, so a fresh singleton is
    // created and wired to them.
    let mut map = build(
        "#.##\n\
         #..#\n\
         ####\n\
         ####",
        2,
    );
    assert_eq!(map.region_count(), 2);
    let bridge = map.grid().cell_id(2, 1);
    let outcome = map.remove_wall(bridge).unwrap();
    let WallRemoveOutcome::NewConnected { region } = outcome else {
        panic!("expected new connected region, got {outcome:?}");
    };
    let neighbors = map.neighbor_regions(region).unwrap();
    assert_eq!(neighbors.len(), 2);
    map.check_invariants().unwrap();
}

#[test]
fn test_toggle_misuse_fails_loudly() {
    let mut map = build("..\n.#", 2);
    let wall = map.grid().cell_id(1, 1);
    let open = map.grid().cell_id(0, 0);
    assert_eq!(
        map.add_wall(wall).unwrap_err(),
        AbstractionError::WallAlreadyPresent(wall)
    );
    assert_eq!(
        map.remove_wall(open).unwrap_err(),
        AbstractionError::CellNotWall(open)
    );
    // Failed calls must not have touched anything.
    map.check_invariants().unwrap();
}

#[test]
fn test_cache_entries_die_with_their_cells_and_regions() {
    let mut map = build(
        "........\n\
         ........\n\
         ........\n\
         ........",
        4,
    );
    let mut stats = SearchStats::default();
    let start = map.grid().cell_id(1, 1);
    let goal = map.grid().cell_id(2, 6);
    let path = map.find_path(start, goal, &mut stats).unwrap();
    assert!(map.stats().cached_pairs > 0);

    // Wall a mid-path cell: every chain crossing it must be dropped, and
    // what remains must reference live regions only.
    let mid = path.cells[path.cells.len() / 2];
    map.add_wall(mid).unwrap();
    map.check_invariants().unwrap();

    // The next query rebuilds lazily and still finds a way around.
    let rerouted = map.find_path(start, goal, &mut stats).unwrap();
    assert!(!rerouted.cells.contains(&mid));
    map.check_invariants().unwrap();
}

#[test]
fn test_region_accessors_match_grid_tags() {
    let map = build("....\n.##.\n....", 4);
    for cell in 0..map.grid().cell_count() as u32 {
        match map.region_id_at(cell) {
            Some(id) => {
                let region = map.region(id).unwrap();
                assert_eq!(map.grid().state(cell), id.0);
                assert_eq!(
                    map.sectors().sector_containing(cell),
                    region.sector,
                    "regions must not leak across sector lines"
                );
            }
            None => assert!(map.grid().is_wall(cell)),
        }
    }
}
