use crate::grid::GridMap;
use crate::region_graph::{Region, RegionIdPool};
use crate::sector::SectorGrid;
use crate::types::{SectorId, CELL_OPEN};
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::debug;

/// Flood-fill one sector's untagged open cells into regions.
///
/// For each open, untagged cell in raster order a BFS confined to the sector
/// collects its connected component, every visited cell is tagged with a
/// fresh region id, and the resulting [`Region`] is recorded on the sector.
/// Cells already tagged (surviving regions of the same sector) are left
/// alone, which is what lets partition/merge re-abstraction wipe only the
/// affected regions.
pub(crate) fn abstract_sector(
    grid: &mut GridMap,
    sectors: &mut SectorGrid,
    sector_id: SectorId,
    pool: &mut RegionIdPool,
) -> Vec<Region> {
    let mut regions = Vec::new();
    let seeds: Vec<u32> = sectors
        .cells_of(sector_id)
        .filter(|&cell| grid.state(cell) == CELL_OPEN)
        .collect();

    for seed in seeds {
        if grid.state(seed) != CELL_OPEN {
            continue; // swallowed by an earlier flood
        }
        let cells = flood_open_cells(grid, sectors, sector_id, seed);
        let id = pool.allocate();
        for &cell in &cells {
            grid.set_state(cell, id.0);
        }
        let representative = compute_representative(grid, id.0, &cells);
        sectors.get_mut(sector_id).region_ids.push(id);
        regions.push(Region {
            id,
            sector: sector_id,
            representative,
            cell_count: cells.len() as u32,
            neighbors: FxHashSet::default(),
        });
    }

    if !regions.is_empty() {
        debug!(
            "[ABSTRACTION] sector {} -> {} region(s)",
            sector_id.0,
            regions.len()
        );
    }
    regions
}

/// BFS over open, untagged cells, confined to one sector's bounds.
/// Diagonal expansion obeys the same corner rule as movement.
fn flood_open_cells(
    grid: &GridMap,
    sectors: &SectorGrid,
    sector_id: SectorId,
    seed: u32,
) -> Vec<u32> {
    let sector = sectors.get(sector_id);
    let mut visited = FixedBitSet::with_capacity(grid.cell_count());
    let mut queue = VecDeque::new();
    let mut cells = Vec::new();

    visited.insert(seed as usize);
    queue.push_back(seed);
    while let Some(cell) = queue.pop_front() {
        cells.push(cell);
        for (next, _cost) in grid.passable_neighbors(cell) {
            if visited.contains(next as usize) || grid.state(next) != CELL_OPEN {
                continue;
            }
            let (r, c) = grid.coords(next);
            if !sector.contains(r, c) {
                continue;
            }
            visited.insert(next as usize);
            queue.push_back(next);
        }
    }
    cells
}

/// Centroid-nearest representative.
///
/// The centroid is the rounded mean (row, col) of the member cells. When the
/// centroid cell itself belongs to the region it wins; otherwise the member
/// cell with minimum octile distance to the centroid does, lowest cell id on
/// ties, so recomputation is deterministic.
pub(crate) fn compute_representative(grid: &GridMap, tag: u32, cells: &[u32]) -> u32 {
    debug_assert!(!cells.is_empty());
    let mut row_sum = 0usize;
    let mut col_sum = 0usize;
    for &cell in cells {
        let (r, c) = grid.coords(cell);
        row_sum += r;
        col_sum += c;
    }
    let n = cells.len();
    let centroid_row = (row_sum + n / 2) / n;
    let centroid_col = (col_sum + n / 2) / n;
    let centroid = grid.cell_id(centroid_row, centroid_col);
    if grid.state(centroid) == tag {
        return centroid;
    }
    let mut best = cells[0];
    let mut best_dist = grid.octile_distance(best, centroid);
    for &cell in &cells[1..] {
        let dist = grid.octile_distance(cell, centroid);
        if dist < best_dist || (dist == best_dist && cell < best) {
            best = cell;
            best_dist = dist;
        }
    }
    best
}

/// Collect the cells currently tagged `tag` inside one sector.
pub(crate) fn member_cells(
    grid: &GridMap,
    sectors: &SectorGrid,
    sector_id: SectorId,
    tag: u32,
) -> Vec<u32> {
    sectors
        .cells_of(sector_id)
        .filter(|&cell| grid.state(cell) == tag)
        .collect()
}
