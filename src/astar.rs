use crate::grid::GridMap;
use crate::stats::SearchStats;
use crate::types::Path;
use rustc_hash::FxHashMap;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, PartialEq, Eq)]
struct OpenState {
    f: u32,
    g: u32,
    cell: u32,
}

// Reversed so the max-heap pops the lowest f; higher g wins ties (deeper
// states first), then lowest cell id for determinism.
impl Ord for OpenState {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .f
            .cmp(&self.f)
            .then(self.g.cmp(&other.g))
            .then(other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for OpenState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct_path(came_from: &FxHashMap<u32, u32>, mut current: u32) -> Vec<u32> {
    let mut cells = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        current = prev;
        cells.push(current);
    }
    cells.reverse();
    cells
}

/// Flat 8-connected A* with the octile heuristic.
///
/// The commodity optimal-path oracle: the compressor feeds on its output and
/// the query layer falls back to it when hill-climbing misses. `None` means
/// no path exists.
pub fn find_path(grid: &GridMap, start: u32, goal: u32, stats: &mut SearchStats) -> Option<Path> {
    if !grid.is_passable(start) || !grid.is_passable(goal) {
        return None;
    }
    if start == goal {
        return Some(Path {
            cells: vec![start],
            cost: 0,
        });
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: FxHashMap<u32, u32> = FxHashMap::default();
    let mut g_score: FxHashMap<u32, u32> = FxHashMap::default();

    g_score.insert(start, 0);
    open_set.push(OpenState {
        f: grid.octile_distance(start, goal),
        g: 0,
        cell: start,
    });

    while let Some(OpenState { g, cell, .. }) = open_set.pop() {
        if g > g_score.get(&cell).copied().unwrap_or(u32::MAX) {
            continue; // stale heap entry
        }
        stats.astar_expanded += 1;
        if cell == goal {
            return Some(Path {
                cells: reconstruct_path(&came_from, cell),
                cost: g,
            });
        }
        for (next, cost) in grid.passable_neighbors(cell) {
            let tentative = g + cost;
            if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                came_from.insert(next, cell);
                g_score.insert(next, tentative);
                open_set.push(OpenState {
                    f: tentative + grid.octile_distance(next, goal),
                    g: tentative,
                    cell: next,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_grid_cost_equals_octile() {
        let grid = GridMap::from_ascii("......\n......\n......\n......");
        let mut stats = SearchStats::default();
        let start = grid.cell_id(0, 0);
        let goal = grid.cell_id(3, 5);
        let path = find_path(&grid, start, goal, &mut stats).unwrap();
        assert_eq!(path.cost, grid.octile_distance(start, goal));
        assert_eq!(path.cost, grid.path_cost(&path.cells));
        assert!(stats.astar_expanded > 0);
    }

    #[test]
    fn test_walled_goal_is_unreachable() {
        let grid = GridMap::from_ascii(
            "...#.\n\
             ...#.\n\
             ...#.",
        );
        let mut stats = SearchStats::default();
        assert!(find_path(&grid, grid.cell_id(0, 0), grid.cell_id(1, 4), &mut stats).is_none());
    }

    #[test]
    fn test_detour_around_block() {
        let grid = GridMap::from_ascii(
            ".....\n\
             .###.\n\
             .....",
        );
        let mut stats = SearchStats::default();
        let start = grid.cell_id(1, 0);
        let goal = grid.cell_id(1, 4);
        let path = find_path(&grid, start, goal, &mut stats).unwrap();
        // Two diagonals around either end of the block plus two straights.
        assert_eq!(path.cost, 48);
    }
}
