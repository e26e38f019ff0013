use crate::grid::GridMap;
use crate::stats::SearchStats;
use fixedbitset::FixedBitSet;

/// Pick the successor a hill-climb takes from `current` toward `goal`:
/// the unclosed passable neighbor minimizing `step cost + octile(n, goal)`,
/// preferring the higher step cost on ties (diagonals first), then the
/// lower cell id so the choice is deterministic.
fn select_next(grid: &GridMap, current: u32, goal: u32, closed: &FixedBitSet) -> Option<u32> {
    let mut best: Option<(u32, u32, u32)> = None; // (score, step cost, cell)
    for (next, cost) in grid.passable_neighbors(current) {
        if closed.contains(next as usize) {
            continue;
        }
        let score = cost + grid.octile_distance(next, goal);
        let better = match best {
            None => true,
            Some((bs, bc, bcell)) => {
                score < bs
                    || (score == bs && cost > bc)
                    || (score == bs && cost == bc && next < bcell)
            }
        };
        if better {
            best = Some((score, cost, next));
        }
    }
    best.map(|(_, _, cell)| cell)
}

/// Greedy best-first local search with a closed set and no open list.
///
/// Each step closes the current cell, then commits to the best unclosed
/// neighbor. The closed set rules out cycles, but with no backtracking the
/// search can dead-end even when a path exists; that miss is an expected
/// outcome (`None`), and callers fall back to full search. Success is
/// guaranteed only along paths the compressor has certified.
pub fn hill_climb(
    grid: &GridMap,
    start: u32,
    goal: u32,
    stats: &mut SearchStats,
) -> Option<Vec<u32>> {
    if !grid.is_passable(start) || !grid.is_passable(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }
    let mut closed = FixedBitSet::with_capacity(grid.cell_count());
    let mut path = vec![start];
    let mut current = start;
    loop {
        closed.insert(current as usize);
        let next = select_next(grid, current, goal, &closed)?;
        stats.hill_climb_steps += 1;
        path.push(next);
        if next == goal {
            return Some(path);
        }
        current = next;
    }
}

/// Constrained reachability check for the compressor: would a hill-climb
/// from `path[from]` toward `path[to]` reproduce `path` step for step?
///
/// Fails the moment the climb's chosen successor deviates from the next
/// recorded cell. Because the simulation closes exactly the cells a real
/// climb would close, a `true` here certifies that re-expansion walks the
/// identical cells.
pub(crate) fn climbs_along_path(grid: &GridMap, path: &[u32], from: usize, to: usize) -> bool {
    debug_assert!(from < to && to < path.len());
    let goal = path[to];
    let mut closed = FixedBitSet::with_capacity(grid.cell_count());
    for i in from..to {
        closed.insert(path[i] as usize);
        match select_next(grid, path[i], goal, &closed) {
            Some(next) if next == path[i + 1] => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_climb_straight_line() {
        let grid = GridMap::from_ascii("....\n....\n....");
        let mut stats = SearchStats::default();
        let path = hill_climb(&grid, grid.cell_id(1, 0), grid.cell_id(1, 3), &mut stats).unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(stats.hill_climb_steps, 3);
    }

    #[test]
    fn test_climb_prefers_diagonal_on_tie() {
        let grid = GridMap::from_ascii("....\n....\n....\n....");
        let mut stats = SearchStats::default();
        let path = hill_climb(&grid, grid.cell_id(0, 0), grid.cell_id(3, 3), &mut stats).unwrap();
        // Pure diagonal descent, no detours.
        assert_eq!(path.len(), 4);
        assert_eq!(grid.path_cost(&path), 42);
    }

    #[test]
    fn test_climb_dead_ends_in_pocket() {
        // The greedy walk marches into the cul-de-sac facing the goal and
        // has nowhere left to go.
        let grid = GridMap::from_ascii(
            ".....\n\
             .###.\n\
             ...#.\n\
             .###.\n\
             .....",
        );
        let mut stats = SearchStats::default();
        let start = grid.cell_id(2, 0);
        let goal = grid.cell_id(2, 4);
        assert!(hill_climb(&grid, start, goal, &mut stats).is_none());
    }

    #[test]
    fn test_on_path_check_rejects_deviating_window() {
        let grid = GridMap::from_ascii("...\n...");
        // A needless detour through row 1 on an open grid: the climb heads
        // straight along row 0 instead, so the window must be rejected.
        let detour = vec![
            grid.cell_id(0, 0),
            grid.cell_id(1, 0),
            grid.cell_id(1, 1),
            grid.cell_id(1, 2),
            grid.cell_id(0, 2),
        ];
        assert!(!climbs_along_path(&grid, &detour, 0, 4));
        // The straight two-step window is fine.
        let straight = vec![grid.cell_id(0, 0), grid.cell_id(0, 1), grid.cell_id(0, 2)];
        assert!(climbs_along_path(&grid, &straight, 0, 2));
    }
}
