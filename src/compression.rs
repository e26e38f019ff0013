use crate::grid::GridMap;
use crate::hill_climb::{climbs_along_path, hill_climb};
use crate::stats::SearchStats;

/// Compress an optimal path into the minimal ordered subgoal list such that
/// chaining hill-climbs through `start → subgoals… → goal` reconstructs the
/// path exactly.
///
/// The cursor repeatedly binary-searches for the farthest path index still
/// reachable by an on-path hill-climb from the current anchor, records that
/// cell as a subgoal and advances. The adjacent successor is always
/// reachable, so every round makes progress. Endpoints are not included in
/// the returned list.
pub fn compress_path(grid: &GridMap, path: &[u32]) -> Vec<u32> {
    let mut subgoals = Vec::new();
    if path.len() < 3 {
        return subgoals;
    }
    let last = path.len() - 1;
    let mut cursor = 0;
    while !climbs_along_path(grid, path, cursor, last) {
        // Farthest reachable index in [cursor + 1, last - 1]. The lower
        // bound always passes; `last` just failed.
        let mut lo = cursor + 1;
        let mut hi = last - 1;
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if climbs_along_path(grid, path, cursor, mid) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        subgoals.push(path[lo]);
        cursor = lo;
    }
    subgoals
}

/// Re-expand a compressed chain by hill-climbing between consecutive
/// anchors. Returns the full cell path, or `None` when any leg dead-ends
/// (possible only if the grid changed since compression).
pub fn expand_subgoals(
    grid: &GridMap,
    start: u32,
    subgoals: &[u32],
    goal: u32,
    stats: &mut SearchStats,
) -> Option<Vec<u32>> {
    let mut cells = vec![start];
    let mut from = start;
    for &anchor in subgoals.iter().chain(std::iter::once(&goal)) {
        if anchor == from {
            continue;
        }
        let leg = hill_climb(grid, from, anchor, stats)?;
        cells.extend_from_slice(&leg[1..]);
        from = anchor;
    }
    Some(cells)
}
