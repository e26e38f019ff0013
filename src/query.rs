//! Hierarchical path queries over the region abstraction.
//!
//! A query maps its endpoints to regions, routes coarsely over the region
//! graph, then expands the route by hill-climbing through cached subgoal
//! chains between consecutive region representatives. Any miss along the
//! way degrades gracefully to flat A*; the abstraction buys speed, never
//! correctness.

use crate::astar;
use crate::compression::compress_path;
use crate::hill_climb::hill_climb;
use crate::region_graph::AbstractedMap;
use crate::stats::SearchStats;
use crate::subgoal_cache::SubgoalChain;
use crate::types::{Path, RegionId};
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

impl AbstractedMap {
    /// Greedy hill-climb between two cells. `None` is an expected miss, not
    /// an error; callers fall back to [`AbstractedMap::find_path`] or flat
    /// A*.
    pub fn hill_climb_path(
        &self,
        start: u32,
        goal: u32,
        stats: &mut SearchStats,
    ) -> Option<Path> {
        let cells = hill_climb(&self.grid, start, goal, stats)?;
        Some(Path {
            cost: self.grid.path_cost(&cells),
            cells,
        })
    }

    /// Minimal subgoal list for an optimal path (endpoints excluded).
    pub fn compressed_subgoals(&self, optimal_path: &[u32]) -> Vec<u32> {
        compress_path(&self.grid, optimal_path)
    }

    /// Coarse route over the region graph from one region to another, by
    /// Dijkstra with representative-to-representative octile weights.
    /// Includes both endpoints; `None` when the regions are disconnected.
    pub fn region_route(&self, from: RegionId, to: RegionId) -> Option<Vec<RegionId>> {
        if from == to {
            return Some(vec![from]);
        }
        let mut dist: FxHashMap<RegionId, u32> = FxHashMap::default();
        let mut prev: FxHashMap<RegionId, RegionId> = FxHashMap::default();
        let mut heap: BinaryHeap<Reverse<(u32, u32)>> = BinaryHeap::new();
        dist.insert(from, 0);
        heap.push(Reverse((0, from.0)));

        while let Some(Reverse((cost, raw))) = heap.pop() {
            let current = RegionId(raw);
            if cost > dist.get(&current).copied().unwrap_or(u32::MAX) {
                continue;
            }
            if current == to {
                break;
            }
            let Some(region) = self.regions.get(&current) else {
                continue;
            };
            let here = region.representative;
            for &next in &region.neighbors {
                let Some(neighbor) = self.regions.get(&next) else {
                    continue;
                };
                let step = self.grid.octile_distance(here, neighbor.representative).max(1);
                let new_cost = cost + step;
                if new_cost < dist.get(&next).copied().unwrap_or(u32::MAX) {
                    dist.insert(next, new_cost);
                    prev.insert(next, current);
                    heap.push(Reverse((new_cost, next.0)));
                }
            }
        }

        if !dist.contains_key(&to) {
            return None;
        }
        let mut route = vec![to];
        let mut current = to;
        while let Some(&p) = prev.get(&current) {
            route.push(p);
            current = p;
        }
        route.reverse();
        debug_assert_eq!(route.first(), Some(&from));
        Some(route)
    }

    /// Cached subgoal chain between two adjacent regions, computing and
    /// storing it on first use (A* between representatives, then binary
    /// search compression).
    fn pair_chain(
        &mut self,
        a: RegionId,
        b: RegionId,
        stats: &mut SearchStats,
    ) -> Option<SubgoalChain> {
        if let Some(chain) = self.cache.get((a, b)) {
            stats.cache_hits += 1;
            return Some(chain.clone());
        }
        stats.cache_misses += 1;
        let rep_a = self
            .representative(a)
            .expect("region representative vanished mid-query");
        let rep_b = self
            .representative(b)
            .expect("region representative vanished mid-query");
        let optimal = astar::find_path(&self.grid, rep_a, rep_b, stats)?;
        let chain = SubgoalChain {
            subgoals: compress_path(&self.grid, &optimal.cells),
            cost: optimal.cost,
            path_cells: optimal.cells,
        };
        self.cache.insert((a, b), chain.clone());
        Some(chain)
    }

    /// Answer a shortest-path query through the abstraction.
    ///
    /// Suboptimality is bounded by the cached chains (each reconstructs an
    /// optimal representative-to-representative path); whenever a leg cannot
    /// be expanded the whole query falls back to flat A*, so the answer is a
    /// real path or a true "no path".
    pub fn find_path(&mut self, start: u32, goal: u32, stats: &mut SearchStats) -> Option<Path> {
        let (Some(start_region), Some(goal_region)) =
            (self.region_id_at(start), self.region_id_at(goal))
        else {
            stats.no_path += 1;
            return None;
        };

        if start_region == goal_region {
            if let Some(path) = self.hill_climb_path(start, goal, stats) {
                return Some(path);
            }
            stats.fallbacks += 1;
            return astar::find_path(&self.grid, start, goal, stats);
        }

        let Some(route) = self.region_route(start_region, goal_region) else {
            // Disconnected in the abstraction; flat search gets the final
            // word so a graph bug can never manufacture a false negative.
            stats.fallbacks += 1;
            return astar::find_path(&self.grid, start, goal, stats);
        };

        // Anchor sequence: start, each leg's representatives with the
        // cached subgoals between them, goal.
        let mut anchors: Vec<u32> = vec![start];
        anchors.push(
            self.representative(start_region)
                .expect("region representative vanished mid-query"),
        );
        for window in route.windows(2) {
            let Some(chain) = self.pair_chain(window[0], window[1], stats) else {
                stats.fallbacks += 1;
                return astar::find_path(&self.grid, start, goal, stats);
            };
            anchors.extend_from_slice(&chain.subgoals);
            anchors.push(
                self.representative(window[1])
                    .expect("region representative vanished mid-query"),
            );
        }
        anchors.push(goal);
        anchors.dedup();

        let mut cells = vec![start];
        for window in anchors.windows(2) {
            let Some(leg) = hill_climb(&self.grid, window[0], window[1], stats) else {
                debug!(
                    "[QUERY] hill-climb leg {} -> {} dead-ended, falling back to A*",
                    window[0], window[1]
                );
                stats.fallbacks += 1;
                return astar::find_path(&self.grid, start, goal, stats);
            };
            cells.extend_from_slice(&leg[1..]);
        }
        Some(Path {
            cost: self.grid.path_cost(&cells),
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMap;

    #[test]
    fn test_route_and_query_cross_sectors() {
        let grid = GridMap::from_ascii(
            "........\n\
             ........\n\
             ........\n\
             ........",
        );
        let mut map = AbstractedMap::build(grid, 4).unwrap();
        let mut stats = SearchStats::default();
        let start = map.grid().cell_id(1, 1);
        let goal = map.grid().cell_id(2, 6);
        let path = map.find_path(start, goal, &mut stats).unwrap();
        assert_eq!(path.cells.first(), Some(&start));
        assert_eq!(path.cells.last(), Some(&goal));
        assert_eq!(path.cost, map.grid().path_cost(&path.cells));
        // Second identical query is served from the cache.
        let misses = stats.cache_misses;
        map.find_path(start, goal, &mut stats).unwrap();
        assert_eq!(stats.cache_misses, misses);
        assert!(stats.cache_hits > 0);
    }

    #[test]
    fn test_query_to_wall_is_no_path() {
        let grid = GridMap::from_ascii("...#\n...#\n...#");
        let mut map = AbstractedMap::build(grid, 4).unwrap();
        let mut stats = SearchStats::default();
        let start = map.grid().cell_id(0, 0);
        let wall = map.grid().cell_id(0, 3);
        assert!(map.find_path(start, wall, &mut stats).is_none());
        assert_eq!(stats.no_path, 1);
    }

    #[test]
    fn test_disconnected_components_answer_none() {
        let grid = GridMap::from_ascii(
            "..#..\n\
             ..#..\n\
             ..#..",
        );
        let mut map = AbstractedMap::build(grid, 8).unwrap();
        let mut stats = SearchStats::default();
        let left = map.grid().cell_id(1, 0);
        let right = map.grid().cell_id(1, 4);
        assert!(map.find_path(left, right, &mut stats).is_none());
        assert!(stats.fallbacks > 0);
    }
}
