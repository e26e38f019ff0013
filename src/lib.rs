//! Sector-based region abstraction for fast grid pathfinding.
//!
//! # Architecture
//!
//! 1. **Grid:** open/wall cells with linear ids and octile movement
//! 2. **Sectors:** fixed-size square tiles; all flood fills stay inside one
//! 3. **Regions:** per-sector connected components with stable ids and
//!    centroid-snapped representatives
//! 4. **Region graph:** symmetric adjacency (corner-cutting aware) over an
//!    id-keyed arena with a min-priority free pool
//! 5. **Incremental engine:** single-cell wall toggles classified into
//!    elimination / partition / merge / pathblocker / plain cases and
//!    repaired in O(sector), never by full rebuild
//! 6. **Subgoal cache:** per region pair, a hill-climbable compressed chain,
//!    invalidated synchronously with every structural change
//! 7. **Query layer:** coarse region route, chained hill-climbs, flat A*
//!    fallback
//!
//! One [`AbstractedMap`] instance owns all state for one map; callers
//! serialize toggles and queries against it.

mod abstraction;
pub mod astar;
pub mod compression;
mod grid;
pub mod hill_climb;
mod incremental;
mod query;
mod region_graph;
mod sector;
mod stats;
mod subgoal_cache;
mod types;

#[cfg(test)]
mod tests;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use grid::GridMap;
pub use region_graph::{AbstractStats, AbstractedMap, Region, RegionIdPool};
pub use sector::{Sector, SectorGrid};
pub use stats::SearchStats;
pub use subgoal_cache::{PairKey, SubgoalCache, SubgoalChain};
pub use types::{
    AbstractionError, Direction, Path, RegionId, SectorId, WallAddOutcome, WallRemoveOutcome,
    CARDINAL_COST, CELL_OPEN, CELL_WALL, DEFAULT_SECTOR_SIZE, DIAGONAL_COST, REGION_TAG_START,
};
