use crate::abstraction;
use crate::grid::GridMap;
use crate::sector::SectorGrid;
use crate::subgoal_cache::SubgoalCache;
use crate::types::{
    AbstractionError, Direction, RegionId, SectorId, CELL_WALL, REGION_TAG_START,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// One maximal connected open-cell component within a single sector.
///
/// Neighbor sets are symmetric by construction: if A lists B then B lists A.
/// Regions are always reached through the id map, never held by reference,
/// so releasing an id cannot dangle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub sector: SectorId,
    pub representative: u32,
    pub cell_count: u32,
    pub neighbors: FxHashSet<RegionId>,
}

/// Min-priority free pool for region ids.
///
/// Ids double as cell tags, so the high-water mark starts at
/// [`REGION_TAG_START`] and nothing below it is ever minted. Released ids
/// are reused lowest-first; an id must not be released while any region or
/// cache key still references it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionIdPool {
    free: BTreeSet<u32>,
    next: u32,
}

impl Default for RegionIdPool {
    fn default() -> Self {
        Self {
            free: BTreeSet::new(),
            next: REGION_TAG_START,
        }
    }
}

impl RegionIdPool {
    pub fn allocate(&mut self) -> RegionId {
        if let Some(id) = self.free.pop_first() {
            return RegionId(id);
        }
        let id = self.next;
        self.next += 1;
        RegionId(id)
    }

    pub fn release(&mut self, id: RegionId) {
        debug_assert!(id.0 >= REGION_TAG_START && id.0 < self.next);
        self.free.insert(id.0);
    }

    pub(crate) fn free_ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.free.iter().map(|&id| RegionId(id))
    }
}

/// Summary numbers for debugging and UIs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AbstractStats {
    pub region_count: usize,
    pub sector_count: usize,
    pub adjacency_edges: usize,
    pub cached_pairs: usize,
}

/// The region abstraction of one grid map, plus everything needed to keep it
/// consistent under single-cell wall toggles.
///
/// # Architecture
///
/// 1. **Grid:** open/wall cells; open cells are tagged with their region id
/// 2. **Sectors:** fixed-size square tiles; every region lives in exactly one
/// 3. **Regions:** id-keyed arena with symmetric neighbor sets
/// 4. **Subgoal cache:** per region pair, a compressed hill-climbable chain
///
/// One instance owns all of the above. The engine is single-threaded and
/// synchronous: callers serialize wall toggles and queries against it, and
/// every toggle runs to completion before the next call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbstractedMap {
    pub(crate) grid: GridMap,
    pub(crate) sectors: SectorGrid,
    pub(crate) regions: FxHashMap<RegionId, Region>,
    pub(crate) pool: RegionIdPool,
    /// Derived data; rebuilt lazily after deserialization.
    #[serde(skip)]
    pub(crate) cache: SubgoalCache,
}

impl AbstractedMap {
    /// One-time full build: flood-fill every sector, then wire adjacency.
    pub fn build(grid: GridMap, sector_size: usize) -> Result<Self, AbstractionError> {
        if grid.rows == 0 || grid.cols == 0 {
            return Err(AbstractionError::EmptyGrid);
        }
        let sectors = SectorGrid::new(grid.rows, grid.cols, sector_size)?;
        let mut map = Self {
            grid,
            sectors,
            regions: FxHashMap::default(),
            pool: RegionIdPool::default(),
            cache: SubgoalCache::default(),
        };

        for idx in 0..map.sectors.sector_count() {
            let fresh = abstraction::abstract_sector(
                &mut map.grid,
                &mut map.sectors,
                SectorId(idx as u32),
                &mut map.pool,
            );
            for region in fresh {
                map.regions.insert(region.id, region);
            }
        }

        for cell in 0..map.grid.cell_count() as u32 {
            if map.grid.state(cell) >= REGION_TAG_START {
                map.add_adjacency_via_cell(cell)?;
            }
        }

        let stats = map.stats();
        info!(
            "[ABSTRACTION] built {} regions / {} edges across {} sectors",
            stats.region_count, stats.adjacency_edges, stats.sector_count
        );
        Ok(map)
    }

    #[inline]
    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    #[inline]
    pub fn sectors(&self) -> &SectorGrid {
        &self.sectors
    }

    /// Region owning a cell, `None` for walls.
    pub fn region_id_at(&self, cell: u32) -> Option<RegionId> {
        let state = self.grid.state(cell);
        if state >= REGION_TAG_START {
            Some(RegionId(state))
        } else {
            None
        }
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn representative(&self, id: RegionId) -> Result<u32, AbstractionError> {
        let region = self
            .regions
            .get(&id)
            .ok_or(AbstractionError::UnknownRegion(id))?;
        if self.grid.state(region.representative) != id.0 {
            return Err(AbstractionError::MissingRepresentative(id));
        }
        Ok(region.representative)
    }

    pub fn neighbor_regions(&self, id: RegionId) -> Result<&FxHashSet<RegionId>, AbstractionError> {
        self.regions
            .get(&id)
            .map(|r| &r.neighbors)
            .ok_or(AbstractionError::UnknownRegion(id))
    }

    pub fn stats(&self) -> AbstractStats {
        AbstractStats {
            region_count: self.regions.len(),
            sector_count: self.sectors.sector_count(),
            adjacency_edges: self.regions.values().map(|r| r.neighbors.len()).sum::<usize>() / 2,
            cached_pairs: self.cache.len(),
        }
    }

    // ========================================================================
    // Adjacency plumbing (shared by initial build and incremental repair)
    // ========================================================================

    /// Insert the symmetric edge a↔b.
    pub(crate) fn link(&mut self, a: RegionId, b: RegionId) -> Result<(), AbstractionError> {
        debug_assert_ne!(a, b);
        self.regions
            .get_mut(&a)
            .ok_or(AbstractionError::UnknownRegion(a))?
            .neighbors
            .insert(b);
        self.regions
            .get_mut(&b)
            .ok_or(AbstractionError::UnknownRegion(b))?
            .neighbors
            .insert(a);
        Ok(())
    }

    /// Remove the symmetric edge a↔b.
    pub(crate) fn unlink(&mut self, a: RegionId, b: RegionId) -> Result<(), AbstractionError> {
        self.regions
            .get_mut(&a)
            .ok_or(AbstractionError::UnknownRegion(a))?
            .neighbors
            .remove(&b);
        self.regions
            .get_mut(&b)
            .ok_or(AbstractionError::UnknownRegion(b))?
            .neighbors
            .remove(&a);
        Ok(())
    }

    /// Add every adjacency edge observable from one tagged cell.
    ///
    /// Cardinal contact always counts; diagonal contact obeys the corner
    /// rule baked into [`GridMap::can_step`]. Iterating this over all cells
    /// of a scope finds every pair with at least one endpoint in the scope.
    pub(crate) fn add_adjacency_via_cell(&mut self, cell: u32) -> Result<(), AbstractionError> {
        let tag = self.grid.state(cell);
        debug_assert!(tag >= REGION_TAG_START);
        for dir in Direction::ALL {
            let Some(target) = self.grid.can_step(cell, dir) else {
                continue;
            };
            let other = self.grid.state(target);
            if other >= REGION_TAG_START && other != tag {
                self.link(RegionId(tag), RegionId(other))?;
            }
        }
        Ok(())
    }

    /// Re-derive adjacency for every region with cells in one sector.
    /// Cross-boundary pairs are found from the inside endpoint.
    pub(crate) fn rebuild_sector_adjacency(
        &mut self,
        sector_id: SectorId,
    ) -> Result<(), AbstractionError> {
        let cells: Vec<u32> = self
            .sectors
            .cells_of(sector_id)
            .filter(|&cell| self.grid.state(cell) >= REGION_TAG_START)
            .collect();
        for cell in cells {
            self.add_adjacency_via_cell(cell)?;
        }
        Ok(())
    }

    /// Detach a region from the graph: neighbors' back-edges, the sector's
    /// id list, and the id map. The caller decides when to release the id
    /// (cache invalidation must come first).
    pub(crate) fn detach_region(&mut self, id: RegionId) -> Result<Region, AbstractionError> {
        let region = self
            .regions
            .remove(&id)
            .ok_or(AbstractionError::UnknownRegion(id))?;
        for &neighbor in &region.neighbors {
            if let Some(other) = self.regions.get_mut(&neighbor) {
                other.neighbors.remove(&id);
            }
        }
        let sector = self.sectors.get_mut(region.sector);
        sector.region_ids.retain(|&r| r != id);
        Ok(region)
    }

    /// Whether regions `a` and `b` still touch anywhere, by scanning `a`'s
    /// cells inside its sector. O(sector), used by pathblocker repair.
    pub(crate) fn still_adjacent(&self, a: RegionId, b: RegionId) -> bool {
        let Some(region) = self.regions.get(&a) else {
            return false;
        };
        for cell in self.sectors.cells_of(region.sector) {
            if self.grid.state(cell) != a.0 {
                continue;
            }
            for dir in Direction::ALL {
                if let Some(target) = self.grid.can_step(cell, dir) {
                    if self.grid.state(target) == b.0 {
                        return true;
                    }
                }
            }
        }
        false
    }

    // ========================================================================
    // Invariant checking (fatal-class conditions, exercised by tests)
    // ========================================================================

    /// Verify every structural invariant the incremental engine promises to
    /// preserve. Cheap enough for tests to call after every toggle; not part
    /// of any hot path.
    pub fn check_invariants(&self) -> Result<(), AbstractionError> {
        // Cell tags agree with the region map.
        let mut actual_counts: FxHashMap<RegionId, u32> = FxHashMap::default();
        for cell in 0..self.grid.cell_count() as u32 {
            let state = self.grid.state(cell);
            if state == CELL_WALL {
                continue;
            }
            if state < REGION_TAG_START {
                return Err(AbstractionError::CorruptCellState { cell, state });
            }
            let id = RegionId(state);
            let region = self
                .regions
                .get(&id)
                .ok_or(AbstractionError::UnknownRegion(id))?;
            if region.sector != self.sectors.sector_containing(cell) {
                return Err(AbstractionError::CorruptCellState { cell, state });
            }
            *actual_counts.entry(id).or_default() += 1;
        }

        for region in self.regions.values() {
            let actual = actual_counts.get(&region.id).copied().unwrap_or(0);
            if actual != region.cell_count {
                return Err(AbstractionError::RegionCellCountMismatch {
                    region: region.id,
                    recorded: region.cell_count,
                    actual,
                });
            }
            if self.grid.state(region.representative) != region.id.0 {
                return Err(AbstractionError::MissingRepresentative(region.id));
            }
            for &neighbor in &region.neighbors {
                let back = self
                    .regions
                    .get(&neighbor)
                    .ok_or(AbstractionError::UnknownRegion(neighbor))?;
                if !back.neighbors.contains(&region.id) {
                    return Err(AbstractionError::AsymmetricAdjacency(region.id, neighbor));
                }
            }
            let listed = self
                .sectors
                .get(region.sector)
                .region_ids
                .iter()
                .filter(|&&r| r == region.id)
                .count();
            if listed != 1 {
                return Err(AbstractionError::UnknownRegion(region.id));
            }
        }

        for id in self.pool.free_ids() {
            if self.regions.contains_key(&id) {
                return Err(AbstractionError::FreeIdInUse(id));
            }
        }

        for (a, b) in self.cache.keys() {
            if !self.regions.contains_key(&a) {
                return Err(AbstractionError::StaleCacheKey(a));
            }
            if !self.regions.contains_key(&b) {
                return Err(AbstractionError::StaleCacheKey(b));
            }
        }
        Ok(())
    }
}
