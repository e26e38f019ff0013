//! Incremental maintenance of the region abstraction under single-cell wall
//! toggles.
//!
//! Each toggle is classified once into a [`WallAddOutcome`] /
//! [`WallRemoveOutcome`] and dispatched by `match`; every branch leaves the
//! region graph with symmetric adjacency, a disjoint free pool, and a
//! coherent subgoal cache. Cost is bounded by one sector: the only expensive
//! branches (partition, merge) wipe and re-flood a single sector and never
//! look at the rest of the map.

use crate::abstraction::{abstract_sector, compute_representative, member_cells};
use crate::region_graph::{AbstractedMap, Region};
use crate::types::{
    AbstractionError, Direction, RegionId, SectorId, WallAddOutcome, WallRemoveOutcome,
    CELL_OPEN, CELL_WALL, REGION_TAG_START,
};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::{debug, info};

/// The four cardinal-cardinal neighbor pairs that are diagonal to each
/// other, with the opposite shared cardinal of each pair (a diagonal of the
/// toggled cell). The toggled cell is the other shared cardinal, so its
/// state can make or break both the cell-level step and the region-level
/// adjacency between the pair.
const SUPPORTED_DIAGONAL_PAIRS: [(Direction, Direction, Direction); 4] = [
    (Direction::North, Direction::East, Direction::NorthEast),
    (Direction::East, Direction::South, Direction::SouthEast),
    (Direction::South, Direction::West, Direction::SouthWest),
    (Direction::West, Direction::North, Direction::NorthWest),
];

impl AbstractedMap {
    /// Turn an open cell into a wall, applying the minimal correct update.
    ///
    /// Fails loudly if the cell is already a wall or the graph is corrupt;
    /// continuing past either would propagate corruption.
    pub fn add_wall(&mut self, cell: u32) -> Result<WallAddOutcome, AbstractionError> {
        let state = self.grid.state(cell);
        if state == CELL_WALL {
            return Err(AbstractionError::WallAlreadyPresent(cell));
        }
        if state < REGION_TAG_START {
            return Err(AbstractionError::CorruptCellState { cell, state });
        }
        let rid = RegionId(state);
        let region = self
            .regions
            .get(&rid)
            .ok_or(AbstractionError::UnknownRegion(rid))?;
        let sector_id = region.sector;
        let cell_count = region.cell_count;
        let was_rep = region.representative == cell;
        let old_neighbors: Vec<RegionId> = region.neighbors.iter().copied().collect();

        // Region pairs whose adjacency may run only through this cell; must
        // be collected before the grid mutates.
        let contacts = self.contact_pairs_via(cell);

        self.grid.set_state(cell, CELL_WALL);
        self.cache.invalidate_cell(cell);
        // Diagonal steps between two of this cell's cardinal neighbors may
        // have just lost their last open support; chains taking such a step
        // are dead even though the walled cell is not on them.
        for (da, db, opposite) in SUPPORTED_DIAGONAL_PAIRS {
            let (Some(p), Some(q)) = (self.grid.neighbor(cell, da), self.grid.neighbor(cell, db))
            else {
                continue;
            };
            if !self.grid.is_passable(p) || !self.grid.is_passable(q) {
                continue;
            }
            let opposite_open = self
                .grid
                .neighbor(cell, opposite)
                .is_some_and(|o| self.grid.is_passable(o));
            if !opposite_open {
                self.cache.invalidate_step(p, q);
            }
        }

        // Elimination: the wall removes the whole region.
        if cell_count == 1 {
            self.cache.invalidate_region(rid);
            self.detach_region(rid)?;
            self.pool.release(rid);
            self.repair_severed_contacts(&contacts)?;
            debug!("[INCREMENTAL] add_wall {cell}: eliminated region {}", rid.0);
            return Ok(WallAddOutcome::Elimination { removed: rid });
        }

        // Partition: cheap ring pre-filter, then a confirming BFS.
        if self.ring_arc_count(cell, rid) >= 2 {
            let seed = self
                .ring_cells(cell)
                .into_iter()
                .find(|&n| self.grid.state(n) == rid.0)
                .ok_or(AbstractionError::CorruptCellState { cell, state })?;
            let reachable = self.count_reachable_in_region(seed, rid);
            if reachable < cell_count - 1 {
                let new_regions =
                    self.reabstract_sector_replacing(&[rid], sector_id, &old_neighbors)?;
                self.repair_severed_contacts(&contacts)?;
                info!(
                    "[INCREMENTAL] add_wall {cell}: partitioned region {} into {:?}",
                    rid.0,
                    new_regions.iter().map(|r| r.0).collect::<Vec<_>>()
                );
                return Ok(WallAddOutcome::Partition {
                    replaced: rid,
                    new_regions,
                });
            }
        }

        // Plain shrink, possibly severing adjacencies that ran only through
        // the walled cell (corner and edge pathblockers alike).
        {
            let region = self
                .regions
                .get_mut(&rid)
                .ok_or(AbstractionError::UnknownRegion(rid))?;
            region.cell_count -= 1;
        }
        if was_rep {
            let cells = member_cells(&self.grid, &self.sectors, sector_id, rid.0);
            let rep = compute_representative(&self.grid, rid.0, &cells);
            self.regions
                .get_mut(&rid)
                .ok_or(AbstractionError::UnknownRegion(rid))?
                .representative = rep;
        }
        self.cache.invalidate_region(rid);
        let severed = self.repair_severed_contacts(&contacts)?;
        if severed.is_empty() {
            Ok(WallAddOutcome::Shrunk { region: rid })
        } else {
            debug!(
                "[INCREMENTAL] add_wall {cell}: blocked {} adjacency pair(s)",
                severed.len()
            );
            Ok(WallAddOutcome::PathBlocked {
                region: rid,
                severed,
            })
        }
    }

    /// Turn a wall cell back into open space.
    pub fn remove_wall(&mut self, cell: u32) -> Result<WallRemoveOutcome, AbstractionError> {
        if self.grid.state(cell) != CELL_WALL {
            return Err(AbstractionError::CellNotWall(cell));
        }
        self.grid.set_state(cell, CELL_OPEN);
        let sector_id = self.sectors.sector_containing(cell);

        // Regions genuinely connected to the cell under the movement rule.
        // A diagonal neighbor walled off on both cardinals does not count;
        // joining it would create a disconnected region.
        let mut touched: SmallVec<[RegionId; 8]> = SmallVec::new();
        for dir in Direction::ALL {
            if let Some(target) = self.grid.can_step(cell, dir) {
                let tag = self.grid.state(target);
                if tag >= REGION_TAG_START && !touched.contains(&RegionId(tag)) {
                    touched.push(RegionId(tag));
                }
            }
        }

        if touched.is_empty() {
            let id = self.create_singleton_region(cell, sector_id)?;
            debug!("[INCREMENTAL] remove_wall {cell}: new isolated region {}", id.0);
            return Ok(WallRemoveOutcome::NewIsolated { region: id });
        }

        let same_sector: SmallVec<[RegionId; 8]> = touched
            .iter()
            .copied()
            .filter(|id| {
                self.regions
                    .get(id)
                    .is_some_and(|r| r.sector == sector_id)
            })
            .collect();

        if same_sector.is_empty() {
            let id = self.create_singleton_region(cell, sector_id)?;
            for &other in &touched {
                self.link(id, other)?;
            }
            self.link_supported_pairs(cell)?;
            debug!(
                "[INCREMENTAL] remove_wall {cell}: new region {} bridging {:?}",
                id.0,
                touched.iter().map(|r| r.0).collect::<Vec<_>>()
            );
            return Ok(WallRemoveOutcome::NewConnected { region: id });
        }

        if same_sector.len() >= 2 {
            let mut merged: Vec<RegionId> = same_sector.to_vec();
            merged.sort();
            let mut invalidation: FxHashSet<RegionId> = FxHashSet::default();
            for &m in &merged {
                let region = self
                    .regions
                    .get(&m)
                    .ok_or(AbstractionError::UnknownRegion(m))?;
                invalidation.extend(region.neighbors.iter().copied());
            }
            let new_regions = self.reabstract_sector_replacing(
                &merged,
                sector_id,
                &invalidation.iter().copied().collect::<Vec<_>>(),
            )?;
            self.link_supported_pairs(cell)?;
            info!(
                "[INCREMENTAL] remove_wall {cell}: merged {:?} into {:?}",
                merged.iter().map(|r| r.0).collect::<Vec<_>>(),
                new_regions.iter().map(|r| r.0).collect::<Vec<_>>()
            );
            return Ok(WallRemoveOutcome::Merge {
                merged,
                new_regions,
            });
        }

        // The cell joins the single connected same-sector region.
        let rid = same_sector[0];
        self.grid.set_state(cell, rid.0);
        {
            let region = self
                .regions
                .get_mut(&rid)
                .ok_or(AbstractionError::UnknownRegion(rid))?;
            region.cell_count += 1;
        }
        let cells = member_cells(&self.grid, &self.sectors, sector_id, rid.0);
        let rep = compute_representative(&self.grid, rid.0, &cells);
        self.regions
            .get_mut(&rid)
            .ok_or(AbstractionError::UnknownRegion(rid))?
            .representative = rep;

        let mut linked: Vec<(RegionId, RegionId)> = Vec::new();
        for &other in &touched {
            if other == rid {
                continue;
            }
            let known = self
                .regions
                .get(&rid)
                .ok_or(AbstractionError::UnknownRegion(rid))?
                .neighbors
                .contains(&other);
            if !known {
                self.link(rid, other)?;
                linked.push((rid, other));
            }
        }
        linked.extend(self.link_supported_pairs(cell)?);
        self.cache.invalidate_region(rid);

        if linked.is_empty() {
            Ok(WallRemoveOutcome::Grown { region: rid })
        } else {
            debug!(
                "[INCREMENTAL] remove_wall {cell}: unblocked {} adjacency pair(s)",
                linked.len()
            );
            Ok(WallRemoveOutcome::Unblocked {
                region: rid,
                linked,
            })
        }
    }

    // ========================================================================
    // Shared machinery
    // ========================================================================

    /// Wipe the given regions' cells back to open-untagged, release their
    /// ids, re-flood the sector, and re-derive its adjacency. Used by both
    /// the partition and merge cases. `expire` lists the extra region ids
    /// whose cache entries the structural change invalidates.
    fn reabstract_sector_replacing(
        &mut self,
        doomed: &[RegionId],
        sector_id: SectorId,
        expire: &[RegionId],
    ) -> Result<Vec<RegionId>, AbstractionError> {
        for &id in doomed {
            for member in member_cells(&self.grid, &self.sectors, sector_id, id.0) {
                self.grid.set_state(member, CELL_OPEN);
            }
            self.cache.invalidate_region(id);
            self.detach_region(id)?;
            self.pool.release(id);
        }
        let fresh = abstract_sector(&mut self.grid, &mut self.sectors, sector_id, &mut self.pool);
        let new_ids: Vec<RegionId> = fresh.iter().map(|r| r.id).collect();
        for region in fresh {
            self.regions.insert(region.id, region);
        }
        self.rebuild_sector_adjacency(sector_id)?;
        for &id in expire {
            self.cache.invalidate_region(id);
        }
        Ok(new_ids)
    }

    fn create_singleton_region(
        &mut self,
        cell: u32,
        sector_id: SectorId,
    ) -> Result<RegionId, AbstractionError> {
        let id = self.pool.allocate();
        self.grid.set_state(cell, id.0);
        self.sectors.get_mut(sector_id).region_ids.push(id);
        self.regions.insert(
            id,
            Region {
                id,
                sector: sector_id,
                representative: cell,
                cell_count: 1,
                neighbors: FxHashSet::default(),
            },
        );
        Ok(id)
    }

    /// The in-bounds cells of the 8-ring around `cell`, circular order.
    fn ring_cells(&self, cell: u32) -> SmallVec<[u32; 8]> {
        let mut out = SmallVec::new();
        for dir in Direction::RING {
            if let Some(n) = self.grid.neighbor(cell, dir) {
                out.push(n);
            }
        }
        out
    }

    /// Partition pre-filter: number of circular arcs the walled cell's
    /// same-region ring neighbors form.
    ///
    /// Every component of a split must touch the ring, and one arc keeps
    /// all ring neighbors mutually connected (consecutive ring cells are
    /// cardinally adjacent), so fewer than two arcs cannot split. Cells
    /// outside the grid or the region count as blocked, which also covers
    /// the sector-edge case for free. Necessary, not sufficient; the BFS
    /// confirms.
    fn ring_arc_count(&self, cell: u32, rid: RegionId) -> u32 {
        let mut open = [false; 8];
        for (i, dir) in Direction::RING.iter().enumerate() {
            if let Some(n) = self.grid.neighbor(cell, *dir) {
                open[i] = self.grid.state(n) == rid.0;
            }
        }
        let mut arcs = 0;
        for i in 0..8 {
            if open[i] && !open[(i + 7) % 8] {
                arcs += 1;
            }
        }
        if arcs == 0 && open.iter().any(|&o| o) {
            1 // fully surrounded by its own region
        } else {
            arcs
        }
    }

    /// BFS over the cells still tagged `rid`, counting how many the seed
    /// reaches. The tag confines the search to one sector by construction.
    fn count_reachable_in_region(&self, seed: u32, rid: RegionId) -> u32 {
        let mut visited = fixedbitset::FixedBitSet::with_capacity(self.grid.cell_count());
        let mut stack = vec![seed];
        visited.insert(seed as usize);
        let mut count = 0;
        while let Some(cell) = stack.pop() {
            count += 1;
            for (next, _cost) in self.grid.passable_neighbors(cell) {
                if !visited.contains(next as usize) && self.grid.state(next) == rid.0 {
                    visited.insert(next as usize);
                    stack.push(next);
                }
            }
        }
        count
    }

    /// Region pairs whose adjacency involves `cell`, either as an endpoint
    /// of a contact or as the supporting cardinal of a diagonal contact
    /// between two of its cardinal neighbors. Evaluated against the current
    /// grid, so callers collect these before mutating the cell.
    fn contact_pairs_via(&self, cell: u32) -> SmallVec<[(RegionId, RegionId); 8]> {
        let mut pairs: SmallVec<[(RegionId, RegionId); 8]> = SmallVec::new();
        let mut push = |a: u32, b: u32| {
            let pair = (RegionId(a.min(b)), RegionId(a.max(b)));
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        };

        let tag = self.grid.state(cell);
        if tag >= REGION_TAG_START {
            for dir in Direction::ALL {
                if let Some(target) = self.grid.can_step(cell, dir) {
                    let other = self.grid.state(target);
                    if other >= REGION_TAG_START && other != tag {
                        push(tag, other);
                    }
                }
            }
        }
        for (da, db, _opposite) in SUPPORTED_DIAGONAL_PAIRS {
            let (Some(a), Some(b)) = (self.grid.neighbor(cell, da), self.grid.neighbor(cell, db))
            else {
                continue;
            };
            let (ta, tb) = (self.grid.state(a), self.grid.state(b));
            if ta >= REGION_TAG_START && tb >= REGION_TAG_START && ta != tb {
                push(ta, tb);
            }
        }
        pairs
    }

    /// Drop recorded adjacencies that no longer have any point of contact.
    /// Covers the original's corner pathblocker and the edge-adjacent case
    /// it left unfinished, with one O(sector) rescan per candidate pair.
    fn repair_severed_contacts(
        &mut self,
        contacts: &[(RegionId, RegionId)],
    ) -> Result<Vec<(RegionId, RegionId)>, AbstractionError> {
        let mut severed = Vec::new();
        for &(a, b) in contacts {
            let recorded = self
                .regions
                .get(&a)
                .is_some_and(|r| r.neighbors.contains(&b));
            if !recorded || self.still_adjacent(a, b) {
                continue;
            }
            self.unlink(a, b)?;
            self.cache.invalidate_pair(a, b);
            severed.push((a, b));
        }
        Ok(severed)
    }

    /// Add adjacencies newly supported by an opened cell: diagonal contacts
    /// between two of its cardinal neighbors now have an open shared
    /// cardinal. Contacts with the cell itself as endpoint are the caller's
    /// business.
    fn link_supported_pairs(
        &mut self,
        cell: u32,
    ) -> Result<Vec<(RegionId, RegionId)>, AbstractionError> {
        let mut linked = Vec::new();
        for (da, db, _opposite) in SUPPORTED_DIAGONAL_PAIRS {
            let (Some(a), Some(b)) = (self.grid.neighbor(cell, da), self.grid.neighbor(cell, db))
            else {
                continue;
            };
            let (ta, tb) = (self.grid.state(a), self.grid.state(b));
            if ta < REGION_TAG_START || tb < REGION_TAG_START || ta == tb {
                continue;
            }
            let (ra, rb) = (RegionId(ta), RegionId(tb));
            let known = self
                .regions
                .get(&ra)
                .is_some_and(|r| r.neighbors.contains(&rb));
            if !known {
                self.link(ra, rb)?;
                linked.push((ra, rb));
            }
        }
        Ok(linked)
    }
}
