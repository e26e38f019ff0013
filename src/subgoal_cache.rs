use crate::types::RegionId;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Cache key: an ordered pair of region ids (direction matters because the
/// chain is replayed start-to-goal).
pub type PairKey = (RegionId, RegionId);

/// A compressed path between two region representatives.
///
/// `subgoals` excludes the endpoints; hill-climbing through
/// `start rep → subgoals… → goal rep` reconstructs `path_cells` exactly.
/// `path_cells` is retained so a wall landing anywhere on the expanded path
/// can invalidate the entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubgoalChain {
    pub subgoals: Vec<u32>,
    pub cost: u32,
    pub path_cells: Vec<u32>,
}

/// Region-pair path cache with synchronous invalidation.
///
/// The incremental engine is responsible for calling the `invalidate_*`
/// entry points in the same operation that changes the structure they
/// depend on; the cache itself never goes stale on its own. Lookup misses
/// are recomputed lazily by the query layer.
///
/// Two reverse indices keep invalidation proportional to what is actually
/// affected: cell → keys (walls landing on a cached path) and region → keys
/// (region deleted, representative moved, or topology changed).
#[derive(Clone, Debug, Default)]
pub struct SubgoalCache {
    entries: FxHashMap<PairKey, SubgoalChain>,
    by_cell: FxHashMap<u32, SmallVec<[PairKey; 2]>>,
    by_region: FxHashMap<RegionId, FxHashSet<PairKey>>,
}

impl SubgoalCache {
    pub fn get(&self, key: PairKey) -> Option<&SubgoalChain> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = PairKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn insert(&mut self, key: PairKey, chain: SubgoalChain) {
        self.remove(key);
        for &cell in &chain.path_cells {
            self.by_cell.entry(cell).or_default().push(key);
        }
        self.by_region.entry(key.0).or_default().insert(key);
        self.by_region.entry(key.1).or_default().insert(key);
        self.entries.insert(key, chain);
    }

    pub fn remove(&mut self, key: PairKey) -> Option<SubgoalChain> {
        let chain = self.entries.remove(&key)?;
        for &cell in &chain.path_cells {
            if let Some(bucket) = self.by_cell.get_mut(&cell) {
                bucket.retain(|k| *k != key);
                if bucket.is_empty() {
                    self.by_cell.remove(&cell);
                }
            }
        }
        for id in [key.0, key.1] {
            if let Some(set) = self.by_region.get_mut(&id) {
                set.remove(&key);
                if set.is_empty() {
                    self.by_region.remove(&id);
                }
            }
        }
        Some(chain)
    }

    /// Drop every entry whose expanded path crosses `cell`.
    pub fn invalidate_cell(&mut self, cell: u32) -> usize {
        let keys: Vec<PairKey> = self
            .by_cell
            .get(&cell)
            .map(|bucket| bucket.to_vec())
            .unwrap_or_default();
        for key in &keys {
            self.remove(*key);
        }
        keys.len()
    }

    /// Drop every entry whose expanded path crosses both `a` and `b`.
    ///
    /// Needed when a diagonal step between two path cells loses its last
    /// open supporting cardinal: the step dies but neither endpoint does,
    /// so cell-level invalidation alone would miss it.
    pub fn invalidate_step(&mut self, a: u32, b: u32) -> usize {
        let Some(bucket_a) = self.by_cell.get(&a) else {
            return 0;
        };
        let keys: Vec<PairKey> = bucket_a
            .iter()
            .filter(|key| {
                self.by_cell
                    .get(&b)
                    .is_some_and(|bucket_b| bucket_b.contains(key))
            })
            .copied()
            .collect();
        for key in &keys {
            self.remove(*key);
        }
        keys.len()
    }

    /// Drop every entry with `id` as either endpoint. Must run before the
    /// id is released back to the free pool.
    pub fn invalidate_region(&mut self, id: RegionId) -> usize {
        let keys: Vec<PairKey> = self
            .by_region
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for key in &keys {
            self.remove(*key);
        }
        keys.len()
    }

    /// Drop both directions of one region pair.
    pub fn invalidate_pair(&mut self, a: RegionId, b: RegionId) {
        self.remove((a, b));
        self.remove((b, a));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_cell.clear();
        self.by_region.clear();
    }
}
