/// Counter accumulator threaded by reference through search calls.
///
/// Purely additive: searches only ever increment, callers reset or diff as
/// they see fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// States popped and expanded by flat A*.
    pub astar_expanded: u64,
    /// Steps committed by hill-climbing (across all legs).
    pub hill_climb_steps: u64,
    /// Subgoal-cache lookups answered from the cache.
    pub cache_hits: u64,
    /// Subgoal-cache lookups that had to compute a fresh entry.
    pub cache_misses: u64,
    /// Hierarchical queries that fell back to full A*.
    pub fallbacks: u64,
    /// Queries rejected outright (wall endpoints, no route).
    pub no_path: u64,
}

impl SearchStats {
    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &SearchStats) {
        self.astar_expanded += other.astar_expanded;
        self.hill_climb_steps += other.hill_climb_steps;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.fallbacks += other.fallbacks;
        self.no_path += other.no_path;
    }
}
