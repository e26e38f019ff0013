use serde::{Deserialize, Serialize};

/// Default sector edge length (16×16 cells).
///
/// Maps are divided into square sectors of this size. Re-abstracting one
/// sector is the single costliest incremental operation, so the sector edge
/// bounds worst-case update cost independent of total map size.
pub const DEFAULT_SECTOR_SIZE: usize = 16;

/// Cell state: open and not yet assigned to a region.
pub const CELL_OPEN: u32 = 0;

/// Cell state: impassable wall.
pub const CELL_WALL: u32 = 1;

/// First value usable as a region tag.
///
/// States 2..8 are reserved sentinels. Any cell state at or above this value
/// is the id of the region that owns the cell, so a cell's state answers
/// "which region" in O(1).
pub const REGION_TAG_START: u32 = 8;

/// Cost of a cardinal step.
pub const CARDINAL_COST: u32 = 10;

/// Cost of a diagonal step (octile approximation of 10·√2).
pub const DIAGONAL_COST: u32 = 14;

/// Region identifier. Equal to the tag stored in the region's cells.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

/// Sector identifier (row-major index into the sector grid).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorId(pub u32);

/// Movement directions (cardinal + diagonal).
///
/// The discriminants index [`Direction::DELTAS`]; `RING` lists the eight
/// neighbors of a cell in circular order, which the partition pre-filter
/// depends on.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
    NorthEast = 4,
    NorthWest = 5,
    SouthEast = 6,
    SouthWest = 7,
}

impl Direction {
    /// (row delta, col delta) per direction, indexed by discriminant.
    /// North is row − 1.
    pub const DELTAS: [(i32, i32); 8] = [
        (-1, 0),
        (1, 0),
        (0, 1),
        (0, -1),
        (-1, 1),
        (-1, -1),
        (1, 1),
        (1, -1),
    ];

    /// All eight directions (cardinal + diagonal).
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// The eight neighbors of a cell in circular (clockwise) order.
    pub const RING: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    #[inline]
    pub fn delta(self) -> (i32, i32) {
        Self::DELTAS[self as usize]
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        (self as u8) >= 4
    }

    /// Step cost for a move in this direction.
    #[inline]
    pub fn cost(self) -> u32 {
        if self.is_diagonal() {
            DIAGONAL_COST
        } else {
            CARDINAL_COST
        }
    }
}

/// A concrete grid path: cell ids from start to goal inclusive, plus its cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub cells: Vec<u32>,
    pub cost: u32,
}

/// Classification of a wall addition, computed once and dispatched by `match`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WallAddOutcome {
    /// The walled cell was its region's only cell; the region is gone.
    Elimination { removed: RegionId },
    /// The wall split the region; the sector was re-abstracted.
    Partition {
        replaced: RegionId,
        new_regions: Vec<RegionId>,
    },
    /// No split, but one or more adjacencies ran only through the walled
    /// cell and were severed.
    PathBlocked {
        region: RegionId,
        severed: Vec<(RegionId, RegionId)>,
    },
    /// Plain shrink: cell count down by one, topology unchanged.
    Shrunk { region: RegionId },
}

/// Classification of a wall removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WallRemoveOutcome {
    /// All eight neighbors are walls; a fresh singleton region.
    NewIsolated { region: RegionId },
    /// Neighboring regions exist but none in the cell's sector; a fresh
    /// singleton region bridging to them.
    NewConnected { region: RegionId },
    /// The cell connected two or more regions of its own sector; the sector
    /// was re-abstracted.
    Merge {
        merged: Vec<RegionId>,
        new_regions: Vec<RegionId>,
    },
    /// The cell joined an existing region and created adjacencies that did
    /// not exist before.
    Unblocked {
        region: RegionId,
        linked: Vec<(RegionId, RegionId)>,
    },
    /// Plain growth: cell count up by one, topology unchanged.
    Grown { region: RegionId },
}

/// Fatal-class errors: invariant violations and boundary misuse.
///
/// Search misses are never errors; they are `None` returns (the caller falls
/// back to full search). Every variant here means the caller or the engine
/// would corrupt the region graph by continuing, so callers must treat these
/// as fatal rather than recover silently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbstractionError {
    WallAlreadyPresent(u32),
    CellNotWall(u32),
    UnknownRegion(RegionId),
    MissingRepresentative(RegionId),
    CorruptCellState { cell: u32, state: u32 },
    AsymmetricAdjacency(RegionId, RegionId),
    RegionCellCountMismatch {
        region: RegionId,
        recorded: u32,
        actual: u32,
    },
    FreeIdInUse(RegionId),
    StaleCacheKey(RegionId),
    BadSectorSize(usize),
    EmptyGrid,
}

impl std::fmt::Display for AbstractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WallAlreadyPresent(cell) => {
                write!(f, "wall already exists at cell {cell}")
            }
            Self::CellNotWall(cell) => {
                write!(f, "cell {cell} is not a wall")
            }
            Self::UnknownRegion(id) => {
                write!(f, "region {} does not exist in the id map", id.0)
            }
            Self::MissingRepresentative(id) => {
                write!(f, "representative for region {} does not exist", id.0)
            }
            Self::CorruptCellState { cell, state } => {
                write!(f, "cell {cell} has corrupt state {state}")
            }
            Self::AsymmetricAdjacency(a, b) => {
                write!(f, "region {} lists {} as neighbor but not vice versa", a.0, b.0)
            }
            Self::RegionCellCountMismatch {
                region,
                recorded,
                actual,
            } => {
                write!(
                    f,
                    "region {} records {recorded} cells but owns {actual}",
                    region.0
                )
            }
            Self::FreeIdInUse(id) => {
                write!(f, "free pool holds id {} which is still live", id.0)
            }
            Self::StaleCacheKey(id) => {
                write!(f, "subgoal cache references dead region {}", id.0)
            }
            Self::BadSectorSize(size) => {
                write!(f, "sector size {size} is invalid")
            }
            Self::EmptyGrid => write!(f, "grid has zero rows or columns"),
        }
    }
}

impl std::error::Error for AbstractionError {}
