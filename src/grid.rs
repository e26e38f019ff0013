use crate::types::{Direction, CELL_OPEN, CELL_WALL, CARDINAL_COST, DIAGONAL_COST};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Rectangular open/wall cell matrix with linear cell ids.
///
/// A cell id is `row * cols + col`. The state array doubles as the region
/// tagging surface: after abstraction every open cell holds its region's id
/// (see [`crate::types::REGION_TAG_START`]), so grid and region lookup share
/// one allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridMap {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<u32>,
}

impl GridMap {
    /// All-open grid of the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![CELL_OPEN; rows * cols],
        }
    }

    /// Parse a terse ASCII grid: one row per line, `.` open, anything in
    /// `#@OTW` a wall. Leading/trailing blank lines are ignored.
    pub fn from_ascii(text: &str) -> Self {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let rows = lines.len();
        let cols = lines.first().map_or(0, |l| l.chars().count());
        let mut grid = Self::new(rows, cols);
        for (r, line) in lines.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if matches!(ch, '#' | '@' | 'O' | 'T' | 'W') {
                    grid.cells[r * cols + c] = CELL_WALL;
                }
            }
        }
        grid
    }

    /// Parse the common benchmark map format:
    ///
    /// ```text
    /// type octile
    /// height 4
    /// width 5
    /// map
    /// .....
    /// ..@..
    /// ```
    ///
    /// `.` and `G` are open; `@`, `O`, `T`, `W` are walls. This is a string
    /// contract only; reading the file is the caller's concern.
    pub fn from_map_str(text: &str) -> Option<Self> {
        let mut height = None;
        let mut width = None;
        let mut lines = text.lines();
        for line in lines.by_ref() {
            let line = line.trim();
            if let Some(h) = line.strip_prefix("height ") {
                height = h.trim().parse::<usize>().ok();
            } else if let Some(w) = line.strip_prefix("width ") {
                width = w.trim().parse::<usize>().ok();
            } else if line == "map" {
                break;
            }
        }
        let (rows, cols) = (height?, width?);
        let mut grid = Self::new(rows, cols);
        for (r, line) in lines.take(rows).enumerate() {
            for (c, ch) in line.chars().take(cols).enumerate() {
                if !matches!(ch, '.' | 'G') {
                    grid.cells[r * cols + c] = CELL_WALL;
                }
            }
        }
        Some(grid)
    }

    /// Render the grid for debugging: `#` wall, `.` open (tagged or not).
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.cols + 1) * self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.push(if self.cells[r * self.cols + c] == CELL_WALL {
                    '#'
                } else {
                    '.'
                });
            }
            out.push('\n');
        }
        out
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cell_id(&self, row: usize, col: usize) -> u32 {
        (row * self.cols + col) as u32
    }

    #[inline]
    pub fn coords(&self, cell: u32) -> (usize, usize) {
        let cell = cell as usize;
        (cell / self.cols, cell % self.cols)
    }

    #[inline]
    pub fn state(&self, cell: u32) -> u32 {
        self.cells[cell as usize]
    }

    #[inline]
    pub fn set_state(&mut self, cell: u32, state: u32) {
        self.cells[cell as usize] = state;
    }

    #[inline]
    pub fn is_wall(&self, cell: u32) -> bool {
        self.cells[cell as usize] == CELL_WALL
    }

    /// Open in the passability sense: untagged-open or region-tagged.
    #[inline]
    pub fn is_passable(&self, cell: u32) -> bool {
        self.cells[cell as usize] != CELL_WALL
    }

    /// Neighbor cell in the given direction, or `None` when out of bounds.
    /// Passability is not checked here.
    #[inline]
    pub fn neighbor(&self, cell: u32, dir: Direction) -> Option<u32> {
        let (r, c) = self.coords(cell);
        let (dr, dc) = dir.delta();
        let nr = r as i32 + dr;
        let nc = c as i32 + dc;
        if nr < 0 || nc < 0 || nr as usize >= self.rows || nc as usize >= self.cols {
            return None;
        }
        Some(self.cell_id(nr as usize, nc as usize))
    }

    /// Whether a step from `cell` in `dir` is legal.
    ///
    /// Cardinal steps need only a passable target. A diagonal step
    /// additionally needs at least one of the two cardinal cells it shears
    /// past to be open, so movement never cuts through a wall corner. Region
    /// adjacency uses the identical rule, which keeps "same sector and
    /// mutually reachable" equivalent to "same region".
    pub fn can_step(&self, cell: u32, dir: Direction) -> Option<u32> {
        let target = self.neighbor(cell, dir)?;
        if !self.is_passable(target) {
            return None;
        }
        if dir.is_diagonal() {
            let (dr, dc) = dir.delta();
            let row_side = self.step_unchecked(cell, dr, 0);
            let col_side = self.step_unchecked(cell, 0, dc);
            let row_open = row_side.is_some_and(|n| self.is_passable(n));
            let col_open = col_side.is_some_and(|n| self.is_passable(n));
            if !row_open && !col_open {
                return None;
            }
        }
        Some(target)
    }

    #[inline]
    fn step_unchecked(&self, cell: u32, dr: i32, dc: i32) -> Option<u32> {
        let (r, c) = self.coords(cell);
        let nr = r as i32 + dr;
        let nc = c as i32 + dc;
        if nr < 0 || nc < 0 || nr as usize >= self.rows || nc as usize >= self.cols {
            return None;
        }
        Some(self.cell_id(nr as usize, nc as usize))
    }

    /// Up to eight legal moves from `cell` with their step costs.
    pub fn passable_neighbors(&self, cell: u32) -> SmallVec<[(u32, u32); 8]> {
        let mut out = SmallVec::new();
        for dir in Direction::ALL {
            if let Some(target) = self.can_step(cell, dir) {
                out.push((target, dir.cost()));
            }
        }
        out
    }

    /// Octile distance `10·(Δrow + Δcol) − 6·min(Δrow, Δcol)`: exact shortest
    /// cost on an empty 8-connected grid, admissible everywhere.
    pub fn octile_distance(&self, a: u32, b: u32) -> u32 {
        let (ar, ac) = self.coords(a);
        let (br, bc) = self.coords(b);
        let dr = ar.abs_diff(br) as u32;
        let dc = ac.abs_diff(bc) as u32;
        CARDINAL_COST * (dr + dc) - (2 * CARDINAL_COST - DIAGONAL_COST) * dr.min(dc)
    }

    /// Sum of step costs along a path of mutually adjacent cells.
    pub fn path_cost(&self, cells: &[u32]) -> u32 {
        cells
            .windows(2)
            .map(|w| {
                let (ar, ac) = self.coords(w[0]);
                let (br, bc) = self.coords(w[1]);
                if ar != br && ac != bc {
                    DIAGONAL_COST
                } else {
                    CARDINAL_COST
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_round_trip() {
        let grid = GridMap::from_ascii(
            "....\n\
             .##.\n\
             ....",
        );
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.cols, 4);
        assert!(grid.is_wall(grid.cell_id(1, 1)));
        assert!(grid.is_wall(grid.cell_id(1, 2)));
        assert!(grid.is_passable(grid.cell_id(0, 0)));
        assert_eq!(grid.to_ascii(), "....\n.##.\n....\n");
    }

    #[test]
    fn test_map_str_parse() {
        let grid = GridMap::from_map_str(
            "type octile\nheight 2\nwidth 3\nmap\n.@.\n...\n",
        )
        .unwrap();
        assert_eq!((grid.rows, grid.cols), (2, 3));
        assert!(grid.is_wall(grid.cell_id(0, 1)));
        assert!(grid.is_passable(grid.cell_id(1, 1)));
    }

    #[test]
    fn test_diagonal_needs_an_open_cardinal() {
        // Center cell with both cardinals toward the NE walled off.
        let grid = GridMap::from_ascii(
            ".#.\n\
             ..#\n\
             ...",
        );
        let center = grid.cell_id(1, 1);
        // NE target (0, 2) is open but both (0, 1) and (1, 2) are walls.
        assert!(grid.can_step(center, Direction::NorthEast).is_none());
        // SW is unobstructed.
        assert_eq!(
            grid.can_step(center, Direction::SouthWest),
            Some(grid.cell_id(2, 0))
        );
    }

    #[test]
    fn test_octile_matches_hand_values() {
        let grid = GridMap::new(8, 8);
        let a = grid.cell_id(0, 0);
        assert_eq!(grid.octile_distance(a, a), 0);
        assert_eq!(grid.octile_distance(a, grid.cell_id(0, 3)), 30);
        assert_eq!(grid.octile_distance(a, grid.cell_id(3, 3)), 42);
        assert_eq!(grid.octile_distance(a, grid.cell_id(2, 5)), 58);
    }

    #[test]
    fn test_octile_symmetric_and_bounded_by_manhattan_cost() {
        let grid = GridMap::new(6, 6);
        for a in 0..36 {
            for b in 0..36 {
                let d = grid.octile_distance(a, b);
                assert_eq!(d, grid.octile_distance(b, a));
                let (ar, ac) = grid.coords(a);
                let (br, bc) = grid.coords(b);
                let manhattan =
                    CARDINAL_COST * (ar.abs_diff(br) + ac.abs_diff(bc)) as u32;
                assert!(d <= manhattan);
            }
        }
    }
}
