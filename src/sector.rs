use crate::types::{AbstractionError, RegionId, SectorId};
use serde::{Deserialize, Serialize};

/// One fixed-bound tile of the sector partition.
///
/// Sectors never move or resize; `row_end`/`col_end` are exclusive and
/// clamped to the grid edge for the last row/column of sectors. The sector
/// stores region ids only, never region references, so deleting a region
/// cannot leave a dangling pointer here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
    pub region_ids: Vec<RegionId>,
}

impl Sector {
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_start && row < self.row_end && col >= self.col_start && col < self.col_end
    }
}

/// The sector partition of a grid: fixed-size square tiles in row-major
/// order. Cell-to-sector mapping is pure integer division, so it is valid
/// for the lifetime of the map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectorGrid {
    pub sector_size: usize,
    grid_rows: usize,
    grid_cols: usize,
    sectors_across: usize,
    sectors_down: usize,
    sectors: Vec<Sector>,
}

impl SectorGrid {
    pub fn new(
        grid_rows: usize,
        grid_cols: usize,
        sector_size: usize,
    ) -> Result<Self, AbstractionError> {
        if sector_size == 0 {
            return Err(AbstractionError::BadSectorSize(sector_size));
        }
        if grid_rows == 0 || grid_cols == 0 {
            return Err(AbstractionError::EmptyGrid);
        }
        let sectors_down = grid_rows.div_ceil(sector_size);
        let sectors_across = grid_cols.div_ceil(sector_size);
        let mut sectors = Vec::with_capacity(sectors_down * sectors_across);
        for sr in 0..sectors_down {
            for sc in 0..sectors_across {
                sectors.push(Sector {
                    id: SectorId((sr * sectors_across + sc) as u32),
                    row_start: sr * sector_size,
                    row_end: ((sr + 1) * sector_size).min(grid_rows),
                    col_start: sc * sector_size,
                    col_end: ((sc + 1) * sector_size).min(grid_cols),
                    region_ids: Vec::new(),
                });
            }
        }
        Ok(Self {
            sector_size,
            grid_rows,
            grid_cols,
            sectors_across,
            sectors_down,
            sectors,
        })
    }

    #[inline]
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    #[inline]
    pub fn sector_id_at(&self, row: usize, col: usize) -> SectorId {
        let sr = row / self.sector_size;
        let sc = col / self.sector_size;
        SectorId((sr * self.sectors_across + sc) as u32)
    }

    /// Sector owning a linear cell id.
    #[inline]
    pub fn sector_containing(&self, cell: u32) -> SectorId {
        let row = cell as usize / self.grid_cols;
        let col = cell as usize % self.grid_cols;
        self.sector_id_at(row, col)
    }

    #[inline]
    pub fn get(&self, id: SectorId) -> &Sector {
        &self.sectors[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: SectorId) -> &mut Sector {
        &mut self.sectors[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.iter()
    }

    /// Linear cell ids covered by a sector, raster order.
    pub fn cells_of(&self, id: SectorId) -> impl Iterator<Item = u32> + '_ {
        let sector = self.get(id);
        let cols = self.grid_cols;
        (sector.row_start..sector.row_end).flat_map(move |r| {
            (sector.col_start..sector.col_end).map(move |c| (r * cols + c) as u32)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_sectors_are_clamped() {
        let sectors = SectorGrid::new(10, 10, 4).unwrap();
        assert_eq!(sectors.sector_count(), 9);
        let last = sectors.get(SectorId(8));
        assert_eq!(last.row_start, 8);
        assert_eq!(last.row_end, 10);
        assert_eq!(last.col_start, 8);
        assert_eq!(last.col_end, 10);
    }

    #[test]
    fn test_cell_to_sector_is_integer_division() {
        let sectors = SectorGrid::new(32, 32, 16).unwrap();
        assert_eq!(sectors.sector_id_at(0, 0), SectorId(0));
        assert_eq!(sectors.sector_id_at(0, 16), SectorId(1));
        assert_eq!(sectors.sector_id_at(16, 0), SectorId(2));
        assert_eq!(sectors.sector_id_at(31, 31), SectorId(3));
        assert_eq!(sectors.sector_containing(31 * 32 + 31), SectorId(3));
    }

    #[test]
    fn test_zero_sector_size_rejected() {
        assert_eq!(
            SectorGrid::new(8, 8, 0).unwrap_err(),
            AbstractionError::BadSectorSize(0)
        );
    }
}
