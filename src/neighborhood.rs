use crate::NeighborSum;
use crate::config::ConfigError;
use crate::grid::Grid;

/// Number of cells in a single ring around a cell.
pub const RING_CELLS: usize = 8;

/// A validated neighborhood size together with the ring count derived from it.
///
/// Only constructible from a positive multiple of [`RING_CELLS`], so every `Neighborhood` in
/// existence has a meaningful ring count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    size: usize,
    rings: usize,
}

impl Neighborhood {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        if size == 0 || size % RING_CELLS != 0 {
            return Err(ConfigError::NeighborhoodSize(size));
        }

        Ok(Self {
            size,
            rings: size / RING_CELLS,
        })
    }

    /// The classic Moore neighborhood, one ring deep.
    pub const fn moore() -> Self {
        Self {
            size: RING_CELLS,
            rings: 1,
        }
    }

    /// The configured neighborhood size, a multiple of [`RING_CELLS`].
    pub fn size(&self) -> usize {
        self.size
    }

    /// Radius in cells.
    pub fn rings(&self) -> usize {
        self.rings
    }
}

/// Sum the states of every cell within `rings` of `(row, col)`, excluding the cell itself.
///
/// Neighbors that fall outside the grid contribute nothing: edge and corner cells simply see a
/// smaller neighborhood.
pub fn sum(grid: &Grid, row: usize, col: usize, rings: usize) -> NeighborSum {
    if grid.cells().is_empty() {
        return 0;
    }

    // Past this every offset is outside the grid. A non-empty grid has at most `isize::MAX` rows
    // and columns, so the cast is lossless.
    let r = rings.min(grid.rows().max(grid.cols())) as isize;
    let mut total = 0;

    for di in -r..=r {
        for dj in -r..=r {
            if di == 0 && dj == 0 {
                continue;
            }

            let (Some(nrow), Some(ncol)) = (row.checked_add_signed(di), col.checked_add_signed(dj))
            else {
                continue;
            };

            if let Some(state) = grid.get(nrow, ncol) {
                total += NeighborSum::from(state);
            }
        }
    }

    total
}

/// A 2D prefix sum over a grid.
///
/// Entry `(r, c)` holds the sum of every cell above and to the left of `(r, c)`, so any
/// rectangle can be summed with four lookups. This makes a neighborhood sum independent of the
/// radius.
#[derive(Debug, Default, Clone)]
pub struct SummedArea {
    /// `(rows + 1) x (cols + 1)`, with a zero first row and column
    table: Vec<NeighborSum>,
    rows: usize,
    cols: usize,
}

impl SummedArea {
    pub fn new(grid: &Grid) -> Self {
        let mut area = Self::default();
        area.rebuild(grid);

        area
    }

    /// Recompute the table for `grid`, reusing the existing allocation where possible.
    pub fn rebuild(&mut self, grid: &Grid) {
        let (rows, cols) = grid.dimensions();
        let w = cols + 1;

        self.rows = rows;
        self.cols = cols;
        self.table.clear();
        self.table.resize((rows + 1) * w, 0);

        for (r, cells) in grid.iter_rows().enumerate() {
            let mut running = 0;

            for (c, &state) in cells.iter().enumerate() {
                running += NeighborSum::from(state);
                self.table[(r + 1) * w + c + 1] = self.table[r * w + c + 1] + running;
            }
        }
    }

    /// Sum of the cells in rows `r0..r1` and columns `c0..c1`.
    fn rect(&self, r0: usize, c0: usize, r1: usize, c1: usize) -> NeighborSum {
        let w = self.cols + 1;
        let at = |r: usize, c: usize| self.table[r * w + c];

        (at(r1, c1) + at(r0, c0)) - (at(r0, c1) + at(r1, c0))
    }

    /// Same result as [`sum`], in constant time. `grid` must be the grid this table was built
    /// from.
    pub fn sum(&self, grid: &Grid, row: usize, col: usize, rings: usize) -> NeighborSum {
        debug_assert_eq!(grid.dimensions(), (self.rows, self.cols));

        let r0 = row.saturating_sub(rings);
        let c0 = col.saturating_sub(rings);
        let r1 = row.saturating_add(rings).saturating_add(1).min(self.rows);
        let c1 = col.saturating_add(rings).saturating_add(1).min(self.cols);

        let center = grid.get(row, col).map_or(0, NeighborSum::from);

        self.rect(r0, c0, r1, c1) - center
    }
}
