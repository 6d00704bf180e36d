use std::fmt;
use std::ops::Index;

use rand::Rng;
use thiserror::Error;

use crate::CellState;
use crate::config::ConfigError;

/// Largest number of states a cell can take, bounded by the width of [`CellState`].
pub const MAX_STATES: u16 = CellState::MAX as u16 + 1;

/// Accepts a state count in `2..=MAX_STATES`.
pub fn check_states(states: u16) -> Result<u16, ConfigError> {
    if (2..=MAX_STATES).contains(&states) {
        Ok(states)
    } else {
        Err(ConfigError::States(states))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("State {state} is out of range, expected a value in 0..{states}")]
    OutOfRange { state: CellState, states: u16 },

    #[error("Cell ({row}, {col}) is outside of a {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Expected {expected} cells, but got {got}")]
    Shape { expected: usize, got: usize },

    #[error("Invalid cell character '{got}' on line {line}")]
    InvalidChar { got: char, line: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A rectangular, row-major buffer of cell states.
///
/// Every cell always lies in `0..states`; the only way in is through [`Grid::set`] or a
/// constructor, both of which check it.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<CellState>,
    rows: usize,
    cols: usize,
    states: u16,
}

impl Grid {
    /// Create a grid where every cell is `0`.
    pub fn zeroed(rows: usize, cols: usize, states: u16) -> Result<Self, ConfigError> {
        let states = check_states(states)?;

        Ok(Self {
            cells: vec![0; rows * cols],
            rows,
            cols,
            states,
        })
    }

    /// A zeroed grid with the same shape and state count as `self`.
    pub(crate) fn zeroed_like(&self) -> Self {
        Self {
            cells: vec![0; self.cells.len()],
            rows: self.rows,
            cols: self.cols,
            states: self.states,
        }
    }

    /// Create a grid where every cell is drawn independently and uniformly from `0..states`.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        states: u16,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let states = check_states(states)?;

        // `states <= MAX_STATES`, so every draw fits in a `CellState`
        let cells = (0..rows * cols)
            .map(|_| rng.random_range(0..states) as CellState)
            .collect();

        Ok(Self {
            cells,
            rows,
            cols,
            states,
        })
    }

    /// Wrap an existing row-major buffer.
    pub fn from_cells(
        rows: usize,
        cols: usize,
        states: u16,
        cells: Vec<CellState>,
    ) -> Result<Self, GridError> {
        let states = check_states(states)?;

        let expected = rows * cols;
        if cells.len() != expected {
            return Err(GridError::Shape {
                expected,
                got: cells.len(),
            });
        }

        if let Some(&state) = cells.iter().find(|&&s| u16::from(s) >= states) {
            return Err(GridError::OutOfRange { state, states });
        }

        Ok(Self {
            cells,
            rows,
            cols,
            states,
        })
    }

    /// Parse a grid from text, one line per row. `.` is `0`, anything else is a base 36 digit.
    /// Blank lines are skipped.
    pub fn parse(text: &str, states: u16) -> Result<Self, GridError> {
        let mut cells = Vec::new();
        let mut rows = 0;
        let mut cols = None;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let before = cells.len();
            for c in line.chars() {
                let state = match c {
                    '.' => 0,
                    c => c
                        .to_digit(36)
                        .and_then(|d| CellState::try_from(d).ok())
                        .ok_or(GridError::InvalidChar {
                            got: c,
                            line: line_no + 1,
                        })?,
                };
                cells.push(state);
            }

            let width = cells.len() - before;
            match cols {
                None => cols = Some(width),
                Some(cols) if cols != width => {
                    return Err(GridError::Shape {
                        expected: (rows + 1) * cols,
                        got: cells.len(),
                    });
                }
                Some(_) => {}
            }

            rows += 1;
        }

        Self::from_cells(rows, cols.unwrap_or(0), states, cells)
    }

    /// `(rows, cols)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn states(&self) -> u16 {
        self.states
    }

    pub fn get(&self, row: usize, col: usize) -> Option<CellState> {
        if row < self.rows && col < self.cols {
            Some(self.cells[self.index_of(row, col)])
        } else {
            None
        }
    }

    /// Set a single cell. Fails if `state` is not in `0..states` or the cell is out of bounds;
    /// the grid is left unchanged in both cases.
    pub fn set(&mut self, row: usize, col: usize, state: CellState) -> Result<(), GridError> {
        self.check_state(state)?;

        if row >= self.rows || col >= self.cols {
            return Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }

        let i = self.index_of(row, col);
        self.cells[i] = state;

        Ok(())
    }

    pub fn check_state(&self, state: CellState) -> Result<(), GridError> {
        if u16::from(state) < self.states {
            Ok(())
        } else {
            Err(GridError::OutOfRange {
                state,
                states: self.states,
            })
        }
    }

    /// Number of cells that are not `0`.
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&s| s != 0).count()
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Mutable row-major access for the step engine. Callers are responsible for keeping every
    /// state in range.
    pub(crate) fn cells_mut(&mut self) -> &mut [CellState] {
        &mut self.cells
    }

    /// Iterate over rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[CellState]> {
        // `chunks_exact(0)` panics
        self.cells.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    #[inline]
    pub(crate) fn index_of(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }
}

impl Index<(usize, usize)> for Grid {
    type Output = CellState;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(row < self.rows, "row is out of bounds");
        assert!(col < self.cols, "col is out of bounds");

        &self.cells[self.index_of(row, col)]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.iter_rows().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            for &state in row {
                let c = match state {
                    0 => '.',
                    s => char::from_digit(u32::from(s), 36).unwrap_or('#'),
                };
                write!(f, "{c}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{} ({} states)", self.rows, self.cols, self.states)?;
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn zeroed_is_empty() {
        let grid = Grid::zeroed(3, 4, 2).unwrap();

        assert_eq!(grid.dimensions(), (3, 4));
        assert_eq!(grid.population(), 0);
        assert_eq!(grid.get(2, 3), Some(0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 4), None);
    }

    #[test]
    fn set_rejects_out_of_range_state() {
        let mut grid = Grid::zeroed(2, 2, 3).unwrap();

        assert_eq!(grid.set(1, 1, 2), Ok(()));
        assert_eq!(
            grid.set(0, 0, 3),
            Err(GridError::OutOfRange {
                state: 3,
                states: 3
            })
        );
        assert_eq!(grid[(0, 0)], 0);
        assert_eq!(grid[(1, 1)], 2);
    }

    #[test]
    fn set_rejects_out_of_bounds_cell() {
        let mut grid = Grid::zeroed(2, 2, 2).unwrap();

        let err = grid.set(2, 0, 1).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { row: 2, col: 0, .. }));
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn from_cells_checks_shape_and_range() {
        assert_eq!(
            Grid::from_cells(2, 2, 2, vec![0, 1, 0]),
            Err(GridError::Shape {
                expected: 4,
                got: 3
            })
        );
        assert_eq!(
            Grid::from_cells(1, 2, 2, vec![0, 5]),
            Err(GridError::OutOfRange {
                state: 5,
                states: 2
            })
        );
    }

    #[test]
    fn constructors_reject_bad_state_counts() {
        let mut rng = StdRng::seed_from_u64(0);

        for states in [0, 1, 257, u16::MAX] {
            let err = || ConfigError::States(states);

            assert_eq!(Grid::zeroed(2, 2, states), Err(err()));
            assert_eq!(Grid::random(2, 2, states, &mut rng), Err(err()));
            assert_eq!(Grid::from_cells(1, 1, states, vec![0]), Err(err().into()));
            assert_eq!(Grid::parse(".", states), Err(err().into()));
        }

        assert_eq!(Grid::zeroed(2, 2, 2).map(|g| g.states()), Ok(2));
        assert_eq!(Grid::zeroed(2, 2, MAX_STATES).map(|g| g.states()), Ok(MAX_STATES));
    }

    #[test]
    fn parse_and_display() {
        let text = "
            .1.
            2..
            ..1
        ";
        let grid = Grid::parse(text, 3).unwrap();

        assert_eq!(grid.dimensions(), (3, 3));
        assert_eq!(grid[(0, 1)], 1);
        assert_eq!(grid[(1, 0)], 2);
        assert_eq!(grid.population(), 3);
        assert_eq!(grid.to_string(), ".1.\n2..\n..1");
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = Grid::parse("..\n...", 2).unwrap_err();
        assert!(matches!(err, GridError::Shape { .. }));
    }

    #[test]
    fn parse_rejects_unknown_chars() {
        let err = Grid::parse("..\n.!", 2).unwrap_err();
        assert_eq!(err, GridError::InvalidChar { got: '!', line: 2 });
    }

    #[test]
    fn random_is_reproducible() {
        let a = Grid::random(8, 8, 4, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Grid::random(8, 8, 4, &mut StdRng::seed_from_u64(7)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn random_draws_every_state_evenly() {
        let mut rng = StdRng::seed_from_u64(11);
        let grid = Grid::random(64, 64, 4, &mut rng).unwrap();

        let mut counts = [0usize; 4];
        for &state in grid.cells() {
            counts[usize::from(state)] += 1;
        }

        // 1024 expected per state
        for (state, &count) in counts.iter().enumerate() {
            assert!((824..=1224).contains(&count), "state {state} drawn {count} times");
        }
    }

    #[test]
    fn random_reaches_the_top_state() {
        let mut rng = StdRng::seed_from_u64(5);
        let grid = Grid::random(128, 128, MAX_STATES, &mut rng).unwrap();

        let mut seen = [false; MAX_STATES as usize];
        for &state in grid.cells() {
            seen[usize::from(state)] = true;
        }

        assert!(seen.iter().all(|&s| s), "some states were never drawn");
    }

    proptest! {
        #[test]
        fn random_cells_are_in_range(size in 1usize..40, states in 2u16..=MAX_STATES, seed: u64) {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = Grid::random(size, size, states, &mut rng).unwrap();

            prop_assert_eq!(grid.cells().len(), size * size);
            prop_assert!(grid.cells().iter().all(|&s| u16::from(s) < states));
        }
    }
}
