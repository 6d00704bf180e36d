use std::mem;

use rayon::prelude::*;

use crate::CellState;
use crate::grid::Grid;
use crate::grid::GridError;
use crate::neighborhood::Neighborhood;
use crate::neighborhood::SummedArea;
use crate::rules::Rule;

/// Compute the grid that follows `grid`.
///
/// This is a pure function of its inputs; `grid` is never modified. Every cell is computed from
/// `grid` alone and written to a separate buffer, so no cell sees a neighbor already updated in
/// the same step. Fails only if `rule` returns a state outside of the grid's range.
pub fn step<R: Rule + ?Sized>(
    grid: &Grid,
    neighborhood: Neighborhood,
    rule: &R,
) -> Result<Grid, GridError> {
    let mut next = grid.zeroed_like();
    let area = SummedArea::new(grid);

    step_into(grid, &area, &mut next, neighborhood, rule, false)?;

    Ok(next)
}

/// Write the successor of `src` into `dst`. `area` must have been built from `src`, and `dst`
/// must have the same shape as `src`.
fn step_into<R: Rule + ?Sized>(
    src: &Grid,
    area: &SummedArea,
    dst: &mut Grid,
    neighborhood: Neighborhood,
    rule: &R,
    parallel: bool,
) -> Result<(), GridError> {
    debug_assert_eq!(src.dimensions(), dst.dimensions());

    let cols = src.cols();
    if src.cells().is_empty() {
        return Ok(());
    }

    let fill = |(row, out): (usize, &mut [CellState])| {
        fill_row(src, area, row, out, neighborhood, rule)
    };

    if parallel {
        dst.cells_mut()
            .par_chunks_mut(cols)
            .enumerate()
            .try_for_each(fill)
    } else {
        dst.cells_mut().chunks_mut(cols).enumerate().try_for_each(fill)
    }
}

fn fill_row<R: Rule + ?Sized>(
    src: &Grid,
    area: &SummedArea,
    row: usize,
    out: &mut [CellState],
    neighborhood: Neighborhood,
    rule: &R,
) -> Result<(), GridError> {
    let start = src.index_of(row, 0);
    let current = &src.cells()[start..start + out.len()];

    for (col, (slot, &state)) in out.iter_mut().zip(current).enumerate() {
        let sum = area.sum(src, row, col, neighborhood.rings());
        let next = rule.apply(sum, state, neighborhood.size());

        src.check_state(next)?;
        *slot = next;
    }

    Ok(())
}

/// Steps a grid in place, reusing its buffers from one step to the next.
///
/// The engine keeps the previous generation around as the write target of the next step and
/// swaps it with the caller's grid once the whole step is done. A step that fails leaves the
/// caller's grid untouched. Rows only depend on the prior generation, so they can be computed in
/// parallel.
pub struct StepEngine<R> {
    rule: R,
    neighborhood: Neighborhood,
    parallel: bool,

    /// Prefix sums of the grid being read
    area: SummedArea,

    /// The write target of the next step
    back: Option<Grid>,
}

impl<R: Rule> StepEngine<R> {
    pub fn new(rule: R, neighborhood: Neighborhood) -> Self {
        Self {
            rule,
            neighborhood,
            parallel: false,
            area: SummedArea::default(),
            back: None,
        }
    }

    /// Compute rows on the rayon thread pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    /// Advance `grid` by one generation.
    pub fn step(&mut self, grid: &mut Grid) -> Result<(), GridError> {
        let (rows, cols) = grid.dimensions();

        let mut back = match self.back.take() {
            Some(back) if back.dimensions() == (rows, cols) && back.states() == grid.states() => {
                back
            }
            _ => grid.zeroed_like(),
        };

        self.area.rebuild(grid);

        let res = step_into(
            grid,
            &self.area,
            &mut back,
            self.neighborhood,
            &self.rule,
            self.parallel,
        );

        if res.is_ok() {
            mem::swap(grid, &mut back);
        }
        self.back = Some(back);

        res
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::NeighborSum;
    use crate::neighborhood;
    use crate::rules::B3S23;
    use crate::rules::Conway;

    /// Materializes the whole prior grid before writing a single cell, and sums neighbors the
    /// slow way.
    fn reference_step<R: Rule>(grid: &Grid, neighborhood: Neighborhood, rule: &R) -> Grid {
        let prior = grid.clone();
        let mut next = grid.clone();

        for row in 0..prior.rows() {
            for col in 0..prior.cols() {
                let sum = neighborhood::sum(&prior, row, col, neighborhood.rings());
                let state = rule.apply(sum, prior[(row, col)], neighborhood.size());

                next.set(row, col, state).unwrap();
            }
        }

        next
    }

    fn parse(text: &str) -> Grid {
        Grid::parse(text, 2).unwrap()
    }

    #[test]
    fn block_is_still() {
        let block = parse(
            "
            ........
            ........
            ........
            ...11...
            ...11...
            ........
            ........
            ........
            ",
        );

        let next = step(&block, Neighborhood::moore(), &Conway).unwrap();

        assert_eq!(next, block);
    }

    #[test]
    fn blinker_oscillates() {
        let blinker = parse(
            "
            .....
            ..1..
            ..1..
            ..1..
            .....
            ",
        );

        let next = step(&blinker, Neighborhood::moore(), &Conway).unwrap();
        insta::assert_snapshot!(next, @r"
        .....
        .....
        .111.
        .....
        .....
        ");

        let back = step(&next, Neighborhood::moore(), &Conway).unwrap();
        assert_eq!(back, blinker);
    }

    #[test]
    fn edges_see_fewer_neighbors() {
        let full = parse(
            "
            111
            111
            111
            ",
        );

        // corners have 3 neighbors, edges 5 and the center 8
        let next = step(&full, Neighborhood::moore(), &Conway).unwrap();
        insta::assert_snapshot!(next, @r"
        1.1
        ...
        1.1
        ");
    }

    #[test]
    fn glider_travels() {
        let glider = parse(
            "
            .1....
            ..1...
            111...
            ......
            ......
            ......
            ",
        );
        let moved = parse(
            "
            ......
            ..1...
            ...1..
            .111..
            ......
            ......
            ",
        );

        let mut engine = StepEngine::new(Conway, Neighborhood::moore());
        let mut grid = glider;
        for _ in 0..4 {
            engine.step(&mut grid).unwrap();
        }

        assert_eq!(grid, moved);
    }

    #[test]
    fn step_is_pure() {
        let grid = parse(
            "
            1.1.
            .11.
            1..1
            .1..
            ",
        );
        let copy = grid.clone();

        let a = step(&grid, Neighborhood::moore(), &Conway).unwrap();
        let b = step(&grid, Neighborhood::moore(), &Conway).unwrap();

        assert_eq!(a, b);
        assert_eq!(grid, copy);
    }

    #[test]
    fn rule_sees_neighborhood_size() {
        let grid = parse(
            "
            1....
            .....
            .....
            .....
            .....
            ",
        );
        let neighborhood = Neighborhood::new(16).unwrap();

        // alive wherever the neighborhood reaches the single live cell
        let reach = |sum: NeighborSum, _: CellState, size: usize| {
            assert_eq!(size, 16);
            (sum > 0) as CellState
        };

        let next = step(&grid, neighborhood, &reach).unwrap();
        insta::assert_snapshot!(next, @r"
        .11..
        111..
        111..
        .....
        .....
        ");
    }

    #[test]
    fn out_of_range_rule_fails_without_touching_grid() {
        let mut grid = parse(
            "
            .1.
            .1.
            .1.
            ",
        );
        let copy = grid.clone();

        let broken = |_: NeighborSum, _: CellState, _: usize| -> CellState { 2 };
        let mut engine = StepEngine::new(broken, Neighborhood::moore());

        let err = engine.step(&mut grid).unwrap_err();

        assert_eq!(err, GridError::OutOfRange { state: 2, states: 2 });
        assert_eq!(grid, copy);
        assert!(step(&grid, Neighborhood::moore(), &broken).is_err());
    }

    #[test]
    fn engine_reuses_buffers_across_shapes() {
        let mut engine = StepEngine::new(Conway, Neighborhood::moore());

        let mut small = parse(".1.\n.1.\n.1.");
        engine.step(&mut small).unwrap();
        assert_eq!(small, parse("...\n111\n..."));

        let mut large = Grid::zeroed(4, 6, 2).unwrap();
        engine.step(&mut large).unwrap();
        assert_eq!(large, Grid::zeroed(4, 6, 2).unwrap());
    }

    #[test]
    fn empty_grid_steps() {
        let grid = Grid::zeroed(0, 0, 2).unwrap();

        assert_eq!(step(&grid, Neighborhood::moore(), &Conway), Ok(grid));
    }

    fn case_strategy() -> impl Strategy<Value = (Grid, Neighborhood)> {
        (1usize..10, 1usize..10, 1usize..4).prop_flat_map(|(rows, cols, rings)| {
            prop::collection::vec(0..2u8, rows * cols).prop_map(move |cells| {
                (
                    Grid::from_cells(rows, cols, 2, cells).unwrap(),
                    Neighborhood::new(rings * 8).unwrap(),
                )
            })
        })
    }

    proptest! {
        #[test]
        fn matches_reference((grid, neighborhood) in case_strategy()) {
            prop_assert_eq!(
                step(&grid, neighborhood, &Conway).unwrap(),
                reference_step(&grid, neighborhood, &Conway)
            );
            prop_assert_eq!(
                step(&grid, neighborhood, &B3S23).unwrap(),
                reference_step(&grid, neighborhood, &B3S23)
            );
        }

        #[test]
        fn parallel_matches_serial((grid, neighborhood) in case_strategy()) {
            let mut serial = grid.clone();
            let mut parallel = grid;

            let mut a = StepEngine::new(Conway, neighborhood);
            let mut b = StepEngine::new(Conway, neighborhood).parallel(true);

            for _ in 0..3 {
                a.step(&mut serial).unwrap();
                b.step(&mut parallel).unwrap();
                prop_assert_eq!(&serial, &parallel);
            }
        }
    }
}
