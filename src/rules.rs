use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::CellState;
use crate::NeighborSum;

/// Computes the next state of a single cell.
///
/// `sum` is the neighborhood sum of the cell, `current` its present state and
/// `neighborhood_size` the configured neighborhood size (a multiple of 8). Rules are pure: the
/// same inputs always produce the same output. They must also return a state within the grid's
/// range, otherwise the step fails.
///
/// Any `Fn(NeighborSum, CellState, usize) -> CellState` is a rule.
pub trait Rule: Sync {
    fn apply(&self, sum: NeighborSum, current: CellState, neighborhood_size: usize) -> CellState;
}

impl<F> Rule for F
where
    F: Fn(NeighborSum, CellState, usize) -> CellState + Sync,
{
    fn apply(&self, sum: NeighborSum, current: CellState, neighborhood_size: usize) -> CellState {
        self(sum, current, neighborhood_size)
    }
}

/// Conway's original rule, stated on neighborhood sums.
///
/// | sum   | next            |
/// |-------|-----------------|
/// | `< 2` | `0`             |
/// | `2`   | current state   |
/// | `3`   | `1`             |
/// | `> 3` | `0`             |
///
/// The neighborhood size is ignored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Conway;

impl Rule for Conway {
    fn apply(&self, sum: NeighborSum, current: CellState, _neighborhood_size: usize) -> CellState {
        match sum {
            2 => current,
            3 => 1,
            _ => 0,
        }
    }
}

/// Rules of Conway's Game of Life, as a [`LifeLike`] rule.
pub const B3S23: LifeLike = LifeLike::new(0b1000, 0b1100);

/// A birth/survival rule.
///
/// # Representation
/// ```notrust
/// |------birth------|
/// 0000_0000_0000_0000_0000_0000_0000_0000
///                     |----survival-----|
/// ```
///
/// # Examples
/// ```notrust
/// b3s23:                0000_0000_0000_1000_0000_0000_0000_1100
///
/// b0s0:                 0000_0000_0000_0000_0000_0000_0000_0000
/// b012345678s012345678: 0000_0001_1111_1111_0000_0001_1111_1111
/// ```
///
/// A dead cell (`0`) is born as `1` if its sum is a birth count. A live cell keeps its state if
/// its sum is a survival count, and dies otherwise. Sums above 8 are never counted.
///
/// See: https://conwaylife.com/wiki/Rulestring
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LifeLike {
    rule: u32,
}

impl Default for LifeLike {
    fn default() -> Self {
        B3S23
    }
}

impl LifeLike {
    /// Create a new rule for the given births and survivals. For both `b` and `s`, counts are
    /// set on a bit basis: if bit `i` in `b` is on, `i` is a birth count. Any bit past the 8th
    /// is ignored.
    pub const fn new(b: u16, s: u16) -> Self {
        let b = b & 0x1FF;
        let s = s & 0x1FF;

        Self {
            rule: (b as u32) << 16 | s as u32,
        }
    }

    pub fn births(&self) -> u16 {
        ((self.rule & 0x1FF0000) >> 0x10) as u16
    }

    pub fn survivals(&self) -> u16 {
        (self.rule & 0x1FF) as u16
    }

    fn contains(set: u16, sum: NeighborSum) -> bool {
        sum <= 8 && set & (1 << sum) != 0
    }
}

impl Rule for LifeLike {
    fn apply(&self, sum: NeighborSum, current: CellState, _neighborhood_size: usize) -> CellState {
        match current {
            0 if Self::contains(self.births(), sum) => 1,
            0 => 0,
            alive if Self::contains(self.survivals(), sum) => alive,
            _ => 0,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule is missing its births, expected something like b3/s23")]
    MissingBirths,

    #[error("Rule is missing its survivals, expected something like b3/s23")]
    MissingSurvivals,

    #[error("Invalid neighbor count '{got}', expected a digit in 0..=8")]
    InvalidCount { got: char },
}

impl FromStr for LifeLike {
    type Err = RuleError;

    /// Parse rules that look like `b3/s23`, `B3S23` or `3/23`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (b, s) = if let Some(rest) = s.strip_prefix(['b', 'B']) {
            let (b, s) = rest
                .split_once(['s', 'S'])
                .ok_or(RuleError::MissingSurvivals)?;

            (b.strip_suffix('/').unwrap_or(b), s)
        } else {
            s.split_once('/').ok_or(RuleError::MissingBirths)?
        };

        Ok(Self::new(counts_to_bits(b)?, counts_to_bits(s)?))
    }
}

/// Convert the human readable neighbor counts to a packed bit representation
fn counts_to_bits(counts: &str) -> Result<u16, RuleError> {
    let mut n = 0;

    for c in counts.chars() {
        let d = c
            .to_digit(10)
            .filter(|&d| d <= 8)
            .ok_or(RuleError::InvalidCount { got: c })?;

        n |= 1 << d;
    }

    Ok(n)
}

impl fmt::Display for LifeLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_counts = |f: &mut fmt::Formatter<'_>, set: u16| {
            (0..=8)
                .filter(|&i| set & (1u16 << i) != 0)
                .try_for_each(|i| write!(f, "{i}"))
        };

        write!(f, "B")?;
        write_counts(f, self.births())?;
        write!(f, "/S")?;
        write_counts(f, self.survivals())
    }
}

impl fmt::Debug for LifeLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LifeLike({self})")
    }
}

/// The built-in rules, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyRule {
    Conway(Conway),
    LifeLike(LifeLike),
}

impl Default for AnyRule {
    fn default() -> Self {
        Self::Conway(Conway)
    }
}

impl Rule for AnyRule {
    fn apply(&self, sum: NeighborSum, current: CellState, neighborhood_size: usize) -> CellState {
        match self {
            Self::Conway(rule) => rule.apply(sum, current, neighborhood_size),
            Self::LifeLike(rule) => rule.apply(sum, current, neighborhood_size),
        }
    }
}

impl FromStr for AnyRule {
    type Err = RuleError;

    /// `conway` selects [`Conway`], anything else is parsed as a [`LifeLike`] rule string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("conway") {
            return Ok(Self::Conway(Conway));
        }

        s.parse().map(Self::LifeLike)
    }
}

impl fmt::Display for AnyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conway(_) => write!(f, "conway"),
            Self::LifeLike(rule) => write!(f, "{rule}"),
        }
    }
}
