pub mod config;
pub mod engine;
pub mod grid;
pub mod neighborhood;
pub mod render;
pub mod rules;
pub mod simulation;

/// The state held by a single cell, always in `0..states`.
pub type CellState = u8;

/// Sum of the states of every in-bounds neighbor of a cell.
pub type NeighborSum = u64;
