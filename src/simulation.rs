use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::config::ConfigError;
use crate::config::SimulationConfig;
use crate::engine::StepEngine;
use crate::grid::Grid;
use crate::grid::GridError;
use crate::rules::AnyRule;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Step to generation {generation} failed: {source}")]
    Step {
        generation: u64,
        #[source]
        source: GridError,
    },

    #[error(transparent)]
    Sink(#[from] anyhow::Error),
}

/// Consumes the grid after every step, e.g. to display or export it.
///
/// The grid is only borrowed for the duration of the call; clone it to keep it.
pub trait FrameSink {
    fn frame(&mut self, generation: u64, grid: &Grid) -> anyhow::Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(u64, &Grid) -> anyhow::Result<()>,
{
    fn frame(&mut self, generation: u64, grid: &Grid) -> anyhow::Result<()> {
        self(generation, grid)
    }
}

/// Retains the most recent frames, dropping the oldest once full.
#[derive(Debug, Default)]
pub struct History {
    frames: VecDeque<(u64, Grid)>,
    capacity: usize,
}

impl History {
    /// Frames are only allocated as they arrive, so `capacity` can be arbitrarily large.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Retained frames, oldest first.
    pub fn frames(&self) -> impl Iterator<Item = (u64, &Grid)> {
        self.frames.iter().map(|(generation, grid)| (*generation, grid))
    }

    pub fn latest(&self) -> Option<(u64, &Grid)> {
        self.frames.back().map(|(generation, grid)| (*generation, grid))
    }
}

impl FrameSink for History {
    fn frame(&mut self, generation: u64, grid: &Grid) -> anyhow::Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }

        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }

        self.frames.push_back((generation, grid.clone()));

        Ok(())
    }
}

/// Drives the step engine for a configured number of frames, handing every generation to a
/// [`FrameSink`].
pub struct Simulation {
    config: SimulationConfig,
    engine: StepEngine<AnyRule>,
    grid: Grid,
    generation: u64,
    seed: Option<u64>,
}

impl Simulation {
    /// Start from a random grid. Uses the configured seed, or picks one if there is none.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let seed = config.seed().unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let size = config.grid_size();
        let grid = Grid::random(size, size, config.states(), &mut rng)?;

        let mut sim = Self::from_grid(config, grid);
        sim.seed = Some(seed);

        Ok(sim)
    }

    /// Start from a given grid. The grid's own shape and state count are used as-is.
    pub fn from_grid(config: SimulationConfig, grid: Grid) -> Self {
        let engine =
            StepEngine::new(config.rule(), config.neighborhood()).parallel(config.parallel());

        Self {
            config,
            engine,
            grid,
            generation: 0,
            seed: None,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The current generation.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The seed the initial grid was drawn with, if it was random.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Advance by a single generation.
    pub fn step(&mut self) -> Result<&Grid, SimulationError> {
        let generation = self.generation + 1;

        self.engine
            .step(&mut self.grid)
            .map_err(|source| SimulationError::Step { generation, source })?;

        self.generation = generation;

        Ok(&self.grid)
    }

    /// Run the configured number of frames, passing each new generation to `sink`.
    pub fn run<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SimulationError> {
        let (rows, cols) = self.grid.dimensions();

        info!(
            rows,
            cols,
            states = self.grid.states(),
            rings = self.config.neighborhood().rings(),
            rule = %self.config.rule(),
            seed = ?self.seed,
            frames = self.config.frame_count(),
            parallel = self.config.parallel(),
            "Starting simulation"
        );

        for _ in 0..self.config.frame_count() {
            self.step()?;

            debug!(
                generation = self.generation,
                population = self.grid.population(),
                "Stepped"
            );

            sink.frame(self.generation, &self.grid)?;
        }

        info!(
            generation = self.generation,
            population = self.grid.population(),
            "Simulation finished"
        );

        Ok(())
    }
}
