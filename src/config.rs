use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::grid;
use crate::grid::MAX_STATES;
use crate::neighborhood::Neighborhood;
use crate::rules::AnyRule;

pub const DEFAULT_GRID_SIZE: usize = 50;
pub const DEFAULT_NEIGHBORHOOD_SIZE: usize = 8;
pub const DEFAULT_STATES: u16 = 2;
pub const DEFAULT_FRAMES: usize = 100;
pub const DEFAULT_INTERVAL_MS: u64 = 1;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(DEFAULT_INTERVAL_MS);
pub const DEFAULT_SAVE_COUNT: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Grid size must be positive and fit in memory, got {0}")]
    GridSize(usize),

    #[error("Neighborhood size must be a positive multiple of 8, got {0}")]
    NeighborhoodSize(usize),

    #[error("Number of states must be in 2..={max}, got {0}", max = MAX_STATES)]
    States(u16),
}

/// Immutable, validated simulation parameters. Only [`ConfigBuilder::build`] makes one.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    grid_size: usize,
    neighborhood: Neighborhood,
    states: u16,
    frame_count: usize,
    step_interval: Duration,
    save_count: usize,
    seed: Option<u64>,
    rule: AnyRule,
    parallel: bool,
}

impl SimulationConfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Side length of the square grid.
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    pub fn states(&self) -> u16 {
        self.states
    }

    /// Number of steps to run.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Delay between displayed frames. Only a rendering concern.
    pub fn step_interval(&self) -> Duration {
        self.step_interval
    }

    /// Number of most recent frames retained for export.
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn rule(&self) -> AnyRule {
        self.rule
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    grid_size: usize,
    neighborhood_size: usize,
    states: u16,
    frame_count: usize,
    step_interval: Duration,
    save_count: usize,
    seed: Option<u64>,
    rule: AnyRule,
    parallel: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            neighborhood_size: DEFAULT_NEIGHBORHOOD_SIZE,
            states: DEFAULT_STATES,
            frame_count: DEFAULT_FRAMES,
            step_interval: DEFAULT_INTERVAL,
            save_count: DEFAULT_SAVE_COUNT,
            seed: None,
            rule: AnyRule::default(),
            parallel: false,
        }
    }
}

impl ConfigBuilder {
    pub fn grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn neighborhood_size(mut self, neighborhood_size: usize) -> Self {
        self.neighborhood_size = neighborhood_size;
        self
    }

    pub fn states(mut self, states: u16) -> Self {
        self.states = states;
        self
    }

    pub fn frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn step_interval(mut self, step_interval: Duration) -> Self {
        self.step_interval = step_interval;
        self
    }

    pub fn save_count(mut self, save_count: usize) -> Self {
        self.save_count = save_count;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn rule(mut self, rule: AnyRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate every parameter at once, so nothing bad is discovered after the simulation has
    /// started.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let grid_size = self.grid_size;
        if grid_size == 0 || grid_size.checked_mul(grid_size).is_none() {
            return Err(ConfigError::GridSize(grid_size));
        }

        let neighborhood = Neighborhood::new(self.neighborhood_size)?;

        let states = grid::check_states(self.states)?;

        if neighborhood.rings() >= grid_size {
            warn!(
                rings = neighborhood.rings(),
                grid_size, "Neighborhood is wider than the grid, every cell sees the whole grid"
            );
        }

        Ok(SimulationConfig {
            grid_size,
            neighborhood,
            states,
            frame_count: self.frame_count,
            step_interval: self.step_interval,
            save_count: self.save_count,
            seed: self.seed,
            rule: self.rule,
            parallel: self.parallel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::builder().build().unwrap();

        assert_eq!(config.grid_size(), 50);
        assert_eq!(config.neighborhood().size(), 8);
        assert_eq!(config.neighborhood().rings(), 1);
        assert_eq!(config.states(), 2);
        assert_eq!(config.frame_count(), 100);
        assert_eq!(config.step_interval(), Duration::from_millis(DEFAULT_INTERVAL_MS));
        assert_eq!(config.save_count(), 50);
        assert_eq!(config.rule(), AnyRule::default());
    }

    #[test]
    fn rejects_neighborhood_not_multiple_of_eight() {
        for size in [0, 1, 7, 9, 20] {
            let err = SimulationConfig::builder()
                .neighborhood_size(size)
                .build()
                .unwrap_err();

            assert_eq!(err, ConfigError::NeighborhoodSize(size));
        }
    }

    #[test]
    fn rejects_empty_grid() {
        let err = SimulationConfig::builder().grid_size(0).build().unwrap_err();
        assert_eq!(err, ConfigError::GridSize(0));
    }

    #[test]
    fn rejects_overflowing_grid() {
        let err = SimulationConfig::builder()
            .grid_size(usize::MAX)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::GridSize(usize::MAX));
    }

    #[test]
    fn rejects_bad_state_counts() {
        for states in [0, 1, 257] {
            let err = SimulationConfig::builder()
                .states(states)
                .build()
                .unwrap_err();

            assert_eq!(err, ConfigError::States(states));
        }

        assert!(SimulationConfig::builder().states(256).build().is_ok());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            ConfigError::NeighborhoodSize(12).to_string(),
            "Neighborhood size must be a positive multiple of 8, got 12"
        );
        assert_eq!(
            ConfigError::States(1).to_string(),
            "Number of states must be in 2..=256, got 1"
        );
    }
}
