use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ringlife::config;
use ringlife::config::SimulationConfig;
use ringlife::grid::Grid;
use ringlife::render;
use ringlife::rules::AnyRule;
use ringlife::simulation::FrameSink;
use ringlife::simulation::History;
use ringlife::simulation::Simulation;
use ringlife::simulation::SimulationError;

use display::Quit;
use display::Terminal;

mod display;

#[derive(Parser)]
#[command(name = "ringlife")]
#[command(about = "Run a cellular automaton over neighborhood sums on a random grid")]
struct Cli {
    /// Side length of the square grid
    #[arg(long, default_value_t = config::DEFAULT_GRID_SIZE)]
    grid_size: usize,

    /// Number of cells in the neighborhood, a multiple of 8. Every 8 adds a ring.
    #[arg(long, default_value_t = config::DEFAULT_NEIGHBORHOOD_SIZE)]
    neighborhood_size: usize,

    /// Number of cell states
    #[arg(long, default_value_t = config::DEFAULT_STATES)]
    states: u16,

    /// Milliseconds between displayed frames
    #[arg(long, default_value_t = config::DEFAULT_INTERVAL_MS)]
    interval: u64,

    /// Number of most recent frames to keep for --output
    #[arg(long, default_value_t = config::DEFAULT_SAVE_COUNT)]
    save_count: usize,

    /// Number of steps to run
    #[arg(long, default_value_t = config::DEFAULT_FRAMES)]
    frames: usize,

    /// Seed for the initial grid. Random if not given.
    #[arg(long)]
    seed: Option<u64>,

    /// `conway`, or a birth/survival rule such as `b36/s23`
    #[arg(long, default_value = "conway")]
    rule: AnyRule,

    /// Compute each step on all cores
    #[arg(long)]
    parallel: bool,

    /// Don't draw frames to the terminal
    #[arg(long)]
    headless: bool,

    /// Write the retained frames to this file as braille text
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = SimulationConfig::builder()
        .grid_size(cli.grid_size)
        .neighborhood_size(cli.neighborhood_size)
        .states(cli.states)
        .frame_count(cli.frames)
        .step_interval(Duration::from_millis(cli.interval))
        .save_count(cli.save_count)
        .seed(cli.seed)
        .rule(cli.rule)
        .parallel(cli.parallel)
        .build()
        .context("Invalid configuration")?;

    let mut sim = Simulation::new(config)?;
    let mut history = History::new(sim.config().save_count());

    let mut display = if cli.headless {
        None
    } else {
        let terminal = Terminal::new(sim.grid(), sim.config().step_interval())
            .context("Failed to set up the terminal")?;

        Some(terminal)
    };

    let res = sim.run(&mut |generation: u64, grid: &Grid| -> anyhow::Result<()> {
        history.frame(generation, grid)?;

        if let Some(display) = display.as_mut() {
            display.frame(generation, grid)?;
        }

        Ok(())
    });

    // Restore the terminal before reporting anything
    drop(display);

    match res {
        Err(SimulationError::Sink(err)) if err.is::<Quit>() => {
            info!(generation = sim.generation(), "Stopped early");
        }
        res => res?,
    }

    if let Some(path) = cli.output {
        export(&history, &path)?;
        info!(frames = history.len(), path = %path.display(), "Exported frames");
    }

    Ok(())
}

/// Write every retained frame as braille text, each under a header line.
fn export(history: &History, path: &Path) -> anyhow::Result<()> {
    let mut out = String::new();

    for (generation, grid) in history.frames() {
        writeln!(out, "generation {generation}")?;
        out.push_str(&render::to_braille(grid));
        out.push('\n');
    }

    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}
