//! Tilecascade: a tile-matching puzzle simulation core.
//!
//! ## Usage
//!
//! - `tilecascade` - Run the demo
//! - `tilecascade play` - Start the text protocol on stdin/stdout
//! - `tilecascade demo --swaps 20` - Play random swaps and print every event
//!
//! Set `RUST_LOG=debug` to trace each cascade pass on stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use tilecascade::config::BoardConfig;
use tilecascade::engine::{Engine, Event};
use tilecascade::grid::Direction;
use tilecascade::protocol::ProtocolSession;

/// Tilecascade: a tile-matching puzzle simulation core
#[derive(Parser)]
#[command(name = "tilecascade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    board: BoardArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Board options; anything given here overrides the config file.
#[derive(Args)]
struct BoardArgs {
    /// JSON board config (dimensions, colors, obstacles, power-ups, seed)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Board width in cells
    #[arg(long, global = true)]
    width: Option<usize>,

    /// Board height in cells
    #[arg(long, global = true)]
    height: Option<usize>,

    /// Number of tile colors
    #[arg(long, global = true)]
    colors: Option<u8>,

    /// Seed for reproducible boards and refills
    #[arg(short, long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the line protocol for use by a presentation front end
    Play,
    /// Play random legal swaps and print the resulting events
    Demo {
        /// Number of swaps to attempt
        #[arg(long, default_value = "10")]
        swaps: usize,
    },
}

impl BoardArgs {
    fn load(&self) -> Result<BoardConfig> {
        let mut config = match &self.config {
            Some(path) => BoardConfig::from_file(path)?,
            None => BoardConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(colors) = self.colors {
            config.colors = colors;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.board.load()?;

    match cli.command {
        Some(Commands::Play) => {
            let mut session = ProtocolSession::new(config)?;
            session.run().context("protocol session failed")?;
        }
        Some(Commands::Demo { swaps }) => run_demo(&config, swaps)?,
        None => run_demo(&config, 10)?,
    }
    Ok(())
}

fn run_demo(config: &BoardConfig, swaps: usize) -> Result<()> {
    println!("Tilecascade: tile-matching simulation core\n");

    let mut engine = Engine::new(config).context("building the board")?;
    // A separate stream picks the swaps so the board's refills stay
    // identical to a run driven by any other front end.
    let mut picker = match config.seed {
        Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(1)),
        None => fastrand::Rng::new(),
    };

    println!("{}", engine.board());
    let mut cleared_total = 0;
    for n in 1..=swaps {
        let board = engine.board();
        let a = picker.usize(..board.len());
        let direction = Direction::ALL[picker.usize(..Direction::ALL.len())];
        let Some(b) = board.grid().step(direction, a) else {
            continue;
        };

        println!("=== Swap {n}: {a} <-> {b} ===");
        for event in engine.swap(a, b)? {
            if let Event::TilesCleared { indices, .. } = &event {
                cleared_total += indices.len();
            }
            println!("{event}");
        }
    }

    println!("\n{}", engine.board());
    println!("Cleared {cleared_total} tiles in total");
    Ok(())
}
