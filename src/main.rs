//! tui2048: the 2048 sliding-tile puzzle in the terminal, with animated moves and merges.

mod animation;
mod app;
mod controller;
mod engine;
mod input;
mod session;
mod theme;
mod tiles;
mod ui;

use animation::{AnimationTimings, DEFAULT_APPEAR_MS, DEFAULT_MERGE_MS, DEFAULT_SHIFT_MS};
use anyhow::{Context, Result, ensure};
use app::App;
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect one game (board size, RNG seed, animation timing).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub size: usize,
    pub seed: Option<u64>,
    pub timings: AnimationTimings,
    pub frame_rate: f64,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    ensure!(
        args.frame_rate.is_finite() && args.frame_rate > 0.0,
        "frame rate must be positive, got {}",
        args.frame_rate
    );
    let config = GameConfig {
        size: args.size as usize,
        seed: args.seed,
        timings: AnimationTimings::new(args.appear_ms, args.shift_ms, args.merge_ms)?,
        frame_rate: args.frame_rate,
        no_animation: args.no_animation,
    };
    log::info!("starting with {:?}", config);
    let theme = theme::Theme::classic()?;
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Log to a file; the terminal UI owns stdout. `RUST_LOG` overrides the default `info` filter.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

/// 2048 in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tui2048",
    version,
    about = "The 2048 sliding-tile puzzle in the terminal.",
    long_about = "tui2048 is a terminal rendition of the 2048 puzzle.\n\n\
        Slide all tiles in one direction; two equal tiles that meet merge into their sum. \
        A new 2 (or sometimes 4) appears after every move. Reach 2048 to win; the game is \
        over when no move is possible.\n\n\
        CONTROLS:\n  Arrows / h j k l / w a s d  Slide\n  \
        Click NEW GAME               Restart\n  \
        Enter / Space / R            New game (after win or loss)\n  \
        Q / Esc                      Quit"
)]
pub struct Args {
    /// Board size N (N×N).
    #[arg(long, default_value = "4", value_name = "N", value_parser = clap::value_parser!(u8).range(2..=8))]
    pub size: u8,

    /// RNG seed for reproducible tile placement. Random if not set.
    #[arg(long, value_name = "U64")]
    pub seed: Option<u64>,

    /// Duration of the appear (scale-in) animation in ms.
    #[arg(long, default_value_t = DEFAULT_APPEAR_MS, value_name = "MS")]
    pub appear_ms: u64,

    /// Duration of the shift (slide) animation in ms.
    #[arg(long, default_value_t = DEFAULT_SHIFT_MS, value_name = "MS")]
    pub shift_ms: u64,

    /// Duration of the merge (pop) animation in ms.
    #[arg(long, default_value_t = DEFAULT_MERGE_MS, value_name = "MS")]
    pub merge_ms: u64,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Disable the victory / game-over fade-in.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}
