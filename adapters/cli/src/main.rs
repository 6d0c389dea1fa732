#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs an Endless Pipes session headlessly.

mod catalog_file;

use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use endless_pipes_core::{Command, TileCatalog, WELCOME_BANNER};
use endless_pipes_rendering::{describe_failure, RenderingBackend, TextRenderer};
use endless_pipes_world::{self as world, query, Level, LevelConfig};

use crate::catalog_file::CatalogFile;

/// Pour fluid into an endless, scrolling grid of pipes and see how long it lasts.
#[derive(Debug, Parser)]
#[command(name = "endless-pipes", version, about)]
struct Args {
    /// Seed for row generation.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of columns in the grid.
    #[arg(long)]
    columns: Option<u32>,
    /// Number of rows visible at once.
    #[arg(long)]
    viewport_rows: Option<u32>,
    /// Seconds simulated per tick.
    #[arg(long, default_value_t = 0.05)]
    dt: f64,
    /// Stop after this many ticks even if the level is still running.
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,
    /// JSON file holding the tile catalog to spawn from.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Print a frame every this many ticks; zero prints only the last one.
    #[arg(long, default_value_t = 0)]
    render_every: u64,
}

impl Args {
    fn level_config(&self) -> LevelConfig {
        let defaults = LevelConfig::default();
        let columns = self.columns.unwrap_or(defaults.columns);
        LevelConfig {
            columns,
            viewport_rows: self.viewport_rows.unwrap_or(defaults.viewport_rows),
            entry_column: columns / 2,
            seed: self.seed.unwrap_or(defaults.seed),
            ..defaults
        }
    }
}

/// Writes frames to standard output.
struct TerminalBackend<W> {
    out: W,
}

impl<W: Write> RenderingBackend for TerminalBackend<W> {
    fn present(&mut self, frame: &str) -> Result<()> {
        writeln!(self.out, "{frame}\n").context("failed to write frame")?;
        self.out.flush().context("failed to flush frame")
    }
}

/// Entry point for the Endless Pipes command-line interface.
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    ensure!(
        args.dt.is_finite() && args.dt > 0.0,
        "--dt must be a positive number of seconds"
    );

    let config = args.level_config();
    let mut level = match &args.catalog {
        Some(path) => {
            let file = CatalogFile::load(path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?;
            Level::with_tiles(file.tiles, config)
        }
        None => Level::new(TileCatalog::standard(), config),
    }
    .context("invalid level configuration")?;
    log::info!(
        "starting {}x{} level with {} tile kinds",
        level.config().columns,
        level.config().viewport_rows,
        query::catalog(&level).tiles().len()
    );

    let mut backend = TerminalBackend {
        out: io::stdout().lock(),
    };
    writeln!(backend.out, "{WELCOME_BANNER}").context("failed to write banner")?;

    let mut renderer = TextRenderer::new();
    let dt = Duration::from_secs_f64(args.dt);
    let mut events = Vec::new();
    let mut ticks = 0;
    while !level.failed() && ticks < args.max_ticks {
        world::apply(&mut level, Command::Tick { dt }, &mut events);
        events.clear();
        ticks += 1;
        if args.render_every > 0 && ticks % args.render_every == 0 {
            backend.present(&renderer.render_frame(&level))?;
        }
    }

    backend.present(&renderer.render_frame(&level))?;
    if let Some(cause) = level.failure() {
        writeln!(backend.out, "{}", describe_failure(cause)).context("failed to write summary")?;
    }
    writeln!(backend.out, "You lasted {:.1} seconds!", level.elapsed())
        .context("failed to write summary")?;
    log::debug!(
        "glyph cache: {} hits, {} misses",
        renderer.glyphs().hits(),
        renderer.glyphs().misses()
    );
    Ok(())
}
