//! # engine_app — demo host
//!
//! Builds an [`Ecs`] on the monotonic clock, spawns a ring of moving
//! entities, registers the demo systems and ticks them at a fixed rate.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`RUST_LOG` overrides the `engine_app=info` default).
//! 2. Load the coordinator configuration, if a path was given.
//! 3. Spawn entities and register systems.
//! 4. Enter the fixed-rate tick loop.

mod components;
mod scene;
mod systems;
mod tick;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_component::EntityAllocator;
use engine_ecs::{Ecs, EcsConfig, MonotonicClock};
use tick::{TickConfig, TickLoop};

#[derive(Debug, Parser)]
#[command(name = "engine_app", about = "Run the ECS demo scene")]
struct Args {
    /// Target ticks per second.
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Number of ticks to run (0 = run until interrupted).
    #[arg(long, default_value_t = 300)]
    max_ticks: u64,

    /// Number of entities to spawn.
    #[arg(long, default_value_t = 16)]
    entities: usize,

    /// Ticks between census reports.
    #[arg(long, default_value_t = 30)]
    report_every: u32,

    /// JSON file with the coordinator configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<EcsConfig> {
    let Some(path) = path else {
        return Ok(EcsConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EcsConfig::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();

    let config = load_config(args.config.as_ref())?;
    info!(gating = ?config.gating, "engine starting");

    let mut ecs = Ecs::with_config(config, MonotonicClock::new());
    let mut ids = EntityAllocator::new();
    scene::spawn_entities(&mut ecs, &mut ids, args.entities)?;
    let reports = scene::register_systems(&mut ecs, args.report_every)?;

    let mut tick_loop = TickLoop::new(
        TickConfig {
            tick_rate: args.tick_rate,
            max_ticks: args.max_ticks,
        },
        ecs,
    )?;
    tick_loop.run().context("tick loop failed")?;

    if let Some(report) = reports.get() {
        info!(
            ticks = tick_loop.tick_id(),
            entities = tick_loop.ecs().entity_count(),
            count = report.count,
            centroid = ?report.centroid,
            "engine shut down"
        );
    }
    Ok(())
}
