mod routes;
mod state;
mod tick_loop;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use medpod_core::EventLevel;
use medpod_world::{
    build_initial_state, load_content, load_saved_ward, load_scenario, validate_scenario,
};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use crate::routes::make_router_with_cors;
use crate::state::{AppState, SimState};
use crate::tick_loop::run_tick_loop;

#[derive(Parser)]
#[command(name = "medpod_daemon", about = "Medical pod ward simulator served over HTTP")]
struct Args {
    /// Generate the ward with this seed. Mutually exclusive with --state.
    #[arg(long, conflicts_with = "state_file")]
    seed: Option<u64>,
    /// Resume from a saved ward file. Mutually exclusive with --seed.
    #[arg(long = "state", conflicts_with = "seed")]
    state_file: Option<PathBuf>,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    #[arg(long, default_value_t = 4)]
    pods: usize,
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Tick rate. 0 runs as fast as possible.
    #[arg(long, default_value_t = 60.0)]
    ticks_per_sec: f64,
    /// Stop ticking after this many ticks; the server keeps running.
    #[arg(long)]
    max_ticks: Option<u64>,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
    event_level: String,
}

fn build_sim(args: &Args) -> Result<SimState> {
    let content = load_content(&args.content_dir)?;

    let (ward, mut host, rng) = if let Some(path) = &args.state_file {
        let saved = load_saved_ward(path)?;
        (saved.state, saved.host, saved.rng)
    } else {
        let seed = args.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (ward, host) = build_initial_state(&content, seed, args.pods, &mut rng);
        (ward, host, rng)
    };

    if let Some(path) = &args.scenario {
        let actions = load_scenario(path)?;
        validate_scenario(&actions, &ward)
            .with_context(|| format!("checking scenario: {}", path.display()))?;
        host.schedule.extend(actions);
    }

    let event_level = match args.event_level.as_str() {
        "debug" => EventLevel::Debug,
        _ => EventLevel::Normal,
    };
    Ok(SimState {
        ward,
        host,
        content,
        rng,
        event_level,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let sim = build_sim(&args)?;
    tracing::info!(
        seed = sim.ward.meta.seed,
        pods = sim.ward.pods.len(),
        content_version = %sim.content.content_version,
        "ward ready"
    );

    let (event_tx, _) = tokio::sync::broadcast::channel(1024);
    let app_state = AppState {
        sim: Arc::new(Mutex::new(sim)),
        event_tx: event_tx.clone(),
        ticks_per_sec: args.ticks_per_sec,
        paused: Arc::new(AtomicBool::new(false)),
    };

    tokio::spawn(run_tick_loop(
        app_state.sim.clone(),
        event_tx,
        args.ticks_per_sec,
        args.max_ticks,
        app_state.paused.clone(),
    ));

    let router = make_router_with_cors(app_state, &args.cors_origin);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await.context("serving HTTP")?;
    Ok(())
}
