use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medpod_core::{inspect_text, Event, EventEnvelope, EventLevel, PodContent, WardState};
use medpod_world::{
    build_initial_state, load_content, load_saved_ward, load_scenario, save_ward,
    sorted_pod_ids, validate_scenario, HostAction, SimHost,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "medpod_cli", about = "Medical pod ward simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ward for a fixed number of ticks.
    Run {
        #[arg(long)]
        ticks: u64,
        /// Generate the ward with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Resume from a saved ward file. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<PathBuf>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Number of pods in a generated ward.
        #[arg(long, default_value_t = 4)]
        pods: usize,
        /// JSON file of scheduled host actions.
        #[arg(long)]
        scenario: Option<PathBuf>,
        #[arg(long, default_value_t = 600)]
        print_every: u64,
        #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
        event_level: String,
        /// Write the final ward to this file.
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

struct RunArgs {
    ticks: u64,
    seed: Option<u64>,
    state_file: Option<PathBuf>,
    content_dir: String,
    pods: usize,
    scenario: Option<PathBuf>,
    print_every: u64,
    event_level: EventLevel,
    save: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn initial_ward(args: &RunArgs, content: &PodContent) -> Result<(WardState, SimHost, ChaCha8Rng)> {
    if let Some(path) = &args.state_file {
        let saved = load_saved_ward(path)?;
        return Ok((saved.state, saved.host, saved.rng));
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (state, host) = build_initial_state(content, seed, args.pods, &mut rng);
    Ok((state, host, rng))
}

fn run(args: &RunArgs) -> Result<()> {
    let content = load_content(&args.content_dir)?;
    let (mut state, mut host, mut rng) = initial_ward(args, &content)?;

    if let Some(path) = &args.scenario {
        let actions = load_scenario(path)?;
        validate_scenario(&actions, &state)
            .with_context(|| format!("checking scenario: {}", path.display()))?;
        host.schedule.extend(actions);
    }

    tracing::info!(
        seed = state.meta.seed,
        pods = state.pods.len(),
        content_version = %content.content_version,
        "starting ward"
    );
    println!(
        "Starting ward: ticks={} seed={} pods={} content_version={}",
        args.ticks,
        state.meta.seed,
        state.pods.len(),
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    let print_every = args.print_every.max(1);
    for _ in 0..args.ticks {
        let now = state.meta.tick;
        for action in host.run_due_actions(now, &content, &mut rng) {
            println!("[tick={now:05}]  host: {}", describe_action(&action));
        }

        let events = medpod_core::tick(&mut state, &mut host, &content, args.event_level);
        host.observe(&events);

        // Notable events print regardless of print_every.
        for envelope in &events {
            if let Some(line) = describe_event(envelope) {
                println!("[tick={:05}]  {line}", envelope.tick);
            }
        }

        if state.meta.tick % print_every == 0 {
            print_status(&state, &host, &content);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final ward at tick {}:", state.meta.tick);
    print_status(&state, &host, &content);

    if let Some(path) = &args.save {
        save_ward(path, &state, &host, &rng)?;
        println!("Ward saved to {}", path.display());
    }
    Ok(())
}

fn describe_action(action: &HostAction) -> String {
    match action {
        HostAction::CutPower { pod_id } => format!("power cut to {pod_id}"),
        HostAction::RestorePower { pod_id } => format!("power restored to {pod_id}"),
        HostAction::Admit {
            pod_id,
            occupant_id: Some(occupant),
        } => format!("{occupant} admitted to {pod_id}"),
        HostAction::Admit {
            pod_id,
            occupant_id: None,
        } => format!("new patient admitted to {pod_id}"),
        HostAction::Remove { pod_id } => format!("occupant removed from {pod_id}"),
    }
}

fn describe_event(envelope: &EventEnvelope) -> Option<String> {
    let line = match &envelope.event {
        Event::DiagnosisCompleted {
            pod_id,
            occupant_id,
            condition_count,
            total_healing_ticks,
            ..
        } => format!(
            "{pod_id}: {occupant_id} diagnosed, {condition_count} condition(s), \
             {total_healing_ticks} healing ticks"
        ),
        Event::ConditionTreated {
            pod_id,
            condition_id,
            ..
        } => format!("{pod_id}: treated {condition_id}"),
        Event::PatientDischarged {
            pod_id,
            occupant_id,
        } => format!("*** {pod_id}: {occupant_id} discharged ***"),
        Event::TreatmentInterrupted {
            pod_id,
            interrupted,
        } => format!("!!! {pod_id}: power lost during {interrupted}"),
        Event::SessionAbandoned { pod_id, status } => {
            format!("{pod_id}: occupant left during {status}")
        }
        Event::TransitionRejected { pod_id, from } => {
            format!("!!! {pod_id}: stuck in error after {from}")
        }
        Event::HealingScheduled {
            pod_id,
            condition_id,
            healing_ticks,
            ..
        } => format!("{pod_id}: {condition_id} scheduled for {healing_ticks} ticks"),
        _ => return None,
    };
    Some(line)
}

fn print_status(state: &WardState, host: &SimHost, content: &PodContent) {
    let tick = state.meta.tick;
    let seconds = tick / content.constants.ticks_per_second.max(1);
    println!(
        "[tick={tick:05}  t={seconds}s]  pods={}  occupied={}  draw={:.0} W",
        state.pods.len(),
        host.beds.len(),
        host.total_requested_draw(),
    );
    for pod_id in sorted_pod_ids(state) {
        let Some(pod) = state.pods.get(&pod_id) else {
            continue;
        };
        let occupant = pod
            .occupant
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let text = inspect_text(pod, &content.constants).replace('\n', "  |  ");
        println!("    {pod_id}  occupant={occupant:<14}  {text}");
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            ticks,
            seed,
            state_file,
            content_dir,
            pods,
            scenario,
            print_every,
            event_level,
            save,
        } => {
            let event_level = match event_level.as_str() {
                "debug" => EventLevel::Debug,
                _ => EventLevel::Normal,
            };
            run(&RunArgs {
                ticks,
                seed,
                state_file,
                content_dir,
                pods,
                scenario,
                print_every,
                event_level,
                save,
            })?;
        }
    }
    Ok(())
}
