use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_control::{AutopilotController, CommandSource, SteadyOreSupply};
use sim_core::fx::NullFxSink;
use sim_core::metrics::MetricsFileWriter;
use sim_core::modifiers::{ModifierProvider, WarehouseBonusModifiers};
use sim_core::parity::{compare_states, run_lockstep, DEFAULT_TOLERANCE};
use sim_core::{Event, EventLevel, GameContent, GameState, NativeEngine, SimEngine};
use sim_world::{build_initial_state, load_content, load_state, save_state};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sim_cli", about = "Factory economy simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Modifiers {
    /// Every modifier at 1.0.
    Neutral,
    /// Bonuses from warehouse metals, crystals, organics, and ice.
    Warehouse,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation under the autopilot for a fixed number of steps.
    Run {
        #[arg(long)]
        steps: u64,
        /// Seconds of game time per step.
        #[arg(long, default_value_t = 1.0)]
        dt: f64,
        /// Generate a world with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Load the initial snapshot from a JSON file. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<PathBuf>,
        /// Factories in a generated world.
        #[arg(long, default_value_t = 3)]
        factories: usize,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Ore handed to the factories per second of game time.
        #[arg(long, default_value_t = 2.0)]
        ore_per_sec: f64,
        #[arg(long, value_enum, default_value_t = Modifiers::Neutral)]
        modifiers: Modifiers,
        #[arg(long, default_value_t = 100)]
        print_every: u64,
        #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
        event_level: String,
        /// Sample metrics every N steps.
        #[arg(long, default_value_t = 60)]
        metrics_every: u64,
        /// Disable automatic metrics collection to the runs/ directory.
        #[arg(long)]
        no_metrics: bool,
        /// Write the final snapshot to this file.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Run two engines from the same seed in lockstep and report the first
    /// divergent step.
    Verify {
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 3)]
        factories: usize,
        #[arg(long, default_value_t = 1000)]
        steps: u64,
        #[arg(long, default_value_t = 1.0)]
        dt: f64,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
    /// Compare two snapshot files.
    Parity {
        left: PathBuf,
        right: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
}

struct RunOptions {
    steps: u64,
    dt: f64,
    ore_per_sec: f64,
    print_every: u64,
    metrics_every: u64,
    no_metrics: bool,
    event_level: EventLevel,
    save: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run directory
// ---------------------------------------------------------------------------

fn generate_run_id(seed: u64) -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let time_of_day = secs % 86_400;
    let (year, month, day) = civil_from_days(secs / 86_400);
    format!(
        "{year:04}{month:02}{day:02}_{:02}{:02}{:02}_seed{seed}",
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60,
    )
}

/// Days since the Unix epoch to a proleptic Gregorian date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let shifted = days + 719_468;
    let era = shifted / 146_097;
    let day_of_era = shifted % 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let mp = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = year_of_era + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

fn create_run_dir(run_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn write_run_info(dir: &Path, run_id: &str, state: &GameState, options: &RunOptions) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": state.meta.seed,
        "content_version": state.meta.content_version,
        "factories": state.factories.len(),
        "metrics_every": options.metrics_every,
        "runner": "sim_cli",
        "args": {
            "steps": options.steps,
            "dt": options.dt,
            "ore_per_sec": options.ore_per_sec,
            "print_every": options.print_every,
        }
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn initial_state(
    content: &GameContent,
    seed: Option<u64>,
    state_file: Option<&Path>,
    factories: usize,
) -> Result<GameState> {
    if let Some(path) = state_file {
        return Ok(load_state(path, content)?.state);
    }
    let resolved_seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(resolved_seed);
    Ok(build_initial_state(content, resolved_seed, factories, &mut rng))
}

fn run<M: ModifierProvider>(
    mut engine: NativeEngine<M, NullFxSink>,
    options: &RunOptions,
) -> Result<()> {
    engine.event_level = options.event_level;

    let mut metrics_writer: Option<MetricsFileWriter> = None;
    if !options.no_metrics {
        let run_id = generate_run_id(engine.state().meta.seed);
        let run_dir = create_run_dir(&run_id)?;
        write_run_info(&run_dir, &run_id, engine.state(), options)?;
        let writer = MetricsFileWriter::new(run_dir.clone())
            .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
        metrics_writer = Some(writer);
        println!("Run directory: {}", run_dir.display());
    }

    let mut autopilot = AutopilotController::default();
    let mut supply = SteadyOreSupply::new(options.ore_per_sec);
    let mut next_command_id = engine.state().counters.next_command_id;

    println!(
        "Starting simulation: steps={} dt={} seed={} factories={} content_version={}",
        options.steps,
        options.dt,
        engine.state().meta.seed,
        engine.state().factories.len(),
        engine.content.content_version,
    );
    println!("{}", "-".repeat(80));

    for step in 1..=options.steps {
        let commands =
            autopilot.generate_commands(engine.state(), &engine.content, &mut next_command_id);
        for envelope in &commands {
            if let Err(err) = engine.apply_command(&envelope.command) {
                info!(command = %envelope.id, %err, "autopilot command rejected");
            }
        }
        engine.state.counters.next_command_id = next_command_id;

        supply.deliver(&mut engine, options.dt);
        let events = engine.step(options.dt);

        // Notable events print regardless of print_every.
        for event in &events {
            match &event.event {
                Event::UpgradeRequestFulfilled { factory_id, upgrade } => println!(
                    "*** {factory_id}: {} request fulfilled at t={:.1} ***",
                    upgrade.as_str(),
                    event.game_time
                ),
                Event::UpgradeRequestExpired { factory_id, upgrade } => println!(
                    "*** {factory_id}: {} request expired at t={:.1} ***",
                    upgrade.as_str(),
                    event.game_time
                ),
                _ => {}
            }
        }

        if options.print_every > 0 && step % options.print_every == 0 {
            print_status(engine.state());
        }

        if let Some(ref mut writer) = metrics_writer {
            if options.metrics_every > 0 && step % options.metrics_every == 0 {
                let snapshot = sim_core::compute_metrics(engine.state());
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at t={:.1}:", engine.state().meta.game_time);
    print_status(engine.state());
    println!("Ore delivered: {:.1}", supply.delivered);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }
    if let Some(path) = &options.save {
        save_state(path, engine.state())?;
        println!("Snapshot saved to {}", path.display());
    }

    Ok(())
}

fn print_status(state: &GameState) {
    let metrics = sim_core::compute_metrics(state);
    println!(
        "[t={:8.1}]  ore={:8.1}  bars={:8.1}  warehouse_bars={:8.1}  \
         refining={:2}  haulers={:2}  in_flight={:7.1}  hauled={:8.1}  requests={}  energy={:.2}",
        state.meta.game_time,
        metrics.total_ore,
        metrics.total_bars,
        metrics.warehouse_bars,
        metrics.refine_active_count,
        metrics.haulers_total,
        metrics.in_flight_amount,
        metrics.throughput_total,
        metrics.open_upgrade_requests,
        metrics.avg_energy_fraction,
    );
}

fn verify(
    content: GameContent,
    seed: u64,
    factories: usize,
    steps: u64,
    dt: f64,
    tolerance: f64,
) -> Result<()> {
    let world = |content: &GameContent| {
        build_initial_state(content, seed, factories, &mut ChaCha8Rng::seed_from_u64(seed))
    };
    let mut left = NativeEngine::new(world(&content), content.clone());
    let mut right = NativeEngine::new(world(&content), content);

    match run_lockstep(&mut left, &mut right, dt, steps, tolerance) {
        None => {
            println!("No divergence over {steps} steps (dt={dt}, seed={seed}).");
            Ok(())
        }
        Some(divergence) => {
            println!("Diverged at step {}:", divergence.step);
            println!("{}", divergence.report);
            bail!("engines diverged at step {}", divergence.step)
        }
    }
}

fn parity(content: &GameContent, left: &Path, right: &Path, tolerance: f64) -> Result<()> {
    let left_state = load_state(left, content)?.state;
    let right_state = load_state(right, content)?.state;
    let report = compare_states(&left_state, &right_state, tolerance);
    if report.is_clean() {
        println!("Snapshots match (tolerance {tolerance}).");
        return Ok(());
    }
    println!("{report}");
    bail!("{} divergences", report.divergences.len())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            steps,
            dt,
            seed,
            state_file,
            factories,
            content_dir,
            ore_per_sec,
            modifiers,
            print_every,
            event_level,
            metrics_every,
            no_metrics,
            save,
        } => {
            if dt.is_nan() || dt <= 0.0 {
                bail!("--dt must be positive, got {dt}");
            }
            let content = load_content(&content_dir)?;
            let state = initial_state(&content, seed, state_file.as_deref(), factories)?;
            let options = RunOptions {
                steps,
                dt,
                ore_per_sec,
                print_every,
                metrics_every,
                no_metrics,
                event_level: match event_level.as_str() {
                    "debug" => EventLevel::Debug,
                    _ => EventLevel::Normal,
                },
                save,
            };
            match modifiers {
                Modifiers::Neutral => run(NativeEngine::new(state, content), &options)?,
                Modifiers::Warehouse => run(
                    NativeEngine::with_hooks(
                        state,
                        content,
                        WarehouseBonusModifiers::default(),
                        NullFxSink,
                    ),
                    &options,
                )?,
            }
        }
        Commands::Verify {
            seed,
            factories,
            steps,
            dt,
            tolerance,
            content_dir,
        } => verify(load_content(&content_dir)?, seed, factories, steps, dt, tolerance)?,
        Commands::Parity {
            left,
            right,
            tolerance,
            content_dir,
        } => parity(&load_content(&content_dir)?, &left, &right, tolerance)?,
    }
    Ok(())
}
