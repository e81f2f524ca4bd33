//! PulseLink command-line session.
//!
//! Runs one workout against a simulated companion: activates the session,
//! fetches current metrics as the dashboard appears, starts the chosen
//! workout, streams metrics for a while, then stops. Every dashboard change
//! is logged.
//!
//! # Usage
//!
//! ```bash
//! # Ten-second cycling session with a fixed metric seed
//! pulselink --workout Cycling --duration-secs 10 --seed 7
//!
//! # Watch a command time out
//! pulselink --silent-companion --command-timeout-ms 2000
//! ```

use std::time::Duration;

use chrono::{Local, Utc};
use clap::Parser;
use pulselink_app::{ChannelHandle, Dashboard, HealthStatus, Runtime, SystemEnv, WorkoutPicker};
use pulselink_core::{
    ChannelConfig, ChannelSnapshot, DEFAULT_TICK_INTERVAL, HealthProfile, MemoryHealthStore,
    SessionState,
};
use pulselink_harness::{DEFAULT_SEED, SimCompanion, SimCompanionConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Interval between simulated metric pushes; one push per second of workout.
const PUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Every this many pushes the phone also asks for a snapshot.
const SNAPSHOT_EVERY: u64 = 5;

/// PulseLink companion sync session
#[derive(Parser, Debug)]
#[command(name = "pulselink")]
#[command(about = "Run a workout session against a simulated companion")]
#[command(version)]
struct Args {
    /// Workout type to start
    #[arg(short, long, default_value = "Running")]
    workout: String,

    /// How long to stream metrics before stopping
    #[arg(short, long, default_value = "10")]
    duration_secs: u64,

    /// Seed for simulated metrics
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Reply timeout for commands, in milliseconds
    #[arg(long, default_value = "10000")]
    command_timeout_ms: u64,

    /// Simulate a platform without companion support
    #[arg(long)]
    unsupported: bool,

    /// Companion swallows commands without replying
    #[arg(long)]
    silent_companion: bool,

    /// Height in metres to save to the health profile
    #[arg(long)]
    height: Option<f64>,

    /// Body mass in kilograms to save to the health profile
    #[arg(long)]
    weight: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut picker = WorkoutPicker::new();
    picker.select(&args.workout)?;

    let health = health_status(&args);

    let companion = SimCompanion::new(SimCompanionConfig {
        supported: !args.unsupported,
        drop_replies: args.silent_companion,
        seed: args.seed,
        ..SimCompanionConfig::default()
    });
    let config = ChannelConfig {
        command_timeout: Duration::from_millis(args.command_timeout_ms),
        tick_interval: DEFAULT_TICK_INTERVAL,
    };

    let (runtime, handle) = Runtime::new(companion.transport(), SystemEnv::new(), config);
    let runtime_task = tokio::spawn(runtime.run());
    let dashboard_task = tokio::spawn(log_dashboards(handle.clone(), health, picker.selected()));

    tracing::info!(workout = picker.selected(), "PulseLink session starting");
    handle.activate();

    if wait_for_session(&handle).await {
        if let Err(e) = Dashboard::shown(&handle).wait().await {
            tracing::warn!(error = %e, "initial metrics unavailable");
        }
        run_workout(&handle, &companion, picker.selected(), args.duration_secs).await;
    } else {
        tracing::warn!("companion session never became active");
    }

    handle.shutdown();
    runtime_task.await?;
    dashboard_task.abort();

    tracing::info!(
        activations = companion.activations(),
        commands = companion.sends(),
        receipts = companion.receipts(),
        wire_bytes = companion.wire_bytes(),
        "PulseLink session finished"
    );
    Ok(())
}

/// Request health permissions, save any profile values given on the command
/// line and log the resulting profile.
fn health_status(args: &Args) -> HealthStatus {
    let mut profile = HealthProfile::new(MemoryHealthStore::new());

    if let Err(e) = profile.request_permissions() {
        tracing::warn!(error = %e, "health permissions not granted");
        return HealthStatus::from_profile(&profile);
    }

    if args.height.is_some() || args.weight.is_some() {
        match profile.save_profile(args.height, args.weight, Utc::now()) {
            Ok(report) if report.is_complete() => {
                tracing::info!(saved = report.saved.len(), "health profile saved");
            },
            Ok(report) => {
                tracing::warn!(failed = report.failed.len(), "health profile partially saved");
            },
            Err(e) => tracing::error!(error = %e, "failed to save health profile"),
        }
    }

    let read = profile.read_profile(Local::now().date_naive());
    tracing::info!(
        height_m = ?read.height_m,
        body_mass_kg = ?read.body_mass_kg,
        age = ?read.age_years,
        "health profile"
    );
    HealthStatus::from_profile(&profile)
}

/// Wait until activation completes. Returns `false` if it never started.
async fn wait_for_session(handle: &ChannelHandle) -> bool {
    let mut updates = handle.subscribe();
    let active = tokio::time::timeout(
        Duration::from_secs(2),
        updates.wait_for(|snapshot| snapshot.session == SessionState::Active),
    )
    .await;

    matches!(active, Ok(Ok(_)))
}

async fn run_workout(
    handle: &ChannelHandle,
    companion: &SimCompanion,
    workout: &str,
    duration_secs: u64,
) {
    if let Err(e) = handle.start_workout(workout).wait().await {
        tracing::error!(error = %e, transient = e.is_transient(), "could not start workout");
        return;
    }

    let mut pushes = tokio::time::interval(PUSH_INTERVAL);
    pushes.tick().await;

    for count in 1..=duration_secs {
        pushes.tick().await;
        companion.push_metrics(true);

        if count % SNAPSHOT_EVERY == 0 {
            let ticket = handle.request_snapshot();
            tokio::spawn(async move {
                if let Err(e) = ticket.wait().await {
                    tracing::warn!(error = %e, "snapshot request failed");
                }
            });
        }
    }

    match handle.stop_workout().wait().await {
        Ok(()) => tracing::info!("workout stopped"),
        Err(e) => tracing::error!(error = %e, "could not stop workout"),
    }
}

/// Log a dashboard line for every published snapshot.
async fn log_dashboards(handle: ChannelHandle, health: HealthStatus, selected: &'static str) {
    let mut updates = handle.subscribe();
    let mut last: Option<ChannelSnapshot> = None;

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        if last.as_ref() == Some(&snapshot) {
            continue;
        }
        tracing::info!("{}", Dashboard::from_snapshot(&snapshot, health, selected));
        last = Some(snapshot);
    }
}
