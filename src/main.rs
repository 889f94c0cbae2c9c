//! fluidctl — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  CdevLines / SimLines   SystemClock   LogTelemetrySink         │
//! │  (LinePort)             (Clock)       (TelemetrySink)          │
//! │  HttpProbe              HttpRegistry                           │
//! │  (ReachabilityProbe)    (DeviceRegistry)                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │ LocalExecutor (main thread)                            │    │
//! │  │  ActuationSequencer ◀── Signal ◀── readiness thread    │    │
//! │  │  IndicatorController flashers (green, yellow, red)     │    │
//! │  │  Watchdog reporter ◀── Channel ◀── prober thread       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use edge_executor::LocalExecutor;
use futures_lite::future;
use log::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use fluidctl::adapters::http::{self, HttpProbe, HttpRegistry};
use fluidctl::adapters::log_sink::LogTelemetrySink;
use fluidctl::adapters::thread::spawn_named;
use fluidctl::adapters::time::SystemClock;
use fluidctl::app::ports::LinePort;
use fluidctl::app::shutdown::Shutdown;
use fluidctl::config::{SequencerConfig, Settings};
use fluidctl::error::ReadinessError;
use fluidctl::indicators::{Color, IndicatorController};
use fluidctl::lines::{LineConfig, LineRoles};
use fluidctl::readiness::{ReadinessGate, ReadinessSignal};
use fluidctl::sequencer::ActuationSequencer;
use fluidctl::watchdog::{self, ConnectivityChannel};

/// Tasks on the main executor: three flashers, the reporter and the
/// sequencer, with headroom.
const EXECUTOR_SLOTS: usize = 8;

const PROBER_STACK_KB: usize = 256;
const GATE_STACK_KB: usize = 256;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

#[cfg(feature = "cdev")]
fn line_port() -> fluidctl::adapters::cdev::CdevLines {
    fluidctl::adapters::cdev::CdevLines::default()
}

#[cfg(not(feature = "cdev"))]
fn line_port() -> fluidctl::adapters::sim::SimLines {
    warn!("Built without the cdev backend; driving simulated lines");
    fluidctl::adapters::sim::SimLines::new()
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Settings and logging ───────────────────────────────
    let settings = Settings::from_env();
    init_logging(settings.verbose);
    info!("fluidctl v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Line configuration ─────────────────────────────────
    let line_config = LineConfig::load(&settings.line_config_file)
        .with_context(|| format!("loading line configuration {}", settings.line_config_file))?;
    if settings.verbose {
        match serde_json::to_string_pretty(&line_config) {
            Ok(pretty) => debug!("Line configuration:\n{pretty}"),
            Err(e) => warn!("Cannot render line configuration: {e}"),
        }
    }
    let roles = LineRoles::resolve(&line_config, &settings.roles).context("resolving line roles")?;
    let config = roles.circuit.effective(SequencerConfig::from_env());
    roles.log_summary(&config);

    // ── 3. Network adapters ───────────────────────────────────
    let client = http::client().context("building HTTP client")?;
    let reachability = HttpProbe::new(client.clone(), settings.reachability_url.as_str());
    let companion = HttpProbe::new(client.clone(), settings.companion_endpoint.as_str());
    let registry = HttpRegistry::new(client, settings.registry_url.as_str());

    // ── 4. Watchdog prober and readiness threads ──────────────
    let shutdown = Shutdown::new();
    let channel: Arc<ConnectivityChannel> = Arc::new(ConnectivityChannel::new());
    {
        let channel = Arc::clone(&channel);
        let shutdown = shutdown.clone();
        spawn_named("conn-probe", PROBER_STACK_KB, move || {
            let clock = SystemClock::new();
            future::block_on(watchdog::run_prober(&reachability, &clock, &channel, &shutdown));
        })
        .context("spawning connectivity prober")?;
    }

    let ready: Arc<ReadinessSignal> = Arc::new(ReadinessSignal::new());
    {
        let ready = Arc::clone(&ready);
        let shutdown = shutdown.clone();
        let device_name = settings.device_name.clone();
        spawn_named("readiness", GATE_STACK_KB, move || {
            let clock = SystemClock::new();
            let gate = ReadinessGate::new(&registry, &companion, &device_name);
            future::block_on(gate.publish(&clock, &shutdown, &ready));
        })
        .context("spawning readiness gate")?;
    }

    // ── 5. Executor: sequencer, flashers, reporter ────────────
    let port = line_port();
    let outcome = run(&port, &roles, config, &ready, &channel, &shutdown);

    if let Err(ReadinessError::Exhausted { attempts }) = outcome {
        error!("Environment not ready after {attempts} attempts, exiting");
        shutdown.trigger();
        std::process::exit(0);
    }
    outcome.context("running sequencer")
}

fn run<P: LinePort>(
    port: &P,
    roles: &LineRoles,
    config: SequencerConfig,
    ready: &ReadinessSignal,
    channel: &ConnectivityChannel,
    shutdown: &Shutdown,
) -> Result<(), ReadinessError> {
    let clock = SystemClock::new();
    let indicators = IndicatorController::new(port, roles.indicators.clone());
    let executor: LocalExecutor<'_, EXECUTOR_SLOTS> = LocalExecutor::new();

    for color in Color::ALL {
        executor
            .spawn(indicators.run_flasher(color, &clock, shutdown))
            .detach();
    }
    executor
        .spawn(watchdog::run_reporter(channel, &indicators, shutdown))
        .detach();

    info!("Executor started ({} slots)", EXECUTOR_SLOTS);

    future::block_on(executor.run(async {
        ready.wait().await?;
        let mut sequencer = ActuationSequencer::new(
            port,
            &clock,
            &indicators,
            LogTelemetrySink::new(),
            roles.circuit.clone(),
            config,
        );
        sequencer.run(shutdown).await;
        Ok(())
    }))
}
