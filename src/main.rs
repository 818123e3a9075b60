//! MIDI Page Turner - sends page-turn keystrokes from MIDI input

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi_page_turner::cli::{self, ReplCommand};
use midi_page_turner::config::{AppConfig, ConfigWatcher};
use midi_page_turner::engine::{
    EngineActor, EngineActorHandle, Observation, SlotId, TriggerEngine, OBSERVATION_CAPACITY,
};
use midi_page_turner::inject::injector_for;
use midi_page_turner::input::{self, MidiInputDriver};
use midi_page_turner::paths::AppPaths;
use midi_page_turner::settings::{
    restore_bindings, BindingSnapshot, PersistenceActor, SettingsStore, SledSettingsStore,
};

/// MIDI Page Turner - turn pages with a MIDI pedal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the detected app directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Start learning a trigger right away (primary or secondary)
    #[arg(long)]
    learn: Option<SlotId>,

    /// Run without the interactive console
    #[arg(long)]
    no_repl: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut paths = AppPaths::detect();
    if let Some(config) = &args.config {
        paths = paths.with_config(config);
    }
    paths.ensure_directories()?;

    let _log_guard = init_logging(&args.log_level, &paths.logs_dir)?;

    info!("Starting MIDI Page Turner v{}...", env!("CARGO_PKG_VERSION"));
    info!("Base directory: {}", paths.base_dir().display());

    let config_path = paths.config.to_string_lossy().into_owned();

    if args.list_ports {
        let pattern = AppConfig::load(&config_path)
            .await
            .map(|c| c.midi.input_port)
            .unwrap_or_default();
        input::print_ports(&pattern);
        return Ok(());
    }

    let (config_watcher, config) = ConfigWatcher::new(config_path).await?;
    info!("Configuration loaded with hot-reload enabled");

    let store: Arc<dyn SettingsStore> = Arc::new(
        SledSettingsStore::open(paths.settings_db_path()).context("Failed to open settings database")?,
    );
    let restored = restore_bindings(store.as_ref());
    let persistence = PersistenceActor::spawn(store, config.persistence.debounce_ms);

    let mut trigger_engine = TriggerEngine::new(restored.bindings, Instant::now());
    let mut presets_changed = false;
    for (slot, preset) in config.triggers.presets() {
        presets_changed |= trigger_engine.select_keys(slot, preset);
    }
    if presets_changed {
        persistence.save(BindingSnapshot::from_bindings(trigger_engine.bindings()));
    }

    let injector = injector_for(config.injection.backend);
    info!("Key injection backend: {}", injector.name());

    let (observation_tx, observation_rx) = broadcast::channel(OBSERVATION_CAPACITY);
    let engine = EngineActor::spawn(trigger_engine, persistence.clone(), injector, observation_tx);

    if let Some(e) = restored.reset {
        engine.announce(Observation::SettingsReset { reason: e.to_string() });
    }

    let mut midi = MidiInputDriver::new(config.midi.input_port.clone());
    let midi_rx = midi
        .take_event_receiver()
        .context("MIDI event receiver already taken")?;
    if let Err(e) = midi.connect() {
        warn!("MIDI input unavailable: {:#}", e);
        warn!("Use 'ports' to list inputs and set midi.input_port in {}", paths.config.display());
    }

    if let Some(slot) = args.learn {
        engine.begin_learn(slot);
    }

    let (repl_tx, repl_rx) = mpsc::unbounded_channel();
    if !args.no_repl {
        // A plain thread: a blocking task would hold the runtime open on exit
        std::thread::Builder::new()
            .name("console".to_string())
            .spawn(move || {
                if let Err(e) = cli::run_repl(repl_tx) {
                    warn!("Console stopped: {}", e);
                }
            })
            .context("Failed to start console")?;
        cli::print_help();
    }

    run_app(
        &engine,
        &mut midi,
        config,
        config_watcher,
        midi_rx,
        observation_rx,
        repl_rx,
        shutdown_signal(),
    )
    .await;

    info!("Shutting down...");
    midi.disconnect();

    // Drain pending engine work so its last snapshot reaches persistence
    let _ = engine.status().await;
    engine.shutdown();

    if let Err(e) = persistence.flush().await {
        warn!("Failed to flush settings: {:#}", e);
    }
    persistence.shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;

    info!("MIDI Page Turner shutdown complete");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_app(
    engine: &EngineActorHandle,
    midi: &mut MidiInputDriver,
    mut config: AppConfig,
    mut config_watcher: ConfigWatcher,
    mut midi_rx: mpsc::Receiver<input::MidiEvent>,
    mut observation_rx: broadcast::Receiver<Observation>,
    mut repl_rx: mpsc::UnboundedReceiver<ReplCommand>,
    shutdown: impl std::future::Future<Output = ()>,
) {
    info!("Ready, waiting for MIDI input");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = midi_rx.recv() => {
                engine.feed(event.data, event.at);
            }

            result = observation_rx.recv() => match result {
                Ok(observation) => log_observation(&observation),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Skipped {} observations", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            Some(new_config) = config_watcher.next_config() => {
                apply_config(engine, midi, &config, &new_config);
                config = new_config;
            }

            Some(command) = repl_rx.recv() => {
                if !handle_command(engine, &config, command).await {
                    break;
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }
}

/// Apply a reloaded config; failures are logged and the old settings kept
fn apply_config(engine: &EngineActorHandle, midi: &mut MidiInputDriver, old: &AppConfig, new: &AppConfig) {
    info!("📝 Configuration changed, applying...");

    for (slot, preset) in new.triggers.presets() {
        engine.select_keys(slot, preset);
    }

    if new.midi.input_port != old.midi.input_port {
        info!("MIDI input changed to '{}', reconnecting", new.midi.input_port);
        midi.set_port_pattern(new.midi.input_port.clone());
        if let Err(e) = midi.connect() {
            warn!("MIDI input unavailable: {:#}", e);
        }
    }

    if new.injection.backend != old.injection.backend {
        warn!("Injection backend change to '{}' takes effect after restart", new.injection.backend);
    }
    if new.persistence.debounce_ms != old.persistence.debounce_ms {
        warn!("Persistence debounce change takes effect after restart");
    }
}

/// Handle one console command, returning false to quit
async fn handle_command(engine: &EngineActorHandle, config: &AppConfig, command: ReplCommand) -> bool {
    debug!(?command, "Console command");
    match command {
        ReplCommand::Learn(slot) => engine.begin_learn(slot),
        ReplCommand::Cancel => engine.cancel_learn(),
        ReplCommand::Keys(slot, preset) => engine.select_keys(slot, preset),
        ReplCommand::Status => match engine.status().await {
            Some(status) => cli::print_status(&status),
            None => warn!("Engine is not running"),
        },
        ReplCommand::Ports => input::print_ports(&config.midi.input_port),
        ReplCommand::Help => cli::print_help(),
        ReplCommand::Quit => return false,
    }
    true
}

fn log_observation(observation: &Observation) {
    match observation {
        Observation::SlotValue { .. } => debug!("{}", observation),
        Observation::Suppressed { .. } => debug!("{}", observation),
        Observation::SettingsReset { .. } => warn!("{}", observation),
        Observation::Fired { .. } => info!("📄 {}", observation),
        _ => info!("{}", observation),
    }
}

fn init_logging(level: &str, logs_dir: &Path) -> Result<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::daily(logs_dir, "page-turner.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
