//! Oracle Console - ask the board from a terminal
//!
//! Reads questions from stdin, one per line, and prints the planchette's
//! answer letter by letter as the oracle spells it.
//!
//! # Usage
//!
//! ```bash
//! oracle-console                      # Talk to Ollama on localhost:11434
//! oracle-console -m mistral --muted   # Another model, no sound cues
//! echo "Will it rain?" | oracle-console --ephemeral
//! ```
//!
//! Lines starting with `:` are commands: `:reset`, `:mute`, `:pick N`,
//! `:close`, `:quit`.
//!
//! # Environment Variables
//!
//! - `ORACLE_CONFIG`: Path to a config file
//! - `ORACLE_LOG_LEVEL`: Log level (default: warn)
//! - `ORACLE_HOST`, `ORACLE_PORT`, `ORACLE_MODEL`: Model server settings
//! - `RUST_LOG`: Fine-grained log filter (overrides the log level)

mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use oracle_core::config::OracleConfig;
use oracle_core::{
    default_config_path, load_config_from_path, BoardGeometry, BoardLayout, Clock, ConfigOverrides,
    FixedJitter, Jitter, JsonFileStore, LayoutHandle, LlmBackend, LogSoundPlayer, MemoryStore,
    OllamaBackend, Oracle, OracleServices, OracleStore, PersonaForge, SoundPlayer, SpiritMedium,
    SurfaceEvent, ThreadJitter,
};

/// Terminal front-end for the Mystifying Oracle
#[derive(Parser, Debug)]
#[command(name = "oracle-console")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short = 'c', long, env = "ORACLE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model server host
    #[arg(long)]
    host: Option<String>,

    /// Model server port
    #[arg(long)]
    port: Option<u16>,

    /// Model to consult
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Directory for cached personas and conversations
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Start with sound cues muted
    #[arg(long)]
    muted: bool,

    /// Disable pacing jitter
    #[arg(long)]
    steady: bool,

    /// Keep nothing between sessions
    #[arg(long)]
    ephemeral: bool,

    /// Board size the layout is measured at
    #[arg(long, value_name = "WxH", default_value = "800x600", value_parser = parse_board)]
    board: BoardGeometry,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "ORACLE_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(host) = &self.host {
            overrides = overrides.with_host(host.clone());
        }
        if let Some(port) = self.port {
            overrides = overrides.with_port(port);
        }
        if let Some(model) = &self.model {
            overrides = overrides.with_model(model.clone());
        }
        if let Some(dir) = &self.data_dir {
            overrides = overrides.with_data_dir(dir.clone());
        }
        if self.muted {
            overrides = overrides.with_muted(true);
        }
        if self.steady {
            overrides = overrides.with_steady(true);
        }
        overrides
    }
}

fn parse_board(value: &str) -> Result<BoardGeometry, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: f32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: f32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err("board size must be positive".to_string());
    }
    Ok(BoardGeometry::new(width, height))
}

/// Initialize logging (stderr, so answers on stdout stay clean)
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("oracle_console={level},oracle_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Virtual time is wall time since the console started
struct ElapsedClock {
    started: Instant,
}

impl Clock for ElapsedClock {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }
}

// =============================================================================
// Input
// =============================================================================

/// One line of user input
#[derive(Clone, Debug, PartialEq, Eq)]
enum Input {
    /// A question for the board
    Ask(String),
    /// A command mapped straight to an event
    Event(SurfaceEvent),
    /// Leave
    Quit,
    /// A `:command` we don't know
    Unknown(String),
    /// Blank line
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Input::Ask(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("reset"), None) => Input::Event(SurfaceEvent::Reset),
        (Some("mute"), None) => Input::Event(SurfaceEvent::ToggleMute),
        (Some("close"), None) => Input::Event(SurfaceEvent::ClosePicker),
        (Some("quit" | "q"), None) => Input::Quit,
        (Some("pick"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Event(SurfaceEvent::SelectPersona(n - 1)),
            _ => Input::Unknown(line.to_string()),
        },
        _ => Input::Unknown(line.to_string()),
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting oracle console");

    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    if args.ephemeral {
        config.storage.ephemeral = true;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        host = %config.backend.host,
        port = config.backend.port,
        model = %config.backend.model,
        "Configuration loaded"
    );

    if config.storage.ephemeral {
        run(config, &args, Arc::new(MemoryStore::new())).await
    } else {
        let root = config
            .storage
            .data_dir
            .clone()
            .or_else(JsonFileStore::default_root);
        let Some(root) = root else {
            bail!("No data directory available; pass --data-dir or --ephemeral");
        };
        info!(root = %root.display(), "Using persona cache");
        run(config, &args, Arc::new(JsonFileStore::new(root))).await
    }
}

async fn run<S: OracleStore + 'static>(
    config: OracleConfig,
    args: &Args,
    store: Arc<S>,
) -> Result<()> {
    let backend = Arc::new(
        OllamaBackend::from_settings(&config.backend).context("Failed to create backend")?,
    );
    if backend.health_check().await {
        match backend.has_model(&config.backend.model).await {
            Ok(true) => {}
            Ok(false) => warn!(model = %config.backend.model, "Model not found on server"),
            Err(e) => warn!("Could not list models: {:#}", e),
        }
    } else {
        warn!(
            host = %config.backend.host,
            port = config.backend.port,
            "Model server is not reachable; the spirits may stay silent"
        );
    }

    let mut medium = SpiritMedium::new(Arc::clone(&backend), config.backend.model.clone())
        .with_context_turns(config.oracle.context_turns);
    let mut forge = PersonaForge::new(backend, config.backend.model.clone());
    if let Some(temperature) = config.backend.temperature {
        medium = medium.with_temperature(temperature);
        forge = forge.with_temperature(temperature);
    }

    let sound = Arc::new(LogSoundPlayer::new());
    sound.set_muted(config.muted);

    let jitter: Arc<dyn Jitter> = if config.oracle.steady {
        Arc::new(FixedJitter::default())
    } else {
        Arc::new(ThreadJitter)
    };

    let layout = Arc::new(LayoutHandle::new(args.board.measure(&BoardLayout::default())));

    let started = Instant::now();
    let (tx, rx) = mpsc::channel(256);
    let renderer = tokio::spawn(render::run(rx, tokio::io::stdout()));

    let services = OracleServices {
        answers: Arc::new(medium),
        personas: Arc::new(forge),
        store,
        sound,
        layout,
        jitter,
        clock: Arc::new(ElapsedClock { started }),
    };
    let mut oracle = Oracle::new(services, config.oracle, config.pacing, tx);

    oracle.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let mut audio_unlocked = false;

    loop {
        if !input_open && oracle.next_deadline().is_none() {
            break;
        }

        let deadline = oracle.next_deadline();
        let wake = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(started + at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            line = lines.next_line(), if input_open => {
                oracle.advance_to(started.elapsed()).await;

                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        input_open = false;
                        continue;
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        input_open = false;
                        continue;
                    }
                };

                if !audio_unlocked {
                    audio_unlocked = true;
                    oracle.handle_event(SurfaceEvent::AudioUnlocked).await;
                }

                match parse_input(&line) {
                    Input::Ask(question) => {
                        oracle.handle_event(SurfaceEvent::QuestionEdited(question.clone())).await;
                        oracle.handle_event(SurfaceEvent::Submit(question)).await;
                        oracle.handle_event(SurfaceEvent::QuestionEdited(String::new())).await;
                    }
                    Input::Event(event) => oracle.handle_event(event).await,
                    Input::Quit => break,
                    Input::Unknown(command) => warn!(%command, "Unknown command"),
                    Input::Empty => {}
                }
            }
            () = wake => {
                oracle.advance_to(started.elapsed()).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Oracle console shutting down");
    drop(oracle);
    match renderer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Output failed: {}", e),
        Err(e) => warn!("Renderer task failed: {}", e),
    }

    Ok(())
}
