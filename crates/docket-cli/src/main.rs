//! `docket`: chat and lifecycle viewer for EDI CSV exports.
//!
//! # Usage
//!
//! ```
//! docket --url http://127.0.0.1:8000
//! docket --config ~/.config/docket/config.toml --log-file docket.log
//! docket lifecycle PO-1001
//! docket ask "which POs are missing an invoice?" --file edi.csv
//! ```

mod app;
mod client;
mod session;
mod ui;
mod viewer;

use std::{
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "docket", about = "Chat and lifecycle viewer for EDI CSV exports")]
struct Args {
  /// Path to a TOML config file (url, timeout_secs).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the docket backend (default: http://127.0.0.1:8000).
  #[arg(long, env = "DOCKET_URL")]
  url: Option<String>,

  /// Append logs to this file. Nothing is logged otherwise.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List purchase orders in the current dataset.
  Pos,
  /// Show the lifecycle of one purchase order.
  Lifecycle { po_id: String },
  /// Upload a CSV, replacing the current dataset.
  Upload { file: PathBuf },
  /// Ask a question, optionally uploading a CSV first.
  Ask {
    question: String,
    #[arg(long, value_name = "FILE")]
    file:     Option<PathBuf>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  timeout_secs: Option<u64>,
}

fn api_config(args: &Args, file_cfg: ConfigFile) -> ApiConfig {
  let defaults = ApiConfig::default();
  // CLI flags override config file, which overrides defaults.
  ApiConfig {
    base_url: args
      .url
      .clone()
      .or_else(|| (!file_cfg.url.is_empty()).then_some(file_cfg.url))
      .unwrap_or(defaults.base_url),
    timeout:  file_cfg
      .timeout_secs
      .map(Duration::from_secs)
      .unwrap_or(defaults.timeout),
  }
}

fn init_logging(path: &Path) -> Result<()> {
  let file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_ansi(false)
    .with_writer(Mutex::new(file))
    .init();
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(path) = &args.log_file {
    init_logging(path)?;
  }

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(api_config(&args, file_cfg))?;
  tracing::info!(url = %client.base_url(), "using backend");

  match args.command {
    Some(command) => run_command(&client, command).await,
    None => run_tui(client).await,
  }
}

// ─── One-shot commands ────────────────────────────────────────────────────────

fn print_json(value: &impl Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[derive(Serialize)]
struct Answer {
  question: String,
  answer:   String,
}

async fn run_command(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Pos => print_json(&client.list_purchase_orders().await?),
    Command::Lifecycle { po_id } => print_json(&client.get_lifecycle(&po_id).await?),
    Command::Upload { file } => print_json(&client.upload_csv(&file).await?),
    Command::Ask { question, file } => {
      if let Some(file) = file {
        client.upload_csv(&file).await?;
      }
      let answer = client.ask(&question).await?;
      print_json(&Answer { question, answer })
    }
  }
}

// ─── TUI ──────────────────────────────────────────────────────────────────────

async fn run_tui(client: ApiClient) -> Result<()> {
  let mut app = App::new(client);
  app.refresh_enablement();

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    app.drain_backend();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key)
    {
      break;
    }
  }

  Ok(())
}
