use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use fasker_core::{ChatSession, Config, CredentialSource, GeminiClient, Overrides, Sender};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod markdown;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui, TICK_RATE};

#[derive(Parser)]
#[command(name = "fasker")]
#[command(about = "Terminal chat client for the Gemini generative language API")]
#[command(version)]
struct Cli {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model to query
    #[arg(short, long, env = "FASKER_MODEL")]
    model: Option<String>,

    /// Base URL of the generative language API
    #[arg(long, env = "FASKER_ENDPOINT")]
    endpoint: Option<String>,

    /// Log file (defaults to the user cache directory)
    #[arg(long, env = "FASKER_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single prompt and print the reply
    Ask {
        /// Your question
        prompt: String,
    },
    /// Save settings to the config file
    Config {
        /// Gemini API key to store
        #[arg(long)]
        api_key: Option<String>,

        /// Default model
        #[arg(short, long)]
        model: Option<String>,

        /// Base URL of the generative language API
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env values must be in the environment before clap reads it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_path = init_logging(cli.log_file.clone())?;
    info!(log = %log_path.display(), "fasker starting");

    if let Some(Commands::Config { api_key, model, endpoint }) = &cli.command {
        return save_config(Overrides {
            api_key: api_key.clone(),
            model: model.clone(),
            endpoint: endpoint.clone(),
        });
    }

    let config = Config::load().unwrap_or_else(|err| {
        warn!(error = %err, "could not read config file, using defaults");
        Config::default()
    });
    let settings = config.resolve(Overrides {
        api_key: cli.api_key,
        model: cli.model,
        endpoint: cli.endpoint,
    });
    info!(
        credential = ?settings.credential_source,
        model = %settings.model,
        endpoint = %settings.endpoint,
        "configuration resolved"
    );

    let client = GeminiClient::new(&settings.endpoint, &settings.model);
    let session = ChatSession::new(Arc::new(client), settings.credential);

    match cli.command {
        Some(Commands::Ask { prompt }) => ask_once(session, &prompt).await,
        _ => run_tui(session, settings.credential_source).await,
    }
}

fn init_logging(log_file: Option<PathBuf>) -> Result<PathBuf> {
    let path = match log_file {
        Some(path) => path,
        None => dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("fasker")
            .join("fasker.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create log directory {}", parent.display()))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    // The terminal belongs to the UI, so logs only go to the file
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}

fn save_config(changes: Overrides) -> Result<()> {
    let path = Config::get_config_path()?;
    let mut config = Config::load_from(&path)
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    let key_changed = changes.api_key.is_some();

    config.update(changes);
    config.save()?;
    info!(api_key_changed = key_changed, "config file updated");

    println!("{} {}", "Saved settings to".green(), path.display());
    Ok(())
}

async fn ask_once(mut session: ChatSession, prompt: &str) -> Result<()> {
    let before = session.state().messages().len();
    session.submit(prompt).await;

    let messages = session.state().messages();
    if messages.len() == before {
        println!("{}", "Nothing to send: the prompt is empty.".yellow());
        return Ok(());
    }

    for message in &messages[before..] {
        if message.sender == Sender::Bot {
            println!("{}", "FaskerAI:".bold().yellow());
            println!("{}", message.text);
        }
    }

    Ok(())
}

async fn run_tui(session: ChatSession, credential_source: CredentialSource) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(session, credential_source);
    let mut events = EventHandler::new(TICK_RATE);

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("fasker exiting");
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        app.poll_request().await;
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
