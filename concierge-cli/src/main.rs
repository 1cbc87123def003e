//! CLI entry point for the Time Travel Concierge

mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use concierge_client::{Concierge, HttpChatEndpoint};
use concierge_core::config::{Config, ConfigLoader};
use concierge_core::logging::{init_logging, LogOutput};
use concierge_core::session::Role;
use concierge_server::{AppState, OpenAiCompletion, PersonaPicker};
use console::style;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Time Travel Concierge: ask about history, the future, or imaginary journeys")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file interactively
    Onboard,
    /// Run the chat endpoint server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Open the interactive chat
    Chat {
        /// Chat endpoint base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Ask a single question and print the conversation
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Chat endpoint base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    if let Commands::Onboard = cli.command {
        return run_onboard(&config_loader);
    }

    let config = config_loader.load()?;
    let output = match cli.command {
        Commands::Chat { .. } => LogOutput::FileOnly,
        _ => LogOutput::Console,
    };
    let _log_guard = init_logging(&config.logging, output);

    match cli.command {
        Commands::Onboard => {}
        Commands::Serve { port } => {
            info!("Starting chat server");
            run_serve(&config, port).await?;
        }
        Commands::Chat { base_url } => {
            info!("Starting TUI");
            let base_url = base_url.unwrap_or_else(|| config.client.base_url.clone());
            tui::run_tui(Concierge::new(Arc::new(HttpChatEndpoint::new(base_url)))).await?;
        }
        Commands::Ask { message, base_url } => {
            let base_url = base_url.unwrap_or_else(|| config.client.base_url.clone());
            run_ask(&base_url, &message).await?;
        }
        Commands::Status => {
            run_status(&config_loader, &config);
        }
    }

    Ok(())
}

/// Run the onboard prompts and write config.json
fn run_onboard(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to the Time Travel Concierge!").bold().cyan());
    println!("Let's set up your configuration.\n");

    let config_path = loader.config_path();
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Onboard cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();

    config.client.base_url = Input::new()
        .with_prompt("Chat endpoint base URL")
        .default(config.client.base_url.clone())
        .interact_text()?;

    let host_server = Confirm::new()
        .with_prompt("Will you also run the chat server on this machine?")
        .default(true)
        .interact()?;
    if host_server {
        config.server.api_key = Input::new()
            .with_prompt("OpenAI API key (leave empty to use OPENAI_API_KEY)")
            .allow_empty(true)
            .interact_text()?;
        config.server.model = Input::new()
            .with_prompt("Model")
            .default(config.server.model.clone())
            .interact_text()?;
        config.server.port = Input::new()
            .with_prompt("Port")
            .default(config.server.port)
            .interact_text()?;
    }

    concierge_core::config::validate::validate_config(&config)?;
    loader.save(&config)?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nYou can now run:");
    if host_server {
        println!("  {} - Start the chat server", style("concierge serve").cyan());
    }
    println!("  {} - Open the chat", style("concierge chat").cyan());
    println!(
        "  {} - Ask one question",
        style("concierge ask --message 'Take me to Ancient Rome'").cyan()
    );

    Ok(())
}

/// Run the chat endpoint server until Ctrl+C
async fn run_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    if config.server.api_key.trim().is_empty() {
        warn!("No API key configured; every chat request will fail until OPENAI_API_KEY is set");
    }

    let backend = Arc::new(OpenAiCompletion::from_config(&config.server));
    let state = AppState::new(backend, PersonaPicker::new(config.server.funny_probability));

    concierge_server::run_server(state, &config.server.host, port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
        }
    })
    .await
}

/// Send one message in a fresh session and print the thread
async fn run_ask(base_url: &str, message: &str) -> Result<()> {
    if message.trim().is_empty() {
        println!("Nothing to send.");
        println!("Example: concierge ask --message 'Take me to Ancient Rome'");
        return Ok(());
    }

    let mut concierge = Concierge::new(Arc::new(HttpChatEndpoint::new(base_url)));
    let session_id = concierge.create_session();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(tui::PENDING_TEXT);
    spinner.enable_steady_tick(Duration::from_millis(120));

    concierge.send_message(&session_id, message).await;
    spinner.finish_and_clear();

    for msg in concierge.store().displayed() {
        match msg.role {
            Role::User => println!("{} {}", style("you:").bold().green(), msg.text),
            Role::Assistant => println!("{} {}", style("concierge:").bold().yellow(), msg.text),
        }
    }

    Ok(())
}

/// Show effective configuration
fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("Time Travel Concierge Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Log directory: {}", config.logging.dir);
    println!();

    println!("{}", style("Client:").bold());
    println!("  Chat endpoint: {}/chat", config.client.base_url.trim_end_matches('/'));
    println!();

    println!("{}", style("Server:").bold());
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("  Model: {}", config.server.model);
    println!("  Max tokens: {}", config.server.max_tokens);
    println!("  Witty persona odds: {:.0}%", config.server.funny_probability * 100.0);
    let key_status = if config.server.api_key.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", key_status);
}
