mod backend;
mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use host::weather::{self, OpenMeteoGateway, PoemWriter};
use host::{NotificationChannel, SamplingClient, ToolExecutor, ToolServer};
use mcp::{ClientCapabilities, Implementation, InitializeParams};
use runtime::{ActiveTurns, Driver, LocalToolHost, ModelSampler, Orchestrator, ToolHost};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use backend::ConfiguredBackend;
use config::{Config, DEFAULT_CONFIG_FILE};
use error::Result;

const DEFAULT_PROMPT: &str =
    "Check the weather in Thessaloniki right now and show the creative response!";

type Bot = Orchestrator<ConfiguredBackend, LocalToolHost>;

#[derive(Parser)]
#[command(name = "weatherbot")]
#[command(about = "Ask a model about the weather through an MCP tool host", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single request and exit
    Ask {
        /// What to ask
        prompt: Option<String>,
    },
    /// Start an interactive chat session
    Chat,
    /// List the tools the host offers
    Tools,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env();
    config.validate()?;
    let bot = assemble(&config)?;

    match cli.command {
        Some(Commands::Ask { prompt }) => {
            cmd_ask(&bot, prompt.as_deref().unwrap_or(DEFAULT_PROMPT)).await
        }
        Some(Commands::Chat) => cmd_chat(&bot, &config).await,
        Some(Commands::Tools) => {
            cmd_tools(&bot);
            Ok(())
        }
        None => cmd_ask(&bot, DEFAULT_PROMPT).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_writer(io::stderr)
                .with_filter(filter),
        )
        .init();
}

/// Wire the model, the weather host and the Turn machinery together.
fn assemble(config: &Config) -> Result<Bot> {
    let backend = Arc::new(ConfiguredBackend::from_config(config)?);
    tracing::info!(backend = %backend, "model backend ready");

    let channel = NotificationChannel::new();
    let turns = ActiveTurns::default();
    let sampler: Arc<dyn SamplingClient> =
        Arc::new(ModelSampler::new(backend.clone(), turns.clone()));

    let gateway = OpenMeteoGateway::new(
        &config.weather.base_url,
        Duration::from_secs(config.weather.timeout_secs),
    )?;
    let poem = config
        .weather
        .poem
        .then(|| PoemWriter::new(config.weather.poem_max_tokens));
    let registry = weather::registry(Arc::new(gateway), poem)?;
    let server = Arc::new(ToolServer::new(
        Implementation::new("weather-server", env!("CARGO_PKG_VERSION")),
        ToolExecutor::new(registry),
    ));

    let capabilities = if config.client.sampling {
        ClientCapabilities::with_sampling()
    } else {
        ClientCapabilities::default()
    };
    let init = InitializeParams::new(
        Implementation::new("weatherbot", env!("CARGO_PKG_VERSION")),
        capabilities,
    );
    let session = server
        .connect(init, Some(sampler), Arc::new(channel.clone()))
        .with_sampling_timeout(Duration::from_secs(config.weather.sampling_timeout_secs));

    let driver = Driver::new(backend, LocalToolHost::new(session), config.driver())?;
    Ok(Orchestrator::new(driver, channel, turns))
}

async fn cmd_ask(bot: &Bot, prompt: &str) -> Result<()> {
    println!("> {prompt}\n");
    let answer = bot.handle(prompt).await?;
    println!("{answer}");
    Ok(())
}

async fn cmd_chat(bot: &Bot, config: &Config) -> Result<()> {
    println!("weatherbot v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {}", config.model());
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        // A failed Turn ends that request, not the session.
        match bot.handle(input).await {
            Ok(response) => println!("\n{response}\n"),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    println!("\nSession ended.");
    Ok(())
}

fn cmd_tools(bot: &Bot) {
    for spec in bot.driver().tools().specs() {
        println!("{}", spec.name);
        if !spec.description.is_empty() {
            println!("    {}", spec.description);
        }
    }
}
