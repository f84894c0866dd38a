use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use concierge::agents::RoutingPolicy;
use concierge::config::Config;
use concierge::llm::ScriptedGenerator;
use concierge::runner::TurnRunner;

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("concierge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("concierge.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Ask { query, session, json } => handle_ask_command(query, session, *json, config).await,
        Commands::Chat { session } => handle_chat_command(session, config).await,
        Commands::Route { query } => handle_route_command(query, config),
        Commands::Tools => handle_tools_command(config),
    }
}

async fn handle_ask_command(query: &str, session: &str, json: bool, config: &Config) -> Result<()> {
    info!("Ask: session={} query={:?}", session, query);
    let runner = TurnRunner::from_config(config).context("Failed to start runner")?;

    match runner.handle(session, query).await {
        Ok(answer) if json => println!("{}", serde_json::json!({ "answer": answer })),
        Ok(answer) => println!("{}", answer),
        Err(e) if json => {
            println!("{}", serde_json::to_string(&e.to_body())?);
            std::process::exit(if e.status() == 400 { 2 } else { 1 });
        }
        Err(e) => return Err(e).context("Turn failed"),
    }
    Ok(())
}

async fn handle_chat_command(session: &str, config: &Config) -> Result<()> {
    info!("Chat: session={}", session);
    let runner = TurnRunner::from_config(config).context("Failed to start runner")?;

    println!("{} session {} (empty line or Ctrl-D to quit)", "Chat:".green(), session.cyan());
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} ", ">".bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            break;
        }

        match runner.handle(session, &line).await {
            Ok(answer) => println!("{}\n", answer),
            Err(e) => eprintln!("{} [{}] {}\n", "Error:".red(), e.kind(), e),
        }
    }
    Ok(())
}

fn handle_route_command(query: &str, config: &Config) -> Result<()> {
    let classification = RoutingPolicy::new(config.router.default_route).classify(query);
    match classification.matched {
        Some(term) => println!("{} (matched {:?})", classification.route.to_string().green(), term),
        None => println!("{} (default route)", classification.route.to_string().yellow()),
    }
    Ok(())
}

fn handle_tools_command(config: &Config) -> Result<()> {
    // Listing needs no credential
    let runner = TurnRunner::with_generator(config, std::sync::Arc::new(ScriptedGenerator::default()))
        .context("Failed to assemble specialists")?;

    for specialist in runner.router().specialists() {
        println!("{} ({})", specialist.route().label().green(), specialist.route().tool_name());
        for def in specialist.tools().definitions() {
            println!("  {} - {}", def.name.cyan(), def.description);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
