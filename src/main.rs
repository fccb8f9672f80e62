//! Squeaker - incremental Smalltalk image builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use squeaker::cli::{commands, Cli, Commands};
use squeaker::config::ConfigManager;
use squeaker::error::SqueakerResult;
use squeaker::vm::autodetect;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SqueakerResult<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => EnvFilter::new("squeaker=info"),
        1 => EnvFilter::new("squeaker=debug"),
        _ => EnvFilter::new("squeaker=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    let store = commands::open_store(cli.cache_root.clone(), &config);

    // Dispatch to command
    match cli.command {
        Commands::Build(args) => commands::build(args, &config, store).await,
        Commands::Run(args) => commands::run(args, &config, store).await,
        Commands::Gc(args) => commands::gc(args, store).await,
        Commands::Tags => commands::tags(store).await,
        Commands::ResolveTag { tag } => commands::resolve_tag(tag, store).await,
        Commands::Dot => commands::dot(store).await,
        Commands::Create { image, dir } => commands::create(image, dir, &config, store).await,
        Commands::Untag { tags } => commands::untag(tags, store).await,
        Commands::Unstage { digests } => commands::unstage(digests, store).await,
        Commands::PrintAutodetect => {
            println!("{}", autodetect::probe_report());
            match autodetect::autodetect() {
                Some(path) => println!("using: {}", path.display()),
                None => println!("using: <none found>"),
            }
            Ok(())
        }
    }
}
