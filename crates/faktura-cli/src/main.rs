//! Faktura CLI - turn document text into schema-valid JSON.

use anyhow::Context;
use clap::Parser;
use faktura_cli::cli::{ConfigAction, ConfigArgs};
use faktura_cli::commands;
use faktura_cli::{Cli, Command, Config, Formatter, OutputFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Defaults, then file, then environment; flags are applied per command.
    // `config init` must work even when the file is missing or broken.
    let config = match &cli.command {
        Command::Config(ConfigArgs {
            action: ConfigAction::Init { .. },
        }) => Config::default(),
        _ => Config::load(cli.config.as_deref()).context("Failed to load configuration")?,
    };

    let format = cli.format.map(Into::into).unwrap_or(OutputFormat::Json);
    let formatter = Formatter::new(format, !cli.no_color);

    match cli.command {
        Command::Extract(args) => commands::execute_extract(args, config, &formatter).await?,
        Command::Convert(args) => commands::execute_convert(args, config, &formatter).await?,
        Command::Process(args) => commands::execute_process(args, config, &formatter).await?,
        Command::Config(args) => {
            commands::execute_config(args, cli.config.as_deref(), &config, &formatter).await?
        }
    }

    Ok(())
}

/// Log to stderr; `-v` overrides RUST_LOG, which overrides the `info` default.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
