//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Faktura CLI - Turn invoices and other documents into schema-valid JSON.
#[derive(Debug, Parser)]
#[command(name = "faktura")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format for extraction results
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.faktura/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// The JSON payload only (default)
    Json,
    /// The full run report as JSON
    Report,
    /// Payload followed by a table of critique passes
    Table,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract JSON from document text
    Extract(ExtractArgs),

    /// Convert a binary document to text
    Convert(ConvertArgs),

    /// Convert a binary document, then extract JSON from its text
    Process(ProcessArgs),

    /// Show or initialize the configuration file
    Config(ConfigArgs),
}

/// Options shared by every command that runs the pipeline.
#[derive(Debug, Clone, Default, Args)]
pub struct PipelineArgs {
    /// JSON Schema file the payload must conform to
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum critique passes (0 disables critique)
    #[arg(long)]
    pub passes: Option<u32>,

    /// Maximum JSON generation attempts
    #[arg(long)]
    pub retries: Option<u32>,

    /// Fail unless the final payload validates against the schema
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the extract command.
#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Text file to extract from
    #[arg(short, long, conflicts_with = "stdin")]
    pub input: Option<PathBuf>,

    /// Read document text from stdin
    #[arg(long)]
    pub stdin: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for the convert command.
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Document to convert (PDF or image)
    #[arg(long)]
    pub file: PathBuf,

    /// Write the text here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the process command.
#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Document to convert and extract from
    #[arg(long)]
    pub file: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for configuration management.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::output::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Json => crate::output::OutputFormat::Json,
            CliFormat::Report => crate::output::OutputFormat::Report,
            CliFormat::Table => crate::output::OutputFormat::Table,
        }
    }
}
