//! Configuration management for the CLI.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! environment variables, command-line flags.

use crate::cli::PipelineArgs;
use crate::error::{CliError, Result};
use faktura_convert::{PollConfig, WhispererConfig, DEFAULT_WHISPERER_URL};
use faktura_extractor::ExtractorConfig;
use faktura_gatekeeper::ValidationConfig;
use faktura_llm::openai::{OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation provider connection
    pub provider: ProviderSettings,

    /// Pipeline behaviour
    pub pipeline: ExtractorConfig,

    /// Schema validation behaviour
    pub validation: ValidationConfig,

    /// Document conversion service
    pub converter: ConverterSettings,

    /// Default file locations
    pub paths: PathSettings,
}

/// Generation provider connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Chat-completions base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Environment variable holding the API token
    pub api_key_env: String,

    /// Per-request timeout (in seconds)
    pub timeout_secs: u64,

    /// Request attempts per generation call; the pipeline's own retry
    /// loops sit above this
    pub max_retries: u32,

    /// Resolved API token; never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Document conversion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    /// Service base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Processing mode
    pub mode: String,

    /// Output layout
    pub output_mode: String,

    /// Bounds on waiting for a job
    pub poll: PollConfig,

    /// Resolved API key; never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Default file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Document text read by `extract` when neither --input nor --stdin is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,

    /// JSON Schema file
    pub schema: PathBuf,

    /// Where to write results; stdout when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "HF_TOKEN".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 1,
            api_key: None,
        }
    }
}

impl Default for ConverterSettings {
    fn default() -> Self {
        let whisperer = WhispererConfig::default();
        Self {
            base_url: DEFAULT_WHISPERER_URL.to_string(),
            api_key_env: "LLMWHISPERER_API_KEY".to_string(),
            mode: whisperer.mode,
            output_mode: whisperer.output_mode,
            poll: PollConfig::default(),
            api_key: None,
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input: None,
            schema: PathBuf::from("schemas/invoice.schema.json"),
            output: None,
        }
    }
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".faktura").join("config.toml"))
    }

    /// Load configuration and apply environment overrides.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?)?,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::from_toml(&fs::read_to_string(&path)?)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse configuration from TOML.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Serialize configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.provider.api_key = lookup(&self.provider.api_key_env).filter(|v| !v.is_empty());
        self.converter.api_key = lookup(&self.converter.api_key_env).filter(|v| !v.is_empty());

        if let Some(model) = lookup("HF_MODEL") {
            self.provider.model = model;
        }
        if let Some(path) = lookup("INVOICE_FILE") {
            self.paths.input = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("SCHEMA_FILE") {
            self.paths.schema = PathBuf::from(path);
        }
        if let Some(path) = lookup("OUTPUT_JSON") {
            self.paths.output = Some(PathBuf::from(path));
        }

        let pipeline = &mut self.pipeline;
        override_parsed(&lookup, "MAX_NEW_TOKENS", &mut pipeline.max_tokens)?;
        override_parsed(&lookup, "TEMPERATURE", &mut pipeline.temperature)?;
        override_parsed(&lookup, "MAX_JSON_RETRIES", &mut pipeline.max_json_retries)?;
        override_parsed(&lookup, "MAX_CRITIQUE_PASSES", &mut pipeline.max_critique_passes)?;
        override_parsed(&lookup, "MAX_CRITIQUE_RETRIES", &mut pipeline.max_critique_retries)?;

        Ok(())
    }

    /// Apply command-line overrides.
    pub fn apply_args(&mut self, args: &PipelineArgs) {
        if let Some(schema) = &args.schema {
            self.paths.schema = schema.clone();
        }
        if let Some(output) = &args.output {
            self.paths.output = Some(output.clone());
        }
        if let Some(passes) = args.passes {
            self.pipeline.max_critique_passes = passes;
        }
        if let Some(retries) = args.retries {
            self.pipeline.max_json_retries = retries;
        }
        if args.strict {
            self.pipeline.require_valid_output = true;
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        if self.provider.timeout_secs == 0 {
            return Err(CliError::Config("provider.timeout_secs must be greater than 0".into()));
        }
        if self.provider.max_retries == 0 {
            return Err(CliError::Config("provider.max_retries must be at least 1".into()));
        }
        self.pipeline
            .validate()
            .map_err(|e| CliError::Config(format!("pipeline: {}", e)))?;

        // A provider call outliving the pipeline timeout keeps sending
        // requests after its run has given up on it
        let worst_case = self.openai_config().worst_case_duration();
        if worst_case > self.pipeline.generation_timeout() {
            return Err(CliError::Config(format!(
                "provider retries can take {}s, longer than pipeline.generation_timeout_secs ({}s)",
                worst_case.as_secs(),
                self.pipeline.generation_timeout_secs
            )));
        }
        self.validation
            .validate()
            .map_err(|e| CliError::Config(format!("validation: {}", e)))?;
        self.converter
            .poll
            .validate()
            .map_err(|e| CliError::Config(format!("converter.poll: {}", e)))?;
        Ok(())
    }

    /// Connection settings for the generation provider.
    pub fn openai_config(&self) -> OpenAiConfig {
        let mut config = OpenAiConfig::default()
            .with_base_url(&self.provider.base_url)
            .with_model(&self.provider.model);
        config.timeout_secs = self.provider.timeout_secs;
        config.max_retries = self.provider.max_retries;
        if let Some(key) = &self.provider.api_key {
            config = config.with_api_key(key);
        }
        config
    }

    /// Connection settings for the conversion service.
    pub fn whisperer_config(&self) -> WhispererConfig {
        let mut config = WhispererConfig::new(&self.converter.base_url)
            .with_mode(&self.converter.mode)
            .with_output_mode(&self.converter.output_mode);
        if let Some(key) = &self.converter.api_key {
            config = config.with_api_key(key);
        }
        config
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| CliError::Config(format!("Invalid value for {}: {} ({})", key, raw, e)))?;
    }
    Ok(())
}
