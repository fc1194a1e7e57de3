//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
///
/// `path` is the --config override; `config` is the effective configuration.
pub async fn execute_config(
    args: ConfigArgs,
    path: Option<&Path>,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            println!("{}", config.to_toml()?);
            let key_state = |key: &Option<String>| if key.is_some() { "set" } else { "not set" };
            eprintln!(
                "{}",
                formatter.info(&format!(
                    "{}: {}, {}: {}",
                    config.provider.api_key_env,
                    key_state(&config.provider.api_key),
                    config.converter.api_key_env,
                    key_state(&config.converter.api_key)
                ))
            );
        }
        ConfigAction::Init { force } => {
            let path = match path {
                Some(path) => path.to_path_buf(),
                None => Config::default_path()?,
            };
            init_config(&path, force)?;
            eprintln!("{}", formatter.success(&format!("Wrote {}", path.display())));
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Config::default().save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "# mine").unwrap();

        assert!(matches!(init_config(&path, false), Err(CliError::Config(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "# mine");

        init_config(&path, true).unwrap();
        let written = Config::from_toml(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.provider.api_key_env, "HF_TOKEN");
    }
}
