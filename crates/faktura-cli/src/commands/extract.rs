//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::commands::{build_pipeline, run_pipeline, write_output};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, mut config: Config, formatter: &Formatter) -> Result<()> {
    config.apply_args(&args.pipeline);

    let raw = read_input(&args, &config, tokio::io::stdin()).await?;

    let pipeline = build_pipeline(&config)?;
    let report = run_pipeline(&pipeline, &raw).await?;

    write_output(config.paths.output.as_deref(), &formatter.format_report(&report)?)?;
    eprintln!("{}", formatter.summary(&report));

    Ok(())
}

/// Read document text from stdin, --input, or the configured default.
async fn read_input<R>(args: &ExtractArgs, config: &Config, mut stdin: R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    if args.stdin {
        let mut buffer = Vec::new();
        stdin.read_to_end(&mut buffer).await?;
        Ok(buffer)
    } else if let Some(path) = args.input.as_ref().or(config.paths.input.as_ref()) {
        Ok(tokio::fs::read(path).await?)
    } else {
        Err(CliError::InvalidInput(
            "Must specify either --input or --stdin (or set INVOICE_FILE)".to_string(),
        ))
    }
}
