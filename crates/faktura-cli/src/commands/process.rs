//! Process command implementation: convert, then extract.

use crate::cli::ProcessArgs;
use crate::commands::{build_pipeline, convert_document, run_pipeline, write_output};
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the process command.
pub async fn execute_process(args: ProcessArgs, mut config: Config, formatter: &Formatter) -> Result<()> {
    config.apply_args(&args.pipeline);

    // Fail on a bad schema or config before paying for a conversion
    let pipeline = build_pipeline(&config)?;

    let conversion = convert_document(&config, &args.file).await?;
    eprintln!("{}", formatter.info(&conversion.summary()));

    let report = run_pipeline(&pipeline, conversion.text.as_str().as_bytes()).await?;

    write_output(config.paths.output.as_deref(), &formatter.format_report(&report)?)?;
    eprintln!("{}", formatter.summary(&report));

    Ok(())
}
