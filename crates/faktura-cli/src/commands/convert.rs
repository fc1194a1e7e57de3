//! Convert command implementation.

use crate::cli::ConvertArgs;
use crate::commands::{convert_document, write_output};
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the convert command.
pub async fn execute_convert(args: ConvertArgs, config: Config, formatter: &Formatter) -> Result<()> {
    let conversion = convert_document(&config, &args.file).await?;

    write_output(args.output.as_deref(), conversion.text.as_str())?;
    eprintln!("{}", formatter.success(&conversion.summary()));

    Ok(())
}
