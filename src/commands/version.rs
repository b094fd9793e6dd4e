//! Version command implementation

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output::{bold, green};

/// Render the client version in the requested format
pub fn format_version(output: OutputFormat) -> Result<String> {
    let version = env!("CARGO_PKG_VERSION");
    let name = env!("CARGO_PKG_NAME");

    Ok(match output {
        OutputFormat::Json => {
            let json = serde_json::json!({ "name": name, "version": version });
            serde_json::to_string_pretty(&json)?
        }
        OutputFormat::Text => format!("{} version {}", bold(name), green(version)),
    })
}

/// Print the client version
pub fn run_version(output: OutputFormat) -> Result<()> {
    println!("{}", format_version(output)?);
    Ok(())
}
