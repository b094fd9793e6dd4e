//! List command implementation

use super::Session;
use crate::cli::OutputFormat;
use crate::config::QueryConfig;
use crate::diagnose::Diagnostics;
use crate::error::Result;
use crate::output::{format_json, format_summary};

/// Print the summary table of the selected IAM service accounts
pub async fn run_list(config: &QueryConfig, output: OutputFormat) -> Result<()> {
    let session = Session::connect(config).await?;
    let service_accounts = session.service_accounts(config).await?;

    let aws = &session.aws;
    let rows = Diagnostics::new(&aws.iam, &aws.cloudtrail)
        .summary(&service_accounts)
        .await;

    let output_str = match output {
        OutputFormat::Json => format_json(&rows)?,
        OutputFormat::Text => format_summary(&rows),
    };

    println!("{}", output_str);
    Ok(())
}
