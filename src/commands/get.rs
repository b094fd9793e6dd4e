//! Get command implementation

use super::Session;
use crate::cli::OutputFormat;
use crate::config::QueryConfig;
use crate::diagnose::{cluster_oidc_provider, Diagnostics, ServiceAccountReport};
use crate::error::Result;
use crate::output::{format_json, format_report};

/// Render `get` reports; JSON is always an array, even when nothing matched
pub fn format_get(reports: &[ServiceAccountReport], output: OutputFormat) -> Result<String> {
    Ok(match output {
        OutputFormat::Json => format_json(reports)?,
        OutputFormat::Text => reports
            .iter()
            .map(format_report)
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// Print a full report for every selected IAM service account
pub async fn run_get(config: &QueryConfig, output: OutputFormat) -> Result<()> {
    let session = Session::connect(config).await?;
    let service_accounts = session.service_accounts(config).await?;
    if service_accounts.is_empty() {
        tracing::warn!(namespace = %config.namespace, "no iam service accounts found");
        if output == OutputFormat::Json {
            println!("{}", format_get(&[], output)?);
        }
        return Ok(());
    }

    let aws = &session.aws;
    let oidc_provider = cluster_oidc_provider(&aws.eks, &aws.iam, &aws.cluster_name).await;
    let reports = Diagnostics::new(&aws.iam, &aws.cloudtrail)
        .reports(&service_accounts, oidc_provider.as_ref())
        .await;

    println!("{}", format_get(&reports, output)?);
    Ok(())
}
