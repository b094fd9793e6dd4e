//! Cluster command implementation

use crate::aws::AwsClients;
use crate::cli::OutputFormat;
use crate::config::QueryConfig;
use crate::diagnose::diagnose_cluster;
use crate::error::Result;
use crate::kubeconfig::load_kubeconfig;
use crate::output::{format_cluster, format_json};

/// Print the cluster OIDC issuer and its IAM provider
///
/// Only AWS is contacted; the Kubernetes API is not needed.
pub async fn run_cluster(config: &QueryConfig, output: OutputFormat) -> Result<()> {
    let kubeconfig = load_kubeconfig(&config.kubeconfig).await?;
    let aws = AwsClients::new(
        &kubeconfig.region,
        &kubeconfig.profile,
        &kubeconfig.cluster_name,
    )
    .await?;

    let report = diagnose_cluster(&aws.eks, &aws.iam, &aws.cluster_name).await?;

    let output_str = match output {
        OutputFormat::Json => format_json(&report)?,
        OutputFormat::Text => format_cluster(&report),
    };

    println!("{}", output_str);
    Ok(())
}
