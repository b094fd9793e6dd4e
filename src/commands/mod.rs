//! Command implementations

pub mod cluster;
pub mod get;
pub mod list;
pub mod version;

pub use cluster::*;
pub use get::*;
pub use list::*;
pub use version::*;

use crate::aws::AwsClients;
use crate::client::create_client;
use crate::config::QueryConfig;
use crate::error::Result;
use crate::k8s::{list_iam_service_accounts, ServiceAccount};
use crate::kubeconfig::load_kubeconfig;

/// Kubernetes and AWS clients for one invocation
pub struct Session {
    pub kube: kube::Client,
    pub aws: AwsClients,
}

impl Session {
    /// Resolve the kubeconfig and connect to both sides
    pub async fn connect(config: &QueryConfig) -> Result<Self> {
        let kubeconfig = load_kubeconfig(&config.kubeconfig).await?;
        tracing::info!(%kubeconfig, "using kubeconfig");

        let kube = create_client(&kubeconfig)?;
        let aws = AwsClients::new(
            &kubeconfig.region,
            &kubeconfig.profile,
            &kubeconfig.cluster_name,
        )
        .await?;
        tracing::debug!(account = %aws.account, region = %aws.region, "aws identity");

        Ok(Self { kube, aws })
    }

    /// IAM service accounts selected by `config`
    pub async fn service_accounts(&self, config: &QueryConfig) -> Result<Vec<ServiceAccount>> {
        list_iam_service_accounts(
            &self.kube,
            &config.namespace,
            &config.label_selector,
            &config.field_selector,
        )
        .await
    }
}
