//! EKS cluster snapshot

use super::{classify, to_chrono};
use crate::error::{Lookup, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Cluster {
    pub arn: String,
    pub name: String,
    /// Base64 certificate authority data
    pub certificate: String,
    pub created_at: Option<DateTime<Utc>>,
    pub endpoint: String,
    pub oidc_issuer: String,
    pub role_arn: String,
    pub status: String,
}

impl Cluster {
    /// Last path segment of the OIDC issuer URL
    pub fn oidc_issuer_id(&self) -> &str {
        self.oidc_issuer.rsplit('/').next().unwrap_or_default()
    }

    /// SHA-1 fingerprint of the OIDC issuer's top certificate
    pub async fn oidc_issuer_fingerprint(&self) -> Result<String> {
        crate::tls::fingerprint_sha1(&self.oidc_issuer).await
    }
}

#[async_trait]
pub trait EksApi: Send + Sync {
    async fn describe_cluster(&self, name: &str) -> Result<Lookup<Cluster>>;
}

#[async_trait]
impl EksApi for aws_sdk_eks::Client {
    async fn describe_cluster(&self, name: &str) -> Result<Lookup<Cluster>> {
        let out = match aws_sdk_eks::Client::describe_cluster(self)
            .name(name)
            .send()
            .await
        {
            Ok(out) => out,
            Err(e) => return classify(e, format!("cluster {name}")),
        };

        let Some(cluster) = out.cluster() else {
            return Ok(Lookup::NotFound);
        };

        Ok(Lookup::Found(Cluster {
            arn: cluster.arn().unwrap_or_default().to_string(),
            name: cluster.name().unwrap_or_default().to_string(),
            certificate: cluster
                .certificate_authority()
                .and_then(|ca| ca.data())
                .unwrap_or_default()
                .to_string(),
            created_at: cluster.created_at().and_then(to_chrono),
            endpoint: cluster.endpoint().unwrap_or_default().to_string(),
            oidc_issuer: cluster
                .identity()
                .and_then(|identity| identity.oidc())
                .and_then(|oidc| oidc.issuer())
                .unwrap_or_default()
                .to_string(),
            role_arn: cluster.role_arn().unwrap_or_default().to_string(),
            status: cluster
                .status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
        }))
    }
}
