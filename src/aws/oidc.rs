//! Matching a cluster's OIDC issuer to an IAM OIDC identity provider
//!
//! IAM keeps no link to the cluster. The only overlap is the issuer id, the
//! last path segment of both the cluster issuer
//! (`https://oidc.eks.<region>.amazonaws.com/id/<ID>`) and the provider URL.

use super::iam::IamApi;
use crate::error::{Lookup, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// IAM OIDC identity provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OidcProvider {
    pub arn: String,
    /// Issuer URL as registered in IAM, without scheme
    pub url: String,
    pub client_ids: Vec<String>,
    pub thumbprints: Vec<String>,
    pub create_date: Option<DateTime<Utc>>,
}

impl OidcProvider {
    /// Last path segment of the issuer URL
    pub fn provider_id(&self) -> &str {
        last_segment(&self.url)
    }

    /// Provider pins `fingerprint` (case-insensitive)
    pub fn has_thumbprint(&self, fingerprint: &str) -> bool {
        self.thumbprints
            .iter()
            .any(|t| t.eq_ignore_ascii_case(fingerprint))
    }
}

fn last_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

/// Issuer without its `https://` prefix
pub fn bare_issuer(issuer: &str) -> &str {
    issuer.strip_prefix("https://").unwrap_or(issuer)
}

/// First provider whose id prefixes the cluster issuer id, in list order
pub fn match_provider<'a>(
    cluster_issuer: &str,
    providers: &'a [OidcProvider],
) -> Option<&'a OidcProvider> {
    let issuer_id = last_segment(bare_issuer(cluster_issuer));
    providers.iter().find(|provider| {
        let provider_id = provider.provider_id();
        !provider_id.is_empty() && issuer_id.starts_with(provider_id)
    })
}

/// Find the IAM OIDC provider backing the cluster with `cluster_issuer`
///
/// Providers are fetched one by one in listing order and the first match is
/// returned. No match is [`Lookup::NotFound`], which is the normal state of a
/// cluster before federation is set up.
pub async fn find_cluster_oidc_provider<I: IamApi + ?Sized>(
    iam: &I,
    cluster_issuer: &str,
) -> Result<Lookup<OidcProvider>> {
    let arns = iam.list_oidc_provider_arns().await?;
    tracing::debug!(count = arns.len(), issuer = %cluster_issuer, "matching oidc providers");

    for arn in &arns {
        let provider = match iam.get_oidc_provider(arn).await? {
            Lookup::Found(provider) => provider,
            Lookup::NotFound => {
                tracing::debug!(%arn, "listed oidc provider disappeared");
                continue;
            }
        };
        if let Some(matched) = match_provider(cluster_issuer, std::slice::from_ref(&provider)) {
            return Ok(Lookup::Found(matched.clone()));
        }
    }
    Ok(Lookup::NotFound)
}
