//! Per service account diagnostics and fleet summary
//!
//! Lookups run one service account at a time, in listing order. A failing
//! IAM or CloudTrail call only degrades the report of the service account it
//! belongs to.

use crate::aws::{
    find_cluster_oidc_provider, get_role, lookup_events, Cluster, EksApi, EventLog, IamApi,
    OidcProvider, Role, TrailApi,
};
use crate::error::{Iam4saError, Lookup, Result};
use crate::k8s::ServiceAccount;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of resolving a service account's IAM role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub enum RoleState {
    Found(Role),
    NotFound,
    /// Lookup failed for a reason other than absence
    Failed(String),
}

impl RoleState {
    pub fn role(&self) -> Option<&Role> {
        match self {
            RoleState::Found(role) => Some(role),
            _ => None,
        }
    }
}

/// Everything known about one IAM service account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceAccountReport {
    pub service_account: ServiceAccount,
    pub role: RoleState,
    pub oidc_provider: Option<OidcProvider>,
    pub events: EventLog,
}

impl ServiceAccountReport {
    pub fn failed_events(&self) -> EventLog {
        self.events.failed()
    }

    /// Whether the role trusts this service account through the cluster provider,
    /// `None` when either side is unknown
    pub fn trust_matches(&self) -> Option<bool> {
        let role = self.role.role()?;
        let provider = self.oidc_provider.as_ref()?;
        Some(role.trusts(
            provider,
            &self.service_account.namespace,
            &self.service_account.name,
        ))
    }
}

/// One `list` table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub namespace: String,
    pub name: String,
    pub pods: usize,
    pub role_account: String,
    pub role_name: String,
    pub events: usize,
    pub failed_events: usize,
}

/// Cluster OIDC state for the `cluster` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub cluster: Cluster,
    /// SHA-1 of the issuer's top certificate, `None` if it could not be fetched
    pub fingerprint: Option<String>,
    pub oidc_provider: Lookup<OidcProvider>,
}

impl ClusterReport {
    /// `None` when either the fingerprint or the provider is unknown
    pub fn thumbprint_matches(&self) -> Option<bool> {
        let fingerprint = self.fingerprint.as_deref()?;
        let provider = self.oidc_provider.as_found()?;
        Some(provider.has_thumbprint(fingerprint))
    }
}

/// Drives the IAM and CloudTrail lookups for service accounts
pub struct Diagnostics<'a> {
    iam: &'a dyn IamApi,
    trail: &'a dyn TrailApi,
    now: DateTime<Utc>,
}

impl<'a> Diagnostics<'a> {
    pub fn new(iam: &'a dyn IamApi, trail: &'a dyn TrailApi) -> Self {
        Self::at(iam, trail, Utc::now())
    }

    /// Diagnostics with the event window ending at `now`
    pub fn at(iam: &'a dyn IamApi, trail: &'a dyn TrailApi, now: DateTime<Utc>) -> Self {
        Self { iam, trail, now }
    }

    /// Full report for one service account
    pub async fn report(
        &self,
        sa: &ServiceAccount,
        oidc_provider: Option<&OidcProvider>,
    ) -> ServiceAccountReport {
        let role = match get_role(self.iam, sa.role_name()).await {
            Ok(Lookup::Found(role)) => RoleState::Found(role),
            Ok(Lookup::NotFound) => {
                tracing::info!(
                    namespace = %sa.namespace,
                    service_account = %sa.name,
                    role = %sa.role_name(),
                    "role not found"
                );
                RoleState::NotFound
            }
            Err(e) => {
                tracing::warn!(
                    namespace = %sa.namespace,
                    service_account = %sa.name,
                    error = %e,
                    "get role for service account failed"
                );
                RoleState::Failed(e.to_string())
            }
        };

        ServiceAccountReport {
            service_account: sa.clone(),
            role,
            oidc_provider: oidc_provider.cloned(),
            events: self.events(sa).await,
        }
    }

    /// Reports for every service account, in input order
    pub async fn reports(
        &self,
        service_accounts: &[ServiceAccount],
        oidc_provider: Option<&OidcProvider>,
    ) -> Vec<ServiceAccountReport> {
        let mut reports = Vec::with_capacity(service_accounts.len());
        for sa in service_accounts {
            reports.push(self.report(sa, oidc_provider).await);
        }
        reports
    }

    /// Summary rows for every service account, in input order
    pub async fn summary(&self, service_accounts: &[ServiceAccount]) -> Vec<SummaryRow> {
        let mut rows = Vec::with_capacity(service_accounts.len());
        for sa in service_accounts {
            let events = self.events(sa).await;
            rows.push(SummaryRow {
                namespace: sa.namespace.clone(),
                name: sa.name.clone(),
                pods: sa.pods.len(),
                role_account: sa.role_account().to_string(),
                role_name: sa.role_name().to_string(),
                events: events.len(),
                failed_events: events.failed().len(),
            });
        }
        rows
    }

    async fn events(&self, sa: &ServiceAccount) -> EventLog {
        match lookup_events(self.trail, &sa.namespace, &sa.name, self.now).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    namespace = %sa.namespace,
                    service_account = %sa.name,
                    error = %e,
                    "lookup events failed"
                );
                EventLog::default()
            }
        }
    }
}

/// Describe the cluster and match its OIDC provider
///
/// A missing cluster or a failed provider lookup is an error; a missing
/// provider is not. The issuer fingerprint is best effort.
pub async fn diagnose_cluster(
    eks: &dyn EksApi,
    iam: &dyn IamApi,
    cluster_name: &str,
) -> Result<ClusterReport> {
    let cluster = describe(eks, cluster_name).await?;

    let oidc_provider = find_cluster_oidc_provider(iam, &cluster.oidc_issuer).await?;

    let fingerprint = match cluster.oidc_issuer_fingerprint().await {
        Ok(fingerprint) => Some(fingerprint),
        Err(e) => {
            tracing::error!(error = %e, issuer = %cluster.oidc_issuer, "oidc cluster issuer fingerprint");
            None
        }
    };

    Ok(ClusterReport {
        cluster,
        fingerprint,
        oidc_provider,
    })
}

/// OIDC provider of the cluster for `get` reports, `None` on any failure
pub async fn cluster_oidc_provider(
    eks: &dyn EksApi,
    iam: &dyn IamApi,
    cluster_name: &str,
) -> Option<OidcProvider> {
    let cluster = match describe(eks, cluster_name).await {
        Ok(cluster) => cluster,
        Err(e) => {
            tracing::warn!(error = %e, "describe cluster failed, expected principal unknown");
            return None;
        }
    };

    match find_cluster_oidc_provider(iam, &cluster.oidc_issuer).await {
        Ok(Lookup::Found(provider)) => Some(provider),
        Ok(Lookup::NotFound) => {
            tracing::warn!(issuer = %cluster.oidc_issuer, "cluster oidc provider not found");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "get cluster oidc provider failed");
            None
        }
    }
}

async fn describe(eks: &dyn EksApi, cluster_name: &str) -> Result<Cluster> {
    if cluster_name.is_empty() {
        return Err(Iam4saError::Config(
            "no --cluster-name in kubeconfig exec args".to_string(),
        ));
    }
    match eks.describe_cluster(cluster_name).await? {
        Lookup::Found(cluster) => Ok(cluster),
        Lookup::NotFound => Err(Iam4saError::Config(format!(
            "cluster {cluster_name}: not found"
        ))),
    }
}
