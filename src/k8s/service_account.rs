//! IAM service account enumeration
//!
//! A service account takes part in IRSA when it carries the
//! `eks.amazonaws.com/role-arn` annotation. Pods are linked back to it through
//! `spec.serviceAccountName`.

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod, ServiceAccount as KubeServiceAccount};
use kube::{api::ListParams, Api, Client, ResourceExt};
use serde::Serialize;

/// Annotation binding a service account to an IAM role
pub const IAM_ROLE_ARN_ANNOTATION: &str = "eks.amazonaws.com/role-arn";

/// Service account annotated with an IAM role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceAccount {
    pub namespace: String,
    pub name: String,
    pub iam_role_arn: String,
    pub pods: Vec<String>,
}

impl ServiceAccount {
    /// AWS account of the annotated role
    pub fn role_account(&self) -> &str {
        role_account(&self.iam_role_arn).unwrap_or_default()
    }

    /// Bare name of the annotated role
    pub fn role_name(&self) -> &str {
        role_name(&self.iam_role_arn).unwrap_or_default()
    }

    /// CloudTrail username of tokens issued to this service account
    pub fn username(&self) -> String {
        service_account_username(&self.namespace, &self.name)
    }
}

/// `system:serviceaccount:<namespace>:<name>`
pub fn service_account_username(namespace: &str, name: &str) -> String {
    format!("system:serviceaccount:{namespace}:{name}")
}

/// Second to last `:` segment of `arn:aws:iam::<account>:role/<name>`
pub fn role_account(arn: &str) -> Option<&str> {
    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() < 2 {
        return None;
    }
    Some(parts[parts.len() - 2]).filter(|account| !account.is_empty())
}

/// Last `/` segment of `arn:aws:iam::<account>:role/<name>`
pub fn role_name(arn: &str) -> Option<&str> {
    arn.rsplit_once('/')
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
}

/// Annotation value carries both an account and a role name segment
pub fn is_well_formed_role_arn(arn: &str) -> bool {
    role_account(arn).is_some() && role_name(arn).is_some()
}

/// Kubernetes reads needed to enumerate IAM service accounts
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Names of all namespaces, in listing order
    async fn namespaces(&self) -> Result<Vec<String>>;

    /// Service accounts in `namespace` matching the selectors
    async fn service_accounts(
        &self,
        namespace: &str,
        label_selector: &str,
        field_selector: &str,
    ) -> Result<Vec<KubeServiceAccount>>;

    /// Names of pods in `namespace` running as `service_account`
    async fn pods_for(&self, namespace: &str, service_account: &str) -> Result<Vec<String>>;
}

fn list_params(label_selector: &str, field_selector: &str) -> ListParams {
    let mut params = ListParams::default();
    if !label_selector.is_empty() {
        params = params.labels(label_selector);
    }
    if !field_selector.is_empty() {
        params = params.fields(field_selector);
    }
    params
}

#[async_trait]
impl ClusterApi for Client {
    async fn namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn service_accounts(
        &self,
        namespace: &str,
        label_selector: &str,
        field_selector: &str,
    ) -> Result<Vec<KubeServiceAccount>> {
        let api: Api<KubeServiceAccount> = Api::namespaced(self.clone(), namespace);
        let list = api
            .list(&list_params(label_selector, field_selector))
            .await?;
        Ok(list.items)
    }

    async fn pods_for(&self, namespace: &str, service_account: &str) -> Result<Vec<String>> {
        let api: Api<Pod> = Api::namespaced(self.clone(), namespace);
        let params =
            ListParams::default().fields(&format!("spec.serviceAccountName={service_account}"));
        let list = api.list(&params).await?;
        Ok(list.items.iter().map(|pod| pod.name_any()).collect())
    }
}

/// List IAM service accounts in `namespace`, or in every namespace when empty
///
/// Namespaces are walked one after another in listing order and the first
/// failure aborts the whole listing.
pub async fn list_iam_service_accounts<C: ClusterApi + ?Sized>(
    api: &C,
    namespace: &str,
    label_selector: &str,
    field_selector: &str,
) -> Result<Vec<ServiceAccount>> {
    if !namespace.is_empty() {
        return list_namespace(api, namespace, label_selector, field_selector).await;
    }

    let namespaces = api.namespaces().await?;
    tracing::debug!(count = namespaces.len(), "listing service accounts in all namespaces");

    let mut all = Vec::new();
    for namespace in &namespaces {
        all.extend(list_namespace(api, namespace, label_selector, field_selector).await?);
    }
    Ok(all)
}

async fn list_namespace<C: ClusterApi + ?Sized>(
    api: &C,
    namespace: &str,
    label_selector: &str,
    field_selector: &str,
) -> Result<Vec<ServiceAccount>> {
    let items = api
        .service_accounts(namespace, label_selector, field_selector)
        .await?;

    let mut service_accounts = Vec::new();
    for sa in items {
        let name = sa.name_any();
        let Some(role_arn) = sa.annotations().get(IAM_ROLE_ARN_ANNOTATION).cloned() else {
            continue;
        };
        if !is_well_formed_role_arn(&role_arn) {
            tracing::warn!(
                namespace,
                service_account = %name,
                role_arn = %role_arn,
                "skipping service account with malformed role ARN annotation"
            );
            continue;
        }

        let pods = api.pods_for(namespace, &name).await?;
        service_accounts.push(ServiceAccount {
            namespace: sa.namespace().unwrap_or_else(|| namespace.to_string()),
            name,
            iam_role_arn: role_arn,
            pods,
        });
    }
    Ok(service_accounts)
}
