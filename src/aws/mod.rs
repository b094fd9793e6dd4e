//! AWS side of the IRSA diagnostics
//!
//! IAM (roles, OIDC providers), CloudTrail (event history) and EKS (cluster
//! snapshot). Each service is reached through a small trait so the diagnostic
//! logic can run against the SDK clients or against fixtures.

pub mod cluster;
pub mod event;
pub mod iam;
pub mod oidc;
pub mod role;

pub use cluster::*;
pub use event::*;
pub use iam::*;
pub use oidc::*;
pub use role::*;

use crate::error::{Iam4saError, Lookup, Result};
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iam::primitives::DateTime as AwsDateTime;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Timeout applied to every AWS API operation
pub const AWS_TIMEOUT: Duration = Duration::from_secs(5);

/// AWS SDK clients for one invocation
pub struct AwsClients {
    pub iam: aws_sdk_iam::Client,
    pub cloudtrail: aws_sdk_cloudtrail::Client,
    pub eks: aws_sdk_eks::Client,
    pub account: String,
    pub region: String,
    pub cluster_name: String,
}

impl AwsClients {
    /// Load AWS configuration for the kubeconfig's region and profile and
    /// verify the credentials with STS
    pub async fn new(region: &str, profile: &str, cluster_name: &str) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(AWS_TIMEOUT)
                .build(),
        );
        if !region.is_empty() {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if !profile.is_empty() {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        let region = match config.region() {
            Some(resolved) if region.is_empty() => {
                tracing::warn!(
                    region = %resolved,
                    "no region in kubeconfig, using default region which can differ from the cluster region"
                );
                resolved.to_string()
            }
            Some(resolved) => resolved.to_string(),
            None => {
                return Err(Iam4saError::Config(
                    "no AWS region in kubeconfig or AWS configuration".to_string(),
                ))
            }
        };

        let identity = aws_sdk_sts::Client::new(&config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| Iam4saError::Aws {
                request: "get caller identity".to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(Self {
            iam: aws_sdk_iam::Client::new(&config),
            cloudtrail: aws_sdk_cloudtrail::Client::new(&config),
            eks: aws_sdk_eks::Client::new(&config),
            account: identity.account().unwrap_or_default().to_string(),
            region,
            cluster_name: cluster_name.to_string(),
        })
    }
}

/// HTTP 404 or a service "no such entity" code
pub(crate) fn is_not_found<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata,
{
    let status_404 = err
        .raw_response()
        .map(|response| response.status().as_u16() == 404)
        .unwrap_or(false);
    let code = err.code().unwrap_or_default();
    status_404 || code == "NoSuchEntity" || code == "ResourceNotFoundException"
}

/// Turn an SDK failure into a lookup outcome: absent or a request error
pub(crate) fn classify<T, E>(err: SdkError<E>, request: String) -> Result<Lookup<T>>
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    if is_not_found(&err) {
        tracing::debug!(%request, "not found");
        return Ok(Lookup::NotFound);
    }
    Err(request_error(err, request))
}

pub(crate) fn request_error<E>(err: SdkError<E>, request: String) -> Iam4saError
where
    E: std::error::Error + 'static,
{
    Iam4saError::Aws {
        request,
        message: DisplayErrorContext(&err).to_string(),
    }
}

pub(crate) fn to_chrono(time: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}
