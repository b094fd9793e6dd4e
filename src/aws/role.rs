//! IAM role resolution

use super::iam::IamApi;
use super::oidc::OidcProvider;
use crate::error::{Lookup, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;

/// IAM role as stored by IAM, trust policy still percent-encoded
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleRecord {
    pub arn: String,
    pub name: String,
    pub description: String,
    pub assume_role_policy_document: String,
    pub create_date: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

/// IAM role with decoded trust policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Role {
    pub arn: String,
    pub name: String,
    pub description: String,
    pub assume_role_policy_document: String,
    pub create_date: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

impl Role {
    /// Decode the record's trust policy, keeping the raw text if it cannot be decoded
    pub fn from_record(record: RoleRecord) -> Self {
        let document = match decode_policy_document(&record.assume_role_policy_document) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                tracing::warn!(
                    role = %record.name,
                    error = %e,
                    "unescape assume role policy failed, keeping raw document"
                );
                record.assume_role_policy_document
            }
        };

        Self {
            arn: record.arn,
            name: record.name,
            description: record.description,
            assume_role_policy_document: document,
            create_date: record.create_date,
            last_used: record.last_used,
        }
    }

    /// Trust policy names the provider as principal and the service account as subject
    pub fn trusts(&self, provider: &OidcProvider, namespace: &str, name: &str) -> bool {
        let subject = crate::k8s::service_account_username(namespace, name);
        let document = &self.assume_role_policy_document;
        document.contains(&provider.arn)
            && document.contains("sts:AssumeRoleWithWebIdentity")
            && (document.contains(&subject) || document.contains(&wildcard_subject(namespace)))
    }
}

fn wildcard_subject(namespace: &str) -> String {
    format!("system:serviceaccount:{namespace}:*")
}

/// Percent-decode a policy document as returned by IAM
pub fn decode_policy_document(encoded: &str) -> std::result::Result<Cow<'_, str>, std::string::FromUtf8Error> {
    urlencoding::decode(encoded)
}

/// Fetch a role by its bare name
pub async fn get_role<I: IamApi + ?Sized>(iam: &I, role_name: &str) -> Result<Lookup<Role>> {
    let record = iam.get_role(role_name).await?;
    Ok(record.map(Role::from_record))
}
