//! IAM reads used by the diagnostics

use super::oidc::OidcProvider;
use super::role::RoleRecord;
use super::{classify, request_error, to_chrono};
use crate::error::{Lookup, Result};
use async_trait::async_trait;

#[async_trait]
pub trait IamApi: Send + Sync {
    /// GetRole by bare role name
    async fn get_role(&self, role_name: &str) -> Result<Lookup<RoleRecord>>;

    /// ARNs of every OIDC provider in the account, in listing order
    async fn list_oidc_provider_arns(&self) -> Result<Vec<String>>;

    /// GetOpenIDConnectProvider
    async fn get_oidc_provider(&self, arn: &str) -> Result<Lookup<OidcProvider>>;
}

#[async_trait]
impl IamApi for aws_sdk_iam::Client {
    async fn get_role(&self, role_name: &str) -> Result<Lookup<RoleRecord>> {
        let out = match aws_sdk_iam::Client::get_role(self)
            .role_name(role_name)
            .send()
            .await
        {
            Ok(out) => out,
            Err(e) => return classify(e, format!("role {role_name}")),
        };

        let Some(role) = out.role() else {
            return Ok(Lookup::NotFound);
        };

        Ok(Lookup::Found(RoleRecord {
            arn: role.arn().to_string(),
            name: role.role_name().to_string(),
            description: role.description().unwrap_or_default().to_string(),
            assume_role_policy_document: role
                .assume_role_policy_document()
                .unwrap_or_default()
                .to_string(),
            create_date: to_chrono(role.create_date()),
            last_used: role
                .role_last_used()
                .and_then(|used| used.last_used_date())
                .and_then(to_chrono),
        }))
    }

    async fn list_oidc_provider_arns(&self) -> Result<Vec<String>> {
        // IAM returns every provider in a single page
        let out = self
            .list_open_id_connect_providers()
            .send()
            .await
            .map_err(|e| request_error(e, "list oidc providers".to_string()))?;

        Ok(out
            .open_id_connect_provider_list()
            .iter()
            .filter_map(|entry| entry.arn().map(String::from))
            .collect())
    }

    async fn get_oidc_provider(&self, arn: &str) -> Result<Lookup<OidcProvider>> {
        let out = match self
            .get_open_id_connect_provider()
            .open_id_connect_provider_arn(arn)
            .send()
            .await
        {
            Ok(out) => out,
            Err(e) => return classify(e, format!("oidc provider {arn}")),
        };

        Ok(Lookup::Found(OidcProvider {
            arn: arn.to_string(),
            url: out.url().unwrap_or_default().to_string(),
            client_ids: out.client_id_list().to_vec(),
            thumbprints: out.thumbprint_list().to_vec(),
            create_date: out.create_date().and_then(to_chrono),
        }))
    }
}
