//! Kubeconfig loading and AWS exec-credential extraction
//!
//! EKS kubeconfigs authenticate through `aws eks get-token`, so the region,
//! profile and cluster name of the target cluster live in the exec plugin
//! arguments and environment of the active context's user.

use crate::error::{Iam4saError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig as KubeconfigFile};
use kube::Config;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Expected exec credential plugin binary
const AWS_EXEC_COMMAND: &str = "aws";

/// Timeout applied to every Kubernetes API call
pub const KUBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolved cluster access parameters
#[derive(Clone)]
pub struct Kubeconfig {
    pub rest_config: Config,
    pub cluster_name: String,
    pub region: String,
    pub profile: String,
}

impl fmt::Debug for Kubeconfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kubeconfig")
            .field("cluster_url", &self.rest_config.cluster_url.to_string())
            .field("cluster_name", &self.cluster_name)
            .field("region", &self.region)
            .field("profile", &self.profile)
            .finish()
    }
}

impl fmt::Display for Kubeconfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster name: {} region {}", self.cluster_name, self.region)
    }
}

/// Exec credential plugin of the active context
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecCredential {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ExecCredential {
    pub fn region(&self) -> String {
        match flag_value(&self.args, "--region") {
            "" => self.env.get("AWS_REGION").cloned().unwrap_or_default(),
            v => v.to_string(),
        }
    }

    pub fn profile(&self) -> String {
        match flag_value(&self.args, "--profile") {
            "" => self.env.get("AWS_PROFILE").cloned().unwrap_or_default(),
            v => v.to_string(),
        }
    }

    pub fn cluster_name(&self) -> String {
        flag_value(&self.args, "--cluster-name").to_string()
    }

    fn is_aws(&self) -> bool {
        Path::new(&self.command)
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == AWS_EXEC_COMMAND)
            .unwrap_or(false)
    }
}

/// Value following `flag` in `args`, empty if the flag is absent or has no value
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> &'a str {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("")
}

/// Exec credential plugin of the current context
pub fn active_exec_credential(kubeconfig: &KubeconfigFile) -> Result<ExecCredential> {
    let context_name = kubeconfig
        .current_context
        .clone()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Iam4saError::Config("current-context is not set".to_string()))?;

    let context = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .ok_or_else(|| Iam4saError::Config(format!("context {context_name} not found")))?;
    let user_name: Option<String> = context
        .context
        .as_ref()
        .and_then(|c| c.user.clone().into());

    let exec = user_name.and_then(|user_name| {
        kubeconfig
            .auth_infos
            .iter()
            .find(|a| a.name == user_name)
            .and_then(|a| a.auth_info.as_ref())
            .and_then(|a| a.exec.as_ref())
    });

    let Some(exec) = exec else {
        return Err(Iam4saError::ExecNotConfigured {
            context: context_name,
        });
    };

    let command: Option<String> = exec.command.clone().into();
    let credential = ExecCredential {
        command: command.unwrap_or_default(),
        args: exec.args.clone().unwrap_or_default(),
        env: exec
            .env
            .iter()
            .flatten()
            .filter_map(|entry| Some((entry.get("name")?.clone(), entry.get("value")?.clone())))
            .collect(),
    };

    if credential.command.is_empty() {
        return Err(Iam4saError::ExecNotConfigured {
            context: context_name,
        });
    }
    if !credential.is_aws() {
        return Err(Iam4saError::UnexpectedExecCommand {
            command: credential.command,
            context: context_name,
        });
    }

    Ok(credential)
}

/// Load the kubeconfig at `path` and resolve cluster access parameters
pub async fn load_kubeconfig(path: &Path) -> Result<Kubeconfig> {
    let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
        Iam4saError::Config(format!("read kubeconfig {}: {e}", path.display()))
    })?;

    let file = KubeconfigFile::from_yaml(&yaml)
        .map_err(|e| Iam4saError::Config(format!("raw config: {e}")))?;
    let exec = active_exec_credential(&file)?;

    let mut rest_config = Config::from_custom_kubeconfig(file, &KubeConfigOptions::default())
        .await
        .map_err(|e| Iam4saError::Config(format!("client config: {e}")))?;
    rest_config.connect_timeout = Some(KUBE_TIMEOUT);
    rest_config.read_timeout = Some(KUBE_TIMEOUT);

    Ok(Kubeconfig {
        rest_config,
        cluster_name: exec.cluster_name(),
        region: exec.region(),
        profile: exec.profile(),
    })
}
