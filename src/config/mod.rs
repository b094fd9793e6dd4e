//! Invocation configuration for iam4sa
//!
//! Built once from the parsed command line and passed by reference to every
//! command; nothing here is mutated after construction.

use crate::cli::{Cli, LogLevel};
use crate::error::{Iam4saError, Result};
use std::path::PathBuf;

/// Selection of service accounts and cluster access for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Path to the kubeconfig file
    pub kubeconfig: PathBuf,
    pub log_level: LogLevel,
    /// Namespace to query, empty for all namespaces
    pub namespace: String,
    pub label_selector: String,
    pub field_selector: String,
}

impl QueryConfig {
    /// Build the configuration from CLI flags and `get` positional names
    pub fn from_cli(cli: &Cli, names: &[String]) -> Result<Self> {
        let kubeconfig = match &cli.kubeconfig {
            Some(path) => path.clone(),
            None => default_kubeconfig_path()?,
        };

        Ok(Self {
            kubeconfig,
            log_level: cli.log_level,
            namespace: if cli.all_namespaces {
                String::new()
            } else {
                cli.namespace.clone()
            },
            label_selector: cli.label.clone(),
            field_selector: fold_names(&cli.field_selector, names),
        })
    }

    pub fn all_namespaces(&self) -> bool {
        self.namespace.is_empty()
    }
}

/// Append a `metadata.name=<name>` term to the field selector for every name
pub fn fold_names(field_selector: &str, names: &[String]) -> String {
    field_selector
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .chain(names.iter().map(|name| format!("metadata.name={name}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// `~/.kube/config`
pub fn default_kubeconfig_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".kube").join("config"))
        .ok_or_else(|| Iam4saError::Config("Could not determine home directory".to_string()))
}
