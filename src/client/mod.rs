//! Kubernetes client construction

use crate::error::{Iam4saError, Result};
use crate::kubeconfig::Kubeconfig;
use kube::Client;

/// Create a Kubernetes client for the resolved kubeconfig
pub fn create_client(kubeconfig: &Kubeconfig) -> Result<Client> {
    Client::try_from(kubeconfig.rest_config.clone()).map_err(Iam4saError::from)
}
