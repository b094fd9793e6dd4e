//! Error types for iam4sa

use thiserror::Error;

/// Main error type for iam4sa
#[derive(Debug, Error)]
pub enum Iam4saError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("exec command is not set in current {context} context, cannot determine cluster name and region")]
    ExecNotConfigured { context: String },

    #[error("unexpected exec command {command} for current {context} context, expected 'aws'")]
    UnexpectedExecCommand { command: String, context: String },

    #[error("{request}: {message}")]
    Aws { request: String, message: String },

    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("TLS connection to {addr} failed: {reason}")]
    TlsConnect { addr: String, reason: String },

    #[error("no certificates returned from {0}")]
    NoCertificates(String),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Iam4saError {
    fn from(e: serde_json::Error) -> Self {
        Iam4saError::Serialization(e.to_string())
    }
}

/// Result type alias for iam4sa
pub type Result<T> = std::result::Result<T, Iam4saError>;

/// Outcome of a lookup that may legitimately find nothing.
///
/// Absence is a reportable state, so it is kept apart from [`Iam4saError`]:
/// a `Result<Lookup<T>>` distinguishes "found", "absent" and "failed to
/// determine".
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn as_found(&self) -> Option<&T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

impl<T: serde::Serialize> serde::Serialize for Lookup<T> {
    /// Serialized as the found value or `null`
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_found().serialize(serializer)
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}
