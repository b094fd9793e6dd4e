//! Kubernetes service accounts bound to IAM roles

mod service_account;

pub use service_account::*;
