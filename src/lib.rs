//! iam4sa - Diagnose IAM roles for Kubernetes service accounts on EKS

pub mod aws;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod k8s;
pub mod kubeconfig;
pub mod output;
pub mod tls;
