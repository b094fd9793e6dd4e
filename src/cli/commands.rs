//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kubectl-iam4sa",
    version,
    about = "Diagnose IAM roles for Kubernetes service accounts",
    long_about = None,
)]
pub struct Cli {
    /// Path to kubeconfig file
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Kubernetes namespace
    #[arg(short = 'n', long, global = true, default_value = "default")]
    pub namespace: String,

    /// All kubernetes namespaces
    #[arg(short = 'A', long, global = true)]
    pub all_namespaces: bool,

    /// Kubernetes label selector
    #[arg(short = 'l', long, global = true, default_value = "")]
    pub label: String,

    /// Kubernetes field selector
    #[arg(long, global = true, default_value = "")]
    pub field_selector: String,

    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for the tracing `EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Get IAM service accounts with role, trust policy and failed events
    Get(GetArgs),

    /// List IAM service accounts
    #[command(alias = "ls")]
    List,

    /// EKS cluster OIDC information
    Cluster,

    /// Print version
    Version,
}

#[derive(Args, Clone)]
pub struct GetArgs {
    /// Service account names (folded into the field selector)
    pub names: Vec<String>,
}
