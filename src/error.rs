use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Ec2ToolsError {
    // AWS Errors
    #[error("AWS EC2 error: {0}")]
    Ec2(String),

    #[error("AWS Service Quotas error: {0}")]
    ServiceQuotas(String),

    #[error("AWS credentials not found or invalid")]
    AwsCredentials,

    // Lookup Errors
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Instance type '{requested}' not found. Offered in this region: {}", .valid.join(", "))]
    InstanceTypeNotFound { requested: String, valid: Vec<String> },

    #[error("Quota '{requested}' not found. Valid quota names: {}", .valid.join(", "))]
    QuotaNotFound { requested: String, valid: Vec<String> },

    #[error("Ambiguous arguments: {0}")]
    AmbiguousArguments(String),

    // SSH Config Errors
    #[error("SSH config file not found: {}", .0.display())]
    SshConfigNotFound(PathBuf),

    // Query Errors
    #[error("Query error: {0}")]
    Query(String),

    // Config Errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    // Timeout
    #[error("Timeout occurred (t > {timeout_secs} s)")]
    Timeout { timeout_secs: u64 },

    // File/IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl Ec2ToolsError {
    pub fn ec2(err: impl std::fmt::Display) -> Self {
        Ec2ToolsError::Ec2(err.to_string())
    }

    pub fn service_quotas(err: impl std::fmt::Display) -> Self {
        Ec2ToolsError::ServiceQuotas(err.to_string())
    }

    pub fn query(err: impl std::fmt::Display) -> Self {
        Ec2ToolsError::Query(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Ec2ToolsError>;
