//! Resource graph error types

use thiserror::Error;

/// Errors raised while assembling, validating or rendering a resource graph
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource already declared: {0}")]
    DuplicateResource(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource '{from}' references undeclared resource '{to}'")]
    DanglingReference { from: String, to: String },

    #[error("Output '{output}' references undeclared resource '{to}'")]
    DanglingOutput { output: String, to: String },

    #[error("Output already declared: {0}")]
    DuplicateOutput(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Secure parameter {path} has no version {version}")]
    SecretVersionMissing { path: String, version: u64 },

    #[error("Context file error: {0}")]
    ContextError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
