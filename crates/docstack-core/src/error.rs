use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("File read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing setting '{0}' in stack definition")]
    MissingSetting(&'static str),

    #[error("Environment '{environment}' does not set '{setting}'")]
    MissingEnvironmentSetting {
        environment: String,
        setting: &'static str,
    },

    #[error("Environment declared twice: {0}")]
    DuplicateEnvironment(String),

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error(
        "Invalid environment identifier '{0}': use a letter followed by letters or digits, at most 32 characters"
    )]
    InvalidEnvironment(String),

    #[error("Config discovery error: {0}")]
    Discovery(#[from] docstack_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, StackError>;
