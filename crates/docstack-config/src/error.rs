use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Stack definition not found. Checked:\n\
        - current directory: docstack.local.kdl, .docstack.local.kdl, docstack.kdl, .docstack.kdl\n\
        - ./.docstack/ directory\n\
        - ~/.config/docstack/docstack.kdl\n\
        Set DOCSTACK_CONFIG_PATH to point at a file directly"
    )]
    StackFileNotFound,

    #[error("Lookup context not found: {0}\nSet DOCSTACK_CONTEXT_PATH or pass --context")]
    ContextFileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
