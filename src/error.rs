use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MetaprepError {
    #[error("missing config file metaprep.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("malformed genome record: {0}")]
    MalformedRecord(String),

    #[error("invalid assembly level: {0}")]
    InvalidAssemblyLevel(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("{tool} failed: {message}")]
    ToolFailure { tool: String, message: String },

    #[error("failed to parse summary table: {0}")]
    SummaryParse(String),
}
