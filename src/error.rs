use std::io;

use thiserror::Error;

/// Errors surfaced at the input boundary.
///
/// Nothing inside the aggregation itself fails: unparseable cells and
/// undefined statistics degrade to `None`. Only configuration and column
/// resolution problems, plus I/O in the CSV/TOML adapters, reach the caller.
#[derive(Debug, Error)]
pub enum CpkError {
    #[error("column '{column}' for role '{role}' not found in input headers")]
    MissingField { role: &'static str, column: String },
    #[error("input header '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for fallible boundary operations.
pub type Result<T> = std::result::Result<T, CpkError>;
