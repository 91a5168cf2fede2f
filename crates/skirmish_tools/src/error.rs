//! Error type for the tools.

use thiserror::Error;

use skirmish_core::error::BattleError;

/// Result alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Failures surfaced by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The engine rejected something.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// A scenario is internally inconsistent.
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Reading or writing a file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON report encoding failed.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
