//! Error types for layout persistence and store operations.

use thiserror::Error;

/// Failures of the account settings store that holds the layout document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("layout serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

/// Rejections and failures of layout store operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout is not in edit mode")]
    NotCustomizing,
    #[error("a layout save is already in flight")]
    SaveInFlight,
    #[error(transparent)]
    Store(#[from] StoreError),
}
