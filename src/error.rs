use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Usage store unavailable: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Usage store path is not configured")]
    StorePathMissing,

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub(crate) enum RegistryError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
