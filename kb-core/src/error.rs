use thiserror::Error;

/// Failures talking to the remote subject catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed catalog response: {0}")]
    MalformedResponse(String),
}

/// Failures in the local preference store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Plain-text form shown to the end user. Catalog failures keep their
    /// message; store failures collapse to a generic line.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Catalog(e) => format!("Error fetching from the catalog: {e}"),
            ServiceError::Store(_) => "Something went wrong saving your preferences.".to_string(),
        }
    }
}
