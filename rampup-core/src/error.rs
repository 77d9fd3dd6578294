use thiserror::Error;

/// Failures of the durable store. A settings-write failure is the only
/// error the presentation layer must surface to the user; cache writes
/// are logged and swallowed at the call site.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Internal failures of the remote fetch collaborator. These never cross
/// the `NewsSource` boundary; adapters log them and return an empty list.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("news api returned status {0}")]
    Api(reqwest::StatusCode),
    #[error("malformed news payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response contained no candidate text")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("a refresh for this partition is already running")]
    AlreadyRunning,
    #[error("unknown company: {0}")]
    UnknownCompany(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
