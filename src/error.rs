use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseMissingSelector(String),

    #[error("Couldn't fetch page {page}: {reason}")]
    SourceFetch { page: usize, reason: String },
    #[error("Nothing to export, the record store is empty.")]
    EmptyExport,
    #[error("Snapshot under '{key}' is corrupt: {reason}")]
    SnapshotCorrupt { key: String, reason: String },

    #[error("The harvester is already running.")]
    AlreadyRunning,
    #[error("The harvester can't be started from status {0}.")]
    InvalidStatus(crate::Status),
    #[error("The source is exhausted (cursor at page {cursor}), reset before starting again.")]
    NotRestartable { cursor: usize },

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Url Error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl Error {
    /// Wraps any failure coming out of a page fetch into a [`Error::SourceFetch`].
    pub fn source_fetch(page: usize, reason: impl std::fmt::Display) -> Self {
        Error::SourceFetch {
            page,
            reason: reason.to_string(),
        }
    }
}
