use thiserror::Error;

/// Top-level error type for the Quaver runtime.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("search backend error: {0}")]
    Search(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("unrecognized catalog URL: {0}")]
    UnsupportedCatalogUrl(String),

    #[error("no active track")]
    NoActiveTrack,

    #[error("voice connection failed: {0}")]
    Voice(String),

    #[error("session mailbox closed")]
    MailboxClosed,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
