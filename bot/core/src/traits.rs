use async_trait::async_trait;

use crate::error::BotError;
use crate::types::{CatalogEntry, Track};

/// Search provider: free-text query in, at most one best-match track out.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Resolve a query to its single best match, or `None` when the
    /// provider has no result for it.
    async fn search(&self, query: &str) -> Result<Option<Track>, BotError>;
}

/// Music-catalog API: expands a track/album/playlist URL into ordered
/// (name, artist) pairs.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn tracks_for(&self, url: &str) -> Result<Vec<CatalogEntry>, BotError>;
}

/// The audio output sink. One track is active at a time; completion is
/// reported asynchronously through the session mailbox, never through
/// these return values.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Start streaming a track. Replaces any active track.
    async fn play(&self, track: &Track) -> Result<(), BotError>;
    /// Stop the active track, firing its completion event.
    async fn stop(&self) -> Result<(), BotError>;
    /// Pause the active track. `BotError::NoActiveTrack` if nothing is
    /// playing.
    async fn pause(&self) -> Result<(), BotError>;
    /// Resume the paused track. `BotError::NoActiveTrack` if nothing is
    /// paused.
    async fn resume(&self) -> Result<(), BotError>;
}

/// Where human-readable status lines go (a chat channel in production).
/// Sends are best-effort; failures are logged by the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str);
}
