use serde::{Deserialize, Serialize};

/// A resolved track: a human-readable title plus the direct stream URL
/// the output sink consumes. Immutable once resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub stream_url: String,
}

impl Track {
    pub fn new(title: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            stream_url: stream_url.into(),
        }
    }
}

/// One (track-name, artist-name) pair extracted from a catalog resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub artist: String,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
        }
    }

    /// The free-text query handed to the search backend for this entry.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.name, self.artist)
    }
}

/// Point-in-time view of a session's queue state, for display and tests.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    /// Title of the active track, if any.
    pub now_playing: Option<String>,
    /// Upcoming titles in play order.
    pub upcoming: Vec<String>,
    /// Total number of queued (not yet playing) tracks.
    pub queued: usize,
    pub playing: bool,
    pub accepting: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_joins_name_and_artist() {
        let entry = CatalogEntry::new("Harvest Moon", "Neil Young");
        assert_eq!(entry.search_query(), "Harvest Moon Neil Young");
    }

    #[test]
    fn track_serialization_roundtrip() {
        let track = Track::new("Song", "https://cdn.example/a.webm");
        let json = serde_json::to_string(&track).unwrap();
        let back: Track = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title, track.title);
        assert_eq!(back.stream_url, track.stream_url);
    }
}
