//! Track resolution.
//!
//! Free-text queries resolve to a single best match through the search
//! backend. Catalog URLs expand to (name, artist) pairs first: the first
//! item resolves synchronously so playback starts immediately, the rest
//! resolve in a background task that checks the session's accept flag
//! before every append. Per-item failures are logged and dropped; they
//! never abort sibling items and are never surfaced per-item to the user.

pub mod catalog;
pub mod ytdlp;

pub use catalog::{is_catalog_url, parse_catalog_url, CatalogResource, SpotifyCatalog};
pub use ytdlp::YtDlpSearch;

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use quaver_core::{CatalogClient, Notifier, SearchBackend, SessionHandle, SessionMessage, Track};

pub struct TrackResolver {
    search: Arc<dyn SearchBackend>,
    catalog: Option<Arc<dyn CatalogClient>>,
}

impl TrackResolver {
    pub fn new(search: Arc<dyn SearchBackend>, catalog: Option<Arc<dyn CatalogClient>>) -> Self {
        Self { search, catalog }
    }

    pub fn catalog_enabled(&self) -> bool {
        self.catalog.is_some()
    }

    /// Resolve user input and feed the session's queue.
    ///
    /// Returns once immediate playback is possible: the single match (or
    /// the first catalog item) has been resolved and enqueued. Remaining
    /// catalog items keep resolving in the background.
    pub async fn resolve_into(
        &self,
        input: &str,
        session: &SessionHandle,
        notifier: &Arc<dyn Notifier>,
    ) {
        let request = Uuid::new_v4();
        if is_catalog_url(input) {
            self.resolve_catalog(request, input, session, notifier).await;
        } else {
            debug!(request = %request, query = %input, "resolving free-text query");
            if let Some(track) = self.search_one(request, input).await {
                self.enqueue(session, track).await;
            }
        }
    }

    async fn resolve_catalog(
        &self,
        request: Uuid,
        url: &str,
        session: &SessionHandle,
        notifier: &Arc<dyn Notifier>,
    ) {
        let Some(catalog) = &self.catalog else {
            notifier
                .notify("❌ Catalog links are disabled: no catalog credentials configured.")
                .await;
            return;
        };

        let mut entries = match catalog.tracks_for(url).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(request = %request, url = %url, error = %e, "catalog expansion failed");
                return;
            }
        };
        debug!(request = %request, url = %url, count = entries.len(), "resolving catalog link");
        if entries.is_empty() {
            return;
        }

        // First item resolves synchronously so playback starts now.
        let first = entries.remove(0);
        if let Some(track) = self.search_one(request, &first.search_query()).await {
            self.enqueue(session, track).await;
        }
        if entries.is_empty() {
            return;
        }

        // Remaining items resolve while the first plays. The accept flag
        // is checked before every append so a concurrent clear halts the
        // enrichment instead of repopulating a just-emptied queue.
        let search = Arc::clone(&self.search);
        let session = session.clone();
        tokio::spawn(async move {
            for entry in entries {
                if !session.accepting() {
                    debug!(request = %request, "appends blocked, halting catalog enrichment");
                    return;
                }
                let query = entry.search_query();
                match search.search(&query).await {
                    Ok(Some(track)) => {
                        if !session.accepting() {
                            debug!(request = %request, "appends blocked, halting catalog enrichment");
                            return;
                        }
                        if session.send(SessionMessage::Enqueue(track)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {
                        debug!(request = %request, query = %query, "no match for catalog item")
                    }
                    Err(e) => {
                        warn!(request = %request, query = %query, error = %e, "catalog item search failed, dropping")
                    }
                }
            }
            debug!(request = %request, "catalog enrichment complete");
        });
    }

    async fn search_one(&self, request: Uuid, query: &str) -> Option<Track> {
        match self.search.search(query).await {
            Ok(Some(track)) => {
                debug!(request = %request, query = %query, title = %track.title, "resolved");
                Some(track)
            }
            Ok(None) => {
                debug!(request = %request, query = %query, "no match");
                None
            }
            Err(e) => {
                warn!(request = %request, query = %query, error = %e, "search failed, dropping item");
                None
            }
        }
    }

    async fn enqueue(&self, session: &SessionHandle, track: Track) {
        if !session.accepting() {
            debug!(title = %track.title, "appends blocked, dropping resolved track");
            return;
        }
        if session.send(SessionMessage::Enqueue(track)).await.is_err() {
            warn!("session mailbox closed, dropping resolved track");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use quaver_core::{AudioSink, BotError, CatalogEntry, Mailbox, QueueSnapshot};
    use quaver_player::PlayerSession;

    /// Search backend answering from a fixed map, optionally gated so the
    /// test controls when each lookup may complete.
    struct FakeSearch {
        results: HashMap<String, Track>,
        failing: Vec<String>,
        gate: Option<Semaphore>,
    }

    impl FakeSearch {
        fn answering(entries: &[(&str, &str)]) -> Self {
            Self {
                results: entries
                    .iter()
                    .map(|(q, title)| {
                        (
                            q.to_string(),
                            Track::new(*title, format!("https://cdn.example/{title}")),
                        )
                    })
                    .collect(),
                failing: Vec::new(),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl SearchBackend for FakeSearch {
        async fn search(&self, query: &str) -> Result<Option<Track>, BotError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.failing.iter().any(|q| q == query) {
                return Err(BotError::Search(format!("backend exploded on {query}")));
            }
            Ok(self.results.get(query).cloned())
        }
    }

    struct FakeCatalog {
        entries: Vec<CatalogEntry>,
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn tracks_for(&self, _url: &str) -> Result<Vec<CatalogEntry>, BotError> {
            Ok(self.entries.clone())
        }
    }

    struct NullSink;

    #[async_trait]
    impl AudioSink for NullSink {
        async fn play(&self, _track: &Track) -> Result<(), BotError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), BotError> {
            Ok(())
        }
        async fn pause(&self) -> Result<(), BotError> {
            Ok(())
        }
        async fn resume(&self) -> Result<(), BotError> {
            Ok(())
        }
    }

    struct RecordingNotifier {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    fn spawn_session() -> (SessionHandle, Arc<RecordingNotifier>) {
        let mailbox = Mailbox::new();
        let notifier = Arc::new(RecordingNotifier {
            lines: Mutex::new(Vec::new()),
        });
        let handle = PlayerSession::spawn(
            mailbox,
            Arc::new(NullSink) as Arc<dyn AudioSink>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        (handle, notifier)
    }

    async fn wait_until(
        handle: &SessionHandle,
        pred: impl Fn(&QueueSnapshot) -> bool,
    ) -> QueueSnapshot {
        for _ in 0..200 {
            let snap = handle.snapshot().await.unwrap();
            if pred(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("snapshot condition never reached");
    }

    fn album_entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new("One", "Artist"),
            CatalogEntry::new("Two", "Artist"),
            CatalogEntry::new("Three", "Artist"),
        ]
    }

    #[tokio::test]
    async fn free_text_query_enqueues_single_match() {
        let (handle, notifier) = spawn_session();
        let resolver = TrackResolver::new(
            Arc::new(FakeSearch::answering(&[("despacito", "Despacito")])),
            None,
        );

        resolver
            .resolve_into(
                "despacito",
                &handle,
                &(Arc::clone(&notifier) as Arc<dyn Notifier>),
            )
            .await;

        let snap = wait_until(&handle, |s| s.playing).await;
        assert_eq!(snap.now_playing.as_deref(), Some("Despacito"));
        assert_eq!(snap.queued, 0);
    }

    #[tokio::test]
    async fn unresolvable_query_enqueues_nothing() {
        let (handle, notifier) = spawn_session();
        let resolver = TrackResolver::new(Arc::new(FakeSearch::answering(&[])), None);

        resolver
            .resolve_into(
                "nothing matches this",
                &handle,
                &(Arc::clone(&notifier) as Arc<dyn Notifier>),
            )
            .await;

        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.playing);
        assert_eq!(snap.queued, 0);
    }

    #[tokio::test]
    async fn album_plays_first_and_enqueues_rest() {
        let (handle, notifier) = spawn_session();
        let resolver = TrackResolver::new(
            Arc::new(FakeSearch::answering(&[
                ("One Artist", "One"),
                ("Two Artist", "Two"),
                ("Three Artist", "Three"),
            ])),
            Some(Arc::new(FakeCatalog {
                entries: album_entries(),
            })),
        );

        resolver
            .resolve_into(
                "https://open.spotify.com/album/abc123",
                &handle,
                &(Arc::clone(&notifier) as Arc<dyn Notifier>),
            )
            .await;

        // First item plays immediately; enrichment fills in the rest.
        let snap = wait_until(&handle, |s| s.queued == 2).await;
        assert_eq!(snap.now_playing.as_deref(), Some("One"));
        assert_eq!(snap.upcoming, vec!["Two", "Three"]);
    }

    #[tokio::test]
    async fn failing_sibling_does_not_abort_the_rest() {
        let (handle, notifier) = spawn_session();
        let mut search = FakeSearch::answering(&[
            ("One Artist", "One"),
            ("Three Artist", "Three"),
        ]);
        search.failing.push("Two Artist".to_string());
        let resolver = TrackResolver::new(
            Arc::new(search),
            Some(Arc::new(FakeCatalog {
                entries: album_entries(),
            })),
        );

        resolver
            .resolve_into(
                "https://open.spotify.com/album/abc123",
                &handle,
                &(Arc::clone(&notifier) as Arc<dyn Notifier>),
            )
            .await;

        let snap = wait_until(&handle, |s| s.queued == 1).await;
        assert_eq!(snap.now_playing.as_deref(), Some("One"));
        assert_eq!(snap.upcoming, vec!["Three"]);
    }

    #[tokio::test]
    async fn clear_during_enrichment_halts_appends() {
        let (handle, notifier) = spawn_session();
        let mut search = FakeSearch::answering(&[
            ("One Artist", "One"),
            ("Two Artist", "Two"),
            ("Three Artist", "Three"),
        ]);
        let gate = Semaphore::new(0);
        gate.add_permits(1); // let the first, synchronous lookup through
        search.gate = Some(gate);
        let search = Arc::new(search);
        let resolver = TrackResolver::new(
            Arc::clone(&search) as Arc<dyn SearchBackend>,
            Some(Arc::new(FakeCatalog {
                entries: album_entries(),
            })),
        );

        resolver
            .resolve_into(
                "https://open.spotify.com/album/abc123",
                &handle,
                &(Arc::clone(&notifier) as Arc<dyn Notifier>),
            )
            .await;
        wait_until(&handle, |s| s.playing).await;

        // Clear lands while the remaining lookups are still gated.
        handle.send(SessionMessage::Clear).await.unwrap();
        wait_until(&handle, |s| !s.accepting).await;
        if let Some(gate) = &search.gate {
            gate.add_permits(16);
        }

        // Give the enrichment task every chance to misbehave.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.queued, 0, "no item resolved after clear may be appended");
    }

    #[tokio::test]
    async fn catalog_url_without_credentials_notifies() {
        let (handle, notifier) = spawn_session();
        let resolver = TrackResolver::new(Arc::new(FakeSearch::answering(&[])), None);

        resolver
            .resolve_into(
                "https://open.spotify.com/album/abc123",
                &handle,
                &(Arc::clone(&notifier) as Arc<dyn Notifier>),
            )
            .await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.queued, 0);
        assert!(notifier
            .lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.contains("Catalog links are disabled")));
    }
}
