//! Output sink over a songbird `Call`.
//!
//! Streams a resolved URL into the guild's voice connection and posts the
//! completion event onto the session mailbox, exactly once per playback
//! attempt, from the driver's End/Error events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serenity::model::id::GuildId;
use songbird::input::HttpRequest;
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use quaver_core::{AudioSink, BotError, SessionMessage, Track};

pub struct SongbirdSink {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    http: reqwest::Client,
    session_tx: mpsc::Sender<SessionMessage>,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(
        manager: Arc<Songbird>,
        guild_id: GuildId,
        http: reqwest::Client,
        session_tx: mpsc::Sender<SessionMessage>,
    ) -> Self {
        Self {
            manager,
            guild_id,
            http,
            session_tx,
            current: Mutex::new(None),
        }
    }

    async fn current_handle(&self) -> Result<TrackHandle, BotError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or(BotError::NoActiveTrack)
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn play(&self, track: &Track) -> Result<(), BotError> {
        let call = self
            .manager
            .get(self.guild_id)
            .ok_or_else(|| BotError::Voice("not connected to a voice channel".to_string()))?;

        // The driver resumes broken streams with ranged requests; the
        // client carries the connect timeout.
        let input = HttpRequest::new(self.http.clone(), track.stream_url.clone());
        let handle = {
            let mut call = call.lock().await;
            call.play_only_input(input.into())
        };

        let fired = Arc::new(AtomicBool::new(false));
        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackEndNotifier {
                        tx: self.session_tx.clone(),
                        fired: Arc::clone(&fired),
                    },
                )
                .map_err(|e| BotError::Voice(format!("failed to attach track event: {e}")))?;
        }

        *self.current.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BotError> {
        let handle = self.current_handle().await?;
        handle
            .stop()
            .map_err(|e| BotError::Voice(format!("stop failed: {e}")))
    }

    async fn pause(&self) -> Result<(), BotError> {
        let handle = self.current_handle().await?;
        let info = handle
            .get_info()
            .await
            .map_err(|_| BotError::NoActiveTrack)?;
        if !matches!(info.playing, PlayMode::Play) {
            return Err(BotError::NoActiveTrack);
        }
        handle
            .pause()
            .map_err(|e| BotError::Voice(format!("pause failed: {e}")))
    }

    async fn resume(&self) -> Result<(), BotError> {
        let handle = self.current_handle().await?;
        let info = handle
            .get_info()
            .await
            .map_err(|_| BotError::NoActiveTrack)?;
        if !matches!(info.playing, PlayMode::Pause) {
            return Err(BotError::NoActiveTrack);
        }
        handle
            .play()
            .map_err(|e| BotError::Voice(format!("resume failed: {e}")))
    }
}

/// Posts the track's completion onto the session mailbox.
///
/// End and Error can both fire for one attempt; the shared flag makes sure
/// the session sees exactly one completion per attempt.
struct TrackEndNotifier {
    tx: mpsc::Sender<SessionMessage>,
    fired: Arc<AtomicBool>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return None;
        }
        let errored = match ctx {
            EventContext::Track(list) => list
                .iter()
                .any(|(state, _)| matches!(state.playing, PlayMode::Errored(_))),
            _ => false,
        };
        debug!(errored, "track completion event");
        if let Err(e) = self.tx.send(SessionMessage::TrackEnded { errored }).await {
            error!(error = %e, "failed to post completion event");
        }
        None
    }
}
