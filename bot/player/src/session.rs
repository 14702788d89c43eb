//! Per-guild playback session.
//!
//! The session is an actor: queue, playing flag, and accept flag live in a
//! single task consuming the mailbox, so user commands and the sink's
//! completion events are serialized without locks. Two states: Idle
//! (nothing active) and Playing (exactly one active track). A skip stops
//! the sink, whose completion event drives the same advance as natural
//! completion.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use quaver_core::{
    AudioSink, BotError, Mailbox, Notifier, QueueSnapshot, SessionHandle, SessionMessage, Track,
};

use crate::queue::TrackQueue;

pub struct PlayerSession {
    queue: TrackQueue,
    playing: bool,
    current: Option<Track>,
    accept_tx: watch::Sender<bool>,
    rx: mpsc::Receiver<SessionMessage>,
    sink: Arc<dyn AudioSink>,
    notifier: Arc<dyn Notifier>,
}

impl PlayerSession {
    /// Consume a fresh mailbox and spawn the session task, returning the
    /// handle producers use.
    pub fn spawn(
        mut mailbox: Mailbox,
        sink: Arc<dyn AudioSink>,
        notifier: Arc<dyn Notifier>,
    ) -> SessionHandle {
        let handle = mailbox.handle();
        let rx = mailbox.take_rx().expect("mailbox rx already taken");
        let accept_tx = mailbox
            .take_accept_tx()
            .expect("mailbox accept publisher already taken");

        let session = Self {
            queue: TrackQueue::new(),
            playing: false,
            current: None,
            accept_tx,
            rx,
            sink,
            notifier,
        };
        tokio::spawn(session.run());
        handle
    }

    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            self.handle_message(msg).await;
        }
        debug!("session mailbox closed, stopping");
    }

    async fn handle_message(&mut self, msg: SessionMessage) {
        match msg {
            SessionMessage::Enqueue(track) => self.handle_enqueue(track).await,
            SessionMessage::AcceptNew => self.set_accepting(true),
            SessionMessage::Skip => self.handle_skip().await,
            SessionMessage::Pause => self.handle_pause().await,
            SessionMessage::Resume => self.handle_resume().await,
            SessionMessage::Clear => self.handle_clear().await,
            SessionMessage::Reset => self.handle_reset(),
            SessionMessage::TrackEnded { errored } => self.handle_track_ended(errored).await,
            SessionMessage::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn accepting(&self) -> bool {
        *self.accept_tx.borrow()
    }

    fn set_accepting(&self, accepting: bool) {
        // send_replace updates the value even with no live receivers.
        self.accept_tx.send_replace(accepting);
    }

    async fn handle_enqueue(&mut self, track: Track) {
        if !self.accepting() {
            debug!(title = %track.title, "appends blocked, dropping track");
            return;
        }
        self.queue.push(track);
        if !self.playing {
            self.advance().await;
        }
    }

    /// Pop the queue head and start it, dropping tracks the sink rejects,
    /// until something plays or the queue runs dry.
    async fn advance(&mut self) {
        while let Some(track) = self.queue.pop() {
            match self.sink.play(&track).await {
                Ok(()) => {
                    self.playing = true;
                    info!(title = %track.title, "now playing");
                    self.notifier
                        .notify(&format!("🎵 Now playing: {}", track.title))
                        .await;
                    self.current = Some(track);
                    return;
                }
                Err(e) => {
                    warn!(error = %e, title = %track.title, "output sink rejected track, skipping");
                }
            }
        }
        self.playing = false;
        self.current = None;
        self.notifier.notify("✅ Queue finished.").await;
    }

    async fn handle_track_ended(&mut self, errored: bool) {
        if !self.playing {
            // Late event from a torn-down track.
            debug!("completion event while idle, ignoring");
            return;
        }
        if errored {
            let title = self.current.as_ref().map_or("<unknown>", |t| t.title.as_str());
            warn!(title = %title, "playback ended with an error, advancing");
        }
        self.current = None;
        self.advance().await;
    }

    async fn handle_skip(&mut self) {
        if !self.playing {
            self.notifier.notify("❌ Nothing is playing right now!").await;
            return;
        }
        // Stopping fires the sink's completion event, which drives the
        // same advance path as natural completion.
        match self.sink.stop().await {
            Ok(()) => self.notifier.notify("⏭ Track skipped!").await,
            Err(e) => warn!(error = %e, "failed to stop active track"),
        }
    }

    async fn handle_pause(&mut self) {
        match self.sink.pause().await {
            Ok(()) => self.notifier.notify("⏸ Track paused!").await,
            Err(BotError::NoActiveTrack) => {
                self.notifier.notify("❌ Nothing is playing right now!").await;
            }
            Err(e) => warn!(error = %e, "pause failed"),
        }
    }

    async fn handle_resume(&mut self) {
        match self.sink.resume().await {
            Ok(()) => self.notifier.notify("▶️ Track resumed!").await,
            Err(BotError::NoActiveTrack) => {
                self.notifier.notify("❌ Nothing is paused right now!").await;
            }
            Err(e) => warn!(error = %e, "resume failed"),
        }
    }

    async fn handle_clear(&mut self) {
        self.queue.clear();
        self.set_accepting(false);
        self.notifier
            .notify("🗑️ All tracks removed from the queue.")
            .await;
    }

    /// Leaving voice: drop everything. The active track dies with the
    /// voice connection, so its late completion event is ignored.
    fn handle_reset(&mut self) {
        self.queue.clear();
        self.set_accepting(false);
        self.playing = false;
        self.current = None;
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            now_playing: self.current.as_ref().map(|t| t.title.clone()),
            upcoming: self.queue.titles(),
            queued: self.queue.len(),
            playing: self.playing,
            accepting: self.accepting(),
        }
    }
}
