//! Per-guild session registry.
//!
//! Sessions are created lazily on the first play in a guild and survive
//! voice disconnects; leaving only resets their state.

use std::collections::HashMap;
use std::sync::Arc;

use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use tokio::sync::Mutex;
use tracing::info;

use quaver_core::{AudioSink, Mailbox, Notifier, SessionHandle};
use quaver_player::PlayerSession;

use crate::notify::ChannelNotifier;
use crate::sink::SongbirdSink;

#[derive(Clone)]
pub struct GuildSession {
    pub handle: SessionHandle,
    pub notifier: Arc<ChannelNotifier>,
}

pub struct SessionRegistry {
    stream_client: reqwest::Client,
    sessions: Mutex<HashMap<GuildId, GuildSession>>,
}

impl SessionRegistry {
    pub fn new(stream_client: reqwest::Client) -> Self {
        Self {
            stream_client,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Existing session for a guild, retargeted to the invoking channel.
    pub async fn get(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<GuildSession> {
        let session = self.sessions.lock().await.get(&guild_id).cloned();
        if let Some(session) = &session {
            session.notifier.set_target(channel_id).await;
        }
        session
    }

    pub async fn get_or_create(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        manager: Arc<Songbird>,
        http: Arc<Http>,
    ) -> GuildSession {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(&guild_id) {
            let session = existing.clone();
            drop(sessions);
            session.notifier.set_target(channel_id).await;
            return session;
        }

        let mailbox = Mailbox::new();
        let notifier = Arc::new(ChannelNotifier::new(http, channel_id));
        let sink = Arc::new(SongbirdSink::new(
            manager,
            guild_id,
            self.stream_client.clone(),
            mailbox.sender(),
        ));
        let handle = PlayerSession::spawn(
            mailbox,
            sink as Arc<dyn AudioSink>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        let session = GuildSession { handle, notifier };
        sessions.insert(guild_id, session.clone());
        info!(guild = %guild_id, "created playback session");
        session
    }
}
