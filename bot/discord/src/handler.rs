//! Serenity event handler: the command surface.
//!
//! Each command is a thin call into the session handle or resolver; the
//! only logic here is input validation (is the caller in a voice channel,
//! is the bot connected) and reply plumbing.

use std::sync::Arc;
use std::time::Duration;

use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::*;
use tracing::{error, info, warn};

use quaver_config::Config;
use quaver_core::{Notifier, SessionMessage};
use quaver_resolver::TrackResolver;

use crate::commands::{detect_command, format_queue, BotCommand};
use crate::cooldown::{CooldownPolicy, PlayCooldown};
use crate::sessions::SessionRegistry;
use crate::voice;

pub struct Handler {
    config: Config,
    resolver: Arc<TrackResolver>,
    registry: SessionRegistry,
    cooldown: PlayCooldown,
}

impl Handler {
    pub fn new(config: Config, resolver: Arc<TrackResolver>, stream_client: reqwest::Client) -> Self {
        let cooldown = PlayCooldown::new(CooldownPolicy {
            max_invocations: 1,
            window_secs: config.play_cooldown_secs,
        });
        Self {
            config,
            resolver,
            registry: SessionRegistry::new(stream_client),
            cooldown,
        }
    }

    async fn say(&self, ctx: &Context, channel_id: ChannelId, text: &str) {
        if let Err(e) = channel_id.say(&ctx.http, text).await {
            error!(error = %e, "failed to send reply");
        }
    }

    async fn handle_play(&self, ctx: &Context, msg: &Message, guild_id: GuildId, query: String) {
        let check = self.cooldown.check(guild_id.get()).await;
        if !check.allowed {
            self.say(
                ctx,
                msg.channel_id,
                &format!("⏳ Hold on, try play again in {}s.", check.reset_in_secs.max(1)),
            )
            .await;
            return;
        }

        let Some(manager) = songbird::get(ctx).await else {
            error!("songbird voice client not initialized");
            return;
        };

        if !voice::is_connected(&manager, guild_id) {
            // Joining needs the caller to be in a voice channel. The cache
            // guard cannot be held across an await.
            let voice_channel = {
                let Some(guild) = msg.guild(&ctx.cache) else {
                    return;
                };
                guild
                    .voice_states
                    .get(&msg.author.id)
                    .and_then(|vs| vs.channel_id)
            };
            let Some(voice_channel) = voice_channel else {
                self.say(
                    ctx,
                    msg.channel_id,
                    "❌ You need to be in a voice channel to summon me!",
                )
                .await;
                return;
            };

            let timeout = Duration::from_secs(self.config.join_timeout_secs);
            match voice::join_with_timeout(&manager, guild_id, voice_channel, timeout).await {
                Ok(()) => {
                    let name = voice_channel
                        .name(&ctx)
                        .await
                        .unwrap_or_else(|_| "voice".to_string());
                    self.say(ctx, msg.channel_id, &format!("🎶 Joined voice channel: {name}"))
                        .await;
                }
                Err(e) => {
                    warn!(error = %e, "voice join failed");
                    self.say(
                        ctx,
                        msg.channel_id,
                        "❌ Couldn't join the voice channel. Try again.",
                    )
                    .await;
                    return;
                }
            }
        }

        let session = self
            .registry
            .get_or_create(guild_id, msg.channel_id, Arc::clone(&manager), Arc::clone(&ctx.http))
            .await;

        // A new playback request reopens the queue for appends.
        if session.handle.send(SessionMessage::AcceptNew).await.is_err() {
            error!(guild = %guild_id, "session mailbox closed");
            return;
        }

        let notifier = Arc::clone(&session.notifier) as Arc<dyn Notifier>;
        self.resolver
            .resolve_into(&query, &session.handle, &notifier)
            .await;

        match session.handle.snapshot().await {
            Ok(snap) => {
                self.say(
                    ctx,
                    msg.channel_id,
                    &format!("🎶 {} track(s) in the queue.", snap.queued),
                )
                .await;
            }
            Err(e) => error!(error = %e, "snapshot failed"),
        }
    }

    async fn handle_queue_list(&self, ctx: &Context, msg: &Message, guild_id: GuildId) {
        let Some(session) = self.registry.get(guild_id, msg.channel_id).await else {
            self.say(ctx, msg.channel_id, "🎵 The queue is empty!").await;
            return;
        };
        match session.handle.snapshot().await {
            Ok(snap) => {
                self.say(
                    ctx,
                    msg.channel_id,
                    &format_queue(&snap.upcoming, self.config.queue_display_limit),
                )
                .await;
            }
            Err(e) => error!(error = %e, "snapshot failed"),
        }
    }

    async fn handle_leave(&self, ctx: &Context, msg: &Message, guild_id: GuildId) {
        let Some(manager) = songbird::get(ctx).await else {
            error!("songbird voice client not initialized");
            return;
        };
        if !voice::is_connected(&manager, guild_id) {
            self.say(ctx, msg.channel_id, "❌ I'm not in a voice channel!").await;
            return;
        }

        if let Some(session) = self.registry.get(guild_id, msg.channel_id).await {
            let _ = session.handle.send(SessionMessage::Reset).await;
        }
        match voice::leave(&manager, guild_id).await {
            Ok(()) => {
                self.say(
                    ctx,
                    msg.channel_id,
                    "👋 Leaving the voice channel and clearing the queue...",
                )
                .await;
            }
            Err(e) => {
                warn!(error = %e, "voice leave failed");
                self.say(ctx, msg.channel_id, "❌ Couldn't leave the voice channel.")
                    .await;
            }
        }
    }

    /// Session-bound commands: forwarded when a session exists, rejected
    /// with `missing` otherwise.
    async fn forward(
        &self,
        ctx: &Context,
        msg: &Message,
        guild_id: GuildId,
        message: SessionMessage,
        missing: &str,
    ) {
        match self.registry.get(guild_id, msg.channel_id).await {
            Some(session) => {
                if session.handle.send(message).await.is_err() {
                    error!(guild = %guild_id, "session mailbox closed");
                }
            }
            None => self.say(ctx, msg.channel_id, missing).await,
        }
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(command) = detect_command(&msg.content, self.config.command_prefix) else {
            return;
        };
        let Some(guild_id) = msg.guild_id else {
            self.say(&ctx, msg.channel_id, "❌ Commands only work in a server.")
                .await;
            return;
        };
        info!(guild = %guild_id, command = ?command, "command received");

        match command {
            BotCommand::Ping => self.say(&ctx, msg.channel_id, "🏓 Pong!").await,
            BotCommand::Play(query) => self.handle_play(&ctx, &msg, guild_id, query).await,
            BotCommand::QueueList => self.handle_queue_list(&ctx, &msg, guild_id).await,
            BotCommand::Skip => {
                self.forward(
                    &ctx,
                    &msg,
                    guild_id,
                    SessionMessage::Skip,
                    "❌ Nothing is playing right now!",
                )
                .await
            }
            BotCommand::Pause => {
                self.forward(
                    &ctx,
                    &msg,
                    guild_id,
                    SessionMessage::Pause,
                    "❌ Nothing is playing right now!",
                )
                .await
            }
            BotCommand::Resume => {
                self.forward(
                    &ctx,
                    &msg,
                    guild_id,
                    SessionMessage::Resume,
                    "❌ Nothing is paused right now!",
                )
                .await
            }
            BotCommand::Clear => {
                self.forward(
                    &ctx,
                    &msg,
                    guild_id,
                    SessionMessage::Clear,
                    "🗑️ All tracks removed from the queue.",
                )
                .await
            }
            BotCommand::Leave => self.handle_leave(&ctx, &msg, guild_id).await,
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}
