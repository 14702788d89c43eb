//! Voice-channel connection helpers around the songbird manager.

use std::sync::Arc;
use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use tracing::{info, warn};

use quaver_core::BotError;

/// Join a voice channel, bounded by an explicit timeout.
pub async fn join_with_timeout(
    manager: &Arc<Songbird>,
    guild_id: GuildId,
    channel_id: ChannelId,
    timeout: Duration,
) -> Result<(), BotError> {
    match tokio::time::timeout(timeout, manager.join(guild_id, channel_id)).await {
        Ok(Ok(_call)) => {
            info!(guild = %guild_id, channel = %channel_id, "joined voice channel");
            Ok(())
        }
        Ok(Err(e)) => Err(BotError::Voice(format!("join failed: {e}"))),
        Err(_) => {
            warn!(guild = %guild_id, "voice join timed out");
            // Drop the half-joined call so the next attempt starts clean.
            let _ = manager.remove(guild_id).await;
            Err(BotError::Voice(
                "timed out joining the voice channel".to_string(),
            ))
        }
    }
}

pub fn is_connected(manager: &Arc<Songbird>, guild_id: GuildId) -> bool {
    manager.get(guild_id).is_some()
}

/// Release the guild's voice connection.
pub async fn leave(manager: &Arc<Songbird>, guild_id: GuildId) -> Result<(), BotError> {
    manager
        .remove(guild_id)
        .await
        .map_err(|e| BotError::Voice(format!("leave failed: {e}")))
}
