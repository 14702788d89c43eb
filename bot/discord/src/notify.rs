use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use tokio::sync::Mutex;
use tracing::error;

use quaver_core::Notifier;

/// Posts session status lines to a text channel.
///
/// The target follows the conversation: it is retargeted to the channel of
/// the most recent session-bound command.
pub struct ChannelNotifier {
    http: Arc<Http>,
    target: Mutex<ChannelId>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>, target: ChannelId) -> Self {
        Self {
            http,
            target: Mutex::new(target),
        }
    }

    pub async fn set_target(&self, target: ChannelId) {
        *self.target.lock().await = target;
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, text: &str) {
        let target = *self.target.lock().await;
        if let Err(e) = target.say(&self.http, text).await {
            error!(channel = %target, error = %e, "failed to send notification");
        }
    }
}
