pub mod commands;
pub mod cooldown;
pub mod handler;
pub mod notify;
pub mod sessions;
pub mod sink;
pub mod voice;

pub use handler::Handler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serenity::prelude::*;
use songbird::SerenityInit;
use tracing::{error, info, warn};

use quaver_config::Config;
use quaver_core::{CatalogClient, SearchBackend};
use quaver_resolver::{SpotifyCatalog, TrackResolver, YtDlpSearch};

/// The Discord-facing bot: builds the resolver from config, wires the
/// gateway client with voice support, and runs until the connection dies.
pub struct DiscordBot {
    config: Config,
}

impl DiscordBot {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn start(&self) -> Result<()> {
        let token = self.config.discord_token()?;

        let search: Arc<dyn SearchBackend> = Arc::new(YtDlpSearch::new(
            self.config.ytdlp_bin.clone(),
            self.config.cookie_file.clone(),
            self.config.search_concurrency,
        ));

        // Catalog credentials are optional: without them catalog links are
        // rejected with a user notice, everything else keeps working.
        let catalog: Option<Arc<dyn CatalogClient>> = match (
            &self.config.spotify_client_id,
            &self.config.spotify_client_secret,
        ) {
            (Some(id), Some(secret)) => {
                let catalog = SpotifyCatalog::new(id.clone(), secret.clone());
                match catalog.authenticate().await {
                    Ok(()) => Some(Arc::new(catalog) as Arc<dyn CatalogClient>),
                    Err(e) => {
                        warn!(error = %e, "catalog authentication failed, catalog links disabled");
                        None
                    }
                }
            }
            _ => {
                warn!("catalog credentials not configured, catalog links disabled");
                None
            }
        };

        let resolver = Arc::new(TrackResolver::new(search, catalog));

        let stream_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.config.stream_connect_timeout_secs))
            .build()?;

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::GUILD_VOICE_STATES
            | GatewayIntents::MESSAGE_CONTENT;

        info!("starting Discord client");
        let mut client = Client::builder(token, intents)
            .event_handler(Handler::new(self.config.clone(), resolver, stream_client))
            .register_songbird()
            .await?;

        if let Err(why) = client.start().await {
            error!("client error: {why:?}");
            anyhow::bail!("Discord client error: {why:?}");
        }

        Ok(())
    }
}
