//! Spotify catalog client.
//!
//! Expands track/album/playlist links into ordered (name, artist) pairs
//! through the public Web API, authenticated with an application
//! client-credentials token fetched at startup and refreshed on expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use quaver_core::{BotError, CatalogClient, CatalogEntry};

const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Matches `open.spotify.com/{kind}/{id}` with optional locale segment.
static CATALOG_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"open\.spotify\.com/(?:[a-z-]+/)?(track|album|playlist)/([A-Za-z0-9]+)").unwrap()
});

/// A parsed catalog link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResource {
    Track(String),
    Album(String),
    Playlist(String),
}

/// Extract the resource kind and ID from a catalog URL.
pub fn parse_catalog_url(url: &str) -> Option<CatalogResource> {
    let caps = CATALOG_URL.captures(url)?;
    let id = caps[2].to_string();
    match &caps[1] {
        "track" => Some(CatalogResource::Track(id)),
        "album" => Some(CatalogResource::Album(id)),
        "playlist" => Some(CatalogResource::Playlist(id)),
        _ => None,
    }
}

/// Whether an input string points at the catalog service at all.
pub fn is_catalog_url(input: &str) -> bool {
    input.contains("spotify.com")
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct SpotifyCatalog {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<CachedToken>>,
}

impl SpotifyCatalog {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: RwLock::new(None),
        }
    }

    /// Obtain the first access token. Called once at startup so credential
    /// problems surface immediately.
    pub async fn authenticate(&self) -> Result<(), BotError> {
        self.refresh_token().await?;
        info!("catalog client authenticated");
        Ok(())
    }

    async fn refresh_token(&self) -> Result<String, BotError> {
        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let response = self
            .http
            .post(ACCOUNTS_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| BotError::Catalog(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(BotError::Catalog(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BotError::Catalog(format!("unparseable token response: {e}")))?;

        // Renew a minute early rather than race the expiry.
        let expires_at = Instant::now() + Duration::from_secs(token.expires_in.saturating_sub(60));
        let access = token.access_token.clone();
        *self.token.write().await = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });
        debug!(expires_in = token.expires_in, "catalog token refreshed");
        Ok(access)
    }

    async fn bearer(&self) -> Result<String, BotError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }
        self.refresh_token().await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BotError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| BotError::Catalog(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(BotError::Catalog(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BotError::Catalog(format!("unparseable response from {url}: {e}")))
    }
}

// API payload slices. Only the fields the resolver needs.

#[derive(Debug, Deserialize)]
struct ApiTrack {
    name: String,
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumTracksPage {
    items: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTracksPage {
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    // Deleted/local tracks come back null; skipped.
    track: Option<ApiTrack>,
}

fn to_entry(track: ApiTrack) -> CatalogEntry {
    let artist = track
        .artists
        .into_iter()
        .next()
        .map(|a| a.name)
        .unwrap_or_default();
    CatalogEntry::new(track.name, artist)
}

#[async_trait]
impl CatalogClient for SpotifyCatalog {
    async fn tracks_for(&self, url: &str) -> Result<Vec<CatalogEntry>, BotError> {
        let resource = parse_catalog_url(url)
            .ok_or_else(|| BotError::UnsupportedCatalogUrl(url.to_string()))?;

        let entries = match resource {
            CatalogResource::Track(id) => {
                let track: ApiTrack = self.get_json(&format!("{API_BASE}/tracks/{id}")).await?;
                vec![to_entry(track)]
            }
            CatalogResource::Album(id) => {
                let page: AlbumTracksPage = self
                    .get_json(&format!("{API_BASE}/albums/{id}/tracks"))
                    .await?;
                page.items.into_iter().map(to_entry).collect()
            }
            CatalogResource::Playlist(id) => {
                let page: PlaylistTracksPage = self
                    .get_json(&format!("{API_BASE}/playlists/{id}/tracks"))
                    .await?;
                page.items
                    .into_iter()
                    .filter_map(|item| item.track)
                    .map(to_entry)
                    .collect()
            }
        };

        debug!(url = %url, count = entries.len(), "catalog resource expanded");
        Ok(entries)
    }
}
