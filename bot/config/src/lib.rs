//! Process-environment configuration.
//!
//! Everything is read once at startup from `QUAVER_*` variables with
//! sensible defaults; only the Discord token is required.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use quaver_core::BotError;

/// Quaver runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Discord bot token. Required; startup fails without it.
    pub discord_token: Option<String>,
    /// Prefix character for text commands.
    pub command_prefix: char,
    /// Catalog (Spotify) application credentials. Optional; catalog-link
    /// resolution is disabled when absent.
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    /// Cookie file handed to the search backend for access-restricted
    /// content.
    pub cookie_file: Option<String>,
    /// Path of the yt-dlp binary.
    pub ytdlp_bin: String,
    /// Voice-channel join timeout, seconds.
    pub join_timeout_secs: u64,
    /// Max concurrent search subprocesses.
    pub search_concurrency: usize,
    /// Max upcoming titles shown by queue_list.
    pub queue_display_limit: usize,
    /// Per-guild play cooldown window, seconds.
    pub play_cooldown_secs: u64,
    /// Connect timeout for the audio stream client, seconds.
    pub stream_connect_timeout_secs: u64,
    /// Log level when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: None,
            command_prefix: '*',
            spotify_client_id: None,
            spotify_client_secret: None,
            cookie_file: None,
            ytdlp_bin: "yt-dlp".to_string(),
            join_timeout_secs: 3,
            search_concurrency: 4,
            queue_display_limit: 5,
            play_cooldown_secs: 5,
            stream_connect_timeout_secs: 5,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load configuration from a provided variable map (useful for
    /// testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            discord_token: non_empty(vars.get("QUAVER_DISCORD_TOKEN")),
            command_prefix: vars
                .get("QUAVER_COMMAND_PREFIX")
                .and_then(|p| {
                    let mut chars = p.chars();
                    let first = chars.next();
                    if chars.next().is_some() {
                        warn!(value = %p, "QUAVER_COMMAND_PREFIX longer than one character, using first");
                    }
                    first
                })
                .unwrap_or(defaults.command_prefix),
            spotify_client_id: non_empty(vars.get("QUAVER_SPOTIFY_CLIENT_ID")),
            spotify_client_secret: non_empty(vars.get("QUAVER_SPOTIFY_CLIENT_SECRET")),
            cookie_file: non_empty(vars.get("QUAVER_COOKIE_FILE")),
            ytdlp_bin: vars
                .get("QUAVER_YTDLP_BIN")
                .cloned()
                .unwrap_or(defaults.ytdlp_bin),
            join_timeout_secs: parse_or(vars.get("QUAVER_JOIN_TIMEOUT_SECS"), defaults.join_timeout_secs),
            search_concurrency: parse_or(
                vars.get("QUAVER_SEARCH_CONCURRENCY"),
                defaults.search_concurrency,
            ),
            queue_display_limit: parse_or(
                vars.get("QUAVER_QUEUE_DISPLAY_LIMIT"),
                defaults.queue_display_limit,
            ),
            play_cooldown_secs: parse_or(
                vars.get("QUAVER_PLAY_COOLDOWN_SECS"),
                defaults.play_cooldown_secs,
            ),
            stream_connect_timeout_secs: parse_or(
                vars.get("QUAVER_STREAM_CONNECT_TIMEOUT_SECS"),
                defaults.stream_connect_timeout_secs,
            ),
            log_level: vars
                .get("RUST_LOG")
                .cloned()
                .unwrap_or(defaults.log_level),
        }
    }

    /// Check startup requirements. The Discord token is the only fatal
    /// one.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.discord_token.is_none() {
            return Err(BotError::ConfigError(
                "QUAVER_DISCORD_TOKEN is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// The validated Discord token.
    pub fn discord_token(&self) -> Result<&str, BotError> {
        self.discord_token
            .as_deref()
            .ok_or_else(|| BotError::ConfigError("QUAVER_DISCORD_TOKEN is not set".to_string()))
    }

    /// Whether catalog-link resolution can be enabled.
    pub fn has_catalog_credentials(&self) -> bool {
        self.spotify_client_id.is_some() && self.spotify_client_secret.is_some()
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

fn parse_or<T: std::str::FromStr>(value: Option<&String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_applied_without_env() {
        let config = Config::from_vars(&HashMap::new());
        assert_eq!(config.command_prefix, '*');
        assert_eq!(config.ytdlp_bin, "yt-dlp");
        assert_eq!(config.join_timeout_secs, 3);
        assert_eq!(config.queue_display_limit, 5);
        assert!(config.discord_token.is_none());
    }

    #[test]
    fn validate_requires_token() {
        let config = Config::from_vars(&HashMap::new());
        assert!(config.validate().is_err());

        let config = Config::from_vars(&vars(&[("QUAVER_DISCORD_TOKEN", "tok")]));
        assert!(config.validate().is_ok());
        assert_eq!(config.discord_token().unwrap(), "tok");
    }

    #[test]
    fn empty_token_treated_as_missing() {
        let config = Config::from_vars(&vars(&[("QUAVER_DISCORD_TOKEN", "")]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn prefix_takes_first_character() {
        let config = Config::from_vars(&vars(&[("QUAVER_COMMAND_PREFIX", "!x")]));
        assert_eq!(config.command_prefix, '!');
    }

    #[test]
    fn numeric_overrides_parse() {
        let config = Config::from_vars(&vars(&[
            ("QUAVER_JOIN_TIMEOUT_SECS", "10"),
            ("QUAVER_SEARCH_CONCURRENCY", "2"),
            ("QUAVER_PLAY_COOLDOWN_SECS", "9"),
        ]));
        assert_eq!(config.join_timeout_secs, 10);
        assert_eq!(config.search_concurrency, 2);
        assert_eq!(config.play_cooldown_secs, 9);
    }

    #[test]
    fn garbage_numeric_falls_back_to_default() {
        let config = Config::from_vars(&vars(&[("QUAVER_JOIN_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.join_timeout_secs, 3);
    }

    #[test]
    fn catalog_credentials_need_both_halves() {
        let config = Config::from_vars(&vars(&[("QUAVER_SPOTIFY_CLIENT_ID", "id")]));
        assert!(!config.has_catalog_credentials());

        let config = Config::from_vars(&vars(&[
            ("QUAVER_SPOTIFY_CLIENT_ID", "id"),
            ("QUAVER_SPOTIFY_CLIENT_SECRET", "secret"),
        ]));
        assert!(config.has_catalog_credentials());
    }
}
