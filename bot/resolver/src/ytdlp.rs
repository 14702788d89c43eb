//! Search backend driving the `yt-dlp` binary.
//!
//! One best match per query (`ytsearch1:` default search), playlists
//! suppressed, best-audio format, JSON dump on stdout. Subprocess spawns
//! are bounded by a semaphore so a burst of resolutions cannot fork-bomb
//! the host.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use quaver_core::{BotError, SearchBackend, Track};

pub struct YtDlpSearch {
    bin: String,
    cookie_file: Option<String>,
    permits: Arc<Semaphore>,
}

impl YtDlpSearch {
    pub fn new(bin: impl Into<String>, cookie_file: Option<String>, concurrency: usize) -> Self {
        Self {
            bin: bin.into(),
            cookie_file,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Run `<bin> --version`, for startup checks.
    pub async fn version(&self) -> Result<String, BotError> {
        let output = Command::new(&self.bin)
            .arg("--version")
            .output()
            .await
            .map_err(|e| BotError::Search(format!("failed to run {}: {e}", self.bin)))?;
        if !output.status.success() {
            return Err(BotError::Search(format!(
                "{} --version exited with {}",
                self.bin, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl SearchBackend for YtDlpSearch {
    async fn search(&self, query: &str) -> Result<Option<Track>, BotError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BotError::Search("search pool closed".to_string()))?;

        let mut cmd = Command::new(&self.bin);
        cmd.arg("--default-search")
            .arg("ytsearch1:")
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--format")
            .arg("bestaudio/best")
            .arg("--dump-json");
        if let Some(cookies) = &self.cookie_file {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(query);

        debug!(query = %query, "running search backend");
        let output = cmd
            .output()
            .await
            .map_err(|e| BotError::Search(format!("failed to spawn {}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(query = %query, status = %output.status, "search backend failed");
            return Err(BotError::Search(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                stderr.lines().last().unwrap_or("")
            )));
        }

        parse_dump(&output.stdout)
    }
}

/// The slice of yt-dlp's JSON dump we care about.
#[derive(Debug, Deserialize)]
struct DumpEntry {
    title: String,
    #[serde(default)]
    url: Option<String>,
}

/// Parse the first JSON object from a `--dump-json` stdout. Empty output
/// means the search had no result.
fn parse_dump(stdout: &[u8]) -> Result<Option<Track>, BotError> {
    let text = String::from_utf8_lossy(stdout);
    let Some(line) = text.lines().find(|l| !l.trim().is_empty()) else {
        return Ok(None);
    };

    let entry: DumpEntry = serde_json::from_str(line)
        .map_err(|e| BotError::Search(format!("unparseable search output: {e}")))?;

    match entry.url {
        Some(url) => Ok(Some(Track::new(entry.title, url))),
        None => {
            warn!(title = %entry.title, "search result carried no stream URL");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_dump_line() {
        let stdout = br#"{"title": "Never Gonna Give You Up", "url": "https://cdn.example/a.m4a", "duration": 212}"#;
        let track = parse_dump(stdout).unwrap().unwrap();
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.stream_url, "https://cdn.example/a.m4a");
    }

    #[test]
    fn empty_output_is_no_result() {
        assert!(parse_dump(b"").unwrap().is_none());
        assert!(parse_dump(b"\n\n").unwrap().is_none());
    }

    #[test]
    fn entry_without_url_is_no_result() {
        let stdout = br#"{"title": "geo-blocked thing"}"#;
        assert!(parse_dump(stdout).unwrap().is_none());
    }

    #[test]
    fn garbage_output_is_an_error() {
        assert!(parse_dump(b"not json at all").is_err());
    }
}
