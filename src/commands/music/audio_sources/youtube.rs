//! Resolves tracks with the `yt-dlp` command-line tool.
//!
//! The retry and timeout budget lives in the options passed to `yt-dlp`; the
//! resolver itself makes exactly one extraction call per request.

use serenity::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use super::{AudioSource, AudioSourceResult, TrackResolver, track_metadata::TrackRef};
use crate::commands::music::utils::music_manager::{MusicError, TRACK_ARGUMENT};

/// Settings forwarded to the extraction backend on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorOptions {
    pub program: String,
    pub format: String,
    pub socket_timeout_secs: u32,
    pub retries: u32,
    pub buffer_size: u64,
    pub http_chunk_size: u64,
    pub force_ipv4: bool,
    pub geo_bypass: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            socket_timeout_secs: 5,
            retries: 10,
            buffer_size: 8 * 1024 * 1024,
            http_chunk_size: 1024 * 1024,
            force_ipv4: true,
            geo_bypass: true,
        }
    }
}

impl ExtractorOptions {
    /// Command-line arguments for extracting `target` without downloading it.
    pub fn args(&self, target: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-check-certificates".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--default-search".to_string(),
            "ytsearch".to_string(),
            "--format".to_string(),
            self.format.clone(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            "--retries".to_string(),
            self.retries.to_string(),
            "--buffer-size".to_string(),
            self.buffer_size.to_string(),
            "--http-chunk-size".to_string(),
            self.http_chunk_size.to_string(),
        ];
        if self.force_ipv4 {
            args.push("--force-ipv4".to_string());
        }
        if self.geo_bypass {
            args.push("--geo-bypass".to_string());
        }
        args.push("--".to_string());
        args.push(target.to_string());
        args
    }
}

/// The external extraction backend.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Return the backend's info dictionary for `target`, never downloading media.
    async fn extract_info(&self, target: &str) -> AudioSourceResult<serde_json::Value>;
}

/// Runs `yt-dlp` as a child process.
pub struct YtDlp {
    options: ExtractorOptions,
}

impl YtDlp {
    pub fn new(options: ExtractorOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn extract_info(&self, target: &str) -> AudioSourceResult<serde_json::Value> {
        let args = self.options.args(target);
        debug!("Running {} {:?}", self.options.program, args);

        let output = Command::new(&self.options.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                MusicError::ExtractionError(format!(
                    "Failed to launch {}: {}",
                    self.options.program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("extractor exited with an error")
                .trim()
                .to_string();
            warn!("{} failed for {}: {}", self.options.program, target, detail);
            return Err(MusicError::ExtractionError(detail));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            MusicError::ExtractionError(format!("Failed to parse video metadata: {}", e))
        })
    }
}

/// Resolver that searches YouTube for plain text and extracts URLs directly.
pub struct YoutubeResolver<E = YtDlp> {
    extractor: E,
}

impl<E: MediaExtractor> YoutubeResolver<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl<E: MediaExtractor> TrackResolver for YoutubeResolver<E> {
    async fn resolve(&self, input: &str) -> AudioSourceResult<TrackRef> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MusicError::MissingArgument(TRACK_ARGUMENT));
        }

        let target = AudioSource::extraction_target(input);
        info!("Resolving track for {}", target);

        let info = self.extractor.extract_info(&target).await?;
        let entry = first_entry(info)?;
        let track = TrackRef::try_from(entry)?;

        info!("Resolved '{}' ({})", track.title, track.canonical_url);
        Ok(track)
    }
}

/// Search results come back as a playlist; keep the first entry.
fn first_entry(info: serde_json::Value) -> AudioSourceResult<serde_json::Value> {
    match info {
        serde_json::Value::Object(mut map) if map.contains_key("entries") => {
            match map.remove("entries") {
                Some(serde_json::Value::Array(entries)) => entries
                    .into_iter()
                    .find(|entry| !entry.is_null())
                    .ok_or(MusicError::NoResultsFound),
                _ => Err(MusicError::NoResultsFound),
            }
        }
        serde_json::Value::Null => Err(MusicError::NoResultsFound),
        other => Ok(other),
    }
}
