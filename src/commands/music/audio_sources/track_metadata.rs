//! Defines `TrackRef`, the immutable result of resolving a query, and the
//! conversion from the extractor's JSON description of a video.

use std::time::Duration;

use serde::Deserialize;

use crate::commands::music::utils::music_manager::MusicError;

/// A resolved, playable track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRef {
    /// The title of the track.
    pub title: String,
    /// Link shown to users.
    pub canonical_url: String,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail_url: Option<String>,
    /// Direct media URL the transcoder reads from.
    pub streamable_locator: String,
    /// The duration of the track, if the extractor reported one.
    pub duration: Option<Duration>,
}

/// The subset of an extractor info dictionary this bot cares about.
#[derive(Debug, Deserialize)]
struct ExtractedInfo {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    extractor_key: Option<String>,
}

impl TryFrom<serde_json::Value> for TrackRef {
    type Error = MusicError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let info: ExtractedInfo = serde_json::from_value(value).map_err(|e| {
            MusicError::ExtractionError(format!("Failed to parse video metadata: {}", e))
        })?;

        let streamable_locator = info.url.clone().ok_or_else(|| {
            MusicError::ExtractionError("No streamable audio format found".to_string())
        })?;

        let is_youtube = info
            .extractor_key
            .as_deref()
            .is_none_or(|key| key.eq_ignore_ascii_case("youtube"));

        let canonical_url = match (&info.id, is_youtube) {
            (Some(id), true) => format!("https://youtu.be/{}", id),
            _ => info
                .webpage_url
                .or(info.original_url)
                .unwrap_or_else(|| streamable_locator.clone()),
        };

        Ok(TrackRef {
            title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
            canonical_url,
            thumbnail_url: info.thumbnail,
            streamable_locator,
            duration: info
                .duration
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        })
    }
}
