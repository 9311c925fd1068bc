//! Turns free text or a URL into a playable `TrackRef`.
//!
//! The extraction itself is delegated to an external backend (`yt-dlp`); this
//! module only decides what to ask it for and which result to keep.

/// Submodule defining the `TrackRef` struct produced by resolution.
pub mod track_metadata;
/// Submodule implementing resolution through `yt-dlp`.
pub mod youtube;

use serenity::async_trait;
use url::Url;

use crate::commands::music::utils::music_manager::MusicError;
use track_metadata::TrackRef;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// Prefix the backend understands as "search and return matches".
pub const SEARCH_PREFIX: &str = "ytsearch:";

/// Resolves user input to a single playable track.
///
/// Fails with `NoResultsFound` when a search matches nothing and with
/// `ExtractionError` for any backend fault. Implementations never retry.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, input: &str) -> AudioSourceResult<TrackRef>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// True when the input starts with a scheme the backend can fetch directly.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }

    /// The string handed to the extraction backend for `input`.
    pub fn extraction_target(input: &str) -> String {
        if Self::is_url(input) {
            input.to_string()
        } else {
            format!("{}{}", SEARCH_PREFIX, input)
        }
    }
}
