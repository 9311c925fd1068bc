//! A voice-channel music bot: resolves tracks through `yt-dlp`, streams them
//! through an `ffmpeg` subprocess and keeps one playback session per guild.

use std::sync::Arc;

use songbird::tracks::TrackHandle;

pub mod commands;
pub mod config;
pub mod events;

use commands::music::audio_sources::TrackResolver;
use commands::music::utils::music_manager::MusicManager;
use commands::music::utils::transcoder::Transcoder;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub music: Arc<MusicManager<TrackHandle>>,
    pub resolver: Arc<dyn TrackResolver>,
    pub transcoder: Transcoder,
}
