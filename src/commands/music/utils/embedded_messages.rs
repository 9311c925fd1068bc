use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{ChannelId, Colour, CreateEmbed};

use super::format_duration;
use crate::commands::music::audio_sources::track_metadata::TrackRef;

/// Outcome of a successful music command.
#[derive(Debug, Clone, PartialEq)]
pub enum MusicReply {
    Joined(ChannelId),
    Left,
    NowPlaying(TrackRef),
    Paused,
    Resumed,
    Stopped,
    Volume(i64),
}

impl MusicReply {
    /// Plain text for every reply except the now-playing card.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Joined(channel_id) => Some(format!("🔊 Joined <#{}>", channel_id)),
            Self::Left => Some("👋 Left the voice channel".to_string()),
            Self::NowPlaying(_) => None,
            Self::Paused => Some("⏸️ Playback paused".to_string()),
            Self::Resumed => Some("▶️ Playback resumed".to_string()),
            Self::Stopped => Some("⏹️ Playback stopped".to_string()),
            Self::Volume(percent) => Some(format!("🔊 Volume set to {}%", percent)),
        }
    }

    pub fn into_reply(self) -> CreateReply {
        match self {
            Self::NowPlaying(track) => CreateReply::default().embed(now_playing(&track)),
            other => CreateReply::default().content(other.text().unwrap_or_default()),
        }
    }
}

/// Create an embed for the track that just started
pub fn now_playing(track: &TrackRef) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("🎶 Now Playing")
        .description(format!("[{}]({})", track.title, track.canonical_url))
        .colour(Colour::BLUE);

    if let Some(duration) = track.duration {
        embed = embed.field("Duration", format!("`{}`", format_duration(duration)), true);
    }

    if let Some(thumbnail) = &track.thumbnail_url {
        embed = embed.thumbnail(thumbnail);
    }

    embed
}
