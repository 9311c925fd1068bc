//! Sample identifiers and tracks used across the integration tests

use jukebox::commands::music::audio_sources::track_metadata::TrackRef;
use serenity::model::id::{ChannelId, GuildId, UserId};

pub const SAMPLE_GUILD_ID: u64 = 555_000_111;
pub const SAMPLE_USER_ID: u64 = 123_456_789;
pub const SAMPLE_CHANNEL_ID: u64 = 987_654_321;

pub fn guild() -> GuildId {
    GuildId::new(SAMPLE_GUILD_ID)
}

pub fn user() -> UserId {
    UserId::new(SAMPLE_USER_ID)
}

pub fn voice_channel() -> ChannelId {
    ChannelId::new(SAMPLE_CHANNEL_ID)
}

/// A resolved track whose fields are derived from `title`
pub fn track(title: &str) -> TrackRef {
    let slug = title.to_lowercase().replace(' ', "-");
    TrackRef {
        title: title.to_string(),
        canonical_url: format!("https://youtu.be/{}", slug),
        thumbnail_url: Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", slug)),
        streamable_locator: format!("https://media.example/{}", slug),
        duration: None,
    }
}

pub fn other_guild() -> GuildId {
    GuildId::new(SAMPLE_GUILD_ID + 1)
}
