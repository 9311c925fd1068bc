use poise::serenity_prelude as serenity;
use serenity::{FullEvent, VoiceState};
use tracing::{info, warn};

use crate::{Data, Error};

pub async fn handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("{} has connected to Discord!", data_about_bot.user.name);
            info!("Bot ID: {}", data_about_bot.user.id);
        }
        FullEvent::VoiceStateUpdate { new, .. } => {
            let bot_id = ctx.cache.current_user().id;
            if let Some(guild_id) = bot_disconnected(new, bot_id) {
                info!("Disconnected from voice in guild {}", guild_id);
                data.music.teardown(guild_id).await;
                release_call(ctx, guild_id).await;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Songbird keeps the `Call` of a kicked bot around; drop it so the next
/// `play` joins afresh.
async fn release_call(ctx: &serenity::Context, guild_id: serenity::GuildId) {
    let Some(manager) = songbird::get(ctx).await else {
        return;
    };
    if manager.get(guild_id).is_some() {
        if let Err(e) = manager.remove(guild_id).await {
            warn!("Failed to release voice call in guild {}: {}", guild_id, e);
        }
    }
}

/// The guild whose voice channel the bot just left, if this update says so.
pub fn bot_disconnected(state: &VoiceState, bot_id: serenity::UserId) -> Option<serenity::GuildId> {
    if state.user_id == bot_id && state.channel_id.is_none() {
        state.guild_id
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn voice_state(user_id: &str, channel_id: Option<&str>) -> VoiceState {
        serde_json::from_value(json!({
            "guild_id": "42",
            "channel_id": channel_id,
            "user_id": user_id,
            "session_id": "abc",
            "deaf": false,
            "mute": false,
            "self_deaf": false,
            "self_mute": false,
            "self_video": false,
            "suppress": false,
            "request_to_speak_timestamp": null
        }))
        .expect("Failed to deserialize test voice state")
    }

    #[test]
    fn test_bot_leaving_is_detected() {
        let bot = serenity::UserId::new(1);
        let state = voice_state("1", None);
        assert_eq!(bot_disconnected(&state, bot), Some(serenity::GuildId::new(42)));
    }

    #[test]
    fn test_bot_moving_is_ignored() {
        let bot = serenity::UserId::new(1);
        let state = voice_state("1", Some("99"));
        assert_eq!(bot_disconnected(&state, bot), None);
    }

    #[test]
    fn test_other_users_are_ignored() {
        let bot = serenity::UserId::new(1);
        let state = voice_state("2", None);
        assert_eq!(bot_disconnected(&state, bot), None);
    }
}
