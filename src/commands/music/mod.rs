pub mod join;
pub mod leave;
pub mod pause;
pub mod play;
pub mod resume;
pub mod stop;
pub mod volume;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context, Error};
use utils::embedded_messages::MusicReply;
use utils::music_manager::{MusicError, MusicResult, SongbirdGateway};

/// All music commands, in help order.
pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![
        join::join(),
        leave::leave(),
        play::play(),
        pause::pause(),
        resume::resume(),
        stop::stop(),
        volume::volume(),
    ]
}

fn guild_id(ctx: Context<'_>) -> MusicResult<poise::serenity_prelude::GuildId> {
    ctx.guild_id().ok_or(MusicError::NotInGuild)
}

fn gateway(ctx: Context<'_>) -> SongbirdGateway<'_> {
    SongbirdGateway::new(ctx.serenity_context(), &ctx.data().transcoder)
}

/// Send the reply for a finished command; errors go to the framework's error hook.
async fn respond(ctx: Context<'_>, result: MusicResult<MusicReply>) -> CommandResult {
    ctx.send(result?.into_reply()).await?;
    Ok(())
}
