use super::*;
use super::utils::music_manager::VOLUME_ARGUMENT;

/// Adjusts the volume (1-200)
#[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume percentage (1-200)"] level: Option<i64>,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let Some(level) = level else {
        return Err(MusicError::MissingArgument(VOLUME_ARGUMENT).into());
    };

    let result = ctx.data().music.volume(guild_id, level).await;
    respond(ctx, result).await
}
