use super::*;

/// Pauses the current track
#[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let result = ctx.data().music.pause(guild_id).await;
    respond(ctx, result).await
}
