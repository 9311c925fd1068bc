use super::*;

/// Stops the current track
#[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let result = ctx.data().music.stop(guild_id).await;
    respond(ctx, result).await
}
