use super::*;

/// Resumes the current track
#[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let result = ctx.data().music.resume(guild_id).await;
    respond(ctx, result).await
}
