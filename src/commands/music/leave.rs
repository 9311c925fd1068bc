use super::*;

/// Leaves the voice channel
#[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;

    let result = ctx.data().music.leave(&gateway(ctx), guild_id).await;
    respond(ctx, result).await
}
