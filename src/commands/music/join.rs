use super::*;
use tracing::info;

/// Joins your voice channel
#[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    info!("Received join command in guild {}", guild_id);

    let result = ctx
        .data()
        .music
        .join(&gateway(ctx), guild_id, ctx.author().id)
        .await;
    respond(ctx, result).await
}
