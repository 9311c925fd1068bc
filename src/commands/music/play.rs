use super::*;
use tracing::info;

/// Plays audio from YouTube (URL or search query)
#[poise::command(prefix_command, slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"]
    #[rest]
    query: Option<String>,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let query = query.unwrap_or_default();
    info!("Received play command with query: {}", query);

    // Resolving can take a few seconds; show the typing indicator meanwhile
    ctx.defer_or_broadcast().await?;

    let data = ctx.data();
    let result = data
        .music
        .play(
            &gateway(ctx),
            data.resolver.as_ref(),
            guild_id,
            ctx.author().id,
            &query,
        )
        .await;
    respond(ctx, result).await
}
