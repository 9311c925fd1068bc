use std::sync::Arc;

use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jukebox::commands::music::audio_sources::youtube::{YoutubeResolver, YtDlp};
use jukebox::commands::music::utils::music_manager::{MusicError, MusicManager};
use jukebox::commands::music::utils::transcoder::Transcoder;
use jukebox::config::Config;
use jukebox::{CommandResult, Context, Data, Error, commands, events};

/// Show help for all commands or a single command
#[poise::command(prefix_command, slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Turn command failures into chat replies.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let message = match error.downcast_ref::<MusicError>() {
                Some(music_error) => {
                    warn!("{} failed: {}", ctx.command().name, music_error);
                    music_error.user_message()
                }
                None => {
                    error!("Error in command {}: {}", ctx.command().name, error);
                    format!("❌ Error: {}", error)
                }
            };
            if let Err(e) = ctx.say(message).await {
                error!("Failed to send error reply: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut commands = vec![register(), help()];
    commands.extend(commands::music::commands());

    let (music, completions) = MusicManager::new(config.default_gain());
    let music = Arc::new(music);
    tokio::spawn(Arc::clone(&music).run_completions(completions));

    let http = reqwest::Client::new();
    let data = Data {
        music: Arc::clone(&music),
        resolver: Arc::new(YoutubeResolver::new(YtDlp::new(config.extractor.clone()))),
        transcoder: Transcoder::new(config.playback_mode, config.transcoder.clone(), http),
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    let shard_manager = client.shard_manager.clone();
    let shutdown_music = Arc::clone(&music);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shutdown_music.shutdown_all().await;
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.map_err(Into::into)
}
