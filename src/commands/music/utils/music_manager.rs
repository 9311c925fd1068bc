use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use dashmap::DashMap;
use serenity::async_trait;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::tracks::TrackHandle;
use songbird::{Call, Songbird};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use super::embedded_messages::MusicReply;
use super::playback_session::{
    AudioStream, EndNotice, PlaybackSession, PlaybackState, StreamEnded,
};
use super::transcoder::Transcoder;
use crate::commands::music::audio_sources::TrackResolver;
use crate::commands::music::audio_sources::track_metadata::TrackRef;

/// Operations that only make sense while something is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pause,
    Resume,
    Stop,
    Volume,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
            Self::Stop => write!(f, "stop"),
            Self::Volume => write!(f, "volume"),
        }
    }
}

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    NotInVoiceChannel,

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Cannot {operation} while {state}")]
    InvalidStateForOperation {
        operation: Operation,
        state: PlaybackState,
    },

    #[error("Volume {value} is outside 1-200")]
    OutOfRange { value: i64 },

    #[error("No results found")]
    NoResultsFound,

    #[error("{0}")]
    ExtractionError(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Transcoder error: {0}")]
    TranscoderError(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("Request was replaced by a newer command")]
    Superseded,
}

impl MusicError {
    /// The line shown in chat when a command fails with this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotInGuild => "❌ This command only works in a server.".to_string(),
            Self::NotInVoiceChannel => "You're not connected to a voice channel!".to_string(),
            Self::NotConnected => "I'm not connected to a voice channel!".to_string(),
            Self::InvalidStateForOperation { operation, .. } => match operation {
                Operation::Resume => "❌ I'm not paused!".to_string(),
                _ => "❌ I'm not playing anything right now!".to_string(),
            },
            Self::OutOfRange { .. } => "❌ Please enter a value between 1 and 200".to_string(),
            Self::NoResultsFound | Self::ExtractionError(_) => {
                format!("❌ Couldn't find or play that song: {}", self)
            }
            Self::MissingArgument(what) => {
                format!("❌ Please provide {} after the command", what)
            }
            Self::Superseded => "⏭️ That request was replaced by a newer command.".to_string(),
            Self::NoVoiceManager
            | Self::JoinError(_)
            | Self::TranscoderError(_)
            | Self::PlaybackError(_) => format!("❌ Error: {}", self),
        }
    }
}

/// What `play` needs after the command name
pub const TRACK_ARGUMENT: &str = "a song name or URL";
/// What `volume` needs after the command name
pub const VOLUME_ARGUMENT: &str = "a volume between 1 and 200";

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Voice connection surface the command router depends on.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    type Stream: AudioStream;

    /// The voice channel `user_id` currently occupies, if any.
    fn user_voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId>;

    async fn is_connected(&self, guild_id: GuildId) -> bool;

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()>;

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Begin streaming `track` on the guild's connection.
    async fn start_stream(&self, guild_id: GuildId, track: &TrackRef) -> MusicResult<Self::Stream>;
}

/// `VoiceGateway` backed by the songbird voice client registered on serenity.
pub struct SongbirdGateway<'a> {
    ctx: &'a Context,
    transcoder: &'a Transcoder,
}

impl<'a> SongbirdGateway<'a> {
    pub fn new(ctx: &'a Context, transcoder: &'a Transcoder) -> Self {
        Self { ctx, transcoder }
    }

    /// Get the Songbird voice client from the context
    pub async fn get_songbird(&self) -> MusicResult<Arc<Songbird>> {
        songbird::get(self.ctx)
            .await
            .ok_or(MusicError::NoVoiceManager)
    }

    /// Get the current voice channel call handle
    pub async fn get_call(&self, guild_id: GuildId) -> MusicResult<Arc<SerenityMutex<Call>>> {
        let songbird = self.get_songbird().await?;
        songbird.get(guild_id).ok_or(MusicError::NotConnected)
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway<'_> {
    type Stream = TrackHandle;

    fn user_voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        let guild = self.ctx.cache.guild(guild_id)?;
        guild.voice_states.get(&user_id)?.channel_id
    }

    /// A kicked bot keeps its `Call` registered, so ask the driver instead.
    async fn is_connected(&self, guild_id: GuildId) -> bool {
        match self.get_call(guild_id).await {
            Ok(call) => call.lock().await.current_connection().is_some(),
            Err(_) => false,
        }
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        let songbird = self.get_songbird().await?;
        songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;
        info!("Joined channel {} in guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        let songbird = self.get_songbird().await?;
        if songbird.get(guild_id).is_none() {
            return Err(MusicError::NotConnected);
        }
        songbird
            .remove(guild_id)
            .await
            .map_err(|e| MusicError::JoinError(format!("Failed to leave voice channel: {}", e)))?;
        info!("Left voice channel in guild {}", guild_id);
        Ok(())
    }

    async fn start_stream(&self, guild_id: GuildId, track: &TrackRef) -> MusicResult<TrackHandle> {
        let call = self.get_call(guild_id).await?;
        let input = self.transcoder.input_for(track)?;
        let mut handler = call.lock().await;
        Ok(handler.play_input(input))
    }
}

type SharedSession<S> = Arc<Mutex<PlaybackSession<S>>>;

/// Routes music commands to per-guild playback sessions.
///
/// Each guild's session sits behind its own lock so commands for one guild
/// commit in order while other guilds proceed independently.
pub struct MusicManager<S> {
    sessions: DashMap<GuildId, SharedSession<S>>,
    default_volume: f32,
    serials: Arc<AtomicU64>,
    completions: UnboundedSender<StreamEnded>,
}

impl<S: AudioStream> MusicManager<S> {
    /// Create a manager and the receiving end of its completion channel.
    pub fn new(default_volume: f32) -> (Self, UnboundedReceiver<StreamEnded>) {
        let (completions, receiver) = mpsc::unbounded_channel();
        let manager = Self {
            sessions: DashMap::new(),
            default_volume,
            serials: Arc::default(),
            completions,
        };
        (manager, receiver)
    }

    /// The session for `guild_id`, if the bot is attached to that guild.
    pub fn session(&self, guild_id: GuildId) -> Option<SharedSession<S>> {
        self.sessions.get(&guild_id).map(|s| Arc::clone(s.value()))
    }

    fn session_or_create(&self, guild_id: GuildId) -> SharedSession<S> {
        let entry = self.sessions.entry(guild_id).or_insert_with(|| {
            debug!("Creating playback session for guild {}", guild_id);
            Arc::new(Mutex::new(PlaybackSession::with_serials(
                self.default_volume,
                Arc::clone(&self.serials),
            )))
        });
        Arc::clone(entry.value())
    }

    fn is_registered(&self, guild_id: GuildId, session: &SharedSession<S>) -> bool {
        self.sessions
            .get(&guild_id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), session))
    }

    pub fn guilds(&self) -> Vec<GuildId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub async fn state(&self, guild_id: GuildId) -> PlaybackState {
        match self.session(guild_id) {
            Some(session) => session.lock().await.state(),
            None => PlaybackState::Idle,
        }
    }

    pub async fn join<G>(
        &self,
        gateway: &G,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<MusicReply>
    where
        G: VoiceGateway<Stream = S>,
    {
        let channel_id = gateway
            .user_voice_channel(guild_id, user_id)
            .ok_or(MusicError::NotInVoiceChannel)?;

        gateway.connect(guild_id, channel_id).await?;
        self.session_or_create(guild_id);
        Ok(MusicReply::Joined(channel_id))
    }

    pub async fn leave<G>(&self, gateway: &G, guild_id: GuildId) -> MusicResult<MusicReply>
    where
        G: VoiceGateway<Stream = S>,
    {
        let connected = gateway.is_connected(guild_id).await;
        self.teardown(guild_id).await;
        if !connected {
            return Err(MusicError::NotConnected);
        }

        gateway.disconnect(guild_id).await?;
        Ok(MusicReply::Left)
    }

    /// Resolve `query` and make it the guild's only live stream.
    pub async fn play<G, R>(
        &self,
        gateway: &G,
        resolver: &R,
        guild_id: GuildId,
        user_id: UserId,
        query: &str,
    ) -> MusicResult<MusicReply>
    where
        G: VoiceGateway<Stream = S>,
        R: TrackResolver + ?Sized,
    {
        let query = query.trim();
        if query.is_empty() {
            return Err(MusicError::MissingArgument(TRACK_ARGUMENT));
        }

        let channel_id = gateway
            .user_voice_channel(guild_id, user_id)
            .ok_or(MusicError::NotInVoiceChannel)?;

        if !gateway.is_connected(guild_id).await {
            info!("Not connected in guild {}, joining {}", guild_id, channel_id);
            gateway.connect(guild_id, channel_id).await?;
        }

        let session = self.session_or_create(guild_id);
        let ticket = session.lock().await.begin_request();

        // Resolution runs unlocked so other commands for this guild stay responsive.
        let resolved = resolver.resolve(query).await;

        let mut guard = session.lock().await;
        if !guard.is_current(ticket) || !self.is_registered(guild_id, &session) {
            info!("Discarding stale resolution for '{}' in guild {}", query, guild_id);
            return Err(MusicError::Superseded);
        }

        let track = match resolved {
            Ok(track) => track,
            Err(e) => {
                guard.invalidate();
                return Err(e);
            }
        };

        // The current stream keeps playing until its replacement exists.
        let stream = match gateway.start_stream(guild_id, &track).await {
            Ok(stream) => stream,
            Err(e) => {
                guard.invalidate();
                return Err(e);
            }
        };

        let serial = guard.start(track.clone(), stream);
        let notice = EndNotice::new(guild_id, serial, self.completions.clone());
        if let Some(stream) = guard.stream() {
            if let Err(e) = stream.notify_on_end(notice) {
                warn!("Could not watch stream #{} for completion: {}", serial, e);
            }
        }

        info!("Now playing '{}' in guild {}", track.title, guild_id);
        Ok(MusicReply::NowPlaying(track))
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<MusicReply> {
        let session = self.require_session(guild_id, Some(Operation::Pause))?;
        session.lock().await.pause()?;
        Ok(MusicReply::Paused)
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<MusicReply> {
        let session = self.require_session(guild_id, Some(Operation::Resume))?;
        session.lock().await.resume()?;
        Ok(MusicReply::Resumed)
    }

    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<MusicReply> {
        let session = self.require_session(guild_id, Some(Operation::Stop))?;
        let stopped = session.lock().await.stop()?;
        if let Some(track) = stopped {
            info!("Stopped '{}' in guild {}", track.title, guild_id);
        }
        Ok(MusicReply::Stopped)
    }

    pub async fn volume(&self, guild_id: GuildId, percent: i64) -> MusicResult<MusicReply> {
        let session = self.require_session(guild_id, None)?;
        let gain = session.lock().await.set_volume(percent)?;
        debug!("Gain for guild {} is now {}", guild_id, gain);
        Ok(MusicReply::Volume(percent))
    }

    /// Drop the guild's session, stopping its stream and cancelling requests.
    pub async fn teardown(&self, guild_id: GuildId) {
        if let Some((_, session)) = self.sessions.remove(&guild_id) {
            if let Some(track) = session.lock().await.shutdown() {
                info!("Ended '{}' while leaving guild {}", track.title, guild_id);
            }
        }
    }

    /// Tear down every session, used on process shutdown.
    pub async fn shutdown_all(&self) {
        let guilds = self.guilds();
        futures::future::join_all(guilds.into_iter().map(|guild_id| self.teardown(guild_id)))
            .await;
    }

    /// Apply a stream completion to its session.
    pub async fn handle_stream_end(&self, ended: StreamEnded) {
        if let Some(e) = &ended.error {
            error!("Playback error in guild {}: {}", ended.guild_id, e);
        }
        let Some(session) = self.session(ended.guild_id) else {
            return;
        };
        if let Some(track) = session.lock().await.finish(ended.serial) {
            info!("Finished '{}' in guild {}", track.title, ended.guild_id);
        }
    }

    /// Drain the completion channel until every sender is gone.
    pub async fn run_completions(self: Arc<Self>, mut receiver: UnboundedReceiver<StreamEnded>) {
        while let Some(ended) = receiver.recv().await {
            self.handle_stream_end(ended).await;
        }
        debug!("Completion channel closed");
    }

    /// Without a session the bot holds no stream, which reads as idle.
    fn require_session(
        &self,
        guild_id: GuildId,
        operation: Option<Operation>,
    ) -> MusicResult<SharedSession<S>> {
        self.session(guild_id).ok_or(match operation {
            Some(operation) => MusicError::InvalidStateForOperation {
                operation,
                state: PlaybackState::Idle,
            },
            None => MusicError::NotConnected,
        })
    }
}
