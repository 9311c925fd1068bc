//! In-memory stand-ins for the voice gateway and the track resolver

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jukebox::commands::music::audio_sources::TrackResolver;
use jukebox::commands::music::audio_sources::track_metadata::TrackRef;
use jukebox::commands::music::utils::music_manager::{MusicError, MusicResult, VoiceGateway};
use jukebox::commands::music::utils::playback_session::{AudioStream, EndNotice};
use mockall::mock;
use serenity::model::id::{ChannelId, GuildId, UserId};
use tokio::sync::Notify;

use super::fixtures;

mock! {
    pub Resolver {}

    #[async_trait]
    impl TrackResolver for Resolver {
        async fn resolve(&self, input: &str) -> MusicResult<TrackRef>;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamOp {
    Pause,
    Resume,
    Gain(f32),
    Stop,
}

/// Records every control call made against it.
#[derive(Clone)]
pub struct FakeStream {
    pub title: String,
    ops: Arc<Mutex<Vec<StreamOp>>>,
    notice: Arc<Mutex<Option<EndNotice>>>,
}

impl FakeStream {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ops: Arc::default(),
            notice: Arc::default(),
        }
    }

    pub fn ops(&self) -> Vec<StreamOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.ops().contains(&StreamOp::Stop)
    }

    /// Simulate the transcoder exiting on its own.
    pub fn finish(&self, error: Option<&str>) {
        if let Some(notice) = self.notice.lock().unwrap().as_ref() {
            notice.send(error.map(String::from));
        }
    }

    fn record(&self, op: StreamOp) -> MusicResult<()> {
        self.ops.lock().unwrap().push(op);
        Ok(())
    }
}

impl AudioStream for FakeStream {
    fn pause(&self) -> MusicResult<()> {
        self.record(StreamOp::Pause)
    }

    fn resume(&self) -> MusicResult<()> {
        self.record(StreamOp::Resume)
    }

    fn set_gain(&self, gain: f32) -> MusicResult<()> {
        self.record(StreamOp::Gain(gain))
    }

    fn stop(&self) -> MusicResult<()> {
        self.record(StreamOp::Stop)
    }

    fn notify_on_end(&self, notice: EndNotice) -> MusicResult<()> {
        *self.notice.lock().unwrap() = Some(notice);
        Ok(())
    }
}

/// Gateway that keeps connections and streams in memory.
#[derive(Default)]
pub struct FakeGateway {
    voice_states: Mutex<HashMap<UserId, ChannelId>>,
    connections: Mutex<HashMap<GuildId, ChannelId>>,
    streams: Mutex<Vec<FakeStream>>,
    connects: AtomicUsize,
    fail_next_stream: AtomicBool,
}

impl FakeGateway {
    /// A gateway where the sample user sits in the sample voice channel.
    pub fn with_user_in_voice() -> Self {
        let gateway = Self::default();
        gateway
            .voice_states
            .lock()
            .unwrap()
            .insert(fixtures::user(), fixtures::voice_channel());
        gateway
    }

    pub fn connection(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.connections.lock().unwrap().get(&guild_id).copied()
    }

    /// Drop the connection the way a moderator kick or channel delete does.
    pub fn kick(&self, guild_id: GuildId) {
        self.connections.lock().unwrap().remove(&guild_id);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make the next `start_stream` fail as if the transcoder could not spawn.
    pub fn fail_next_stream(&self) {
        self.fail_next_stream.store(true, Ordering::SeqCst);
    }

    pub fn streams(&self) -> Vec<FakeStream> {
        self.streams.lock().unwrap().clone()
    }

    pub fn live_streams(&self) -> Vec<FakeStream> {
        self.streams()
            .into_iter()
            .filter(|s| !s.is_stopped())
            .collect()
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    type Stream = FakeStream;

    fn user_voice_channel(&self, _guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.voice_states.lock().unwrap().get(&user_id).copied()
    }

    async fn is_connected(&self, guild_id: GuildId) -> bool {
        self.connection(guild_id).is_some()
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connections.lock().unwrap().insert(guild_id, channel_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        self.connections
            .lock()
            .unwrap()
            .remove(&guild_id)
            .map(|_| ())
            .ok_or(MusicError::NotConnected)
    }

    async fn start_stream(&self, guild_id: GuildId, track: &TrackRef) -> MusicResult<FakeStream> {
        if self.connection(guild_id).is_none() {
            return Err(MusicError::NotConnected);
        }
        if self.fail_next_stream.swap(false, Ordering::SeqCst) {
            return Err(MusicError::TranscoderError(
                "Failed to start ffmpeg: not found".to_string(),
            ));
        }
        let stream = FakeStream::new(&track.title);
        self.streams.lock().unwrap().push(stream.clone());
        Ok(stream)
    }
}

/// Resolver that holds queries named "slow" until released.
#[derive(Default)]
pub struct GatedResolver {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl TrackResolver for GatedResolver {
    async fn resolve(&self, input: &str) -> MusicResult<TrackRef> {
        if input == "slow" {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(fixtures::track(input))
    }
}
