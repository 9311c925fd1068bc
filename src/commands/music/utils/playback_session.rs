//! Per-guild playback state machine.
//!
//! A session wraps at most one live audio stream. Every transition is made
//! while the caller holds the guild's session lock, so the state seen by one
//! command is never half-written by another.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serenity::model::id::GuildId;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::music_manager::{MusicError, MusicResult, Operation};
use crate::commands::music::audio_sources::track_metadata::TrackRef;

/// Lowest accepted volume percentage
pub const MIN_VOLUME: i64 = 1;
/// Highest accepted volume percentage
pub const MAX_VOLUME: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Sent once a stream finishes, whether it ran out, was stopped or failed.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEnded {
    pub guild_id: GuildId,
    pub serial: u64,
    pub error: Option<String>,
}

/// Handed to a stream so it can report its own end to the session manager.
#[derive(Debug, Clone)]
pub struct EndNotice {
    pub guild_id: GuildId,
    pub serial: u64,
    sender: UnboundedSender<StreamEnded>,
}

impl EndNotice {
    pub fn new(guild_id: GuildId, serial: u64, sender: UnboundedSender<StreamEnded>) -> Self {
        Self {
            guild_id,
            serial,
            sender,
        }
    }

    pub fn send(&self, error: Option<String>) {
        let ended = StreamEnded {
            guild_id: self.guild_id,
            serial: self.serial,
            error,
        };
        // The receiver only goes away on shutdown.
        if self.sender.send(ended).is_err() {
            debug!("Completion channel closed for guild {}", self.guild_id);
        }
    }
}

/// Control surface of a live audio stream.
pub trait AudioStream: Send + Sync + 'static {
    fn pause(&self) -> MusicResult<()>;
    fn resume(&self) -> MusicResult<()>;
    fn set_gain(&self, gain: f32) -> MusicResult<()>;
    fn stop(&self) -> MusicResult<()>;
    /// Arrange for `notice` to be sent when the stream ends.
    fn notify_on_end(&self, notice: EndNotice) -> MusicResult<()>;
}

/// Identifies an in-flight `play` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

pub struct PlaybackSession<S> {
    state: PlaybackState,
    volume: f32,
    current_track: Option<TrackRef>,
    stream: Option<S>,
    serial: u64,
    serials: Arc<AtomicU64>,
    epoch: u64,
    pending: Option<Ticket>,
}

impl<S: AudioStream> PlaybackSession<S> {
    pub fn new(volume: f32) -> Self {
        Self::with_serials(volume, Arc::default())
    }

    /// A session drawing stream serials from a counter shared with other
    /// sessions, so a recreated session never reuses an old stream's serial.
    pub fn with_serials(volume: f32, serials: Arc<AtomicU64>) -> Self {
        Self {
            state: PlaybackState::Idle,
            volume,
            current_track: None,
            stream: None,
            serial: 0,
            serials,
            epoch: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn current_track(&self) -> Option<&TrackRef> {
        self.current_track.as_ref()
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending.is_some()
    }

    /// Register a new `play` request, invalidating any older one.
    pub fn begin_request(&mut self) -> Ticket {
        self.epoch += 1;
        let ticket = Ticket(self.epoch);
        self.pending = Some(ticket);
        ticket
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.pending == Some(ticket)
    }

    /// Drop every outstanding request; their results will be discarded.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
        self.pending = None;
    }

    /// Stop the live stream, if any, without treating idle as an error.
    pub fn halt(&mut self) -> Option<TrackRef> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                warn!("Failed to stop stream: {}", e);
            }
        }
        self.state = PlaybackState::Idle;
        self.current_track.take()
    }

    /// Make `stream` the live stream for `track`, stopping the previous one.
    /// Returns the serial number that identifies the new stream.
    pub fn start(&mut self, track: TrackRef, stream: S) -> u64 {
        if let Some(previous) = self.halt() {
            info!("Replacing '{}' with '{}'", previous.title, track.title);
        }

        if let Err(e) = stream.set_gain(self.volume) {
            warn!("Failed to apply gain {} to new stream: {}", self.volume, e);
        }

        self.serial = self.serials.fetch_add(1, Ordering::Relaxed) + 1;
        self.pending = None;
        self.stream = Some(stream);
        self.current_track = Some(track);
        self.state = PlaybackState::Playing;
        self.serial
    }

    pub fn pause(&mut self) -> MusicResult<()> {
        self.require(Operation::Pause, &[PlaybackState::Playing])?;
        self.live_stream()?.pause()?;
        self.state = PlaybackState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> MusicResult<()> {
        self.require(Operation::Resume, &[PlaybackState::Paused])?;
        self.live_stream()?.resume()?;
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Stop playback and cancel any pending request.
    pub fn stop(&mut self) -> MusicResult<Option<TrackRef>> {
        if self.state == PlaybackState::Idle && self.pending.is_none() {
            return Err(MusicError::InvalidStateForOperation {
                operation: Operation::Stop,
                state: self.state,
            });
        }
        self.invalidate();
        Ok(self.halt())
    }

    /// Set the gain from a percentage in `1..=200`. The gain is untouched on rejection.
    pub fn set_volume(&mut self, percent: i64) -> MusicResult<f32> {
        let gain = gain_from_percent(percent)?;
        self.require(
            Operation::Volume,
            &[PlaybackState::Playing, PlaybackState::Paused],
        )?;
        self.live_stream()?.set_gain(gain)?;
        self.volume = gain;
        Ok(gain)
    }

    /// Return to idle if `serial` still names the live stream.
    pub fn finish(&mut self, serial: u64) -> Option<TrackRef> {
        if serial != self.serial || self.stream.is_none() {
            debug!("Ignoring end of stale stream #{}", serial);
            return None;
        }
        self.stream = None;
        self.state = PlaybackState::Idle;
        self.current_track.take()
    }

    /// Tear the session down: cancel requests and stop the stream.
    pub fn shutdown(&mut self) -> Option<TrackRef> {
        self.invalidate();
        self.halt()
    }

    fn require(&self, operation: Operation, allowed: &[PlaybackState]) -> MusicResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MusicError::InvalidStateForOperation {
                operation,
                state: self.state,
            })
        }
    }

    fn live_stream(&self) -> MusicResult<&S> {
        self.stream
            .as_ref()
            .ok_or_else(|| MusicError::PlaybackError("no live stream".to_string()))
    }
}

/// Convert a volume percentage into a gain multiplier.
pub fn gain_from_percent(percent: i64) -> MusicResult<f32> {
    if (MIN_VOLUME..=MAX_VOLUME).contains(&percent) {
        Ok(percent as f32 / 100.0)
    } else {
        Err(MusicError::OutOfRange { value: percent })
    }
}
