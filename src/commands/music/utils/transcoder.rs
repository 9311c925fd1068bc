//! Builds songbird inputs for resolved tracks, either through an `ffmpeg`
//! subprocess or songbird's own HTTP reader.

use std::process::{Command, Stdio};
use std::str::FromStr;

use songbird::input::{ChildContainer, HttpRequest, Input, RawAdapter};
use symphonia::core::io::ReadOnlySource;
use tracing::debug;

use super::music_manager::{MusicError, MusicResult};
use crate::commands::music::audio_sources::track_metadata::TrackRef;

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Decode through an `ffmpeg` child process.
    #[default]
    Ffmpeg,
    /// Let songbird fetch and decode the stream in-process.
    Direct,
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ffmpeg" => Ok(Self::Ffmpeg),
            "direct" => Ok(Self::Direct),
            other => Err(format!("unknown playback mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscoderOptions {
    pub program: String,
    /// Options placed before the input, used for reconnect behaviour
    pub before_options: Vec<String>,
    /// Options placed after the input
    pub options: Vec<String>,
}

impl Default for TranscoderOptions {
    fn default() -> Self {
        let split = |s: &str| s.split_whitespace().map(String::from).collect();
        Self {
            program: "ffmpeg".to_string(),
            before_options: split("-reconnect 1 -reconnect_streamed 1 -reconnect_delay_max 5"),
            options: split("-vn"),
        }
    }
}

impl TranscoderOptions {
    /// Arguments that read `locator` and write raw interleaved f32 PCM to stdout.
    pub fn args(&self, locator: &str) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        args.extend(self.before_options.iter().cloned());
        args.push("-i".to_string());
        args.push(locator.to_string());
        args.extend(self.options.iter().cloned());
        args.extend(
            [
                "-f",
                "f32le",
                "-ar",
                &SAMPLE_RATE.to_string(),
                "-ac",
                &CHANNELS.to_string(),
                "pipe:1",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args
    }
}

pub struct Transcoder {
    mode: PlaybackMode,
    options: TranscoderOptions,
    http: reqwest::Client,
}

impl Transcoder {
    pub fn new(mode: PlaybackMode, options: TranscoderOptions, http: reqwest::Client) -> Self {
        Self {
            mode,
            options,
            http,
        }
    }

    /// Create an audio source for `track` without downloading it first.
    pub fn input_for(&self, track: &TrackRef) -> MusicResult<Input> {
        match self.mode {
            PlaybackMode::Ffmpeg => self.spawn_ffmpeg(&track.streamable_locator),
            PlaybackMode::Direct => Ok(HttpRequest::new(
                self.http.clone(),
                track.streamable_locator.clone(),
            )
            .into()),
        }
    }

    fn spawn_ffmpeg(&self, locator: &str) -> MusicResult<Input> {
        let args = self.options.args(locator);
        debug!("Spawning {} {:?}", self.options.program, args);

        let child = Command::new(&self.options.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                MusicError::TranscoderError(format!(
                    "Failed to start {}: {}",
                    self.options.program, e
                ))
            })?;

        let source = ReadOnlySource::new(ChildContainer::from(child));
        Ok(RawAdapter::new(source, SAMPLE_RATE, CHANNELS).into())
    }
}
