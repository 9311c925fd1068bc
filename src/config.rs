//! Process configuration, read once from the environment at startup.

use thiserror::Error;

use crate::commands::music::audio_sources::youtube::ExtractorOptions;
use crate::commands::music::utils::transcoder::{PlaybackMode, TranscoderOptions};

const DEFAULT_PREFIX: &str = "-";
const DEFAULT_VOLUME_PERCENT: u32 = 50;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing DISCORD_TOKEN")]
    MissingToken,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub prefix: String,
    /// Gain applied to freshly started streams, as a percentage
    pub default_volume: u32,
    pub extractor: ExtractorOptions,
    pub transcoder: TranscoderOptions,
    pub playback_mode: PlaybackMode,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .or_else(|| lookup("discord_token"))
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let prefix = lookup("COMMAND_PREFIX")
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let default_volume = match lookup("DEFAULT_VOLUME") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(v) if (1..=200).contains(&v) => v,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "DEFAULT_VOLUME",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_VOLUME_PERCENT,
        };

        let playback_mode = match lookup("PLAYBACK_MODE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PLAYBACK_MODE",
                value: raw,
            })?,
            None => PlaybackMode::default(),
        };

        let mut extractor = ExtractorOptions::default();
        if let Some(path) = lookup("YTDLP_PATH") {
            extractor.program = path;
        }

        let mut transcoder = TranscoderOptions::default();
        if let Some(path) = lookup("FFMPEG_PATH") {
            transcoder.program = path;
        }

        Ok(Self {
            discord_token,
            prefix,
            default_volume,
            extractor,
            transcoder,
            playback_mode,
        })
    }

    pub fn default_gain(&self) -> f32 {
        self.default_volume as f32 / 100.0
    }
}
