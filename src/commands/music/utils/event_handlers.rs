use poise::serenity_prelude as serenity;
use serenity::async_trait;
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Event, EventContext, TrackEvent};
use tracing::debug;

use super::music_manager::{MusicError, MusicResult};
use super::playback_session::{AudioStream, EndNotice};

/// Reports the end of a track back to its playback session
pub struct TrackEndNotifier {
    notice: EndNotice,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            let error = tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            });
            debug!(
                "Track #{} ended in guild {}",
                self.notice.serial, self.notice.guild_id
            );
            self.notice.send(error);
        }
        None
    }
}

fn control_error(e: impl std::fmt::Display) -> MusicError {
    MusicError::PlaybackError(e.to_string())
}

impl AudioStream for TrackHandle {
    fn pause(&self) -> MusicResult<()> {
        TrackHandle::pause(self).map_err(control_error)
    }

    fn resume(&self) -> MusicResult<()> {
        self.play().map_err(control_error)
    }

    fn set_gain(&self, gain: f32) -> MusicResult<()> {
        self.set_volume(gain).map_err(control_error)
    }

    fn stop(&self) -> MusicResult<()> {
        TrackHandle::stop(self).map_err(control_error)
    }

    fn notify_on_end(&self, notice: EndNotice) -> MusicResult<()> {
        self.add_event(
            Event::Track(TrackEvent::Error),
            TrackEndNotifier {
                notice: notice.clone(),
            },
        )
        .map_err(control_error)?;
        self.add_event(Event::Track(TrackEvent::End), TrackEndNotifier { notice })
            .map_err(control_error)
    }
}
