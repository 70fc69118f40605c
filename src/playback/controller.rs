use super::{MediaBackend, MediaEvent};
use crate::error::MediaError;

/// Single owner of the player. Everything else reads the derived state.
pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    current_time: f64,
    duration: f64,
    playing: bool,
    seeking: bool,
    play_after_seek: bool,
    error: Option<String>,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            current_time: 0.0,
            duration: 0.0,
            playing: false,
            seeking: false,
            play_after_seek: false,
            error: None,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Blocking media error, if one occurred
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Move the play head. With `then_play`, playback starts only after the
    /// backend confirms the seek landed.
    pub fn seek(&mut self, time: f64, then_play: bool) -> Result<(), MediaError> {
        let mut target = time.max(0.0);
        if self.duration > 0.0 {
            target = target.min(self.duration);
        }

        tracing::debug!("Seeking to {:.3} (play after: {})", target, then_play);
        self.backend.seek(target)?;
        self.seeking = true;
        self.play_after_seek = then_play;
        self.current_time = target;
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), MediaError> {
        if self.seeking {
            self.play_after_seek = true;
            return Ok(());
        }
        self.backend.play()
    }

    pub fn pause(&mut self) -> Result<(), MediaError> {
        self.play_after_seek = false;
        self.backend.pause()
    }

    pub fn toggle_pause(&mut self) -> Result<(), MediaError> {
        if self.playing || self.play_after_seek {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn shutdown(&mut self) -> Result<(), MediaError> {
        self.backend.shutdown()
    }

    /// Fold a backend event into the controller state
    pub fn handle(&mut self, event: &MediaEvent) -> Result<(), MediaError> {
        match event {
            MediaEvent::TimeUpdate(time) => {
                self.current_time = *time;
            }
            MediaEvent::DurationChanged(duration) => {
                self.duration = *duration;
            }
            MediaEvent::Seeked => {
                self.seeking = false;
                if self.play_after_seek {
                    self.play_after_seek = false;
                    self.backend.play()?;
                }
            }
            MediaEvent::Paused => self.playing = false,
            MediaEvent::Playing => self.playing = true,
            MediaEvent::Ended => {
                self.playing = false;
            }
            MediaEvent::Error(message) => {
                tracing::error!("Media error: {}", message);
                self.error = Some(message.clone());
                self.playing = false;
                self.seeking = false;
                self.play_after_seek = false;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
