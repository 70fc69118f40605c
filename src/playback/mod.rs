pub mod controller;
pub mod looping;
#[cfg(unix)]
pub mod mpv;
pub mod seek;

use crate::error::MediaError;

/// Notifications coming out of the media backend
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    TimeUpdate(f64),
    DurationChanged(f64),
    /// A previously requested seek has landed
    Seeked,
    Paused,
    Playing,
    Ended,
    Error(String),
}

/// Commands the playback controller can issue to a player.
///
/// Implementations report progress asynchronously through `MediaEvent`s.
pub trait MediaBackend {
    fn seek(&mut self, time: f64) -> Result<(), MediaError>;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self) -> Result<(), MediaError>;
    fn shutdown(&mut self) -> Result<(), MediaError>;
}
