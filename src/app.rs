use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crate::config::{Config, SeekConfig};
use crate::offsets::{OffsetUpdate, OffsetWorker};
use crate::playback::controller::PlaybackController;
use crate::playback::looping::{LoopAction, LoopController};
use crate::playback::seek::resolve_seek_at;
use crate::playback::{MediaBackend, MediaEvent};
use crate::progress::{ProgressWorker, SaveTrigger};
use crate::subtitle::line::SubtitleLine;
use crate::ui;

/// Where the subtitle lines came from, and where offsets get saved
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(PathBuf),
    Remote { video_id: String },
}

pub struct App<B: MediaBackend> {
    pub title: String,
    pub lines: Vec<SubtitleLine>,
    pub selected_index: usize,
    pub follow_active: bool,
    pub player: PlaybackController<B>,
    pub looper: LoopController,
    pub seek_config: SeekConfig,
    pub status_message: String,
    pub error_message: Option<String>,
    pub dirty_offsets: BTreeSet<usize>,
    pub should_quit: bool,
    offset_step: f64,
    source: Source,
    offsets: Option<OffsetWorker>,
    progress: Option<ProgressWorker>,
    media_rx: Receiver<MediaEvent>,
}

impl<B: MediaBackend> App<B> {
    pub fn new(
        title: String,
        lines: Vec<SubtitleLine>,
        source: Source,
        backend: B,
        media_rx: Receiver<MediaEvent>,
        config: &Config,
    ) -> Self {
        Self {
            title,
            lines,
            selected_index: 0,
            follow_active: true,
            player: PlaybackController::new(backend),
            looper: LoopController::new(&config.looping),
            seek_config: config.seek,
            status_message: String::new(),
            error_message: None,
            dirty_offsets: BTreeSet::new(),
            should_quit: false,
            offset_step: config.player.offset_step,
            source,
            offsets: None,
            progress: None,
            media_rx,
        }
    }

    pub fn with_offsets(mut self, offsets: OffsetWorker) -> Self {
        self.offsets = Some(offsets);
        self
    }

    pub fn with_progress(mut self, progress: ProgressWorker) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
        loop {
            self.process_media_events();
            self.process_offset_reports();
            self.tick_progress();

            terminal.draw(|frame| ui::player::draw(frame, self))?;

            if event::poll(Duration::from_millis(50))? {
                self.handle_event(event::read()?);
            }

            if self.should_quit {
                break;
            }
        }

        self.shutdown();
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key.code),
            Event::FocusLost => self.request_save(SaveTrigger::VisibilityLost),
            _ => {}
        }
    }

    /// Drain everything the player has reported since the last frame
    pub fn process_media_events(&mut self) {
        while let Ok(event) = self.media_rx.try_recv() {
            self.on_media_event(event);
        }
    }

    fn on_media_event(&mut self, event: MediaEvent) {
        if let Err(e) = self.player.handle(&event) {
            self.error_message = Some(format!("Player command failed: {}", e));
        }

        match event {
            MediaEvent::Seeked => self.looper.on_seeked(),
            MediaEvent::TimeUpdate(time) => {
                if self.player.is_seeking() {
                    return;
                }
                let action = self.looper.on_tick(time, self.player.duration(), &self.lines);
                if self.follow_active {
                    if let Some(active) = self.looper.active() {
                        self.selected_index = active;
                    }
                }
                if let Some(action) = action {
                    self.apply(action);
                }
            }
            MediaEvent::Paused => self.request_save(SaveTrigger::Pause),
            MediaEvent::Ended => {
                if let Some(action) = self.looper.on_ended() {
                    self.apply(action);
                } else {
                    self.request_save(SaveTrigger::Pause);
                }
            }
            // A failed load never reports Seeked
            MediaEvent::Error(_) => self.looper.on_seeked(),
            MediaEvent::Playing | MediaEvent::DurationChanged(_) => {}
        }
    }

    fn apply(&mut self, action: LoopAction) {
        let result = match action {
            LoopAction::Seek(time) => self.player.seek(time, true),
            LoopAction::Pause => self.player.pause(),
        };
        if let Err(e) = result {
            self.looper.on_seeked();
            self.error_message = Some(format!("Player command failed: {}", e));
        }
    }

    fn tick_progress(&mut self) {
        if self.player.is_playing() {
            if let Some(progress) = &self.progress {
                progress.tick(self.player.current_time(), self.player.duration());
            }
        }
    }

    fn request_save(&self, trigger: SaveTrigger) {
        if let Some(progress) = &self.progress {
            progress.request(trigger, self.player.current_time(), self.player.duration());
        }
    }

    /// Smart-seek target of the selected line
    pub fn selected_seek_time(&self) -> Option<f64> {
        resolve_seek_at(&self.lines, self.selected_index, &self.seek_config)
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        // A blocking media error swallows keys until dismissed
        if self.player.error().is_some() {
            match key {
                KeyCode::Esc | KeyCode::Enter => self.player.clear_error(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        if self.error_message.is_some() && key != KeyCode::Esc {
            self.error_message = None;
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.error_message = None,
            KeyCode::Up | KeyCode::Char('k') => {
                self.follow_active = false;
                self.selected_index = self.selected_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.follow_active = false;
                if self.selected_index < self.lines.len().saturating_sub(1) {
                    self.selected_index += 1;
                }
            }
            KeyCode::Enter => self.seek_to_selected(),
            KeyCode::Char(' ') => {
                if let Err(e) = self.player.toggle_pause() {
                    self.error_message = Some(format!("Player command failed: {}", e));
                }
            }
            KeyCode::Char('f') => {
                self.follow_active = !self.follow_active;
                if let (true, Some(active)) = (self.follow_active, self.looper.active()) {
                    self.selected_index = active;
                }
            }
            KeyCode::Char('m') => {
                self.looper.toggle_mode();
                self.status_message = format!("Loop mode: {}", self.looper.mode.as_str());
            }
            KeyCode::Char('c') => {
                self.looper.cycle_count();
                self.status_message = format!("Repeat count: {}", self.looper.count.label());
            }
            KeyCode::Char('n') => {
                self.looper.auto_next = !self.looper.auto_next;
                self.status_message = format!("Auto next: {}", on_off(self.looper.auto_next));
            }
            KeyCode::Char('v') => {
                self.looper.video_loop = !self.looper.video_loop;
                self.status_message = format!("Video loop: {}", on_off(self.looper.video_loop));
            }
            KeyCode::Char('[') => self.adjust_offset(-self.offset_step),
            KeyCode::Char(']') => self.adjust_offset(self.offset_step),
            KeyCode::Char('0') => self.set_offset(0.0),
            KeyCode::Char('s') => self.save_offsets(),
            _ => {}
        }
    }

    fn seek_to_selected(&mut self) {
        let Some(time) = self.selected_seek_time() else {
            return;
        };
        self.follow_active = true;
        self.looper.on_manual_seek(Some(self.selected_index));
        if let Err(e) = self.player.seek(time, true) {
            self.looper.on_seeked();
            self.error_message = Some(format!("Seek failed: {}", e));
        }
    }

    fn adjust_offset(&mut self, delta: f64) {
        if let Some(line) = self.lines.get(self.selected_index) {
            let offset = line.seek_offset + delta;
            self.set_offset(offset);
        }
    }

    fn set_offset(&mut self, offset: f64) {
        let index = self.selected_index;
        let Some(line) = self.lines.get_mut(index) else {
            return;
        };
        // Keep offsets on a millisecond grid so repeated steps return to 0 exactly
        let offset = (offset * 1000.0).round() / 1000.0;
        if line.seek_offset == offset {
            return;
        }
        line.seek_offset = offset;
        self.dirty_offsets.insert(index);
        self.status_message = format!("Line {} offset: {:+.2}s (unsaved)", line.sequence, offset);
    }

    /// Persist changed seek offsets to wherever the lines came from
    pub fn save_offsets(&mut self) {
        if self.dirty_offsets.is_empty() {
            self.status_message = "No offset changes to save".to_string();
            return;
        }

        match &self.source {
            Source::File(path) => {
                let target = crate::subtitle::offsets_path(path);
                match crate::subtitle::save_json(&target, &self.lines) {
                    Ok(()) => {
                        self.dirty_offsets.clear();
                        self.status_message = format!("Saved offsets to {}", target.display());
                    }
                    Err(e) => self.error_message = Some(format!("Failed to save offsets: {:#}", e)),
                }
            }
            Source::Remote { .. } => {
                let Some(offsets) = &self.offsets else {
                    self.error_message = Some("Remote backend not configured".to_string());
                    return;
                };
                let batch: Vec<OffsetUpdate> = self
                    .dirty_offsets
                    .iter()
                    .map(|&index| OffsetUpdate {
                        index,
                        sequence: self.lines[index].sequence,
                        seek_offset: self.lines[index].seek_offset,
                    })
                    .collect();
                let count = batch.len();
                if offsets.submit(batch) {
                    self.dirty_offsets.clear();
                    self.status_message = format!("Saving {} offsets...", count);
                } else {
                    self.error_message = Some("Offset saver is not running".to_string());
                }
            }
        }
    }

    /// Apply results of background offset saves; failed lines stay dirty
    pub fn process_offset_reports(&mut self) {
        let Some(offsets) = &self.offsets else {
            return;
        };
        while let Some(report) = offsets.try_report() {
            if report.failed.is_empty() {
                self.status_message = format!("Saved {} offsets", report.saved.len());
            } else {
                self.error_message = Some(format!(
                    "Saved {} offsets, {} failed (network error)",
                    report.saved.len(),
                    report.failed.len()
                ));
            }
            self.dirty_offsets.extend(report.failed);
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(mut offsets) = self.offsets.take() {
            offsets.shutdown();
        }
        if let Some(mut progress) = self.progress.take() {
            progress.shutdown(self.player.current_time(), self.player.duration());
        }
        if let Err(e) = self.player.shutdown() {
            tracing::warn!("Player shutdown failed: {}", e);
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
