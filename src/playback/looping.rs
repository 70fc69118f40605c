use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::LoopConfig;
use crate::subtitle::line::{find_line_at, SubtitleLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Natural progression through the video
    Continuous,
    /// Repeat the active line
    Single,
}

impl LoopMode {
    pub fn as_str(&self) -> &str {
        match self {
            LoopMode::Continuous => "continuous",
            LoopMode::Single => "single",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoopCount {
    One,
    Two,
    Three,
    Infinite,
}

impl LoopCount {
    /// Number of repetitions, `None` for unlimited
    pub fn times(&self) -> Option<u32> {
        match self {
            LoopCount::One => Some(1),
            LoopCount::Two => Some(2),
            LoopCount::Three => Some(3),
            LoopCount::Infinite => None,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            LoopCount::One => LoopCount::Two,
            LoopCount::Two => LoopCount::Three,
            LoopCount::Three => LoopCount::Infinite,
            LoopCount::Infinite => LoopCount::One,
        }
    }

    pub fn label(&self) -> String {
        match self.times() {
            Some(n) => format!("×{}", n),
            None => "×∞".to_string(),
        }
    }
}

/// What the loop controller wants the player to do after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopAction {
    /// Seek and keep playing
    Seek(f64),
    Pause,
}

/// Tracks the active line and decides when to repeat, advance, or stop.
#[derive(Debug, Clone)]
pub struct LoopController {
    pub mode: LoopMode,
    pub count: LoopCount,
    pub auto_next: bool,
    pub video_loop: bool,
    end_margin: f64,
    video_end_margin: f64,
    active: Option<usize>,
    repeats: u32,
    awaiting_seek: bool,
    stopped_on: Option<usize>,
}

impl LoopController {
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            mode: config.mode,
            count: config.count,
            auto_next: config.auto_next,
            video_loop: config.video_loop,
            end_margin: config.end_margin,
            video_end_margin: config.video_end_margin,
            active: None,
            repeats: 0,
            awaiting_seek: false,
            stopped_on: None,
        }
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoopMode::Continuous => LoopMode::Single,
            LoopMode::Single => LoopMode::Continuous,
        };
        self.stopped_on = None;
    }

    pub fn cycle_count(&mut self) {
        self.count = self.count.next();
        self.stopped_on = None;
    }

    /// The seek requested by the last action has landed
    pub fn on_seeked(&mut self) {
        self.awaiting_seek = false;
    }

    /// The user jumped to `index` directly
    pub fn on_manual_seek(&mut self, index: Option<usize>) {
        self.stopped_on = None;
        self.awaiting_seek = true;
        if let Some(index) = index {
            self.set_active(index);
        }
    }

    /// Playback reached the end of the media
    pub fn on_ended(&mut self) -> Option<LoopAction> {
        if self.video_loop {
            self.awaiting_seek = true;
            Some(LoopAction::Seek(0.0))
        } else {
            None
        }
    }

    /// Inspect a playback-time tick. Returns the action to apply, if any.
    pub fn on_tick(&mut self, time: f64, duration: f64, lines: &[SubtitleLine]) -> Option<LoopAction> {
        if self.awaiting_seek {
            return None;
        }

        // The active line's end is checked before the next line can take
        // over, so a coarse tick that lands past the boundary still repeats
        // a jump beyond the following line is left alone
        let current = find_line_at(lines, time);
        if self.mode == LoopMode::Single {
            let natural_progress = match self.active {
                Some(active) => lines.get(active + 2).map_or(true, |after| time < after.start_time),
                None => true,
            };
            if natural_progress {
                if let Some(action) = self.check_line_end(time, lines) {
                    return Some(action);
                }
            }
        }

        if let Some(index) = current {
            self.set_active(index);
        }

        if self.video_loop && duration > 0.0 && time >= duration - self.video_end_margin {
            tracing::debug!("Video loop: restarting from 0 at {:.2}", time);
            self.awaiting_seek = true;
            return Some(LoopAction::Seek(0.0));
        }

        None
    }

    fn check_line_end(&mut self, time: f64, lines: &[SubtitleLine]) -> Option<LoopAction> {
        let index = self.active?;
        let line = lines.get(index)?;
        if time < line.end_time - self.end_margin || self.stopped_on == Some(index) {
            return None;
        }

        let remaining = match self.count.times() {
            Some(n) => self.repeats < n,
            None => true,
        };

        if remaining {
            self.repeats += 1;
            self.awaiting_seek = true;
            tracing::debug!("Repeating line {} ({})", line.sequence, self.repeats);
            return Some(LoopAction::Seek(line.start_time));
        }

        if self.auto_next {
            if let Some(next) = lines.get(index + 1) {
                self.repeats = 0;
                self.awaiting_seek = true;
                self.active = Some(index + 1);
                tracing::debug!("Advancing to line {}", next.sequence);
                return Some(LoopAction::Seek(next.start_time));
            }
        }

        self.stopped_on = Some(index);
        Some(LoopAction::Pause)
    }

    fn set_active(&mut self, index: usize) {
        if self.active != Some(index) {
            self.active = Some(index);
            self.repeats = 0;
            self.stopped_on = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<SubtitleLine> {
        vec![
            SubtitleLine::new(1, 0.0, 2.0, "one"),
            SubtitleLine::new(2, 2.5, 5.0, "two"),
            SubtitleLine::new(3, 5.5, 8.0, "three"),
        ]
    }

    fn single(count: LoopCount, auto_next: bool) -> LoopController {
        LoopController::new(&LoopConfig {
            mode: LoopMode::Single,
            count,
            auto_next,
            ..LoopConfig::default()
        })
    }

    /// Advance time in 50ms steps from `from`, landing seeks immediately.
    fn play(controller: &mut LoopController, lines: &[SubtitleLine], from: f64, steps: usize) -> Vec<LoopAction> {
        let mut actions = Vec::new();
        let mut time = from;
        for _ in 0..steps {
            if let Some(action) = controller.on_tick(time, 100.0, lines) {
                actions.push(action);
                match action {
                    LoopAction::Seek(to) => {
                        time = to;
                        controller.on_seeked();
                    }
                    LoopAction::Pause => break,
                }
            } else {
                time += 0.05;
            }
        }
        actions
    }

    #[test]
    fn test_two_repeats_then_advance() {
        let lines = lines();
        let mut controller = single(LoopCount::Two, true);

        // Three passes over line one, then part of line two
        let actions = play(&mut controller, &lines, 0.0, 130);
        assert_eq!(
            actions,
            vec![LoopAction::Seek(0.0), LoopAction::Seek(0.0), LoopAction::Seek(2.5)]
        );
        assert_eq!(controller.active(), Some(1));
        assert_eq!(controller.repeats(), 0);
    }

    #[test]
    fn test_exhausted_repeats_pause_without_auto_next() {
        let lines = lines();
        let mut controller = single(LoopCount::One, false);

        let actions = play(&mut controller, &lines, 0.0, 200);
        assert_eq!(actions, vec![LoopAction::Seek(0.0), LoopAction::Pause]);

        // Resuming on the same line does not pause again
        assert_eq!(controller.on_tick(1.95, 100.0, &lines), None);
    }

    #[test]
    fn test_last_line_pauses_even_with_auto_next() {
        let lines = lines();
        let mut controller = single(LoopCount::One, true);
        controller.on_manual_seek(Some(2));
        controller.on_seeked();

        let actions = play(&mut controller, &lines, 5.5, 200);
        assert_eq!(actions, vec![LoopAction::Seek(5.5), LoopAction::Pause]);
    }

    #[test]
    fn test_infinite_keeps_repeating() {
        let lines = lines();
        let mut controller = single(LoopCount::Infinite, true);

        let actions = play(&mut controller, &lines, 0.0, 2000);
        assert!(actions.len() > 10);
        assert!(actions.iter().all(|a| *a == LoopAction::Seek(0.0)));
    }

    #[test]
    fn test_counter_resets_when_active_line_changes() {
        let lines = lines();
        let mut controller = single(LoopCount::Three, false);

        controller.on_tick(0.5, 100.0, &lines);
        assert_eq!(controller.on_tick(1.95, 100.0, &lines), Some(LoopAction::Seek(0.0)));
        controller.on_seeked();
        assert_eq!(controller.repeats(), 1);

        controller.on_tick(1.0, 100.0, &lines);
        assert_eq!(controller.active(), Some(0));
        assert_eq!(controller.repeats(), 1);

        controller.on_manual_seek(Some(1));
        controller.on_seeked();
        assert_eq!(controller.on_tick(3.0, 100.0, &lines), None);
        assert_eq!(controller.active(), Some(1));
        assert_eq!(controller.repeats(), 0);
    }

    #[test]
    fn test_coarse_tick_past_abutting_boundary_still_repeats() {
        let lines = vec![
            SubtitleLine::new(1, 0.0, 2.0, "one"),
            SubtitleLine::new(2, 2.0, 4.0, "two"),
            SubtitleLine::new(3, 4.0, 6.0, "three"),
        ];
        let mut controller = single(LoopCount::Two, true);

        assert_eq!(controller.on_tick(1.85, 100.0, &lines), None);
        assert_eq!(controller.on_tick(2.0, 100.0, &lines), Some(LoopAction::Seek(0.0)));
        assert_eq!(controller.active(), Some(0));
        assert_eq!(controller.repeats(), 1);
    }

    #[test]
    fn test_jump_far_ahead_does_not_pull_back() {
        let lines = lines();
        let mut controller = single(LoopCount::Two, false);

        controller.on_tick(0.5, 100.0, &lines);
        assert_eq!(controller.on_tick(6.0, 100.0, &lines), None);
        assert_eq!(controller.active(), Some(2));
        assert_eq!(controller.repeats(), 0);
    }

    #[test]
    fn test_gap_keeps_active_line() {
        let lines = lines();
        let mut controller = LoopController::new(&LoopConfig::default());

        controller.on_tick(0.5, 100.0, &lines);
        controller.on_tick(2.2, 100.0, &lines);
        assert_eq!(controller.active(), Some(0));
    }

    #[test]
    fn test_ticks_ignored_until_seek_lands() {
        let lines = lines();
        let mut controller = single(LoopCount::Two, false);

        assert_eq!(controller.on_tick(1.95, 100.0, &lines), Some(LoopAction::Seek(0.0)));
        assert_eq!(controller.on_tick(1.97, 100.0, &lines), None);
        controller.on_seeked();
        assert_eq!(controller.on_tick(1.97, 100.0, &lines), Some(LoopAction::Seek(0.0)));
        assert_eq!(controller.repeats(), 2);
    }

    #[test]
    fn test_continuous_mode_never_repeats() {
        let lines = lines();
        let mut controller = LoopController::new(&LoopConfig::default());

        let actions = play(&mut controller, &lines, 0.0, 200);
        assert!(actions.is_empty());
        assert_eq!(controller.active(), Some(2));
    }

    #[test]
    fn test_video_loop_restarts_near_end() {
        let lines = lines();
        let mut controller = LoopController::new(&LoopConfig {
            video_loop: true,
            ..LoopConfig::default()
        });

        assert_eq!(controller.on_tick(9.0, 10.0, &lines), None);
        assert_eq!(controller.on_tick(9.5, 10.0, &lines), Some(LoopAction::Seek(0.0)));
        controller.on_seeked();
        assert_eq!(controller.on_ended(), Some(LoopAction::Seek(0.0)));

        controller.video_loop = false;
        assert_eq!(controller.on_ended(), None);
    }

    #[test]
    fn test_loop_count_cycle() {
        let mut count = LoopCount::One;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(count.times());
            count = count.next();
        }
        assert_eq!(seen, vec![Some(1), Some(2), Some(3), None]);
        assert_eq!(count, LoopCount::One);
    }
}
