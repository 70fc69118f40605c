use crate::config::SeekConfig;
use crate::subtitle::line::SubtitleLine;

/// Where to move the play head so audio starts at the sentence boundary.
///
/// Subtitle timestamps tend to run late, so without a manual offset the
/// target backs up a little before `target.start_time`: a fixed amount
/// normally, or deeper into the silence when the gap to `previous` is wide,
/// but never into the previous line's audio.
pub fn resolve_seek(target: &SubtitleLine, previous: Option<&SubtitleLine>, config: &SeekConfig) -> f64 {
    let pad = config.boundary_pad;

    let time = if target.has_offset() {
        target.start_time + target.seek_offset
    } else {
        let mut backtrack = config.default_backtrack;
        if let Some(prev) = previous {
            let gap = target.start_time - prev.end_time;
            if gap >= config.gap_threshold {
                backtrack = config.max_backtrack.min(gap - pad);
            }
        }

        let mut time = target.start_time - backtrack;
        if let Some(prev) = previous {
            // Overlapping lines would push the floor past the start itself
            time = time.max(prev.end_time + pad).min(target.start_time);
        }
        time
    };

    time.min(target.end_time - pad).max(0.0)
}

/// Smart-seek target for `lines[index]`
pub fn resolve_seek_at(lines: &[SubtitleLine], index: usize, config: &SeekConfig) -> Option<f64> {
    let target = lines.get(index)?;
    let previous = index.checked_sub(1).and_then(|i| lines.get(i));
    Some(resolve_seek(target, previous, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(start: f64, end: f64) -> SubtitleLine {
        SubtitleLine::new(0, start, end, "")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_small_gap_respects_boundary_pad() {
        let config = SeekConfig::default();
        let prev = line(0.0, 2.0);
        let target = line(2.05, 5.0);

        let t = resolve_seek(&target, Some(&prev), &config);
        assert!(close(t, 2.03), "got {}", t);
    }

    #[test]
    fn test_manual_offset_wins() {
        let config = SeekConfig::default();
        let prev = line(9.0, 9.95);
        let target = line(10.0, 15.0).with_offset(-1.0);

        assert!(close(resolve_seek(&target, Some(&prev), &config), 9.0));
    }

    #[test]
    fn test_manual_offset_is_clamped() {
        let config = SeekConfig::default();
        let early = line(0.5, 3.0).with_offset(-2.0);
        assert_eq!(resolve_seek(&early, None, &config), 0.0);

        let late = line(10.0, 10.5).with_offset(3.0);
        assert!(close(resolve_seek(&late, None, &config), 10.47));
    }

    #[test]
    fn test_first_line_uses_default_backtrack() {
        let config = SeekConfig::default();
        assert!(close(resolve_seek(&line(5.0, 8.0), None, &config), 4.88));
        assert_eq!(resolve_seek(&line(0.05, 1.0), None, &config), 0.0);
    }

    #[test]
    fn test_wide_gap_backtracks_into_silence() {
        let config = SeekConfig::default();

        // gap 0.5 -> backtrack 0.47, lands on the pad
        let t = resolve_seek(&line(3.5, 6.0), Some(&line(1.0, 3.0)), &config);
        assert!(close(t, 3.03), "got {}", t);

        // gap 4.0 -> backtrack capped at 1.0
        let t = resolve_seek(&line(8.0, 10.0), Some(&line(1.0, 4.0)), &config);
        assert!(close(t, 7.0), "got {}", t);
    }

    #[test]
    fn test_medium_gap_keeps_default_backtrack() {
        let config = SeekConfig::default();
        let t = resolve_seek(&line(2.3, 4.0), Some(&line(0.0, 2.0)), &config);
        assert!(close(t, 2.18), "got {}", t);
    }

    #[test]
    fn test_overlapping_lines_never_land_after_start() {
        let config = SeekConfig::default();
        let t = resolve_seek(&line(2.0, 4.0), Some(&line(0.0, 2.5)), &config);
        assert!(close(t, 2.0), "got {}", t);
    }

    #[test]
    fn test_short_line_does_not_overshoot() {
        let config = SeekConfig::default();
        let t = resolve_seek(&line(5.0, 5.1), Some(&line(0.0, 4.99)), &config);
        assert!(t <= 5.1 - config.boundary_pad + 1e-9);
        assert!(t >= 0.0);
    }

    #[test]
    fn test_small_gap_property_over_grid() {
        let config = SeekConfig::default();
        let mut gap = config.boundary_pad;
        while gap < config.gap_threshold {
            let prev = line(0.0, 10.0);
            let target = line(10.0 + gap, 14.0);
            let t = resolve_seek(&target, Some(&prev), &config);
            assert!(t >= prev.end_time + config.boundary_pad - 1e-9, "gap {} -> {}", gap, t);
            assert!(t <= target.start_time + 1e-9, "gap {} -> {}", gap, t);
            gap += 0.01;
        }
    }

    #[test]
    fn test_resolve_seek_at_uses_previous_line() {
        let config = SeekConfig::default();
        let lines = vec![line(0.0, 2.0), line(2.05, 5.0)];
        assert!(close(resolve_seek_at(&lines, 1, &config).unwrap(), 2.03));
        assert!(resolve_seek_at(&lines, 2, &config).is_none());
    }
}
