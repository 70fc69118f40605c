use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Wrap,
    },
    Frame,
};

use super::style;
use crate::app::App;
use crate::playback::looping::LoopMode;
use crate::playback::MediaBackend;
use crate::subtitle::line::SubtitleLine;
use crate::subtitle::srt::format_time;

pub fn draw<B: MediaBackend>(frame: &mut Frame, app: &App<B>) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Length(2), // Title + state
        Constraint::Length(3), // Timeline
        Constraint::Min(8),    // Content
        Constraint::Length(5), // Help
    ])
    .split(area);

    draw_header(frame, app, chunks[0]);
    draw_timeline(frame, app, chunks[1]);

    let content_chunks = Layout::horizontal([
        Constraint::Percentage(60), // Subtitle list
        Constraint::Percentage(40), // Line details
    ])
    .split(chunks[2]);

    draw_subtitle_list(frame, app, content_chunks[0]);
    draw_detail_panel(frame, app, content_chunks[1]);
    draw_help(frame, app, chunks[3]);

    if let Some(error) = app.player.error() {
        draw_error_overlay(frame, error, area);
    }
}

fn draw_header<B: MediaBackend>(frame: &mut Frame, app: &App<B>, area: Rect) {
    let looper = &app.looper;
    let state = if app.player.is_playing() { "▶ playing" } else { "⏸ paused" };
    let mode = match looper.mode {
        LoopMode::Continuous => "continuous".to_string(),
        LoopMode::Single => format!(
            "single {} ({} done)",
            looper.count.label(),
            looper.repeats()
        ),
    };

    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(" ", style::normal_style()),
            Span::styled(&app.title, style::title_style()),
            Span::styled(" │ ", style::muted_style()),
            Span::styled(format!("{} lines", app.lines.len()), style::normal_style()),
        ]),
        Line::from(vec![
            Span::styled(" ", style::normal_style()),
            Span::styled(state, style::key_style()),
            Span::styled(" │ loop: ", style::muted_style()),
            Span::styled(mode, style::normal_style()),
            Span::styled(" │ next: ", style::muted_style()),
            Span::styled(flag(looper.auto_next), style::normal_style()),
            Span::styled(" │ video loop: ", style::muted_style()),
            Span::styled(flag(looper.video_loop), style::normal_style()),
            Span::styled(" │ follow: ", style::muted_style()),
            Span::styled(flag(app.follow_active), style::normal_style()),
        ]),
    ]);
    frame.render_widget(header, area);
}

fn draw_timeline<B: MediaBackend>(frame: &mut Frame, app: &App<B>, area: Rect) {
    let current = app.player.current_time();
    let duration = app.player.duration();
    let ratio = if duration > 0.0 {
        (current / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).border_style(style::border_style()))
        .gauge_style(style::progress_style())
        .ratio(ratio)
        .label(format!("{} / {}", clock(current), clock(duration)));
    frame.render_widget(gauge, area);
}

fn draw_subtitle_list<B: MediaBackend>(frame: &mut Frame, app: &App<B>, area: Rect) {
    let active = app.looper.active();
    let max_text_len = (area.width as usize).saturating_sub(20);

    let items: Vec<ListItem> = app
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let text_preview: String = line.text_en.chars().take(max_text_len).collect();
            let text_preview = if line.text_en.chars().count() > max_text_len {
                format!("{}...", text_preview)
            } else {
                text_preview
            };

            let marker = if Some(i) == active { "▶" } else { " " };
            let dirty = if app.dirty_offsets.contains(&i) { "*" } else { " " };
            let content = format!(
                "{}{:4} │ {} │ {}",
                marker,
                line.sequence,
                clock(line.start_time),
                text_preview.replace('\n', " ")
            );

            let row_style = if i == app.selected_index {
                style::highlight_style()
            } else if Some(i) == active {
                style::active_style()
            } else {
                style::normal_style()
            };

            ListItem::new(Line::from(vec![
                Span::styled(content, row_style),
                Span::styled(dirty, style::warning_style()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Subtitles ")
                .title_style(style::title_style())
                .borders(Borders::ALL)
                .border_style(style::border_style()),
        )
        .highlight_style(style::highlight_style());

    let mut list_state = ListState::default();
    list_state.select(Some(app.selected_index));
    frame.render_stateful_widget(list, area, &mut list_state);

    if !app.lines.is_empty() {
        let mut scrollbar_state = ScrollbarState::new(app.lines.len()).position(app.selected_index);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));
        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                horizontal: 0,
                vertical: 1,
            }),
            &mut scrollbar_state,
        );
    }
}

fn draw_detail_panel<B: MediaBackend>(frame: &mut Frame, app: &App<B>, area: Rect) {
    let block = Block::default()
        .title(" Line ")
        .title_style(style::title_style())
        .borders(Borders::ALL)
        .border_style(style::border_style());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(line) = app.lines.get(app.selected_index) else {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No subtitles loaded.", style::muted_style())),
        ]);
        frame.render_widget(empty, inner);
        return;
    };

    let seek = app
        .selected_seek_time()
        .map(format_time)
        .unwrap_or_default();

    let mut content = vec![
        Line::from(annotated_spans(line)),
        Line::from(Span::styled(&line.text_zh, style::translation_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Start:  ", style::muted_style()),
            Span::styled(format_time(line.start_time), style::key_style()),
        ]),
        Line::from(vec![
            Span::styled("End:    ", style::muted_style()),
            Span::styled(format_time(line.end_time), style::key_style()),
        ]),
        Line::from(vec![
            Span::styled("Offset: ", style::muted_style()),
            Span::styled(format!("{:+.2}s", line.seek_offset), style::normal_style()),
        ]),
        Line::from(vec![
            Span::styled("Seek →  ", style::muted_style()),
            Span::styled(seek, style::success_style()),
        ]),
    ];

    if !line.annotations.is_empty() {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled("Learning points:", style::muted_style())));
        for annotation in &line.annotations {
            let mut spans = vec![
                Span::styled(format!(" [{}] ", annotation.kind.as_str()), style::muted_style()),
                Span::styled(&annotation.text, style::annotation_style()),
            ];
            if !annotation.phonetic.is_empty() {
                spans.push(Span::styled(format!(" /{}/", annotation.phonetic), style::muted_style()));
            }
            if !annotation.meaning.is_empty() {
                spans.push(Span::styled(format!("  {}", annotation.meaning), style::normal_style()));
            }
            content.push(Line::from(spans));
        }
    }

    let paragraph = Paragraph::new(content).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);
}

fn draw_help<B: MediaBackend>(frame: &mut Frame, app: &App<B>, area: Rect) {
    let mut lines = vec![
        Line::from(vec![Span::styled(
            "─".repeat(area.width as usize),
            style::muted_style(),
        )]),
        Line::from(vec![
            Span::styled("  ↑/k ↓/j ", style::key_style()),
            Span::styled("select  ", style::muted_style()),
            Span::styled("Enter ", style::key_style()),
            Span::styled("play line  ", style::muted_style()),
            Span::styled("Space ", style::key_style()),
            Span::styled("pause  ", style::muted_style()),
            Span::styled("f ", style::key_style()),
            Span::styled("follow  ", style::muted_style()),
            Span::styled("q ", style::key_style()),
            Span::styled("quit", style::muted_style()),
        ]),
        Line::from(vec![
            Span::styled("  m ", style::key_style()),
            Span::styled("loop mode  ", style::muted_style()),
            Span::styled("c ", style::key_style()),
            Span::styled("repeat count  ", style::muted_style()),
            Span::styled("n ", style::key_style()),
            Span::styled("auto next  ", style::muted_style()),
            Span::styled("v ", style::key_style()),
            Span::styled("video loop  ", style::muted_style()),
            Span::styled("[ ] ", style::key_style()),
            Span::styled("offset  ", style::muted_style()),
            Span::styled("0 ", style::key_style()),
            Span::styled("clear  ", style::muted_style()),
            Span::styled("s ", style::key_style()),
            Span::styled("save", style::muted_style()),
        ]),
    ];

    if let Some(error) = &app.error_message {
        lines.push(Line::from(vec![
            Span::styled("  ⚠ ", style::error_style()),
            Span::styled(error, style::error_style()),
        ]));
    } else if !app.status_message.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("  ✓ ", style::success_style()),
            Span::styled(&app.status_message, style::success_style()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_error_overlay(frame: &mut Frame, error: &str, area: Rect) {
    let popup = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup);

    let message = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(error, style::error_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", style::muted_style()),
            Span::styled("Esc", style::key_style()),
            Span::styled(" to dismiss, ", style::muted_style()),
            Span::styled("q", style::key_style()),
            Span::styled(" to quit", style::muted_style()),
        ]),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(" Playback error ")
            .title_style(style::error_style())
            .borders(Borders::ALL)
            .border_style(style::error_style()),
    );
    frame.render_widget(message, popup);
}

/// English text with annotated spans highlighted
pub fn annotated_spans(line: &SubtitleLine) -> Vec<Span<'_>> {
    let text = &line.text_en;
    let char_count = text.chars().count();
    let mut ranges: Vec<(usize, usize)> = line
        .annotations
        .iter()
        .filter(|a| a.start < a.end && a.end <= char_count)
        .map(|a| (a.start, a.end))
        .collect();
    ranges.sort_unstable();

    let byte_at = |char_index: usize| {
        text.char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(text.len())
    };

    let mut spans = Vec::new();
    let mut cursor = 0;
    for (start, end) in ranges {
        // Overlapping annotations: the earlier one wins
        if start < cursor {
            continue;
        }
        if start > cursor {
            spans.push(Span::styled(&text[byte_at(cursor)..byte_at(start)], style::normal_style()));
        }
        spans.push(Span::styled(&text[byte_at(start)..byte_at(end)], style::annotation_style()));
        cursor = end;
    }
    if cursor < char_count {
        spans.push(Span::styled(&text[byte_at(cursor)..], style::normal_style()));
    }
    spans
}

/// `m:ss.s`
fn clock(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    format!("{}:{:04.1}", minutes, seconds - minutes as f64 * 60.0)
}

fn flag(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}
