use ratatui::style::{Color, Modifier, Style};

// Color palette
pub const BG_PRIMARY: Color = Color::Rgb(15, 15, 25);
pub const BG_SECONDARY: Color = Color::Rgb(25, 25, 40);
pub const ACCENT_PRIMARY: Color = Color::Rgb(0, 200, 255); // Cyan
pub const ACCENT_SECONDARY: Color = Color::Rgb(255, 100, 150); // Pink
pub const TEXT_PRIMARY: Color = Color::Rgb(230, 230, 240);
pub const TEXT_SECONDARY: Color = Color::Rgb(150, 150, 170);
pub const TEXT_MUTED: Color = Color::Rgb(100, 100, 120);
pub const SUCCESS: Color = Color::Rgb(100, 255, 150);
pub const WARNING: Color = Color::Rgb(255, 200, 100);
pub const ERROR: Color = Color::Rgb(255, 100, 100);

pub fn title_style() -> Style {
    Style::default()
        .fg(ACCENT_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

/// Secondary-language text (Chinese translation)
pub fn translation_style() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

/// Cursor row in the subtitle list
pub fn highlight_style() -> Style {
    Style::default()
        .fg(BG_PRIMARY)
        .bg(ACCENT_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

/// The line currently being played
pub fn active_style() -> Style {
    Style::default()
        .fg(SUCCESS)
        .add_modifier(Modifier::BOLD)
}

pub fn normal_style() -> Style {
    Style::default().fg(TEXT_PRIMARY)
}

pub fn muted_style() -> Style {
    Style::default().fg(TEXT_MUTED)
}

pub fn key_style() -> Style {
    Style::default()
        .fg(ACCENT_SECONDARY)
        .add_modifier(Modifier::BOLD)
}

/// Annotated words and phrases
pub fn annotation_style() -> Style {
    Style::default()
        .fg(WARNING)
        .add_modifier(Modifier::UNDERLINED)
}

pub fn success_style() -> Style {
    Style::default().fg(SUCCESS)
}

pub fn warning_style() -> Style {
    Style::default().fg(WARNING)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn border_style() -> Style {
    Style::default().fg(ACCENT_PRIMARY)
}

pub fn progress_style() -> Style {
    Style::default().fg(ACCENT_PRIMARY).bg(BG_SECONDARY)
}
