use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppScreen, Banner, SettingsStatus, SETTINGS_ROWS};
use memobit::generator::CharPolicy;
use memobit::round::Phase;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            AppScreen::Game => render_game(self, area, buf),
            AppScreen::Settings => render_settings(self, area, buf),
            AppScreen::Help => render_help(area, buf),
            AppScreen::ConfirmReset => render_confirm_reset(area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn render_game(app: &App, area: Rect, buf: &mut Buffer) {
    let green_bold_style = bold().fg(Color::Green);
    let red_bold_style = bold().fg(Color::Red);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    // the answer may wrap on narrow terminals; reserve lines for it the
    // same way the prompt display does
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let answer_width = app.engine.answer().map_or(0, |a| a.width());
    let stage_lines = ((answer_width as f64 / max_chars_per_line as f64).ceil() as u16).max(1);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(1),
                Constraint::Length(stage_lines),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let stage = match app.engine.phase() {
        Phase::Memorizing => Span::styled(
            app.engine.answer().unwrap_or_default().to_string(),
            bold(),
        ),
        Phase::AwaitingInput => Span::styled(
            "Type the sequence you memorized".to_string(),
            italic_style,
        ),
        Phase::Idle => match &app.banner {
            Some(Banner::Won) => Span::styled("You won!".to_string(), green_bold_style),
            Some(Banner::Lost) => Span::styled("You lost!".to_string(), red_bold_style),
            Some(Banner::Info(msg)) => Span::styled(msg.clone(), italic_style),
            Some(Banner::Error(msg)) => Span::styled(msg.clone(), bold().fg(Color::Yellow)),
            None => Span::styled("Press n to start a round".to_string(), dim_bold()),
        },
    };
    Paragraph::new(Line::from(stage))
        .alignment(if answer_width <= max_chars_per_line as usize {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    let input_line = if app.engine.phase() == Phase::AwaitingInput {
        Span::styled(format!("> {}_", app.input), bold())
    } else {
        Span::styled("".to_string(), dim_bold())
    };
    Paragraph::new(Line::from(input_line))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    render_tiles(app, chunks[5], buf);

    let hints = match app.engine.phase() {
        Phase::Idle => "n new round   s settings   h help   e edit config   esc quit",
        Phase::Memorizing => "memorize the sequence before it disappears",
        Phase::AwaitingInput => "enter submit   backspace edit",
    };
    Paragraph::new(Span::styled(hints.to_string(), dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[7], buf);

    Paragraph::new(Span::styled(
        app.store.config_path().display().to_string(),
        Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[8], buf);
}

fn render_tiles(app: &App, area: Rect, buf: &mut Buffer) {
    let tiles = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ]
            .as_ref(),
        )
        .split(area);

    let time_remaining = match app.engine.seconds_remaining() {
        Some(secs) => secs.to_string(),
        None => "--".to_string(),
    };
    let mode = format!("{} x {}", CharPolicy::of(&app.config), app.config.length);

    tile("Score", &app.engine.score().to_string(), tiles[0], buf);
    tile("High score", &app.engine.high_score().to_string(), tiles[1], buf);
    tile("Time remaining", &time_remaining, tiles[2], buf);
    tile("Mode", &mode, tiles[3], buf);
}

fn tile(title: &str, value: &str, area: Rect, buf: &mut Buffer) {
    Paragraph::new(vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::DIM),
        )),
        Line::from(Span::styled(value.to_string(), bold())),
    ])
    .alignment(Alignment::Center)
    .render(area, buf);
}

fn render_settings(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Length(SETTINGS_ROWS.len() as u16),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    Paragraph::new(Span::styled("Settings".to_string(), bold()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let rows = SETTINGS_ROWS
        .iter()
        .enumerate()
        .map(|(idx, (field, label))| {
            let selected = idx == app.settings.selected;
            let value = match app.settings.editing.as_ref() {
                Some(buffer) if selected => format!("{buffer}_"),
                _ => settings_value(app, field),
            };
            let text = format!(
                "{} {label}: {value}",
                if selected { ">" } else { " " }
            );
            let style = if selected { bold() } else { Style::default() };
            Line::from(Span::styled(text, style))
        })
        .collect::<Vec<Line>>();
    Paragraph::new(rows).render(chunks[1], buf);

    let status = match &app.settings.status {
        Some(SettingsStatus::Saved) => Span::styled("saved".to_string(), bold().fg(Color::Green)),
        Some(SettingsStatus::Error(msg)) => Span::styled(msg.clone(), bold().fg(Color::Red)),
        None => Span::styled(String::new(), Style::default()),
    };
    Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    let hints = if app.settings.editing.is_some() {
        "enter apply   esc cancel"
    } else {
        "enter edit/toggle   d reset to defaults   e open in editor   esc back"
    };
    Paragraph::new(Span::styled(hints.to_string(), dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
}

fn settings_value(app: &App, field: &str) -> String {
    match field {
        "timeToMemorize" => app.config.time_to_memorize.to_string(),
        "timeout" => {
            if app.config.timeout > 0 {
                app.config.timeout.to_string()
            } else {
                format!("{} (unlimited)", app.config.timeout)
            }
        }
        "length" => app.config.length.to_string(),
        "allowNonBinaryDigits" => app.config.allow_non_binary_digits.to_string(),
        "useCustomChars" => app.config.use_custom_chars.to_string(),
        "customChars" => {
            if app.config.custom_chars.is_empty() {
                "(empty: printable ascii)".to_string()
            } else {
                app.config.custom_chars.clone()
            }
        }
        _ => String::new(),
    }
}

fn render_help(area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled("How to play".to_string(), bold())),
        Line::from(""),
        Line::from("A sequence of characters appears for a short moment. Memorize it"),
        Line::from("before it disappears, then retype it exactly and press enter"),
        Line::from("before the timer runs out."),
        Line::from(""),
        Line::from("Every correct answer adds one point to your streak. A wrong answer"),
        Line::from("or a timeout resets the streak to zero. Your best streak is kept"),
        Line::from("as the high score across sessions."),
        Line::from(""),
        Line::from("The sequence is drawn from the configured character set: binary"),
        Line::from("digits by default, 0-9, or your own characters. Edit the settings"),
        Line::from("in-app or change the configuration file directly; the file is"),
        Line::from("reloaded while the game is running."),
        Line::from(""),
        Line::from(Span::styled(
            "press any key to go back".to_string(),
            dim_bold(),
        )),
    ];

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("memobit"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn render_confirm_reset(area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ]
            .as_ref(),
        )
        .split(area);

    Paragraph::new(Span::styled(
        "Reset configuration to defaults?".to_string(),
        bold().fg(Color::Yellow),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        "y confirm   any other key cancel".to_string(),
        dim_bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}
