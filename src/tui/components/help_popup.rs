use crate::app::AppState;
use crate::config::keybindings::Scope;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const KEY_COLUMN: usize = 18;

const GLOBAL: &[(&str, &str)] = &[
    ("toggle_mode", "Switch between insert and scroll mode"),
    ("cycle_display_mode", "Cycle display mode"),
    ("cycle_input_mode", "Cycle input mode"),
    ("page_up", "Page up"),
    ("page_down", "Page down"),
    ("toggle_help", "Show this help"),
    ("end_of_input", "Quit on an empty line"),
    ("quit", "Quit"),
];

const INSERT: &[(&str, &str)] = &[
    ("submit", "Send the command line"),
    ("history_prev", "Previous command"),
    ("history_next", "Next command"),
    ("cursor_home", "Start of line"),
    ("cursor_end", "End of line"),
    ("clear_line", "Clear the line"),
];

const SCROLL: &[(&str, &str)] = &[
    ("scroll_up", "Scroll up one line"),
    ("scroll_down", "Scroll down one line"),
    ("scroll_top", "Jump to the oldest output"),
    ("scroll_bottom", "Follow new output"),
    ("quit", "Quit"),
];

fn section<'a>(
    title: &'a str,
    entries: &[(&str, &'a str)],
    scope: Option<Scope>,
    state: &AppState,
) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))];
    for (action, description) in entries {
        let keys = state.keybindings.keys_for(scope, action);
        if keys.is_empty() {
            continue;
        }
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<width$}", keys.join(", "), width = KEY_COLUMN),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(*description),
        ]));
    }
    lines.push(Line::from(""));
    lines
}

pub fn render(frame: &mut Frame, state: &AppState) {
    let area = centered_rect(60, 70, frame.area());

    // Clear the background
    frame.render_widget(Clear, area);

    let mut help_text = vec![
        Line::from(Span::styled(
            "ttyterm - serial and socket terminal",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    help_text.extend(section("Everywhere", GLOBAL, None, state));
    help_text.extend(section("Insert mode", INSERT, Some(Scope::Insert), state));
    help_text.extend(section("Scroll mode", SCROLL, Some(Scope::Scroll), state));
    help_text.push(Line::from(Span::styled(
        "Press Esc or q to close",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
