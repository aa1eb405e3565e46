use crate::app::{AppState, InputMode, MessageKind};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let badge = match state.input_mode {
        InputMode::Insert => Style::default().fg(Color::Black).bg(Color::Green),
        InputMode::Scroll => Style::default().fg(Color::Black).bg(Color::Cyan),
    };

    let mut left_text = vec![
        Span::styled(
            format!(" {} ", state.input_mode.name()),
            badge.add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            format!("out: {}", state.view.display_mode.name()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  "),
        Span::styled(
            format!("in: {}", state.input_codec.name()),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if let Some(message) = &state.status {
        let style = match message.kind {
            MessageKind::Info => Style::default().fg(Color::White),
            MessageKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        };
        left_text.push(Span::raw("  "));
        left_text.push(Span::styled(message.text.clone(), style));
    }

    let right_text = vec![
        Span::styled(state.connection.clone(), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  EOL {}", state.eol_display),
            Style::default().fg(Color::Gray),
        ),
        Span::styled("  F1 help", Style::default().fg(Color::Gray)),
    ];

    let left_len: usize = left_text.iter().map(|s| s.width()).sum();
    let right_len: usize = right_text.iter().map(|s| s.width()).sum();
    let padding = (area.width as usize).saturating_sub(left_len + right_len + 1);

    let mut spans = left_text;
    spans.push(Span::raw(" ".repeat(padding)));
    spans.extend(right_text);
    spans.push(Span::raw(" "));

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
