use crate::app::{AppState, InputMode};
use crate::codec::{style_line, Tone};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::default(),
        Tone::Escape => Style::default().fg(Color::Magenta),
        Tone::Address => Style::default().fg(Color::Yellow),
        Tone::Gutter => Style::default().fg(Color::DarkGray),
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = &state.view;
    let border_style = if state.input_mode == InputMode::Scroll {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };

    let title = if view.at_tail {
        format!(" {} - {} ", state.connection, view.display_mode.name())
    } else {
        format!(
            " {} - {} [line {}/{}] ",
            state.connection,
            view.display_mode.name(),
            view.first_line + 1,
            view.total_lines
        )
    };

    let block = Block::default()
        .title(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<Line> = view
        .lines
        .iter()
        .map(|line| {
            let spans: Vec<Span> = style_line(line, view.display_mode)
                .into_iter()
                .map(|(tone, text)| Span::styled(text, tone_style(tone)))
                .collect();
            Line::from(spans)
        })
        .collect();

    let viewport_height = block.inner(area).height as usize;
    frame.render_widget(Paragraph::new(lines).block(block), area);

    // Render scrollbar if content exceeds viewport
    if view.total_lines > viewport_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        let mut scrollbar_state = ScrollbarState::new(view.total_lines).position(view.first_line);
        frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}
