use crate::app::{AppState, InputMode};
use ratatui::{
    layout::{Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const PROMPT: &str = "> ";

/// First character shown so the cursor stays inside `width` columns.
fn window_start(cursor: usize, width: usize) -> usize {
    if width == 0 {
        return cursor;
    }
    cursor.saturating_sub(width - 1)
}

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let editing = state.input_mode == InputMode::Insert && !state.show_help;
    let prompt_style = if editing {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let room = (area.width as usize).saturating_sub(PROMPT.len());
    let cursor = state.editor.cursor();
    let start = window_start(cursor, room);
    let visible: String = state.editor.text().chars().skip(start).take(room).collect();

    let line = Line::from(vec![
        Span::styled(PROMPT, prompt_style),
        Span::raw(visible),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    if editing {
        let x = area.x + (PROMPT.len() + cursor - start) as u16;
        frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_follows_cursor() {
        assert_eq!(window_start(3, 10), 0);
        assert_eq!(window_start(9, 10), 0);
        assert_eq!(window_start(10, 10), 1);
        assert_eq!(window_start(25, 10), 16);
    }
}
