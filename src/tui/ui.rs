use crate::app::AppState;
use crate::tui::components::{command_line, help_popup, output_pane, status_bar};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

/// Rows taken by the output pane borders, the status bar and the command line.
const CHROME_ROWS: u16 = 4;
/// Columns taken by the output pane borders.
const CHROME_COLS: u16 = 2;

/// Text area of the output pane for a terminal of `width` x `height`.
pub fn output_size(width: u16, height: u16) -> (usize, usize) {
    (
        width.saturating_sub(CHROME_COLS).max(1) as usize,
        height.saturating_sub(CHROME_ROWS).max(1) as usize,
    )
}

pub fn draw(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Output
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Command line
        ])
        .split(frame.area());

    output_pane::render(frame, chunks[0], state);
    status_bar::render(frame, chunks[1], state);
    command_line::render(frame, chunks[2], state);

    if state.show_help {
        help_popup::render(frame, state);
    }
}
