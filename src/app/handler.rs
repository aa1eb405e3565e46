use anyhow::Result;
use tracing::{debug, error};

use crate::app::{Action, AppState};
use crate::scrollback::ScrollDirection;
use crate::session::Session;
use crate::tui::ui::output_size;

/// Lines moved by PageUp/PageDown.
const PAGE_LINES: usize = 10;

pub fn process_action(state: &mut AppState, action: Action, session: &mut Session) -> Result<()> {
    match action {
        Action::Quit => {
            state.should_quit = true;
        }
        Action::Fatal(reason) => {
            error!(%reason, "session ended");
            state.fatal = Some(reason);
            state.should_quit = true;
        }
        Action::EndOfInput => {
            if state.editor.is_empty() {
                state.should_quit = true;
            } else {
                state.editor.delete();
            }
        }
        Action::Tick | Action::Redraw => {}
        Action::Resize(w, h) => {
            state.terminal_size = (w, h);
            let (width, height) = output_size(w, h);
            session.resize(width, height)?;
        }

        // Modes
        Action::ToggleMode => {
            state.input_mode = state.input_mode.toggled();
        }
        Action::ToggleHelp => {
            state.show_help = !state.show_help;
        }
        Action::CycleDisplayMode => {
            let mode = state.view.display_mode.next();
            session.set_display_mode(mode)?;
            state.info(format!("Display mode: {}", mode.name()));
        }
        Action::CycleInputMode => {
            let mode = session.input_mode().next();
            session.set_input_mode(mode);
            state.input_codec = mode;
            state.info(format!("Input mode: {}", mode.name()));
        }

        // Viewport
        Action::ScrollUp => session.scroll(1, ScrollDirection::Up)?,
        Action::ScrollDown => session.scroll(1, ScrollDirection::Down)?,
        Action::PageUp => session.scroll(PAGE_LINES, ScrollDirection::Up)?,
        Action::PageDown => session.scroll(PAGE_LINES, ScrollDirection::Down)?,
        Action::ScrollTop => session.scroll(0, ScrollDirection::Up)?,
        Action::ScrollBottom => session.scroll(0, ScrollDirection::Down)?,

        // Line editor
        Action::InsertChar(c) => state.editor.insert(c),
        Action::Paste(text) => state.editor.insert_str(&text),
        Action::Backspace => state.editor.backspace(),
        Action::Delete => state.editor.delete(),
        Action::CursorLeft => state.editor.left(),
        Action::CursorRight => state.editor.right(),
        Action::CursorHome => state.editor.home(),
        Action::CursorEnd => state.editor.end(),
        Action::ClearLine => state.editor.clear(),
        Action::HistoryPrev => state.editor.history_prev(),
        Action::HistoryNext => state.editor.history_next(),
        Action::Submit => submit(state, session),
    }

    refresh(state, session)
}

fn submit(state: &mut AppState, session: &Session) {
    let line = state.editor.submit();
    if line.trim().is_empty() {
        return;
    }
    match session.send_line(&line) {
        Ok(sent) => {
            debug!(bytes = sent, "command sent");
            state.status = None;
        }
        Err(e) if !e.is_fatal() => {
            state.error(format!("Not sent: {}", e));
        }
        Err(e) => {
            error!(error = %e, "write failed");
            state.fatal = Some(e.to_string());
            state.should_quit = true;
        }
    }
}

/// Pull a fresh snapshot of the output pane.
pub fn refresh(state: &mut AppState, session: &Session) -> Result<()> {
    state.view = session.view()?;
    state.input_codec = session.input_mode();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::editor::LineEditor;
    use crate::app::state::{InputMode, MessageKind};
    use crate::codec::Mode;
    use crate::config::keybindings::KeybindingConfig;
    use crate::eol::Eol;
    use crate::transport::Transport;
    use std::io::Read;
    use std::os::unix::net::UnixStream;

    fn setup(mode: Mode) -> (AppState, Session, UnixStream) {
        let (a, b) = UnixStream::pair().unwrap();
        let transport = Transport::from_unix_stream("pair", a);
        let session = Session::new(transport, mode, Eol::Lf, None, 80, 20);
        let state = AppState::new(LineEditor::new(Vec::new(), 50), KeybindingConfig::default());
        (state, session, b)
    }

    fn type_line(state: &mut AppState, session: &mut Session, text: &str) {
        for c in text.chars() {
            process_action(state, Action::InsertChar(c), session).unwrap();
        }
        process_action(state, Action::Submit, session).unwrap();
    }

    #[test]
    fn test_submit_sends_and_records_history() {
        let (mut state, mut session, mut peer) = setup(Mode::Text);
        type_line(&mut state, &mut session, "AT");
        assert_eq!(state.editor.history(), &["AT".to_string()]);
        session.close();

        let mut sent = Vec::new();
        peer.read_to_end(&mut sent).unwrap();
        assert_eq!(sent, b"AT\n");
    }

    #[test]
    fn test_invalid_input_reports_and_continues() {
        let (mut state, mut session, _peer) = setup(Mode::Raw);
        type_line(&mut state, &mut session, "0x1FF");
        assert!(!state.should_quit);
        assert_eq!(state.status.as_ref().map(|m| m.kind), Some(MessageKind::Error));
    }

    #[test]
    fn test_empty_line_is_ignored() {
        let (mut state, mut session, _peer) = setup(Mode::Text);
        type_line(&mut state, &mut session, "   ");
        assert!(state.status.is_none());
        assert!(state.editor.history().is_empty());
    }

    #[test]
    fn test_end_of_input_quits_only_on_empty_line() {
        let (mut state, mut session, _peer) = setup(Mode::Text);
        process_action(&mut state, Action::InsertChar('x'), &mut session).unwrap();
        process_action(&mut state, Action::CursorHome, &mut session).unwrap();
        process_action(&mut state, Action::EndOfInput, &mut session).unwrap();
        assert!(!state.should_quit);
        assert!(state.editor.is_empty());
        process_action(&mut state, Action::EndOfInput, &mut session).unwrap();
        assert!(state.should_quit);
    }

    #[test]
    fn test_fatal_ends_session() {
        let (mut state, mut session, _peer) = setup(Mode::Text);
        process_action(&mut state, Action::Fatal("remote side disconnected".into()), &mut session).unwrap();
        assert!(state.should_quit);
        assert_eq!(state.fatal.as_deref(), Some("remote side disconnected"));
    }

    #[test]
    fn test_mode_cycling() {
        let (mut state, mut session, _peer) = setup(Mode::Text);
        process_action(&mut state, Action::ToggleMode, &mut session).unwrap();
        assert_eq!(state.input_mode, InputMode::Scroll);

        process_action(&mut state, Action::Tick, &mut session).unwrap();
        process_action(&mut state, Action::CycleDisplayMode, &mut session).unwrap();
        assert_eq!(state.view.display_mode, Mode::Raw);

        process_action(&mut state, Action::CycleInputMode, &mut session).unwrap();
        assert_eq!(state.input_codec, Mode::Raw);
        assert_eq!(session.input_mode(), Mode::Raw);
    }
}
