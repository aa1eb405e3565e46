use crate::app::editor::LineEditor;
use crate::app::AppState;
use crate::config::keybindings::load_keybindings;
use crate::config::Config;
use crate::persistence;
use crate::session::Session;
use crate::tui;
use crate::tui::event::EventHandler;
use crate::tui::ui::output_size;
use anyhow::{Context, Result};
use tracing::{info, warn};

use super::handler::{process_action, refresh};

/// Run the terminal session until the operator quits or the link fails.
///
/// Returns the reason the session ended when it ended badly.
pub async fn run_tui(config: Config) -> Result<Option<String>> {
    let (cols, rows) = crossterm::terminal::size().context("cannot read terminal size")?;
    let (width, height) = output_size(cols, rows);

    // Open before touching the screen so startup errors print normally
    let mut session = Session::open(&config, width, height)
        .with_context(|| format!("cannot open {}", config.endpoint))?;

    let history = persistence::load_history().unwrap_or_else(|e| {
        warn!(error = %e, "could not load command history");
        Vec::new()
    });
    let mut state = AppState::new(
        LineEditor::new(history, config.history_limit),
        load_keybindings(),
    );
    state.connection = session.info().describe();
    state.eol_display = session.info().eol.display_form();
    state.terminal_size = (cols, rows);
    refresh(&mut state, &session)?;

    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    events.watch_signals();

    let result = match session.spawn_reader(events.action_sender(), config.timeout) {
        Ok(()) => run_main_loop(&mut terminal, &mut state, &mut events, &mut session).await,
        Err(e) => Err(e.into()),
    };

    // Single teardown path for every way out of the loop
    let restored = tui::restore();
    session.close();
    if let Err(e) = persistence::save_history(state.editor.history(), config.history_limit) {
        warn!(error = %e, "could not save command history");
    }
    restored?;
    result?;

    info!(fatal = state.fatal.is_some(), "exiting");
    Ok(state.fatal)
}

async fn run_main_loop(
    terminal: &mut tui::Terminal,
    state: &mut AppState,
    events: &mut EventHandler,
    session: &mut Session,
) -> Result<()> {
    loop {
        terminal.draw(|frame| tui::ui::draw(frame, state))?;

        let action = events.next(state).await?;
        process_action(state, action, session)?;

        if state.should_quit {
            break;
        }
    }

    Ok(())
}
