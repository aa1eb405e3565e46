use crate::app::{Action, AppState, InputMode};
use crate::config::keybindings::KeyCombo;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map a key press to an action through the binding tables for the
/// current mode. Unbound printable keys type into the command line.
pub(super) fn key_to_action(key: KeyEvent, state: &AppState) -> Action {
    let mut modifiers = key.modifiers;
    // Shift is already folded into the character
    if matches!(key.code, KeyCode::Char(_)) {
        modifiers.remove(KeyModifiers::SHIFT);
    }
    let combo = KeyCombo::new(key.code, modifiers);

    if let Some(action) = state
        .keybindings
        .lookup(state.scope(), &combo)
        .and_then(Action::from_name)
    {
        return action;
    }

    match key.code {
        KeyCode::Char(c)
            if !state.show_help
                && state.input_mode == InputMode::Insert
                && !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Action::InsertChar(c)
        }
        _ => Action::Tick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::editor::LineEditor;
    use crate::config::keybindings::KeybindingConfig;

    fn state() -> AppState {
        AppState::new(LineEditor::new(Vec::new(), 10), KeybindingConfig::default())
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_insert_mode_types_characters() {
        let state = state();
        assert_eq!(
            key_to_action(press(KeyCode::Char('k'), KeyModifiers::NONE), &state),
            Action::InsertChar('k')
        );
        assert_eq!(
            key_to_action(press(KeyCode::Char('A'), KeyModifiers::SHIFT), &state),
            Action::InsertChar('A')
        );
        assert_eq!(
            key_to_action(press(KeyCode::Enter, KeyModifiers::NONE), &state),
            Action::Submit
        );
    }

    #[test]
    fn test_scroll_mode_uses_its_own_table() {
        let mut state = state();
        state.input_mode = InputMode::Scroll;
        assert_eq!(
            key_to_action(press(KeyCode::Char('k'), KeyModifiers::NONE), &state),
            Action::ScrollUp
        );
        assert_eq!(
            key_to_action(press(KeyCode::Char('G'), KeyModifiers::SHIFT), &state),
            Action::ScrollBottom
        );
        assert_eq!(
            key_to_action(press(KeyCode::Char('x'), KeyModifiers::NONE), &state),
            Action::Tick
        );
    }

    #[test]
    fn test_global_keys_apply_everywhere() {
        let mut state = state();
        let tab = press(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(key_to_action(tab, &state), Action::ToggleMode);
        state.input_mode = InputMode::Scroll;
        assert_eq!(key_to_action(tab, &state), Action::ToggleMode);
        assert_eq!(
            key_to_action(press(KeyCode::Char('d'), KeyModifiers::CONTROL), &state),
            Action::EndOfInput
        );
    }

    #[test]
    fn test_help_popup_swallows_typing() {
        let mut state = state();
        state.show_help = true;
        assert_eq!(
            key_to_action(press(KeyCode::Esc, KeyModifiers::NONE), &state),
            Action::ToggleHelp
        );
        assert_eq!(
            key_to_action(press(KeyCode::Char('z'), KeyModifiers::NONE), &state),
            Action::Tick
        );
    }
}
