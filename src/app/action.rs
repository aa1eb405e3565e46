#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Line editor
    InsertChar(char),
    Paste(String),
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    ClearLine,
    HistoryPrev,
    HistoryNext,
    Submit,

    // Viewport
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollTop,
    ScrollBottom,

    // Modes
    ToggleMode,
    ToggleHelp,
    CycleDisplayMode,
    CycleInputMode,

    // Session lifecycle
    EndOfInput,
    Quit,
    /// The session cannot continue (disconnect, I/O failure)
    Fatal(String),
    /// New data arrived from the transport
    Redraw,
    Resize(u16, u16),
    Tick,
}

impl Action {
    /// Resolve an action name from the keybindings file.
    pub fn from_name(name: &str) -> Option<Self> {
        let action = match name {
            "backspace" => Action::Backspace,
            "delete" => Action::Delete,
            "cursor_left" => Action::CursorLeft,
            "cursor_right" => Action::CursorRight,
            "cursor_home" => Action::CursorHome,
            "cursor_end" => Action::CursorEnd,
            "clear_line" => Action::ClearLine,
            "history_prev" => Action::HistoryPrev,
            "history_next" => Action::HistoryNext,
            "submit" => Action::Submit,
            "scroll_up" => Action::ScrollUp,
            "scroll_down" => Action::ScrollDown,
            "page_up" => Action::PageUp,
            "page_down" => Action::PageDown,
            "scroll_top" => Action::ScrollTop,
            "scroll_bottom" => Action::ScrollBottom,
            "toggle_mode" => Action::ToggleMode,
            "toggle_help" => Action::ToggleHelp,
            "cycle_display_mode" => Action::CycleDisplayMode,
            "cycle_input_mode" => Action::CycleInputMode,
            "end_of_input" => Action::EndOfInput,
            "quit" => Action::Quit,
            _ => return None,
        };
        Some(action)
    }
}
