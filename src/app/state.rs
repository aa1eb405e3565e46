use crate::codec::Mode;
use crate::config::keybindings::{KeybindingConfig, Scope};
use crate::session::View;

use super::editor::LineEditor;

/// Operator mode: typing commands or moving through the scrollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Insert,
    Scroll,
}

impl InputMode {
    pub fn name(&self) -> &'static str {
        match self {
            InputMode::Insert => "INSERT",
            InputMode::Scroll => "SCROLL",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            InputMode::Insert => InputMode::Scroll,
            InputMode::Scroll => InputMode::Insert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

/// Transient line shown in the status bar until the next command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: MessageKind,
}

pub struct AppState {
    pub input_mode: InputMode,
    pub show_help: bool,
    pub editor: LineEditor,
    /// Encoding applied to typed commands
    pub input_codec: Mode,
    pub status: Option<StatusMessage>,
    pub view: View,
    /// Endpoint, line settings and terminator for the status bar
    pub connection: String,
    pub eol_display: &'static str,
    pub terminal_size: (u16, u16),
    pub keybindings: KeybindingConfig,
    pub should_quit: bool,
    /// Why the session ended, if it ended badly
    pub fatal: Option<String>,
}

impl AppState {
    pub fn new(editor: LineEditor, keybindings: KeybindingConfig) -> Self {
        Self {
            input_mode: InputMode::default(),
            show_help: false,
            editor,
            input_codec: Mode::default(),
            status: None,
            view: View::default(),
            connection: String::new(),
            eol_display: "",
            terminal_size: (0, 0),
            keybindings,
            should_quit: false,
            fatal: None,
        }
    }

    /// Binding table for the current mode.
    pub fn scope(&self) -> Scope {
        if self.show_help {
            return Scope::Help;
        }
        match self.input_mode {
            InputMode::Insert => Scope::Insert,
            InputMode::Scroll => Scope::Scroll,
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: MessageKind::Info,
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind: MessageKind::Error,
        });
    }
}
