mod action;
pub mod editor;
mod handler;
mod runtime;
mod state;

pub use action::Action;
pub use runtime::run_tui;
pub use state::{AppState, InputMode, MessageKind};
