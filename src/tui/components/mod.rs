pub mod command_line;
pub mod help_popup;
pub mod output_pane;
pub mod status_bar;
