mod keys;

use crate::app::{Action, AppState};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEventKind};
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Internal event type for terminal events
enum TerminalEvent {
    Key(KeyEvent),
    Paste(String),
    MouseScrollUp,
    MouseScrollDown,
    Resize(u16, u16),
    Tick,
}

pub struct EventHandler {
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    terminal_rx: mpsc::UnboundedReceiver<TerminalEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (terminal_tx, terminal_rx) = mpsc::unbounded_channel();

        // Spawn dedicated thread for terminal events
        std::thread::spawn(move || {
            let poll_timeout = Duration::from_millis(50);
            loop {
                let event = if event::poll(poll_timeout).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                            TerminalEvent::Key(key)
                        }
                        Ok(Event::Mouse(mouse)) => match mouse.kind {
                            MouseEventKind::ScrollUp => TerminalEvent::MouseScrollUp,
                            MouseEventKind::ScrollDown => TerminalEvent::MouseScrollDown,
                            _ => TerminalEvent::Tick,
                        },
                        Ok(Event::Resize(w, h)) => TerminalEvent::Resize(w, h),
                        Ok(Event::Paste(data)) => TerminalEvent::Paste(data),
                        _ => TerminalEvent::Tick,
                    }
                } else {
                    TerminalEvent::Tick
                };

                if terminal_tx.send(event).is_err() {
                    break; // Channel closed, exit thread
                }
            }
        });

        Self {
            action_tx,
            action_rx,
            terminal_rx,
        }
    }

    pub fn action_sender(&self) -> mpsc::UnboundedSender<Action> {
        self.action_tx.clone()
    }

    /// Turn SIGTERM and SIGHUP into an orderly quit.
    pub fn watch_signals(&self) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
                (Ok(term), Ok(hup)) => (term, hup),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "cannot install signal handlers");
                    return;
                }
            };
            tokio::select! {
                _ = term.recv() => info!("SIGTERM received"),
                _ = hup.recv() => info!("SIGHUP received"),
            }
            let _ = tx.send(Action::Quit);
        });
    }

    fn translate(event: TerminalEvent, state: &AppState) -> Action {
        match event {
            TerminalEvent::Key(key) => keys::key_to_action(key, state),
            TerminalEvent::Paste(data) => Action::Paste(data),
            TerminalEvent::MouseScrollUp => Action::ScrollUp,
            TerminalEvent::MouseScrollDown => Action::ScrollDown,
            TerminalEvent::Resize(w, h) => Action::Resize(w, h),
            TerminalEvent::Tick => Action::Tick,
        }
    }

    pub async fn next(&mut self, state: &AppState) -> Result<Action> {
        // Keyboard input should never wait behind incoming data
        if let Ok(event) = self.terminal_rx.try_recv() {
            return Ok(Self::translate(event, state));
        }
        if let Ok(action) = self.action_rx.try_recv() {
            return Ok(action);
        }

        tokio::select! {
            biased;

            Some(event) = self.terminal_rx.recv() => Ok(Self::translate(event, state)),
            // Reader notifications and signals
            Some(action) = self.action_rx.recv() => Ok(action),
            else => Ok(Action::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
