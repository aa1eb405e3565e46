use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::persistence;

/// Default keybindings embedded at compile time
const DEFAULT_KEYBINDINGS: &str = include_str!("defaults.toml");

/// A key combination (key code + modifiers)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyCombo {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Parse a key string like "Ctrl-c", "Shift-Tab", "Enter", "F2"
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut modifiers = KeyModifiers::NONE;
        let mut parts: Vec<&str> = s.split('-').collect();

        // Handle special case of single dash key
        if s == "-" {
            return Some(Self::new(KeyCode::Char('-'), KeyModifiers::NONE));
        }

        // Process modifiers (all but the last part)
        while parts.len() > 1 {
            let modifier = parts.remove(0).to_lowercase();
            match modifier.as_str() {
                "ctrl" | "c" => modifiers |= KeyModifiers::CONTROL,
                "alt" | "a" | "opt" | "option" => modifiers |= KeyModifiers::ALT,
                "shift" | "s" => modifiers |= KeyModifiers::SHIFT,
                "super" | "cmd" | "command" | "meta" => modifiers |= KeyModifiers::SUPER,
                _ => return None, // Unknown modifier
            }
        }

        // Parse the key code (last part)
        let key_str = parts[0];
        let code = parse_key_code(key_str)?;

        Some(Self::new(code, modifiers))
    }

    /// Convert to display string for UI
    pub fn display(&self) -> String {
        let mut parts = Vec::new();

        if self.modifiers.contains(KeyModifiers::SUPER) {
            parts.push("Cmd");
        }
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl");
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            parts.push("Alt");
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            parts.push("Shift");
        }

        let key_name = key_code_display(&self.code);
        parts.push(&key_name);

        parts.join("-")
    }
}

fn parse_key_code(s: &str) -> Option<KeyCode> {
    // Handle single character keys
    if s.len() == 1 {
        let c = s.chars().next()?;
        return Some(KeyCode::Char(c));
    }

    // Handle special keys (case insensitive)
    match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backtab" => Some(KeyCode::BackTab),
        "backspace" | "bs" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        "insert" | "ins" => Some(KeyCode::Insert),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "pageup" | "pgup" => Some(KeyCode::PageUp),
        "pagedown" | "pgdn" => Some(KeyCode::PageDown),
        "space" => Some(KeyCode::Char(' ')),
        other => other
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=12).contains(n))
            .map(KeyCode::F),
    }
}

fn key_code_display(code: &KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "BackTab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    }
}

/// The action name as a string (matches `Action::from_name`)
pub type ActionName = String;

/// Raw TOML structure for keybindings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeybindingsToml {
    #[serde(default)]
    pub global: HashMap<String, String>,
    #[serde(default)]
    pub insert: HashMap<String, String>,
    #[serde(default)]
    pub scroll: HashMap<String, String>,
    #[serde(default)]
    pub help: HashMap<String, String>,
}

/// Which binding table applies to a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Insert,
    Scroll,
    Help,
}

/// Parsed keybinding configuration with KeyCombo lookups
#[derive(Debug, Clone)]
pub struct KeybindingConfig {
    /// Bindings that apply in every scope unless shadowed
    pub global: HashMap<KeyCombo, ActionName>,
    pub insert: HashMap<KeyCombo, ActionName>,
    pub scroll: HashMap<KeyCombo, ActionName>,
    pub help: HashMap<KeyCombo, ActionName>,
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self::from_toml(DEFAULT_KEYBINDINGS)
    }
}

impl KeybindingConfig {
    /// Parse a HashMap<String, String> into HashMap<KeyCombo, ActionName>
    fn parse_bindings(raw: &HashMap<String, String>) -> HashMap<KeyCombo, ActionName> {
        raw.iter()
            .filter_map(|(key, action)| match KeyCombo::parse(key) {
                Some(combo) => Some((combo, action.clone())),
                None => {
                    warn!(key = %key, "ignoring unparseable key binding");
                    None
                }
            })
            .collect()
    }

    pub fn from_toml(content: &str) -> Self {
        let raw: KeybindingsToml = toml::from_str(content).unwrap_or_else(|e| {
            warn!(error = %e, "invalid keybindings, using defaults");
            toml::from_str(DEFAULT_KEYBINDINGS).unwrap_or_default()
        });
        Self {
            global: Self::parse_bindings(&raw.global),
            insert: Self::parse_bindings(&raw.insert),
            scroll: Self::parse_bindings(&raw.scroll),
            help: Self::parse_bindings(&raw.help),
        }
    }

    /// Scope table first, then the global one.
    pub fn lookup(&self, scope: Scope, combo: &KeyCombo) -> Option<&str> {
        let table = match scope {
            Scope::Insert => &self.insert,
            Scope::Scroll => &self.scroll,
            Scope::Help => &self.help,
        };
        table
            .get(combo)
            .or_else(|| self.global.get(combo))
            .map(String::as_str)
    }

    /// Key labels bound to `action`, for the help popup. `None` reads the
    /// global table alone.
    pub fn keys_for(&self, scope: Option<Scope>, action: &str) -> Vec<String> {
        let table = match scope {
            Some(Scope::Insert) => Some(&self.insert),
            Some(Scope::Scroll) => Some(&self.scroll),
            Some(Scope::Help) => Some(&self.help),
            None => None,
        };
        let mut keys: Vec<String> = table
            .into_iter()
            .flatten()
            .chain(self.global.iter())
            .filter(|(_, a)| a.as_str() == action)
            .map(|(k, _)| k.display())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Load keybindings from user config, falling back to defaults
pub fn load_keybindings() -> KeybindingConfig {
    let Some(user_config_path) = get_user_config_path() else {
        return KeybindingConfig::default();
    };

    let toml_content = if user_config_path.exists() {
        std::fs::read_to_string(&user_config_path).unwrap_or_else(|e| {
            warn!(path = %user_config_path.display(), error = %e, "cannot read keybindings");
            DEFAULT_KEYBINDINGS.to_string()
        })
    } else {
        // Create user config directory and file with defaults
        if let Some(parent) = user_config_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&user_config_path, DEFAULT_KEYBINDINGS) {
            debug!(error = %e, "could not write default keybindings");
        }
        DEFAULT_KEYBINDINGS.to_string()
    };

    KeybindingConfig::from_toml(&toml_content)
}

/// Get the path to user's keybindings config file
pub fn get_user_config_path() -> Option<PathBuf> {
    persistence::app_config_dir().map(|dir| dir.join("keybindings.toml"))
}
