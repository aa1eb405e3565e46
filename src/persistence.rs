use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ttyterm";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PersistedHistory {
    pub commands: Vec<String>,
}

/// `<config dir>/ttyterm`, if the platform has a config dir.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Default location of `config.toml`.
pub fn config_file() -> Option<PathBuf> {
    app_config_dir().map(|dir| dir.join("config.toml"))
}

/// Default log file under the cache dir.
pub fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR).join("ttyterm.log"))
}

fn history_path() -> Result<PathBuf> {
    let dir = app_config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    Ok(dir.join("history.json"))
}

pub fn load_history() -> Result<Vec<String>> {
    load_history_from(&history_path()?)
}

pub fn save_history(commands: &[String], limit: usize) -> Result<()> {
    save_history_to(&history_path()?, commands, limit)
}

pub fn load_history_from(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let history: PersistedHistory =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(history.commands)
}

/// Write the newest `limit` commands.
pub fn save_history_to(path: &Path, commands: &[String], limit: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let skip = commands.len().saturating_sub(limit);
    let history = PersistedHistory {
        commands: commands[skip..].to_vec(),
    };
    let contents = serde_json::to_string_pretty(&history)?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
