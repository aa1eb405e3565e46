pub mod keybindings;

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::codec::Mode;
use crate::eol::Eol;
use crate::persistence;
use crate::transport::{Endpoint, FrameFormat};

pub const DEFAULT_SPEED: u32 = 9600;
pub const DEFAULT_EOL: &str = "n";
pub const DEFAULT_TIMEOUT_MS: i64 = 100;
pub const DEFAULT_FORMAT: &str = "8N1";
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown end-of-line `{0}` (expected n, r, rn or nr)")]
    InvalidEol(String),

    #[error("invalid frame format `{0}` (expected <5-8><N|E|O|0|1><1|2>, e.g. 8N1)")]
    InvalidFormat(String),

    #[error("timeout must not be negative (got {0} ms)")]
    NegativeTimeout(i64),

    #[error("baud rate must be positive")]
    InvalidSpeed,

    #[error("no device, host or socket given (use -n)")]
    MissingTarget,

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Parser)]
#[command(name = "ttyterm")]
#[command(version)]
#[command(about = "Terminal client for serial lines and TCP/Unix sockets")]
pub struct Cli {
    /// Serial device, host name or socket path
    #[arg(short, long)]
    pub name: Option<String>,

    /// Baud rate (serial only)
    #[arg(short, long)]
    pub speed: Option<u32>,

    /// End of line: n (\n), r (\r), rn (\r\n) or nr (\n\r)
    #[arg(short, long)]
    pub eol: Option<String>,

    /// Read timeout in milliseconds
    #[arg(short, long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// TCP port (implies --socket)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Connect to a socket instead of a serial device
    #[arg(short = 'S', long)]
    pub socket: bool,

    /// Serial frame format, e.g. 8N1 (parity 0 = space, 1 = mark)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Append all traffic to this file
    #[arg(short, long)]
    pub dumpfile: Option<PathBuf>,

    /// Initial display and input mode
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Log file (default: cache dir)
    #[arg(long, env = "TTYTERM_LOG")]
    pub log_file: Option<PathBuf>,

    /// Defaults file (default: config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Defaults read from `config.toml`; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub speed: Option<u32>,
    pub eol: Option<String>,
    pub timeout_ms: Option<i64>,
    pub format: Option<String>,
    pub mode: Option<Mode>,
    pub history_limit: Option<usize>,
}

impl FileConfig {
    /// Read the defaults file. A missing file yields empty defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated session settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Endpoint,
    pub speed: u32,
    pub eol: Eol,
    pub timeout: Duration,
    pub format: FrameFormat,
    pub mode: Mode,
    pub dumpfile: Option<PathBuf>,
    pub history_limit: usize,
}

impl Config {
    /// Load the defaults file named by `cli` (or the default one) and merge.
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = match cli.config.clone().or_else(persistence::config_file) {
            Some(path) => FileConfig::load(&path)?,
            None => FileConfig::default(),
        };
        Self::validate(cli, file)
    }

    /// Merge command line over file defaults and check every value.
    pub fn validate(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let eol_token = cli.eol.or(file.eol).unwrap_or_else(|| DEFAULT_EOL.to_string());
        let eol = Eol::resolve(&eol_token)?;

        let format_str = cli.format.or(file.format).unwrap_or_else(|| DEFAULT_FORMAT.to_string());
        let format: FrameFormat = format_str
            .parse()
            .map_err(|_| ConfigError::InvalidFormat(format_str.clone()))?;

        let timeout_ms = cli.timeout.or(file.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms < 0 {
            return Err(ConfigError::NegativeTimeout(timeout_ms));
        }

        let speed = cli.speed.or(file.speed).unwrap_or(DEFAULT_SPEED);
        if speed == 0 {
            return Err(ConfigError::InvalidSpeed);
        }

        let target = cli
            .name
            .filter(|n| !n.is_empty())
            .ok_or(ConfigError::MissingTarget)?;
        let endpoint = match (cli.socket, cli.port) {
            (_, Some(port)) => Endpoint::Tcp { host: target, port },
            (true, None) => Endpoint::Unix { path: target },
            (false, None) => Endpoint::Serial { device: target },
        };

        Ok(Self {
            endpoint,
            speed,
            eol,
            timeout: Duration::from_millis(timeout_ms as u64),
            format,
            mode: cli.mode.or(file.mode).unwrap_or_default(),
            dumpfile: cli.dumpfile,
            history_limit: file.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ttyterm"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let config = Config::validate(cli(&["-n", "/dev/ttyUSB0"]), FileConfig::default()).unwrap();
        assert_eq!(config.speed, 9600);
        assert_eq!(config.eol, Eol::Lf);
        assert_eq!(config.timeout, Duration::from_millis(100));
        assert_eq!(config.format, FrameFormat::default());
        assert_eq!(config.mode, Mode::Text);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert!(matches!(config.endpoint, Endpoint::Serial { ref device } if device == "/dev/ttyUSB0"));
    }

    #[test]
    fn test_endpoint_kinds() {
        let tcp = Config::validate(cli(&["-n", "localhost", "-S", "-p", "2000"]), FileConfig::default()).unwrap();
        assert!(matches!(tcp.endpoint, Endpoint::Tcp { port: 2000, .. }));

        let unix = Config::validate(cli(&["-n", "/tmp/sock", "-S"]), FileConfig::default()).unwrap();
        assert!(matches!(unix.endpoint, Endpoint::Unix { .. }));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig {
            speed: Some(115200),
            eol: Some("rn".into()),
            mode: Some(Mode::Hexdump),
            history_limit: Some(20),
            ..Default::default()
        };
        let config = Config::validate(cli(&["-n", "dev", "-e", "r"]), file).unwrap();
        assert_eq!(config.speed, 115200);
        assert_eq!(config.eol, Eol::Cr);
        assert_eq!(config.mode, Mode::Hexdump);
        assert_eq!(config.history_limit, 20);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let bad = |args: &[&str]| Config::validate(cli(args), FileConfig::default()).unwrap_err();
        assert!(matches!(bad(&["-n", "d", "-e", "x"]), ConfigError::InvalidEol(_)));
        assert!(matches!(bad(&["-n", "d", "-f", "9X1"]), ConfigError::InvalidFormat(_)));
        assert!(matches!(bad(&["-n", "d", "-t", "-5"]), ConfigError::NegativeTimeout(-5)));
        assert!(matches!(bad(&["-n", "d", "-s", "0"]), ConfigError::InvalidSpeed));
        assert!(matches!(bad(&[]), ConfigError::MissingTarget));
    }

    #[test]
    fn test_file_config_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(FileConfig::load(&path).unwrap(), FileConfig::default());

        std::fs::write(&path, "speed = 57600\nformat = \"7E2\"\nmode = \"rtu-hex\"\n").unwrap();
        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.speed, Some(57600));
        assert_eq!(file.format.as_deref(), Some("7E2"));
        assert_eq!(file.mode, Some(Mode::RtuHex));

        std::fs::write(&path, "speed = \"fast\"").unwrap();
        assert!(matches!(FileConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
