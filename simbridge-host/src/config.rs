//! Bridge configuration, read from `~/.simbridge/bridge.toml`.
//!
//! Every field has a default, and a missing or unreadable file never stops
//! the host: it logs and falls back to the defaults.

use crate::error::HostResult;
use serde::{Deserialize, Serialize};
use simbridge_protocol::{DEFAULT_HOST, DEFAULT_PORT};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a run does when the engine sends a frame tag outside the known set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTagPolicy {
    #[default]
    /// Log the frame, count it in the run report and keep reading.
    Ignore,
    /// End the run with a protocol fault.
    Fail,
}

/// How to find and start the engine subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bundled engine archive. Without one, `executable` must already exist.
    pub archive_path: Option<PathBuf>,
    /// Directory the archive is extracted into.
    pub runtime_dir: PathBuf,
    /// Engine executable, relative to `runtime_dir` unless absolute.
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub hide_window: bool,
    /// Start the engine when the console starts.
    pub autostart: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            archive_path: None,
            runtime_dir: dirs_path().join("engine"),
            executable: PathBuf::from(format!("simbridge-engine{}", std::env::consts::EXE_SUFFIX)),
            args: Vec::new(),
            hide_window: true,
            autostart: true,
        }
    }
}

/// Host configuration parsed from `bridge.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub unknown_tags: UnknownTagPolicy,
    pub engine: EngineConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            unknown_tags: UnknownTagPolicy::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Loads `~/.simbridge/bridge.toml` if it exists.
    pub fn load() -> Self {
        Self::load_from(dirs_path().join("bridge.toml"))
    }

    /// Loads config from a specific path, falling back to defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No bridge config at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded bridge config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse bridge config {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read bridge config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> HostResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// `host:port` of the engine.
    pub fn engine_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        Path::new(&home).join(".simbridge")
    } else if let Ok(home) = std::env::var("USERPROFILE") {
        Path::new(&home).join(".simbridge")
    } else {
        PathBuf::from(".simbridge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.engine_addr(), "127.0.0.1:6672");
        assert_eq!(config.unknown_tags, UnknownTagPolicy::Ignore);
        assert!(config.engine.hide_window);
        assert!(config.engine.autostart);
        assert!(config.engine.archive_path.is_none());
    }

    #[test]
    fn parse_full_file() {
        let toml_str = r#"
host = "127.0.0.1"
port = 7000
unknown_tags = "fail"

[engine]
archive_path = "/opt/game/mods/engine.zip"
runtime_dir = "/tmp/simbridge"
executable = "bin/engine"
args = ["--verbose"]
hide_window = false
autostart = false
"#;
        let config = BridgeConfig::parse(toml_str).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.unknown_tags, UnknownTagPolicy::Fail);
        assert_eq!(
            config.engine.archive_path,
            Some(PathBuf::from("/opt/game/mods/engine.zip"))
        );
        assert_eq!(config.engine.executable, PathBuf::from("bin/engine"));
        assert_eq!(config.engine.args, vec!["--verbose".to_string()]);
        assert!(!config.engine.hide_window);
        assert!(!config.engine.autostart);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = BridgeConfig::parse("port = 6000\n[engine]\nautostart = false\n").unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(!config.engine.autostart);
        assert!(config.engine.hide_window);
    }

    #[test]
    fn unknown_policy_value_is_rejected() {
        assert!(BridgeConfig::parse("unknown_tags = \"explode\"").is_err());
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load_from(dir.path().join("nope.toml"));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn load_from_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "port = \"not a number\"\n[engine\n").unwrap();
        let config = BridgeConfig::load_from(&path);
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn load_from_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "port = 7100\nunknown_tags = \"fail\"\n").unwrap();
        let config = BridgeConfig::load_from(&path);
        assert_eq!(config.port, 7100);
        assert_eq!(config.unknown_tags, UnknownTagPolicy::Fail);
        assert_eq!(config.engine, EngineConfig::default());
    }
}
