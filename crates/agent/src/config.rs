//! Agent configuration, loaded from a TOML file at startup.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("failed to read settings file {path:?}"))]
    Read { source: std::io::Error, path: PathBuf },

    #[snafu(display("failed to parse settings file {path:?}"))]
    Parse { source: toml::de::Error, path: PathBuf },
}

pub type Result<T, E = SettingsError> = std::result::Result<T, E>;

/// Top-level agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL of the network map service this node polls.
    pub network_map_url: String,

    /// Directory this node's own node info is watched for and persisted
    /// to.
    pub node_info_dir: PathBuf,

    /// Path to the PEM-encoded trust anchor (root CA) certificate this
    /// node validates everything against.
    pub trust_anchor_path: PathBuf,

    /// The network parameters hash this node is currently running. The
    /// updater exits the process if the network map ever publishes a
    /// different hash, so there is no safe default for this value.
    pub current_parameters_hash: String,

    /// Directory the updater persists accepted-but-not-yet-active
    /// parameters updates to.
    #[serde(default = "default_base_directory")]
    pub base_directory: PathBuf,

    /// Minimum log level, passed straight to `tracing_subscriber`'s
    /// `EnvFilter` when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_base_directory() -> PathBuf {
    PathBuf::from("/var/lib/zone-agent")
}

impl Settings {
    /// Loads settings from a TOML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        toml::from_str(&contents).context(ParseSnafu { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_settings_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("agent.toml");
        std::fs::write(
            &path,
            r#"
            network_map_url = "https://network-map.example.invalid"
            node_info_dir = "/var/lib/zone-agent/node-info"
            trust_anchor_path = "/etc/zone-agent/root-ca.pem"
            current_parameters_hash = "deadbeef"
            "#,
        )
        .expect("failed to write settings file");

        let settings = Settings::from_file(&path).expect("failed to load settings");
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.network_map_url, "https://network-map.example.invalid");
        assert_eq!(settings.base_directory, PathBuf::from("/var/lib/zone-agent"));
    }
}
