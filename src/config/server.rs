use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "devmarks.toml";

const DEFAULT_TOKEN_TTL_HOURS: u32 = 24 * 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Session token lifetime. `0` issues tokens that never expire.
    pub token_ttl_hours: u32,
}

/// Values read from `devmarks.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub token_ttl_hours: Option<u32>,
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub token_ttl_hours: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

impl ServerConfig {
    /// Merges defaults, the config file and command-line overrides.
    ///
    /// Without an explicit `config_path`, `devmarks.toml` inside the data
    /// directory is read when it exists.
    pub fn resolve(overrides: ConfigOverrides, config_path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let data_dir = overrides
            .data_dir
            .clone()
            .unwrap_or_else(|| defaults.data_dir.clone());

        let file = match config_path {
            Some(path) => FileConfig::load(path)?,
            None => {
                let implicit = data_dir.join(CONFIG_FILE_NAME);
                if implicit.is_file() {
                    FileConfig::load(&implicit)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let config = Self {
            host: overrides.host.or(file.host).unwrap_or(defaults.host),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            data_dir: overrides.data_dir.or(file.data_dir).unwrap_or(data_dir),
            token_ttl_hours: overrides
                .token_ttl_hours
                .or(file.token_ttl_hours)
                .unwrap_or(defaults.token_ttl_hours),
        };

        tracing::debug!(?config, "resolved server configuration");
        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address: {e}")))
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("devmarks.db")
    }

    #[must_use]
    pub fn token_ttl(&self) -> Option<chrono::Duration> {
        (self.token_ttl_hours > 0).then(|| chrono::Duration::hours(i64::from(self.token_ttl_hours)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::resolve(
            ConfigOverrides {
                data_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.db_path(), dir.path().join("devmarks.db"));
        assert_eq!(config.token_ttl(), Some(chrono::Duration::hours(720)));
    }

    #[test]
    fn test_file_in_data_dir_is_read_and_flags_win() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "host = \"0.0.0.0\"\nport = 9000\ntoken_ttl_hours = 0\n",
        )
        .unwrap();

        let config = ServerConfig::resolve(
            ConfigOverrides {
                port: Some(9100),
                data_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9100);
        assert_eq!(config.token_ttl(), None);
        assert_eq!(config.socket_addr().unwrap().port(), 9100);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "hostname = \"x\"\n").unwrap();

        let result = ServerConfig::resolve(ConfigOverrides::default(), Some(&path));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_host_is_a_config_error() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(config.socket_addr(), Err(Error::Config(_))));
    }
}
