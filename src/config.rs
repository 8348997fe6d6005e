use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, OptionExt, Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::{PLATFORM_BATCH_LIMIT, UpdateOptions};
use crate::services::spotify::client::SPOTIFY_API_BASE_URL;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/playlist-sync/library.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for `--batch-size`, never above the platform limit.
    pub max_batch_size: usize,
    pub batch_size: usize,
    pub max_api_calls: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_batch_size: PLATFORM_BATCH_LIMIT,
            batch_size: PLATFORM_BATCH_LIMIT,
            max_api_calls: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub access_token: Option<String>,
    pub api_base_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base_url: SPOTIFY_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("playlist-sync").join("config.toml"))
    }

    /// Load `path`, or the default location. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let config_path = Self::config_path().ok_or_eyre("Could not determine config directory")?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::from_file(&config_path)
    }

    /// Write the default config to `path`, refusing to overwrite an existing file.
    pub fn create_default(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }

        let contents =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    pub fn database_path(&self) -> PathBuf {
        Self::expand_path(&self.database.path)
    }

    /// Spotify token from the config, falling back to `SPOTIFY_ACCESS_TOKEN`.
    pub fn spotify_access_token(&self) -> Option<String> {
        self.spotify
            .access_token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| std::env::var("SPOTIFY_ACCESS_TOKEN").ok())
            .filter(|token| !token.is_empty())
    }

    /// Update options seeded from the `[sync]` section.
    pub fn update_defaults(&self) -> UpdateOptions {
        UpdateOptions {
            batch_size: self.sync.batch_size,
            max_api_calls: self.sync.max_api_calls,
            ..UpdateOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[database]
path = "/tmp/library.db"

[sync]
batch_size = 50
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/library.db"));
        assert_eq!(config.sync.batch_size, 50);
        assert_eq!(config.sync.max_api_calls, 500);
        assert_eq!(config.spotify.api_base_url, SPOTIFY_API_BASE_URL);
        assert_eq!(config.update_defaults().batch_size, 50);
    }

    #[test]
    fn test_create_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::create_default(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
        assert!(Config::create_default(&path).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync\nbatch_size = ").unwrap();

        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(Config::expand_path("~/music.db"), home.join("music.db"));
        }
        assert_eq!(Config::expand_path("/abs/music.db"), PathBuf::from("/abs/music.db"));
    }
}
