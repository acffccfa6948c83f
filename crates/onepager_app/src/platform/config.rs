use std::fs;
use std::path::{Path, PathBuf};

use onepager_engine::BackendConfig;
use onepager_logging::{redact_secret, wizard_info, wizard_warn};
use serde::Deserialize;
use thiserror::Error;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "onepager.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Contents of `onepager.ron`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Same-origin host of the one-pager service.
    pub origin: Option<String>,
    pub backend_base_url: Option<String>,
    /// Replaces the built-in local development backends.
    pub fallback_bases: Option<Vec<String>>,
    pub logo_api_key: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub log: Option<LogDestination>,
}

/// Command-line and environment values, which win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_base_url: Option<String>,
    pub logo_api_key: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl AppConfig {
    /// A missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn backend(self, overrides: Overrides) -> BackendConfig {
        let defaults = BackendConfig::default();
        let config = BackendConfig {
            origin: self.origin,
            backend_base_url: overrides.backend_base_url.or(self.backend_base_url),
            fallback_bases: self.fallback_bases.unwrap_or(defaults.fallback_bases.clone()),
            logo_api_key: overrides.logo_api_key.or(self.logo_api_key),
            output_dir: overrides
                .output_dir
                .or(self.output_dir)
                .unwrap_or(defaults.output_dir.clone()),
            ..defaults
        };

        match config.logo_api_key.as_deref() {
            Some(key) if config.logo_key_is_publishable() => wizard_warn!(
                "Logo search key {} is publishable; search needs a secret (sk_) key",
                redact_secret(key)
            ),
            Some(key) => wizard_info!("Logo search key {}", redact_secret(key)),
            None => wizard_info!("No logo search key; suggestions use the backend proxy"),
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn file_values_are_read_and_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"(
                backend_base_url: Some("https://file.example.com"),
                fallback_bases: Some([]),
                logo_api_key: Some("sk_from_file"),
                log: Some(both),
            )"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.log, Some(LogDestination::Both));

        let backend = config.backend(Overrides {
            backend_base_url: Some("https://cli.example.com".to_string()),
            output_dir: Some(PathBuf::from("decks")),
            ..Overrides::default()
        });
        assert_eq!(backend.backend_base_url.as_deref(), Some("https://cli.example.com"));
        assert_eq!(backend.logo_api_key.as_deref(), Some("sk_from_file"));
        assert_eq!(backend.output_dir, PathBuf::from("decks"));
        assert_eq!(backend.candidate_base_urls(), vec!["https://cli.example.com"]);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "(origin: 42").unwrap();

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
