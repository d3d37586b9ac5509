use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "chatbot-ui";
const ENDPOINT_ENV: &str = "CHATBOT_UI_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend; requests go to `<endpoint>/chat`.
    pub endpoint: String,
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    pub window_size: [f32; 2],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            data_dir: None,
            log_level: "info".to_string(),
            window_size: [1024.0, 760.0],
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Loads the config file at the default location, then applies the
    /// environment override.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint.trim().to_string();
            }
        }
        Ok(config)
    }

    /// A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::error::ConfigError;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let config = Config::from_file(&dir.path().join("config.toml")).expect("should load");
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, "http://localhost:5000");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "endpoint = \"http://10.0.0.5:8080\"\ndata_dir = \"/tmp/chat\"\n",
        )
        .expect("fixture should write");

        let config = Config::from_file(&path).expect("should load");
        assert_eq!(config.endpoint, "http://10.0.0.5:8080");
        assert_eq!(config.resolved_data_dir(), PathBuf::from("/tmp/chat"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.toml");
        fs::write(&path, "endpoint = ").expect("fixture should write");

        let error = Config::from_file(&path).expect_err("invalid toml should fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }
}
