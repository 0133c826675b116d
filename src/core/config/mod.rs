//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment variables
//! 4. CLI flags (not handled here)
//!
//! # Config File Locations
//!
//! Searched in order:
//! 1. The path passed explicitly (e.g. `--config`); must exist
//! 2. `$CASCADE_MERGE_CONFIG` if set
//! 3. `<config_dir>/cascade-merge/config.toml`
//!
//! # Environment Overrides
//!
//! | Variable | Field |
//! |---|---|
//! | `PORT` | port of `listen` |
//! | `TOKEN` | `token` |
//! | `BITBUCKET_USERNAME` | `credentials.username` |
//! | `BITBUCKET_PASSWORD` | `credentials.password` |
//! | `CASCADE_MERGE_WORKDIR` | `workdir` |
//!
//! # Example
//!
//! ```no_run
//! use cascade_merge::core::config::Config;
//!
//! let loaded = Config::load(None).unwrap();
//! println!("listening on {}", loaded.config.listen);
//! ```

pub mod schema;

pub use schema::{BitbucketConfig, ServiceConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CASCADE_MERGE_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: ServiceConfig,
    /// The file it was read from, if any.
    pub source: Option<PathBuf>,
}

/// Configuration loader.
pub struct Config;

impl Config {
    /// Load configuration from the standard locations and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing, if a config file
    /// exists but cannot be parsed, or if the merged values are invalid.
    /// A missing default config file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with_env(explicit, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], with environment lookups going through `env`.
    pub fn load_with_env(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let (mut config, source) = match Self::locate(explicit, &env)? {
            Some(path) => (Self::read_config(&path)?, Some(path)),
            None => (ServiceConfig::default(), None),
        };

        Self::apply_env(&mut config, &env)?;
        config.validate()?;

        Ok(ConfigLoadResult { config, source })
    }

    fn locate(
        explicit: Option<&Path>,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Ok(Some(path.to_path_buf()));
        }

        if let Some(path) = env(CONFIG_ENV).map(PathBuf::from) {
            if path.exists() {
                return Ok(Some(path));
            }
        }

        Ok(dirs::config_dir()
            .map(|dir| dir.join("cascade-merge/config.toml"))
            .filter(|path| path.exists()))
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply environment overrides in one pass.
    fn apply_env(
        config: &mut ServiceConfig,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = env("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("invalid PORT '{port}'")))?;
            let mut addr = config.listen_addr()?;
            addr.set_port(port);
            config.listen = addr.to_string();
        }
        if let Some(token) = env("TOKEN") {
            config.token = token;
        }
        if let Some(username) = env("BITBUCKET_USERNAME") {
            config.credentials.username = username;
        }
        if let Some(password) = env("BITBUCKET_PASSWORD") {
            config.credentials.password = password;
        }
        if let Some(workdir) = env("CASCADE_MERGE_WORKDIR") {
            config.workdir = PathBuf::from(workdir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
            listen = "127.0.0.1:8080"
            token = "secret"
            queue_capacity = 5
            "#,
        );

        let result = Config::load_with_env(Some(&path), env_from(&[])).unwrap();
        assert_eq!(result.config.listen, "127.0.0.1:8080");
        assert_eq!(result.config.token, "secret");
        assert_eq!(result.config.queue_capacity, 5);
        assert_eq!(result.source, Some(path));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Config::load_with_env(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn env_names_the_config_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "token = \"from-file\"\n");
        let path_str = path.to_string_lossy().to_string();

        let result =
            Config::load_with_env(None, env_from(&[(CONFIG_ENV, path_str.as_str())])).unwrap();
        assert_eq!(result.config.token, "from-file");
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
            listen = "127.0.0.1:8080"
            token = "file-token"

            [credentials]
            username = "file-user"
            password = "file-pass"
            "#,
        );

        let env = env_from(&[
            ("PORT", "9000"),
            ("TOKEN", "env-token"),
            ("BITBUCKET_USERNAME", "env-user"),
            ("BITBUCKET_PASSWORD", "env-pass"),
            ("CASCADE_MERGE_WORKDIR", "/srv/cascade"),
        ]);
        let config = Config::load_with_env(Some(&path), env).unwrap().config;

        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.token, "env-token");
        assert_eq!(config.credentials.username, "env-user");
        assert_eq!(config.credentials.password, "env-pass");
        assert_eq!(config.workdir, PathBuf::from("/srv/cascade"));
    }

    #[test]
    fn bad_port_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let err = Config::load_with_env(Some(&path), env_from(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn unknown_fields_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "unknown_key = 1\n");
        let err = Config::load_with_env(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_values_rejected_after_merge() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "queue_capacity = 0\n");
        let err = Config::load_with_env(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
