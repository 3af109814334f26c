//! Configuration loading from disk and environment.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, environment
//! variables.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_LOGGER: &str = "LOGGER";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_LOG_DIR: &str = "LOG_DIR";
pub const ENV_BIND_ADDRESS: &str = "BIND_ADDRESS";
pub const ENV_COOKIE_SECRET: &str = "COOKIE_SECRET";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply process environment overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn apply_env<F>(config: &mut AppConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(settings) = env(ENV_LOGGER) {
        config.logging.settings = settings;
    }
    if let Some(debug) = env(ENV_DEBUG) {
        config.logging.debug = match debug.as_str() {
            "true" => true,
            "false" => false,
            _ => {
                return Err(ConfigError::Env {
                    key: ENV_DEBUG,
                    value: debug,
                })
            }
        };
    }
    if let Some(dir) = env(ENV_LOG_DIR) {
        config.logging.log_dir = dir;
    }
    if let Some(addr) = env(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Some(secret) = env(ENV_COOKIE_SECRET) {
        config.cookies.secret = (!secret.is_empty()).then_some(secret);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_config_with(None, env_of(&[])).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert!(config.logging.settings.is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[logging]\nsettings = \"BC\"\nlog_dir = \"/var/log/app\"\n[listener]\nbind_address = \"127.0.0.1:4000\""
        )
        .unwrap();

        let config = load_config_with(
            Some(file.path()),
            env_of(&[("LOGGER", "EF.RF"), ("DEBUG", "true"), ("COOKIE_SECRET", "k")]),
        )
        .unwrap();

        assert_eq!(config.logging.settings, "EF.RF");
        assert!(config.logging.debug);
        assert_eq!(config.logging.log_dir, "/var/log/app");
        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert_eq!(config.cookies.secret.as_deref(), Some("k"));
    }

    #[test]
    fn test_debug_is_strict() {
        let err = load_config_with(None, env_of(&[("DEBUG", "yes")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "DEBUG", .. }));
        assert!(load_config_with(None, env_of(&[("DEBUG", "false")])).is_ok());
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = load_config_with(None, env_of(&[("BIND_ADDRESS", "localhost")])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "listener.bind_address"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config_with(Some(Path::new("/definitely/not/here.toml")), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging\nsettings = 1").unwrap();
        let err = load_config_with(Some(file.path()), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
