//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, CourierConfig, LogFormat};

/// Prefix used by [`ConfigLoader::with_default_env`].
pub const DEFAULT_ENV_PREFIX: &str = "COURIER";

/// Loads a [`CourierConfig`] in layers, later layers overriding earlier
/// ones:
/// 1. defaults or a preset
/// 2. TOML or JSON files and inline strings, each overriding only the
///    keys it sets
/// 3. environment variables named `PREFIX__SECTION__KEY`
///
/// ```no_run
/// use courier_config::ConfigLoader;
///
/// # fn main() -> Result<(), courier_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("courier.toml")?
///     .with_dotenv()?
///     .with_env_prefix("COURIER")
///     .load()?;
///
/// println!("listening on {}", config.server.bind_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: CourierConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Starts from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CourierConfig::default(),
            env_prefix: None,
        }
    }

    /// Starts from [`CourierConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = CourierConfig::development();
        self
    }

    /// Starts from [`CourierConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = CourierConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file.
    ///
    /// Keys the file sets override the configuration loaded so far; keys
    /// it omits keep their current values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has an
    /// unsupported extension, does not parse, or has unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        self.overlay(&content, format)?;
        Ok(self)
    }

    /// Loads a file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) when the file exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Overlays configuration text in `format` (`"toml"` or `"json"`), like
    /// [`with_file`](Self::with_file).
    ///
    /// ```
    /// use courier_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\npath = \"/ws\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.server.path, "/ws");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.overlay(content, format)?;
        Ok(self)
    }

    fn overlay(&mut self, content: &str, format: &str) -> Result<(), ConfigError> {
        let overrides = parse(content, format)?;
        let mut merged = serde_json::to_value(&self.config)?;
        merge(&mut merged, overrides);
        self.config = serde_json::from_value(merged)?;
        Ok(())
    }

    /// Reads overrides from variables named `PREFIX__SECTION__KEY` when
    /// loading, e.g. `COURIER__SERVER__BIND_ADDR=127.0.0.1:4000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// [`with_env_prefix`](Self::with_env_prefix) with [`DEFAULT_ENV_PREFIX`].
    #[must_use]
    pub fn with_default_env(self) -> Self {
        self.with_env_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Loads a `.env` file from the working directory or its parents into
    /// the process environment. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if a `.env` file exists but cannot be
    /// parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or the result
    /// fails [`CourierConfig::validate`].
    pub fn load(self) -> Result<CourierConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse.
    pub fn load_unvalidated(mut self) -> Result<CourierConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(&prefix, env::vars())?;
        }
        Ok(self.config)
    }

    fn apply_env_vars(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let head = format!("{prefix}__");
        for (key, value) in vars {
            if let Some(path) = key.strip_prefix(&head) {
                self.apply_env_var(&key, path, &value)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let server = &mut self.config.server;
        let telemetry = &mut self.config.telemetry;

        match parts.as_slice() {
            ["SERVER", "BIND_ADDR"] => server.bind_addr = value.to_string(),
            ["SERVER", "PATH"] => server.path = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["SERVER", "MAX_MESSAGE_SIZE"] => {
                server.max_message_size = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            ["TELEMETRY", "SERVICE_NAME"] => telemetry.service_name = value.to_string(),

            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                telemetry.logging.enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
                };
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                telemetry.logging.include_location = parse_bool(key, value)?;
            }

            ["TELEMETRY", "METRICS", "ENABLED"] => {
                telemetry.metrics.enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => telemetry.metrics.addr = value.to_string(),

            // Unknown keys are left to other consumers of the prefix.
            _ => {}
        }
        Ok(())
    }
}

// The layer's own keys. It is checked against the schema on its own first,
// so unknown fields are reported in the layer's format.
fn parse(content: &str, format: &str) -> Result<Value, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => {
            toml::from_str::<CourierConfig>(content)?;
            Ok(toml::from_str(content)?)
        }
        "json" => {
            serde_json::from_str::<CourierConfig>(content)?;
            Ok(serde_json::from_str(content)?)
        }
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, value) => *base = value,
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, CourierConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert!(config.telemetry.metrics.enabled);
    }

    #[test]
    fn test_with_string_json() {
        let json = r#"{"server": {"bind_addr": "127.0.0.1:4000"}}"#;
        let config = ConfigLoader::new().with_string(json, "json").unwrap().load().unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.server.path, "/");
    }

    #[test]
    fn test_layers_override_only_their_keys() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[server]\npath = \"/chat\"\n[telemetry]\nservice_name = \"chat\"", "toml")
            .unwrap()
            .with_string(r#"{"telemetry": {"logging": {"level": "warn"}}}"#, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.path, "/chat");
        assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.telemetry.service_name, "chat");
        assert_eq!(config.telemetry.logging.level, "warn");
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_with_string_unknown_field() {
        let toml = "[server]\nport = 80";
        let err = ConfigLoader::new().with_string(toml, "toml").unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_with_string_unsupported_format() {
        let err = ConfigLoader::new().with_string("a: b", "yaml").unwrap_err();
        assert_eq!(err.to_string(), "unsupported configuration format: yaml");
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new().with_file("/nonexistent/courier.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/courier.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, CourierConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_vars(
                "COURIER",
                vars(&[
                    ("COURIER__SERVER__BIND_ADDR", "127.0.0.1:4000"),
                    ("COURIER__SERVER__PATH", "/ws"),
                    ("COURIER__SERVER__MAX_MESSAGE_SIZE", "1024"),
                    ("COURIER__TELEMETRY__LOGGING__FORMAT", "Pretty"),
                    ("COURIER__TELEMETRY__METRICS__ENABLED", "on"),
                    ("COURIER__SOMETHING__ELSE", "ignored"),
                    ("COURIERX__SERVER__PATH", "/not-ours"),
                    ("PATH", "/usr/bin"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated().unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.server.path, "/ws");
        assert_eq!(config.server.max_message_size, 1024);
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
        assert!(config.telemetry.metrics.enabled);
    }

    #[test]
    fn test_env_parse_failures() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env_vars("COURIER", vars(&[("COURIER__SERVER__SHUTDOWN_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("COURIER__SERVER__SHUTDOWN_TIMEOUT_SECS"));

        let err = loader
            .apply_env_vars("COURIER", vars(&[("COURIER__TELEMETRY__LOGGING__ENABLED", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("expected boolean"));
    }

    #[test]
    fn test_load_validates() {
        let err = ConfigLoader::new()
            .with_string("[server]\npath = \"ws\"", "toml")
            .unwrap()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
