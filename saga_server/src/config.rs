//! Configuration settings for the Saga server.

use saga_core::KnowledgeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "saga.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub knowledge: KnowledgeConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from `saga.toml` if present, else defaults.
    ///
    /// Returns the file the configuration came from, if any.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = path {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Ok((Self::from_file(&default_path)?, Some(default_path)));
        }

        Ok((Config::default(), None))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(
                "server.api_prefix must start with '/'".to_string(),
            ));
        }
        self.knowledge
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Mount point for every API route.
    pub api_prefix: String,
    pub enable_cors: bool,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            api_prefix: "/api".to_string(),
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_core::SchemaPolicy;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.knowledge.schema_policy, SchemaPolicy::Lenient);
        assert_eq!(config.knowledge.layout.radius_per_node, 30.0);
    }

    #[test]
    fn test_parse_overrides() {
        let config = Config::parse(
            r#"
            [server]
            port = 8080
            cors_origins = ["http://localhost:5173"]

            [knowledge]
            schema_policy = "strict"

            [knowledge.layout]
            radius_per_node = 45.0
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.knowledge.schema_policy, SchemaPolicy::Strict);
        assert_eq!(config.knowledge.layout.radius_per_node, 45.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::parse("[server]\napi_prefix = \"api\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::parse("[knowledge.layout]\nradius_per_node = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::parse("[knowledge]\nschema_policy = \"loose\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/definitely/not/here/saga.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile(_))));
    }
}
