use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub llm: LLMConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub session: SessionConfig,
}

/// Where the pre-fetched quiz list is loaded from
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub path: String,
}

/// Quiz generation (chat completions) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

/// Countdown configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Length of one countdown "second" in milliseconds.
    pub tick_millis: u64,
    /// How long an idle or completed session is kept before eviction.
    pub retention_secs: u64,
    /// How often the registry is swept for stale sessions.
    pub sweep_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            catalog: CatalogConfig::from_env()?,
            llm: LLMConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            session: SessionConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        info!(
            catalog_path = %self.catalog.path,
            llm_api_key_masked = %mask_sensitive_data(&self.llm.api_key),
            llm_model = %self.llm.model,
            server_address = %self.server.address(),
            log_level = %self.logging.level,
            tick_millis = self.session.tick_millis,
            retention_secs = self.session.retention_secs,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.session.tick_millis == 0 {
            return Err(anyhow!("SESSION_TICK_MILLIS must be greater than 0"));
        }

        if self.session.sweep_secs == 0 {
            return Err(anyhow!("SESSION_SWEEP_SECS must be greater than 0"));
        }

        if self.llm.max_tokens == 0 {
            return Err(anyhow!("LLM_MAX_TOKENS must be greater than 0"));
        }

        if self.llm.api_key.is_empty() || self.llm.api_key == "your-api-key" {
            warn!("LLM API key appears to be placeholder or empty - quiz generation may not work");
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self> {
        let path = env::var("QUIZ_CATALOG_PATH").unwrap_or_else(|_| "data/quizzes.json".to_string());
        Ok(CatalogConfig { path })
    }
}

impl LLMConfig {
    fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY").unwrap_or_else(|_| "your-api-key".to_string());
        let base_url = env::var("LLM_BASE_URL").ok();
        let model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let max_tokens_str = env::var("LLM_MAX_TOKENS").unwrap_or_else(|_| "1500".to_string());
        let max_tokens = max_tokens_str
            .parse::<u32>()
            .map_err(|_| anyhow!("Invalid LLM_MAX_TOKENS value: '{}'", max_tokens_str))?;

        Ok(LLMConfig {
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,quiz_session=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

impl SessionConfig {
    fn from_env() -> Result<Self> {
        let tick_str = env::var("SESSION_TICK_MILLIS").unwrap_or_else(|_| "1000".to_string());
        let tick_millis = tick_str
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid SESSION_TICK_MILLIS value: '{}'", tick_str))?;

        let retention_str = env::var("SESSION_RETENTION_SECS").unwrap_or_else(|_| "1800".to_string());
        let retention_secs = retention_str
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid SESSION_RETENTION_SECS value: '{}'", retention_str))?;

        let sweep_str = env::var("SESSION_SWEEP_SECS").unwrap_or_else(|_| "60".to_string());
        let sweep_secs = sweep_str
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid SESSION_SWEEP_SECS value: '{}'", sweep_str))?;

        Ok(SessionConfig {
            tick_millis,
            retention_secs,
            sweep_secs,
        })
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_secs)
    }
}

/// Mask sensitive data in configuration for safe logging
pub fn mask_sensitive_data(data: &str) -> String {
    if data.len() <= 8 {
        "*".repeat(data.len())
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            catalog: CatalogConfig {
                path: "data/quizzes.json".to_string(),
            },
            llm: LLMConfig {
                api_key: "sk-valid-key".to_string(),
                base_url: None,
                model: "gpt-4o-mini".to_string(),
                max_tokens: 1500,
            },
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
            session: SessionConfig {
                tick_millis: 1000,
                retention_secs: 1800,
                sweep_secs: 60,
            },
        }
    }

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("sk-1234567890abcdef"), "sk-1***cdef");
    }

    #[test]
    fn test_config_validation() {
        let config = valid_config();
        assert!(config.validate().is_ok());

        let mut invalid = config.clone();
        invalid.server.port = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = config.clone();
        invalid.session.tick_millis = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = config.clone();
        invalid.session.sweep_secs = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = config;
        invalid.llm.max_tokens = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_tick_period_and_address() {
        let config = valid_config();
        assert_eq!(config.session.tick_period(), Duration::from_secs(1));
        assert_eq!(config.session.retention(), Duration::from_secs(1800));
        assert_eq!(config.session.sweep_period(), Duration::from_secs(60));
        assert_eq!(config.server.address(), "0.0.0.0:3000");
    }
}
