use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated. `*` allows any origin.
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Cloud service identifiers
    #[serde(default = "default_service_name")]
    pub cloud_service_name: String,
    pub cloud_pod: Option<String>,

    /// Events buffered per connection before it is evicted as too slow
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Largest inbound WebSocket message accepted, in bytes
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from explicit key/value pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(pairs)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "OUTBOUND_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::Invalid(
                "MAX_MESSAGE_BYTES must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        match &self.cors_origins {
            Some(origins) => origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![default_cors_origin()],
        }
    }

    /// Fallback tracing filter when RUST_LOG is not set
    pub fn default_log_filter(&self) -> String {
        format!(
            "colabri_presence={},tower_http=debug,axum::rejection=trace,info",
            self.log_level
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            cloud_service_name: default_service_name(),
            cloud_pod: None,
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "colabri-presence".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_max_message_bytes() -> usize {
    1024 * 1024
}
