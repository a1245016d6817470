//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Oracle configuration
    pub oracle: OracleConfig,
    /// Pipeline configuration
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Oracle configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// API key for the chat-completions endpoint
    pub api_key: String,
    /// Model name to request
    pub model: String,
    /// Directory for the on-disk response cache
    pub cache_dir: String,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Rejected fix cycles allowed before a run gives up
    pub max_fix_cycles: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            oracle: OracleConfig {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                model: env::var("ORACLE_MODEL").unwrap_or_else(|_| "gpt-4-0613".to_string()),
                cache_dir: env::var("RESPONSE_CACHE_DIR")
                    .unwrap_or_else(|_| ".response-cache".to_string()),
            },
            pipeline: PipelineConfig {
                max_fix_cycles: env::var("PIPELINE_MAX_FIX_CYCLES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
