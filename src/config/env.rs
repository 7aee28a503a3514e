use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub bot_username: Option<String>,
    pub admin_group_id: Option<i64>,
    pub classifier: ClassifierConfig,
    pub emotion: EmotionConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub timezone: String,
    pub history_page_size: usize,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Bearer token for the hosted inference endpoint. Anonymous calls work
    /// but are rate-limited by the host.
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

/// Normalization and presentation tables. Loaded once, validated against the
/// taxonomy, never mutated at runtime.
#[derive(Debug, Clone)]
pub struct EmotionConfig {
    pub taxonomy: Vec<String>,
    pub default_emotion: String,
    /// Raw classifier label → taxonomy member.
    pub label_map: Vec<(String, String)>,
    /// Trigger substring → forced taxonomy member.
    pub overrides: Vec<(String, String)>,
    pub override_confidence: f64,
    /// Taxonomy member → display swatch.
    pub palette: Vec<(String, String)>,
    pub fallback_swatch: String,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
