use std::env;

use url::Url;

use super::env::{
    AppConfig, ClassifierConfig, ConfigError, DirectoryConfig, EmotionConfig, LoggingConfig,
};

const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_MODEL: &str = "bhadresh-savani/distilbert-base-uncased-emotion";

const DEFAULT_TAXONOMY: &[&str] = &["happy", "love", "sad", "anger", "romantic", "neutral"];
const DEFAULT_EMOTION: &str = "neutral";
// Covers the label set of the usual hosted emotion models; anything else
// (fear, surprise, ...) falls through to the default emotion.
const DEFAULT_LABEL_MAP: &[(&str, &str)] = &[
    ("joy", "happy"),
    ("happiness", "happy"),
    ("love", "love"),
    ("sadness", "sad"),
    ("anger", "anger"),
    ("hate", "anger"),
    ("romance", "romantic"),
];
// The base models routinely mislabel affection as joy.
const DEFAULT_OVERRIDES: &[(&str, &str)] = &[("love", "love"), ("사랑", "love")];
const DEFAULT_PALETTE: &[(&str, &str)] = &[
    ("happy", "🟡"),
    ("love", "❤️"),
    ("sad", "🔵"),
    ("anger", "🔴"),
    ("romantic", "🟣"),
    ("neutral", "⚪"),
];
const DEFAULT_FALLBACK_SWATCH: &str = "⚪";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let bot_username = env::var("BOT_USERNAME").ok().filter(|v| !v.is_empty());
        let admin_group_id = parse_int("ADMIN_GROUP_ID").map(|id| if id > 0 { -id } else { id });

        let endpoint = env::var("CLASSIFIER_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        Url::parse(&endpoint).map_err(|err| ConfigError::Invalid {
            key: "CLASSIFIER_ENDPOINT",
            reason: err.to_string(),
        })?;

        let classifier = ClassifierConfig {
            api_key: env::var("CLASSIFIER_API_KEY").ok().filter(|v| !v.is_empty()),
            model: env::var("CLASSIFIER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            endpoint,
            timeout: std::time::Duration::from_millis(
                env::var("CLASSIFIER_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(15_000),
            ),
        };

        let emotion = EmotionConfig {
            taxonomy: parse_list("EMOTIONS")
                .unwrap_or_else(|| DEFAULT_TAXONOMY.iter().map(|s| s.to_string()).collect()),
            default_emotion: env::var("DEFAULT_EMOTION")
                .unwrap_or_else(|_| DEFAULT_EMOTION.to_string()),
            label_map: parse_pairs("EMOTION_LABEL_MAP").unwrap_or_else(|| owned(DEFAULT_LABEL_MAP)),
            overrides: parse_pairs("EMOTION_OVERRIDES").unwrap_or_else(|| owned(DEFAULT_OVERRIDES)),
            override_confidence: env::var("OVERRIDE_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(1.0),
            palette: parse_pairs("EMOTION_PALETTE").unwrap_or_else(|| owned(DEFAULT_PALETTE)),
            fallback_swatch: env::var("EMOTION_FALLBACK_SWATCH")
                .unwrap_or_else(|_| DEFAULT_FALLBACK_SWATCH.to_string()),
        };
        validate_emotion_config(&emotion)?;

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "moodlog.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let timezone = env::var("BOT_TIMEZONE").unwrap_or_else(|_| "Asia/Seoul".to_string());

        let history_page_size = env::var("HISTORY_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(10);

        Ok(Self {
            telegram_bot_token,
            bot_username,
            admin_group_id,
            classifier,
            emotion,
            directories,
            logging,
            timezone,
            history_page_size,
        })
    }
}

fn validate_emotion_config(emotion: &EmotionConfig) -> Result<(), ConfigError> {
    if emotion.taxonomy.is_empty() {
        return Err(ConfigError::Invalid {
            key: "EMOTIONS",
            reason: "taxonomy must not be empty".to_string(),
        });
    }
    if !emotion.taxonomy.contains(&emotion.default_emotion) {
        return Err(ConfigError::Invalid {
            key: "DEFAULT_EMOTION",
            reason: format!("'{}' is not a taxonomy member", emotion.default_emotion),
        });
    }
    for (label, target) in &emotion.label_map {
        if !emotion.taxonomy.contains(target) {
            return Err(ConfigError::Invalid {
                key: "EMOTION_LABEL_MAP",
                reason: format!("'{label}' maps to non-taxonomy emotion '{target}'"),
            });
        }
    }
    for (trigger, target) in &emotion.overrides {
        if !emotion.taxonomy.contains(target) {
            return Err(ConfigError::Invalid {
                key: "EMOTION_OVERRIDES",
                reason: format!("'{trigger}' forces non-taxonomy emotion '{target}'"),
            });
        }
    }
    if !(0.0..=1.0).contains(&emotion.override_confidence) {
        return Err(ConfigError::Invalid {
            key: "OVERRIDE_CONFIDENCE",
            reason: format!("{} is outside [0, 1]", emotion.override_confidence),
        });
    }
    Ok(())
}

fn parse_int(key: &str) -> Option<i64> {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
}

fn parse_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|value| split_list(&value))
}

fn parse_pairs(key: &str) -> Option<Vec<(String, String)>> {
    env::var(key).ok().map(|value| split_pairs(&value))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn split_pairs(value: &str) -> Vec<(String, String)> {
    value
        .split(',')
        .filter_map(|part| {
            let (key, val) = part.split_once('=')?;
            let key = key.trim();
            let val = val.trim();
            if key.is_empty() || val.is_empty() {
                None
            } else {
                Some((key.to_string(), val.to_string()))
            }
        })
        .collect()
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
