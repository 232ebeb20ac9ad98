//! Configuration types for the Tutor Loop engine.
//!
//! Configuration is read from `tutor.json` (camelCase keys). Every field has a
//! default, so a missing file or a partial file is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};
use crate::retry::RetryPolicy;

/// The default config file name.
const CONFIG_FILE_NAME: &str = "tutor.json";

/// Largest curriculum a session may request.
pub const MAX_CURRICULUM_SIZE: usize = 10;

/// Default learner name recorded in the progress log.
fn default_user() -> String {
    "learner".to_string()
}

/// Default number of subtopics per curriculum.
const fn default_curriculum_size() -> usize {
    5
}

/// Default progress log location.
fn default_progress_file() -> String {
    ".tutor/progress.json".to_string()
}

/// Default model identifier.
fn default_model() -> String {
    "gemini-pro".to_string()
}

/// Default environment variable holding the API key.
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

/// Default API base URL.
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Default per-request timeout in seconds.
const fn default_request_timeout() -> u64 {
    30
}

/// Default number of generation attempts.
const fn default_max_attempts() -> u32 {
    3
}

/// Default linear backoff base in milliseconds.
const fn default_backoff_base_ms() -> u64 {
    1000
}

/// Main configuration for a tutoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Learner name written to the progress log.
    #[serde(default = "default_user")]
    pub user: String,

    /// Number of subtopics in every curriculum.
    #[serde(default = "default_curriculum_size")]
    pub curriculum_size: usize,

    /// Content provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Retry policy for generation calls.
    #[serde(default)]
    pub retry: RetrySettings,

    /// Path to the progress log file.
    #[serde(default = "default_progress_file")]
    pub progress_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: default_user(),
            curriculum_size: default_curriculum_size(),
            provider: ProviderConfig::default(),
            retry: RetrySettings::default(),
            progress_file: default_progress_file(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `tutor.json` in the current directory and falls back to
    /// defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON or values.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            TutorError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `tutor.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON or values.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigParseError` if the file cannot be read or
    /// contains invalid JSON or enum values.
    ///
    /// Returns `TutorError::ConfigValidationError` if the values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(TutorError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TutorError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// Checks that:
    /// - `curriculum_size` is between 1 and [`MAX_CURRICULUM_SIZE`]
    /// - `retry.max_attempts` is greater than 0
    /// - `provider.request_timeout_secs` is greater than 0
    /// - `user`, `progress_file` and `provider.model` are not empty
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.curriculum_size == 0 || self.curriculum_size > MAX_CURRICULUM_SIZE {
            return Err(TutorError::config_validation(
                format!(
                    "curriculumSize must be between 1 and {MAX_CURRICULUM_SIZE}, got {}",
                    self.curriculum_size
                ),
                "Set curriculumSize to a value like 5 in your tutor.json",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(TutorError::config_validation(
                "retry.maxAttempts must be greater than 0",
                "Set retry.maxAttempts to at least 1 in your tutor.json",
            ));
        }

        if self.provider.request_timeout_secs == 0 {
            return Err(TutorError::config_validation(
                "provider.requestTimeoutSecs must be greater than 0",
                "Set provider.requestTimeoutSecs to at least 1 second in your tutor.json",
            ));
        }

        if self.user.trim().is_empty() {
            return Err(TutorError::config_validation(
                "user must not be empty",
                "Provide a learner name in the 'user' field of your tutor.json",
            ));
        }

        if self.progress_file.trim().is_empty() {
            return Err(TutorError::config_validation(
                "progressFile must not be empty",
                "Provide a progress file path in your tutor.json (e.g. '.tutor/progress.json')",
            ));
        }

        if self.provider.kind == ProviderKind::Gemini && self.provider.model.trim().is_empty() {
            return Err(TutorError::config_validation(
                "provider.model must not be empty",
                "Set provider.model (e.g. 'gemini-pro') in your tutor.json",
            ));
        }

        Ok(())
    }

    /// Builds the retry policy described by this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.backoff_base_ms),
        )
        .with_call_timeout(Duration::from_secs(self.provider.request_timeout_secs))
    }
}

/// Supported content providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    /// Google Gemini `generateContent` API (default).
    #[default]
    Gemini,
    /// No provider: every generation fails and deterministic fallbacks are used.
    Offline,
}

impl ProviderKind {
    /// Parses a string into a `ProviderKind`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid provider kind '{s}': expected one of 'gemini', 'offline'"
            ))
        })
    }
}

impl Serialize for ProviderKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::Gemini => "gemini",
            Self::Offline => "offline",
        };
        serializer.serialize_str(s)
    }
}

/// Content provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Which provider to use.
    #[serde(default)]
    pub kind: ProviderKind,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single generation request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Retry settings for generation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    /// Total number of attempts per generation call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff base in milliseconds; attempt `k` waits `k * base`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.user, "learner");
        assert_eq!(config.curriculum_size, 5);
        assert_eq!(config.progress_file, ".tutor/progress.json");
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.model, "gemini-pro");
        assert_eq!(config.provider.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.provider.request_timeout_secs, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_base_ms, 1000);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config {
            retry: RetrySettings {
                max_attempts: 4,
                backoff_base_ms: 250,
            },
            ..Default::default()
        };

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff_base, Duration::from_millis(250));
        assert_eq!(policy.call_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_provider_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::Gemini).unwrap(),
            "\"gemini\""
        );
        assert_eq!(
            serde_json::to_string(&ProviderKind::Offline).unwrap(),
            "\"offline\""
        );
    }

    #[test]
    fn test_provider_kind_case_insensitive() {
        let config: Config = serde_json::from_str(r#"{"provider": {"kind": "OFFLINE"}}"#).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Offline);

        let config: Config = serde_json::from_str(r#"{"provider": {"kind": "Gemini"}}"#).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
    }

    #[test]
    fn test_invalid_provider_kind_error() {
        let json = r#"{"provider": {"kind": "gpt4"}}"#;
        let result: std::result::Result<Config, _> = serde_json::from_str(json);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid provider kind"));
        assert!(err.contains("gpt4"));
    }

    #[test]
    fn test_config_deserialization_with_overrides() {
        let json = r#"{
            "user": "ada",
            "curriculumSize": 3,
            "provider": { "model": "gemini-1.5-flash" },
            "retry": { "maxAttempts": 5 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.user, "ada");
        assert_eq!(config.curriculum_size, 3);
        assert_eq!(config.provider.model, "gemini-1.5-flash");
        assert_eq!(config.retry.max_attempts, 5);
        // Unspecified nested fields keep their defaults
        assert_eq!(config.provider.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.retry.backoff_base_ms, 1000);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"user": "ada", "theme": "dark"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.user, "ada");
    }

    #[test]
    fn test_load_from_file_valid_json() {
        let config_path = std::env::temp_dir().join("test_tutor_valid.json");
        std::fs::write(
            &config_path,
            r#"{ "user": "grace", "provider": { "kind": "offline" } }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.user, "grace");
        assert_eq!(config.provider.kind, ProviderKind::Offline);
        assert_eq!(config.curriculum_size, 5);

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let config_path = std::env::temp_dir().join("test_tutor_invalid.json");
        std::fs::write(&config_path, "{ not valid json }").unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(
            matches!(&err, TutorError::ConfigParseError { path, message } if *path == config_path && !message.is_empty()),
            "Expected ConfigParseError with correct path, got: {err:?}"
        );

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_load_from_file_nonexistent_returns_default() {
        let config = Config::load_from_file(&PathBuf::from("/nonexistent/path/tutor.json")).unwrap();
        assert_eq!(config.user, "learner");
        assert_eq!(config.curriculum_size, 5);
    }

    #[test]
    fn test_load_from_dir_finds_tutor_json() {
        let temp_dir = std::env::temp_dir().join("test_tutor_dir");
        std::fs::create_dir_all(&temp_dir).unwrap();
        let config_path = temp_dir.join("tutor.json");
        std::fs::write(&config_path, r#"{"curriculumSize": 7}"#).unwrap();

        let config = Config::load_from_dir(&temp_dir).unwrap();
        assert_eq!(config.curriculum_size, 7);

        std::fs::remove_file(&config_path).ok();
        std::fs::remove_dir(&temp_dir).ok();
    }

    #[test]
    fn test_config_validation_curriculum_size() {
        for size in [0, MAX_CURRICULUM_SIZE + 1] {
            let config = Config {
                curriculum_size: size,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(
                matches!(&err, TutorError::ConfigValidationError { message, suggestion }
                    if message.contains("curriculumSize") && suggestion.contains("curriculumSize")),
                "Expected ConfigValidationError about curriculumSize, got: {err:?}"
            );
        }
    }

    #[test]
    fn test_config_validation_zero_attempts() {
        let config = Config {
            retry: RetrySettings {
                max_attempts: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, TutorError::ConfigValidationError { message, .. } if message.contains("maxAttempts")),
            "Expected ConfigValidationError about maxAttempts, got: {err:?}"
        );
    }

    #[test]
    fn test_config_validation_empty_strings() {
        let config = Config {
            user: "   ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            progress_file: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_offline_provider_does_not_need_model() {
        let config = Config {
            provider: ProviderConfig {
                kind: ProviderKind::Offline,
                model: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_validates_after_parsing() {
        let config_path = std::env::temp_dir().join("test_tutor_validation.json");
        std::fs::write(&config_path, r#"{ "curriculumSize": 0 }"#).unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(
            matches!(&err, TutorError::ConfigValidationError { .. }),
            "Expected ConfigValidationError, got: {err:?}"
        );

        std::fs::remove_file(&config_path).ok();
    }
}
