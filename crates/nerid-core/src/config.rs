//! nerid Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::labels::{LabelDef, LabelRegistry, BACKGROUND_LABEL};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Token classifier configuration
    pub classifier: ClassifierConfig,

    /// Span merging configuration
    pub merge: MergeConfig,

    /// Label table configuration
    pub labels: LabelsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    ///
    /// Every variable that is set replaces the file value, including values
    /// equal to the built-in default.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides(
        mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // Server
        if let Some(host) = var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("API_PORT") {
            self.server.port = parse_var("API_PORT", port)?;
        }

        // CORS origins (comma-separated)
        if let Some(origins) = var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Classifier
        if let Some(backend) = var("NER_BACKEND") {
            self.classifier.backend = backend.parse()?;
        }
        if let Some(endpoint) = var("NER_ENDPOINT") {
            self.classifier.endpoint = endpoint;
        }
        if let Some(model) = var("NER_MODEL") {
            self.classifier.model = model;
        }
        if let Some(token) = var("HF_API_TOKEN") {
            self.classifier.api_token = Some(token);
        }
        if let Some(timeout) = var("NER_TIMEOUT_SECS") {
            self.classifier.timeout_secs = parse_var("NER_TIMEOUT_SECS", timeout)?;
        }

        // Merge
        if let Some(score) = var("NER_MIN_SCORE") {
            self.merge.min_score = parse_var("NER_MIN_SCORE", score)?;
        }
        if let Some(policy) = var("NER_BACKGROUND_POLICY") {
            self.merge.background_policy = policy.parse()?;
        }
        if let Some(strict) = var("NER_STRICT_LABELS") {
            self.merge.strict_labels = parse_var("NER_STRICT_LABELS", strict)?;
        }
        if let Some(max) = var("NER_MAX_TEXT_CHARS") {
            self.merge.max_text_chars = parse_var("NER_MAX_TEXT_CHARS", max)?;
        }

        // Logging
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = var("LOG_JSON") {
            self.logging.json_format = parse_var("LOG_JSON", json)?;
        }

        Ok(self)
    }

    /// Check cross-field constraints and build the label registry
    pub fn validate(&self) -> Result<LabelRegistry, ConfigError> {
        if !(0.0..=1.0).contains(&self.merge.min_score) {
            return Err(ConfigError::InvalidValue {
                key: "merge.min_score".to_string(),
                value: self.merge.min_score.to_string(),
            });
        }
        if self.merge.max_text_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "merge.max_text_chars".to_string(),
                value: "0".to_string(),
            });
        }
        if self.classifier.backend == ClassifierBackend::Http && self.classifier.model.is_empty() {
            return Err(ConfigError::MissingRequired("classifier.model".to_string()));
        }

        self.labels.registry()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 256 * 1024, // 256KB
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Token classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Which classifier implementation to construct at startup
    pub backend: ClassifierBackend,

    /// Base URL of the inference API
    pub endpoint: String,

    /// Model identifier on the inference API
    pub model: String,

    /// Bearer token for the inference API
    pub api_token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Http,
            endpoint: "https://api-inference.huggingface.co".to_string(),
            model: "cindyangelira/ner-roberta-large-bahasa-indonesia".to_string(),
            api_token: None,
            timeout_secs: 30,
        }
    }
}

/// Supported classifier backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// Hosted token-classification model over HTTP
    Http,
    /// Offline regex and gazetteer rules
    Rules,
}

impl std::str::FromStr for ClassifierBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "rules" => Ok(Self::Rules),
            _ => Err(ConfigError::InvalidValue {
                key: "NER_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// How background ("O") tokens are treated around the merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundPolicy {
    /// Merge background runs like any label and return them
    #[default]
    Keep,
    /// Background breaks runs but its spans are removed from the output
    Drop,
    /// Background is removed before merging, joining runs across it
    Bridge,
}

impl std::str::FromStr for BackgroundPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "drop" => Ok(Self::Drop),
            "bridge" => Ok(Self::Bridge),
            _ => Err(ConfigError::InvalidValue {
                key: "NER_BACKGROUND_POLICY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for BackgroundPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => write!(f, "keep"),
            Self::Drop => write!(f, "drop"),
            Self::Bridge => write!(f, "bridge"),
        }
    }
}

/// Span merging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Background token handling
    pub background_policy: BackgroundPolicy,

    /// Tokens scored below this become background
    pub min_score: f32,

    /// Reject labels missing from the registry instead of passing them through
    pub strict_labels: bool,

    /// Maximum accepted input length in characters
    pub max_text_chars: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            background_policy: BackgroundPolicy::Keep,
            min_score: 0.0,
            strict_labels: true,
            max_text_chars: 5000,
        }
    }
}

/// Label table configuration
///
/// An empty `definitions` list selects the built-in Indonesian table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Background label name
    pub background: String,

    /// Custom label definitions
    pub definitions: Vec<LabelDef>,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            background: BACKGROUND_LABEL.to_string(),
            definitions: vec![],
        }
    }
}

impl LabelsConfig {
    /// Build the validated registry for this configuration
    pub fn registry(&self) -> Result<LabelRegistry, ConfigError> {
        if self.definitions.is_empty() {
            if self.background != BACKGROUND_LABEL {
                return Err(ConfigError::InvalidValue {
                    key: "labels.background".to_string(),
                    value: self.background.clone(),
                });
            }
            return Ok(LabelRegistry::indonesian_pii());
        }

        LabelRegistry::from_defs(self.definitions.clone(), &self.background)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.classifier.backend, ClassifierBackend::Http);
        assert_eq!(config.merge.background_policy, BackgroundPolicy::Keep);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(
            "rules".parse::<ClassifierBackend>().unwrap(),
            ClassifierBackend::Rules
        );
        assert_eq!(
            "HTTP".parse::<ClassifierBackend>().unwrap(),
            ClassifierBackend::Http
        );
        assert!("onnx".parse::<ClassifierBackend>().is_err());
    }

    #[test]
    fn test_background_policy_parse() {
        assert_eq!(
            "bridge".parse::<BackgroundPolicy>().unwrap(),
            BackgroundPolicy::Bridge
        );
        assert_eq!(BackgroundPolicy::Drop.to_string(), "drop");
        assert!("merge".parse::<BackgroundPolicy>().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [classifier]
            backend = "rules"

            [merge]
            background_policy = "drop"
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.backend, ClassifierBackend::Rules);
        assert_eq!(config.merge.background_policy, BackgroundPolicy::Drop);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_custom_labels_from_toml() {
        let config: AppConfig = toml::from_str(
            r##"
            [labels]
            background = "O"

            [[labels.definitions]]
            name = "O"
            color = "#ffffff"

            [[labels.definitions]]
            name = "PER"
            color = "#ffadad"
            aliases = ["PERSON"]
            "##,
        )
        .unwrap();

        let registry = config.validate().unwrap();
        assert_eq!(registry.labels().len(), 2);
        assert_eq!(registry.resolve("person").unwrap().name, "PER");
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let file: AppConfig = toml::from_str(
            r#"
            [classifier]
            backend = "rules"
            timeout_secs = 5

            [merge]
            strict_labels = true
            min_score = 0.2
            "#,
        )
        .unwrap();

        let config = file
            .with_overrides(lookup(&[
                ("NER_BACKEND", "http"),
                ("NER_STRICT_LABELS", "false"),
                ("NER_MAX_TEXT_CHARS", "10"),
                ("NER_TIMEOUT_SECS", "30"),
                ("NER_MIN_SCORE", "0.5"),
                ("LOG_JSON", "true"),
            ]))
            .unwrap();

        // Values equal to the defaults still win over the file
        assert_eq!(config.classifier.backend, ClassifierBackend::Http);
        assert_eq!(config.classifier.timeout_secs, 30);
        assert!(!config.merge.strict_labels);
        assert_eq!(config.merge.max_text_chars, 10);
        assert_eq!(config.merge.min_score, 0.5);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_unset_overrides_keep_file_values() {
        let file: AppConfig = toml::from_str(
            r#"
            [classifier]
            backend = "rules"
            "#,
        )
        .unwrap();

        let config = file.with_overrides(lookup(&[])).unwrap();
        assert_eq!(config.classifier.backend, ClassifierBackend::Rules);
        assert_eq!(config.merge.max_text_chars, 5000);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let err = AppConfig::default()
            .with_overrides(lookup(&[("NER_MAX_TEXT_CHARS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "NER_MAX_TEXT_CHARS"));
    }

    #[test]
    fn test_validate_rejects_bad_min_score() {
        let mut config = AppConfig::default();
        config.merge.min_score = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
