//! Engine configuration.
//!
//! [`EngineConfig`] is read from a JSON file. Every field has a default, so a
//! file only needs the settings it changes:
//!
//! ```
//! use sapa::config::EngineConfig;
//!
//! let config: EngineConfig = serde_json::from_str(r#"{"min_confidence": 0.2}"#).unwrap();
//! assert_eq!(config.min_confidence, 0.2);
//! assert_eq!(config.unknown_intent, "unknown");
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::NormalizerConfig;
use crate::error::{Result, SapaError};
use crate::ml::artifact::ArtifactPaths;

/// Reply when no confident, mapped answer exists.
pub const DEFAULT_FALLBACK_RESPONSE: &str = "Sorry, I didn't understand that. Could you rephrase?";

/// Intent reported when no label could be produced.
pub const DEFAULT_UNKNOWN_INTENT: &str = "unknown";

/// Session lifetime settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of inactivity after which a session may be evicted.
    /// `None` keeps sessions until they are ended explicitly.
    pub idle_timeout_secs: Option<u64>,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration for the inference engine and its resources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the three artifacts.
    pub artifact_dir: PathBuf,
    pub classifier_file: String,
    pub vectorizer_file: String,
    pub label_encoder_file: String,
    /// Dataset with `Intent` and `Respon(se)` columns.
    pub dataset_path: Option<PathBuf>,
    /// Optional two-column slang table merged over the built-in one.
    pub slang_path: Option<PathBuf>,
    pub fallback_response: String,
    /// Reply to blank input. Unset answers blank input with the fallback.
    pub empty_input_response: Option<String>,
    pub unknown_intent: String,
    /// Predictions scoring below this are answered with the fallback.
    pub min_confidence: f64,
    pub normalizer: NormalizerConfig,
    pub session: SessionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            artifact_dir: PathBuf::from("models"),
            classifier_file: ArtifactPaths::CLASSIFIER_FILE.to_string(),
            vectorizer_file: ArtifactPaths::ADAPTER_FILE.to_string(),
            label_encoder_file: ArtifactPaths::LABEL_CODEC_FILE.to_string(),
            dataset_path: None,
            slang_path: None,
            fallback_response: DEFAULT_FALLBACK_RESPONSE.to_string(),
            empty_input_response: None,
            unknown_intent: DEFAULT_UNKNOWN_INTENT.to_string(),
            min_confidence: 0.0,
            normalizer: NormalizerConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read and validate a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SapaError::invalid_config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        let config: EngineConfig = serde_json::from_str(&content).map_err(|e| {
            SapaError::invalid_config(format!("cannot parse config '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SapaError::invalid_config(format!(
                "min_confidence must be between 0 and 1, got {}",
                self.min_confidence
            )));
        }
        if self.fallback_response.trim().is_empty() {
            return Err(SapaError::invalid_config("fallback_response must not be empty"));
        }
        if self
            .empty_input_response
            .as_deref()
            .is_some_and(|response| response.trim().is_empty())
        {
            return Err(SapaError::invalid_config(
                "empty_input_response must not be empty",
            ));
        }
        if self.unknown_intent.trim().is_empty() {
            return Err(SapaError::invalid_config("unknown_intent must not be empty"));
        }
        for (name, file) in [
            ("classifier_file", &self.classifier_file),
            ("vectorizer_file", &self.vectorizer_file),
            ("label_encoder_file", &self.label_encoder_file),
        ] {
            if file.trim().is_empty() {
                return Err(SapaError::invalid_config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Full paths of the three artifacts.
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            classifier: self.artifact_dir.join(&self.classifier_file),
            adapter: self.artifact_dir.join(&self.vectorizer_file),
            label_codec: self.artifact_dir.join(&self.label_encoder_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.artifact_paths(),
            ArtifactPaths::in_dir(PathBuf::from("models"))
        );
        assert_eq!(config.session.idle_timeout(), None);
        assert_eq!(config.empty_input_response, None);
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "artifact_dir": "/srv/sapa",
                "classifier_file": "intent_classifier.bin",
                "empty_input_response": "Please type a message to get a response.",
                "normalizer": {{ "remove_stopwords": true }},
                "session": {{ "idle_timeout_secs": 600 }}
            }}"#
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.artifact_paths().classifier,
            PathBuf::from("/srv/sapa/intent_classifier.bin")
        );
        assert!(config.normalizer.remove_stopwords);
        assert!(!config.normalizer.lemmatize);
        assert_eq!(config.session.idle_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.fallback_response, DEFAULT_FALLBACK_RESPONSE);
        assert_eq!(
            config.empty_input_response.as_deref(),
            Some("Please type a message to get a response.")
        );
    }

    #[test]
    fn test_validation() {
        let config = EngineConfig {
            min_confidence: 1.5,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(SapaError::InvalidConfig(_))));

        let config = EngineConfig {
            fallback_response: "  ".to_string(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            empty_input_response: Some(String::new()),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            label_encoder_file: String::new(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SapaError::InvalidConfig(_)));
    }
}
