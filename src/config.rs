// Runtime configuration: JSON file, then environment, then command-line overrides.
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::tokenizer::OovPolicy;

pub const DEFAULT_SEQUENCE_LENGTH: usize = 200;
pub const DEFAULT_SENTENCE_COUNT: usize = 3;

pub const ENV_MODEL: &str = "SENTISUM_MODEL";
pub const ENV_TOKENIZER: &str = "SENTISUM_TOKENIZER";
pub const ENV_SENTENCES: &str = "SENTISUM_SENTENCES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub sequence_length: usize,
    pub oov_policy: OovPolicy,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/sentiment_cnn.json"),
            tokenizer_path: PathBuf::from("models/tokenizer.json"),
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            oov_policy: OovPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWords {
    #[default]
    None,
    English,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    pub sentence_count: usize,
    /// Minimum similarity for two sentences to share an edge.
    pub similarity_threshold: f64,
    /// Power iteration stops once the L2 change drops to this value.
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Weight edges by similarity instead of 0/1.
    pub continuous: bool,
    pub stop_words: StopWords,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            sentence_count: DEFAULT_SENTENCE_COUNT,
            similarity_threshold: 0.1,
            epsilon: 0.1,
            max_iterations: 1000,
            continuous: false,
            stop_words: StopWords::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub artifacts: ArtifactConfig,
    pub summary: SummaryConfig,
}

impl Config {
    /// Reads `path` if given, falling back to defaults, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let f = File::open(path)
            .map_err(|e| Error::Config(format!("cannot open {}: {}", path.display(), e)))?;
        serde_json::from_reader(f)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL) {
            self.artifacts.model_path = PathBuf::from(model);
        }
        if let Some(tokenizer) = lookup(ENV_TOKENIZER) {
            self.artifacts.tokenizer_path = PathBuf::from(tokenizer);
        }
        if let Some(raw) = lookup(ENV_SENTENCES) {
            self.summary.sentence_count = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a non-negative integer, got {:?}", ENV_SENTENCES, raw))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.artifacts.sequence_length == 0 {
            return Err(Error::Config("sequence_length must be greater than zero".to_string()));
        }
        let summary = &self.summary;
        if !(0.0..1.0).contains(&summary.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity_threshold must be in [0, 1), got {}",
                summary.similarity_threshold
            )));
        }
        if !(summary.epsilon > 0.0) {
            return Err(Error::Config(format!("epsilon must be positive, got {}", summary.epsilon)));
        }
        if summary.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.artifacts.sequence_length, 200);
        assert_eq!(config.summary.sentence_count, 3);
        assert_eq!(config.artifacts.oov_policy, OovPolicy::Drop);
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        write!(f, r#"{{"summary": {{"sentence_count": 5, "stop_words": "english"}}}}"#)?;
        let config = Config::load(Some(f.path()))?;
        assert_eq!(config.summary.sentence_count, 5);
        assert_eq!(config.summary.stop_words, StopWords::English);
        assert_eq!(config.summary.epsilon, 0.1);
        assert_eq!(config.artifacts, ArtifactConfig::default());
        Ok(())
    }

    #[test]
    fn test_unknown_field_rejected() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        write!(f, r#"{{"summary": {{"sentences": 5}}}}"#)?;
        assert!(matches!(Config::from_file(f.path()), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file(Path::new("/nonexistent/sentisum.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_MODEL, "/tmp/m.json"),
            (ENV_TOKENIZER, "/tmp/t.json"),
            (ENV_SENTENCES, " 4 "),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.artifacts.model_path, PathBuf::from("/tmp/m.json"));
        assert_eq!(config.artifacts.tokenizer_path, PathBuf::from("/tmp/t.json"));
        assert_eq!(config.summary.sentence_count, 4);
    }

    #[test]
    fn test_bad_sentence_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|k| (k == ENV_SENTENCES).then(|| "three".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.artifacts.sequence_length = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.summary.epsilon = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.summary.similarity_threshold = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.summary.max_iterations = 0;
        assert!(config.validate().is_err());
    }
}
