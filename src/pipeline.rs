// Per-request pipeline: summary and sentiment for one piece of text.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::artifacts::{ArtifactLoader, Artifacts};
use crate::config::Config;
use crate::error::Result;
use crate::nlp::{LexRankSummarizer, Sentiment, SentimentScorer, Summarizer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: String,
    pub sentiment: Sentiment,
}

pub struct Analyzer {
    scorer: SentimentScorer,
    summarizer: Box<dyn Summarizer>,
    default_sentences: usize,
}

impl Analyzer {
    pub fn new(artifacts: Arc<Artifacts>, summarizer: Box<dyn Summarizer>) -> Self {
        Self {
            scorer: SentimentScorer::new(artifacts),
            summarizer,
            default_sentences: crate::config::DEFAULT_SENTENCE_COUNT,
        }
    }

    /// Takes the shared artifacts from `loader`, loading them on first use.
    pub fn from_loader(loader: &ArtifactLoader, config: &Config) -> Result<Self> {
        Ok(Self::with_artifacts(loader.get()?, config))
    }

    pub fn with_artifacts(artifacts: Arc<Artifacts>, config: &Config) -> Self {
        let mut analyzer = Self::new(artifacts, Box::new(LexRankSummarizer::from_config(&config.summary)));
        analyzer.default_sentences = config.summary.sentence_count;
        analyzer
    }

    pub fn scorer(&self) -> &SentimentScorer {
        &self.scorer
    }

    pub fn summarizer(&self) -> &dyn Summarizer {
        self.summarizer.as_ref()
    }

    pub fn default_sentences(&self) -> usize {
        self.default_sentences
    }

    /// Runs both branches concurrently; fails only if scoring fails.
    pub fn analyze(&self, text: &str, sentence_count: usize) -> Result<Analysis> {
        let (summary, sentiment) = rayon::join(
            || self.summarizer.summarize(text, sentence_count),
            || self.scorer.score(text),
        );
        Ok(Analysis {
            summary,
            sentiment: sentiment?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactConfig;
    use crate::nlp::Label;
    use crate::testing;
    use tempfile::TempDir;

    fn analyzer() -> Analyzer {
        Analyzer::with_artifacts(testing::toy_artifacts(), &Config::default())
    }

    #[test]
    fn test_product_review() {
        let text = "This product is absolutely wonderful and works great! I am very happy with my purchase. Highly recommend to everyone.";
        let result = analyzer().analyze(text, 2).unwrap();
        assert_eq!(
            result.summary,
            "This product is absolutely wonderful and works great! I am very happy with my purchase."
        );
        assert_eq!(result.sentiment.label, Label::Positive);
        assert!(result.sentiment.confidence >= 0.5);
    }

    #[test]
    fn test_empty_text() {
        let result = analyzer().analyze("", 3).unwrap();
        assert_eq!(result.summary, "");
        assert_eq!(result.sentiment.token_count, 0);
        assert_eq!(result.sentiment.confidence, 0.5);
        assert_eq!(result.sentiment.label, Label::Positive);
    }

    #[test]
    fn test_negative_markup() {
        let text = "<b>Terrible</b> service, I hate it, never coming back!!!";
        assert_eq!(crate::normalize(text), "terrible service i hate it never coming back");
        let result = analyzer().analyze(text, 3).unwrap();
        assert_eq!(result.sentiment.label, Label::Negative);
        assert_eq!(result.summary, "<b>Terrible</b> service, I hate it, never coming back!!!");
    }

    #[test]
    fn test_default_sentences_from_config() {
        let mut config = Config::default();
        config.summary.sentence_count = 5;
        let analyzer = Analyzer::with_artifacts(testing::toy_artifacts(), &config);
        assert_eq!(analyzer.default_sentences(), 5);
    }

    #[test]
    fn test_from_loader_loads_files() -> Result<()> {
        let dir = TempDir::new()?;
        let (model_path, tokenizer_path) = testing::write_toy_artifacts(dir.path());
        let config = Config {
            artifacts: ArtifactConfig {
                model_path,
                tokenizer_path,
                ..ArtifactConfig::default()
            },
            ..Config::default()
        };
        let loader = ArtifactLoader::new(config.artifacts.clone());
        let analyzer = Analyzer::from_loader(&loader, &config)?;
        let result = analyzer.analyze("I hate this. It is awful.", 1)?;
        assert_eq!(result.sentiment.label, Label::Negative);
        Ok(())
    }

    #[test]
    fn test_analyzers_share_one_load() -> Result<()> {
        let dir = TempDir::new()?;
        let (model_path, tokenizer_path) = testing::write_toy_artifacts(dir.path());
        let config = Config {
            artifacts: ArtifactConfig {
                model_path: model_path.clone(),
                tokenizer_path,
                ..ArtifactConfig::default()
            },
            ..Config::default()
        };
        let loader = ArtifactLoader::new(config.artifacts.clone());
        let first = Analyzer::from_loader(&loader, &config)?;
        std::fs::remove_file(&model_path)?;
        let second = Analyzer::from_loader(&loader, &config)?;
        assert_eq!(
            first.analyze("great service", 1)?.sentiment,
            second.analyze("great service", 1)?.sentiment
        );
        Ok(())
    }

    #[test]
    fn test_from_loader_missing_artifacts() {
        let config = Config {
            artifacts: ArtifactConfig {
                model_path: "/nonexistent/model.json".into(),
                ..ArtifactConfig::default()
            },
            ..Config::default()
        };
        let loader = ArtifactLoader::new(config.artifacts.clone());
        assert!(Analyzer::from_loader(&loader, &config).is_err());
        assert!(!loader.is_loaded());
    }

    #[test]
    fn test_analysis_json_shape() {
        let result = analyzer().analyze("Great service.", 1).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["summary"], "Great service.");
        assert_eq!(json["sentiment"]["label"], "Positive");
    }
}
