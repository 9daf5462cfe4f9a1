// Load-once holder for the classifier and tokenizer.
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::{ArtifactConfig, DEFAULT_SEQUENCE_LENGTH};
use crate::error::{Error, Result};
use crate::model::{Classifier, CnnClassifier, OovPolicy, Tokenizer};

/// Read-only context shared by every request.
pub struct Artifacts {
    classifier: Arc<dyn Classifier>,
    tokenizer: Tokenizer,
    oov_policy: OovPolicy,
}

impl std::fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifacts")
            .field("input_length", &self.classifier.input_length())
            .field("vocab_size", &self.classifier.vocab_size())
            .field("tokenizer_words", &self.tokenizer.len())
            .field("oov_policy", &self.oov_policy)
            .finish()
    }
}

impl Artifacts {
    /// Builds the context from in-memory parts, which must agree on the
    /// standard sequence length of `DEFAULT_SEQUENCE_LENGTH` ids.
    pub fn new(classifier: Arc<dyn Classifier>, tokenizer: Tokenizer) -> Result<Self> {
        let artifacts = Self::assemble(classifier, tokenizer);
        artifacts.check_compatible(DEFAULT_SEQUENCE_LENGTH)?;
        Ok(artifacts)
    }

    fn assemble(classifier: Arc<dyn Classifier>, tokenizer: Tokenizer) -> Self {
        Self {
            classifier,
            tokenizer,
            oov_policy: OovPolicy::Drop,
        }
    }

    pub fn with_oov_policy(mut self, policy: OovPolicy) -> Self {
        self.oov_policy = policy;
        self
    }

    pub fn load(config: &ArtifactConfig) -> Result<Self> {
        info!(path = %config.model_path.display(), "loading sentiment model");
        let classifier = CnnClassifier::load(&config.model_path)?;
        info!(path = %config.tokenizer_path.display(), "loading tokenizer");
        let tokenizer = Tokenizer::load(&config.tokenizer_path)?;

        let artifacts = Self::assemble(Arc::new(classifier), tokenizer).with_oov_policy(config.oov_policy);
        artifacts.check_compatible(config.sequence_length)?;
        info!(
            input_length = artifacts.classifier.input_length(),
            vocab_size = artifacts.classifier.vocab_size(),
            words = artifacts.tokenizer.len(),
            "artifacts ready"
        );
        Ok(artifacts)
    }

    /// Confirms the tokenizer and classifier agree on sequence length and id range.
    pub fn check_compatible(&self, sequence_length: usize) -> Result<()> {
        if self.classifier.input_length() != sequence_length {
            return Err(Error::InvalidModel(format!(
                "model expects sequences of {} ids but sequence_length is {}",
                self.classifier.input_length(),
                sequence_length
            )));
        }
        let max_id = self.tokenizer.max_emitted_id() as usize;
        if max_id >= self.classifier.vocab_size() {
            return Err(Error::InvalidModel(format!(
                "tokenizer emits ids up to {} but the embedding has {} rows",
                max_id,
                self.classifier.vocab_size()
            )));
        }
        Ok(())
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn oov_policy(&self) -> OovPolicy {
        self.oov_policy
    }

    pub fn sequence_length(&self) -> usize {
        self.classifier.input_length()
    }
}

/// Loads artifacts on first use and hands out the same instance afterwards.
pub struct ArtifactLoader {
    config: ArtifactConfig,
    cell: OnceCell<Arc<Artifacts>>,
}

impl ArtifactLoader {
    pub fn new(config: ArtifactConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    // Concurrent first callers block until one load finishes; a failed load is retried by the next caller.
    pub fn get(&self) -> Result<Arc<Artifacts>> {
        self.cell
            .get_or_try_init(|| Artifacts::load(&self.config).map(Arc::new))
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
