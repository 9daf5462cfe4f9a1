// Sentiment scoring with the pretrained convolutional classifier.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::normalize::normalize;
use crate::artifacts::Artifacts;
use crate::error::Result;
use crate::model::pad_sequence;

/// Confidence at or above this is Positive.
pub const POSITIVE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= POSITIVE_THRESHOLD {
            Label::Positive
        } else {
            Label::Negative
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Positive => f.write_str("Positive"),
            Label::Negative => f.write_str("Negative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: Label,
    pub confidence: f32,
    /// Ids produced for the text before padding; 0 means the model only saw padding.
    pub token_count: usize,
}

#[derive(Debug, Clone)]
pub struct SentimentScorer {
    artifacts: Arc<Artifacts>,
}

impl SentimentScorer {
    pub fn new(artifacts: Arc<Artifacts>) -> Self {
        Self { artifacts }
    }

    /// The fixed-length id sequence the classifier sees for `text`.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        pad_sequence(&self.token_ids(text), self.artifacts.sequence_length())
    }

    fn token_ids(&self, text: &str) -> Vec<u32> {
        let normalized = normalize(text);
        self.artifacts
            .tokenizer()
            .texts_to_sequence(&normalized, self.artifacts.oov_policy())
    }

    pub fn score(&self, text: &str) -> Result<Sentiment> {
        let ids = self.token_ids(text);
        let sequence = pad_sequence(&ids, self.artifacts.sequence_length());
        let confidence = self.artifacts.classifier().predict(&sequence)?;
        let sentiment = Sentiment {
            label: Label::from_confidence(confidence),
            confidence,
            token_count: ids.len(),
        };
        debug!(tokens = ids.len(), confidence, label = %sentiment.label, "scored");
        Ok(sentiment)
    }
}
