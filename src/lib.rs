// Extractive summaries and CNN sentiment scores for free text.
pub mod artifacts;
pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod nlp;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{ArtifactLoader, Artifacts};
pub use config::Config;
pub use error::{Error, Result};
pub use nlp::{normalize, Label, LexRankSummarizer, Sentiment, SentimentScorer, Summarizer};
pub use pipeline::{Analysis, Analyzer};
