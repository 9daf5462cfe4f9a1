// NLP module for sentisum
pub mod lexrank;
pub mod normalize;
pub mod sentences;
pub mod sentiment;
pub mod summarization;

pub use normalize::normalize;
pub use sentences::split_sentences;
pub use sentiment::{Label, Sentiment, SentimentScorer};
pub use summarization::{LexRankSummarizer, Summarizer};
