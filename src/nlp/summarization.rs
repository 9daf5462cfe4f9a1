// Extractive summarization: LexRank over the sentences of the input.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::lexrank::LexRank;
use super::sentences::split_sentences;
use crate::config::{StopWords, SummaryConfig};

static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\W\d_]+(?:['’-][^\W\d_]+)*").unwrap());

// Common English stop words, used when configured
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
        "has", "he", "in", "is", "it", "its", "of", "on", "that", "the",
        "to", "was", "will", "with", "this", "but", "they", "have",
        "had", "what", "when", "where", "who", "which", "why", "how",
        "i", "me", "my", "we", "our", "you", "your", "she", "her", "him",
        "his", "them", "their", "or", "so", "if", "do", "did", "been", "am",
    ]
    .iter()
    .copied()
    .collect()
});

pub trait Summarizer: Send + Sync {
    /// Picks up to `sentence_count` sentences and joins them in source order.
    fn summarize(&self, text: &str, sentence_count: usize) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct LexRankSummarizer {
    ranker: LexRank,
    stop_words: StopWords,
}

impl LexRankSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SummaryConfig) -> Self {
        let ranker = LexRank::new()
            .with_threshold(config.similarity_threshold)
            .with_epsilon(config.epsilon)
            .with_max_iterations(config.max_iterations)
            .with_continuous(config.continuous);
        Self {
            ranker,
            stop_words: config.stop_words,
        }
    }

    fn sentence_words(&self, sentence: &str) -> Vec<String> {
        WORD_PATTERN
            .find_iter(sentence)
            .map(|m| m.as_str().to_lowercase())
            .filter(|w| match self.stop_words {
                StopWords::None => true,
                StopWords::English => !STOP_WORDS.contains(w.as_str()),
            })
            .collect()
    }
}

impl Summarizer for LexRankSummarizer {
    fn summarize(&self, text: &str, sentence_count: usize) -> String {
        let sentences = split_sentences(text);
        if sentence_count == 0 || sentences.is_empty() {
            return String::new();
        }
        if sentences.len() <= sentence_count {
            return sentences.join(" ");
        }

        let words: Vec<Vec<String>> = sentences.iter().map(|s| self.sentence_words(s)).collect();
        let ranking = self.ranker.rank(&words);
        let mut selected = ranking.top_n(sentence_count);
        selected.sort_unstable();
        debug!(
            sentences = sentences.len(),
            selected = selected.len(),
            iterations = ranking.iterations,
            "summarized"
        );

        selected
            .iter()
            .map(|&idx| sentences[idx].as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW: &str = "This product is absolutely wonderful and works great! I am very happy with my purchase. Highly recommend to everyone.";

    // The first sentence shares vocabulary with the next three, which share
    // nothing with each other; the last one is unrelated.
    const ARTICLE: &str = "Solar panels and wind turbines both produce clean electricity. \
        Solar panels convert sunlight directly. \
        Wind turbines spin in strong coastal breezes. \
        Clean electricity reduces urban smog. \
        My cat sleeps all afternoon.";

    #[test]
    fn test_review_drops_one_sentence() {
        let summary = LexRankSummarizer::new().summarize(REVIEW, 2);
        assert_eq!(
            summary,
            "This product is absolutely wonderful and works great! I am very happy with my purchase."
        );
    }

    #[test]
    fn test_short_text_returned_whole() {
        let summarizer = LexRankSummarizer::new();
        assert_eq!(summarizer.summarize(REVIEW, 3), REVIEW);
        assert_eq!(summarizer.summarize(REVIEW, 10), REVIEW);
        assert_eq!(summarizer.summarize("Just   one\nsentence", 3), "Just one sentence");
    }

    #[test]
    fn test_empty_inputs() {
        let summarizer = LexRankSummarizer::new();
        assert_eq!(summarizer.summarize("", 3), "");
        assert_eq!(summarizer.summarize("   \n\t ", 3), "");
        assert_eq!(summarizer.summarize("?!...", 3), "");
        assert_eq!(summarizer.summarize(REVIEW, 0), "");
    }

    #[test]
    fn test_sentence_ending_in_common_word_counts_once() {
        let text = "The answer was no. We left early. Then rain came.";
        let summary = LexRankSummarizer::new().summarize(text, 2);
        assert_eq!(split_sentences(&summary).len(), 2);
    }

    #[test]
    fn test_hub_sentence_ranked_first() {
        let summary = LexRankSummarizer::new().summarize(ARTICLE, 1);
        assert_eq!(summary, "Solar panels and wind turbines both produce clean electricity.");
    }

    #[test]
    fn test_output_keeps_source_order() {
        let sentences = split_sentences(ARTICLE);
        let summary = LexRankSummarizer::new().summarize(ARTICLE, 2);
        let picked = split_sentences(&summary);
        let positions: Vec<usize> = picked
            .iter()
            .map(|p| sentences.iter().position(|s| s == p).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sentence_count_bound() {
        let summarizer = LexRankSummarizer::new();
        let total = split_sentences(ARTICLE).len();
        for n in 1..=total + 2 {
            let summary = summarizer.summarize(ARTICLE, n);
            assert!(split_sentences(&summary).len() <= n.min(total));
        }
    }

    #[test]
    fn test_deterministic() {
        let summarizer = LexRankSummarizer::new();
        let first = summarizer.summarize(ARTICLE, 2);
        for _ in 0..5 {
            assert_eq!(summarizer.summarize(ARTICLE, 2), first);
        }
    }

    #[test]
    fn test_stop_words_filtered_when_configured() {
        let config = SummaryConfig {
            stop_words: StopWords::English,
            ..SummaryConfig::default()
        };
        let summarizer = LexRankSummarizer::from_config(&config);
        assert_eq!(summarizer.sentence_words("The cat is on the mat"), vec!["cat", "mat"]);
        assert_eq!(
            LexRankSummarizer::new().sentence_words("It's a well-known fact, 42 times"),
            vec!["it's", "a", "well-known", "fact", "times"]
        );
    }
}
