//! LexRank sentence centrality.
//!
//! Sentences are compared with idf-modified cosine similarity, connected when
//! the similarity clears a threshold, and scored by power iteration over the
//! degree-normalized similarity matrix.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

/// Result of a centrality computation
#[derive(Debug, Clone, PartialEq)]
pub struct RankResult {
    /// Score per sentence, in input order
    pub scores: Vec<f64>,
    pub iterations: usize,
    /// L2 change of the last iteration
    pub delta: f64,
    pub converged: bool,
}

impl RankResult {
    /// Indices of the `n` best sentences; equal scores go to the earlier sentence.
    pub fn top_n(&self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.scores.len()).collect();
        order.sort_by(|&a, &b| self.scores[b].total_cmp(&self.scores[a]).then(a.cmp(&b)));
        order.truncate(n);
        order
    }
}

#[derive(Debug, Clone)]
pub struct LexRank {
    /// Minimum similarity for an edge
    pub threshold: f64,
    /// Stop once the L2 change is at most this
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Use similarity values as edge weights instead of 0/1
    pub continuous: bool,
}

impl Default for LexRank {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            epsilon: 0.1,
            max_iterations: 1000,
            continuous: false,
        }
    }
}

impl LexRank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Scores sentences given as lists of already normalized words.
    pub fn rank<S: AsRef<str>>(&self, sentences: &[Vec<S>]) -> RankResult {
        let n = sentences.len();
        if n == 0 {
            return RankResult {
                scores: vec![],
                iterations: 0,
                delta: 0.0,
                converged: true,
            };
        }

        let tf: Vec<HashMap<&str, f64>> = sentences.iter().map(|s| term_frequencies(s)).collect();
        let idf = inverse_document_frequencies(&tf);
        let matrix = self.similarity_matrix(&tf, &idf);
        self.power_iteration(&matrix)
    }

    fn similarity_matrix(&self, tf: &[HashMap<&str, f64>], idf: &HashMap<&str, f64>) -> Vec<Vec<f64>> {
        let n = tf.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for (row, weights) in matrix.iter_mut().enumerate() {
            let mut degree = 0.0;
            for (col, cell) in weights.iter_mut().enumerate() {
                let sim = idf_modified_cosine(&tf[row], &tf[col], idf);
                if self.continuous {
                    *cell = sim;
                    degree += sim;
                } else if sim > self.threshold {
                    *cell = 1.0;
                    degree += 1.0;
                }
            }
            // Rows of sentences without weighted words stay zero.
            if degree > 0.0 {
                for cell in weights.iter_mut() {
                    *cell /= degree;
                }
            }
        }
        matrix
    }

    fn power_iteration(&self, matrix: &[Vec<f64>]) -> RankResult {
        let n = matrix.len();
        let mut scores = vec![1.0 / n as f64; n];
        let mut next = vec![0.0; n];
        let mut iterations = 0;
        let mut delta = f64::MAX;

        while iterations < self.max_iterations && delta > self.epsilon {
            iterations += 1;
            next.fill(0.0);
            for (row, &score) in matrix.iter().zip(scores.iter()) {
                for (out, &weight) in next.iter_mut().zip(row) {
                    *out += weight * score;
                }
            }
            delta = scores
                .iter()
                .zip(next.iter())
                .map(|(old, new)| (old - new).powi(2))
                .sum::<f64>()
                .sqrt();
            std::mem::swap(&mut scores, &mut next);
        }

        let converged = delta <= self.epsilon;
        if converged {
            debug!(iterations, delta, "lexrank converged");
        } else {
            warn!(iterations, delta, "lexrank stopped at the iteration cap");
        }
        RankResult {
            scores,
            iterations,
            delta,
            converged,
        }
    }
}

// Counts normalized by the most frequent word of the sentence.
fn term_frequencies<S: AsRef<str>>(words: &[S]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    for w in words {
        *counts.entry(w.as_ref()).or_insert(0.0) += 1.0;
    }
    let max = counts.values().copied().fold(0.0, f64::max);
    if max > 0.0 {
        for v in counts.values_mut() {
            *v /= max;
        }
    }
    counts
}

// ln(N / (1 + df)): a word found in every sentence gets a negative weight,
// which only ever appears squared.
fn inverse_document_frequencies<'a>(tf: &[HashMap<&'a str, f64>]) -> HashMap<&'a str, f64> {
    let n = tf.len() as f64;
    let mut df: HashMap<&str, f64> = HashMap::new();
    for sentence in tf {
        for &word in sentence.keys() {
            *df.entry(word).or_insert(0.0) += 1.0;
        }
    }
    df.into_iter().map(|(w, d)| (w, (n / (1.0 + d)).ln())).collect()
}

fn idf_modified_cosine(a: &HashMap<&str, f64>, b: &HashMap<&str, f64>, idf: &HashMap<&str, f64>) -> f64 {
    let weight = |w: &str| idf.get(w).copied().unwrap_or(0.0);
    let common: HashSet<&str> = a.keys().filter(|w| b.contains_key(*w)).copied().collect();
    let numerator: f64 = common.iter().map(|&w| a[w] * b[w] * weight(w).powi(2)).sum();
    let norm = |v: &HashMap<&str, f64>| {
        v.iter()
            .map(|(&w, &tf)| (tf * weight(w)).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let (na, nb) = (norm(a), norm(b));
    if na > 0.0 && nb > 0.0 {
        numerator / (na * nb)
    } else {
        0.0
    }
}
