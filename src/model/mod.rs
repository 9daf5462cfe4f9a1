// Pretrained artifacts: the convolutional classifier and the fitted tokenizer.
pub mod cnn;
pub mod tokenizer;

pub use cnn::CnnClassifier;
pub use tokenizer::{pad_sequence, OovPolicy, Tokenizer};

use crate::error::Result;

/// Maps a fixed-length token id sequence to a probability in [0, 1].
pub trait Classifier: Send + Sync {
    /// Length of the sequence `predict` expects.
    fn input_length(&self) -> usize;

    /// Number of embedding rows; ids must stay below this.
    fn vocab_size(&self) -> usize;

    fn predict(&self, sequence: &[u32]) -> Result<f32>;
}
