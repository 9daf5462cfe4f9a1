// Word-index tokenizer compatible with the JSON written by Keras' `Tokenizer.to_json()`.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with a word the vocabulary does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OovPolicy {
    /// Skip the word entirely.
    #[default]
    Drop,
    /// Emit the artifact's `oov_token` id when it declares one, otherwise skip.
    ArtifactToken,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenizerFile {
    Keras(KerasTokenizer),
    Plain(HashMap<String, u32>),
}

#[derive(Deserialize)]
struct KerasTokenizer {
    #[serde(default)]
    class_name: Option<String>,
    config: KerasTokenizerConfig,
}

#[derive(Deserialize)]
struct KerasTokenizerConfig {
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default)]
    oov_token: Option<String>,
    word_index: WordIndex,
}

// Keras stores the index as a JSON string nested in the config.
#[derive(Deserialize)]
#[serde(untagged)]
enum WordIndex {
    Encoded(String),
    Map(HashMap<String, u32>),
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    word_index: HashMap<String, u32>,
    num_words: Option<usize>,
    oov_index: Option<u32>,
}

impl Tokenizer {
    pub fn from_word_index(word_index: HashMap<String, u32>) -> Result<Self> {
        if let Some((word, _)) = word_index.iter().find(|&(_, &id)| id == 0) {
            return Err(Error::InvalidTokenizer(format!(
                "word {:?} maps to id 0, which is reserved for padding",
                word
            )));
        }
        Ok(Self {
            word_index,
            num_words: None,
            oov_index: None,
        })
    }

    pub fn with_num_words(mut self, num_words: Option<usize>) -> Self {
        self.num_words = num_words;
        self
    }

    pub fn with_oov_token(mut self, token: Option<&str>) -> Result<Self> {
        self.oov_index = match token {
            Some(t) => Some(*self.word_index.get(t).ok_or_else(|| {
                Error::InvalidTokenizer(format!("oov_token {:?} is not in the word index", t))
            })?),
            None => None,
        };
        Ok(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let parsed: TokenizerFile = serde_json::from_str(s)?;
        Self::from_file_repr(parsed)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: TokenizerFile =
            serde_json::from_str(&raw).map_err(|source| Error::ArtifactFormat {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_file_repr(parsed)
    }

    fn from_file_repr(parsed: TokenizerFile) -> Result<Self> {
        match parsed {
            TokenizerFile::Plain(word_index) => Self::from_word_index(word_index),
            TokenizerFile::Keras(keras) => {
                if let Some(name) = keras.class_name.as_deref() {
                    if name != "Tokenizer" {
                        return Err(Error::InvalidTokenizer(format!(
                            "unexpected class_name {:?}",
                            name
                        )));
                    }
                }
                let config = keras.config;
                let word_index = match config.word_index {
                    WordIndex::Map(map) => map,
                    WordIndex::Encoded(encoded) => serde_json::from_str(&encoded).map_err(|e| {
                        Error::InvalidTokenizer(format!("word_index is not a JSON object: {}", e))
                    })?,
                };
                Self::from_word_index(word_index)?
                    .with_num_words(config.num_words)
                    .with_oov_token(config.oov_token.as_deref())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.word_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_index.is_empty()
    }

    /// Largest id `texts_to_sequence` can produce under any policy.
    pub fn max_emitted_id(&self) -> u32 {
        let in_vocab = self
            .word_index
            .values()
            .copied()
            .filter(|&id| self.within_num_words(id))
            .max()
            .unwrap_or(0);
        in_vocab.max(self.oov_index.unwrap_or(0))
    }

    // A limit of 0 means no limit.
    fn within_num_words(&self, id: u32) -> bool {
        match self.num_words {
            Some(n) if n > 0 => (id as usize) < n,
            _ => true,
        }
    }

    /// Maps whitespace-separated words of already normalized text to ids.
    pub fn texts_to_sequence(&self, text: &str, policy: OovPolicy) -> Vec<u32> {
        let oov = match policy {
            OovPolicy::Drop => None,
            OovPolicy::ArtifactToken => self.oov_index,
        };
        text.split_whitespace()
            .filter_map(|word| match self.word_index.get(word) {
                Some(&id) if self.within_num_words(id) => Some(id),
                _ => oov,
            })
            .collect()
    }
}

/// Left-pads with 0 or keeps the last `length` ids.
pub fn pad_sequence(ids: &[u32], length: usize) -> Vec<u32> {
    if ids.len() >= length {
        return ids[ids.len() - length..].to_vec();
    }
    let mut out = vec![0; length - ids.len()];
    out.extend_from_slice(ids);
    out
}
