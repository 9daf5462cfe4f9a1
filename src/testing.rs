// Hand-built artifacts shared by unit tests.
//
// The toy network embeds each word as [positive, negative], keeps both
// channels through a width-1 relu convolution, max-pools over time and
// scores sigmoid(4 * positive - 4 * negative). The all-padding sequence
// therefore scores exactly 0.5.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;

use crate::artifacts::Artifacts;
use crate::model::cnn::{Activation, CnnClassifier, Layer, ModelArtifact, Padding, FORMAT_NAME};
use crate::model::Tokenizer;

pub const VOCAB: &[(&str, f32, f32)] = &[
    ("wonderful", 1.0, 0.0),
    ("great", 1.0, 0.0),
    ("happy", 1.0, 0.0),
    ("recommend", 1.0, 0.0),
    ("love", 1.0, 0.0),
    ("terrible", 0.0, 1.0),
    ("hate", 0.0, 1.0),
    ("never", 0.0, 1.0),
    ("awful", 0.0, 1.0),
    ("product", 0.0, 0.0),
    ("service", 0.0, 0.0),
    ("the", 0.0, 0.0),
];

pub fn word_id(word: &str) -> u32 {
    VOCAB
        .iter()
        .position(|(w, _, _)| *w == word)
        .map(|i| i as u32 + 1)
        .unwrap_or_else(|| panic!("{} is not in the toy vocabulary", word))
}

pub fn toy_artifact() -> ModelArtifact {
    ModelArtifact {
        format: FORMAT_NAME.to_string(),
        input_length: 200,
        vocab_size: VOCAB.len() + 1,
        embedding_dim: 2,
        weights: None,
        layers: vec![
            Layer::Conv1d {
                filters: 2,
                kernel_size: 1,
                padding: Padding::Same,
                activation: Activation::Relu,
            },
            Layer::GlobalMaxPooling1d,
            Layer::Dropout { rate: 0.5 },
            Layer::Dense {
                units: 1,
                activation: Activation::Sigmoid,
            },
        ],
    }
}

pub fn toy_weights() -> HashMap<String, Tensor> {
    let dev = Device::Cpu;
    let mut embedding = vec![0.0f32, 0.0];
    embedding.extend(VOCAB.iter().flat_map(|&(_, pos, neg)| [pos, neg]));
    let tensors = [
        ("embedding.weight", Tensor::from_vec(embedding, (VOCAB.len() + 1, 2), &dev)),
        ("layers.0.weight", Tensor::from_vec(vec![1.0f32, 0.0, 0.0, 1.0], (2, 2, 1), &dev)),
        ("layers.0.bias", Tensor::zeros(2, DType::F32, &dev)),
        ("layers.3.weight", Tensor::from_vec(vec![4.0f32, -4.0], (1, 2), &dev)),
        ("layers.3.bias", Tensor::zeros(1, DType::F32, &dev)),
    ];
    tensors
        .into_iter()
        .map(|(name, t)| (name.to_string(), t.expect("toy tensor")))
        .collect()
}

pub fn toy_classifier() -> CnnClassifier {
    let vb = VarBuilder::from_tensors(toy_weights(), DType::F32, &Device::Cpu);
    CnnClassifier::new(&toy_artifact(), vb).expect("toy artifact is valid")
}

pub fn toy_word_index() -> HashMap<String, u32> {
    VOCAB
        .iter()
        .map(|&(w, _, _)| (w.to_string(), word_id(w)))
        .collect()
}

pub fn toy_tokenizer() -> Tokenizer {
    Tokenizer::from_word_index(toy_word_index()).expect("toy vocabulary is valid")
}

pub fn toy_artifacts() -> Arc<Artifacts> {
    Arc::new(Artifacts::new(Arc::new(toy_classifier()), toy_tokenizer()).expect("toy artifacts agree"))
}

/// Writes the toy model (architecture JSON plus safetensors weights) and a
/// Keras-style tokenizer JSON into `dir`.
pub fn write_toy_artifacts(dir: &Path) -> (PathBuf, PathBuf) {
    let model_path = dir.join("sentiment_cnn.json");
    let tokenizer_path = dir.join("tokenizer.json");
    let model_json = serde_json::to_string(&toy_artifact()).expect("serialize model");
    std::fs::write(&model_path, model_json).expect("write model");
    candle_core::safetensors::save(&toy_weights(), model_path.with_extension("safetensors"))
        .expect("write weights");
    let index = serde_json::to_string(&toy_word_index()).expect("serialize word index");
    let tokenizer_json = serde_json::json!({
        "class_name": "Tokenizer",
        "config": { "num_words": null, "oov_token": null, "word_index": index }
    });
    std::fs::write(&tokenizer_path, tokenizer_json.to_string()).expect("write tokenizer");
    (model_path, tokenizer_path)
}
