// Inference for the convolutional sentiment network.
// The architecture is a JSON description of the Keras layer stack; the weights
// sit next to it in a safetensors file and run through candle on the CPU.
use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Conv1d, Conv1dConfig, Embedding, Linear, VarBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Classifier;
use crate::error::{Error, Result};

pub const FORMAT_NAME: &str = "sentisum-cnn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Activation::Linear => Ok(x.clone()),
            Activation::Relu => x.relu(),
            Activation::Sigmoid => candle_nn::ops::sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    #[default]
    Valid,
    Same,
}

/// One layer after the embedding. Layer `i` reads `layers.{i}.weight` and
/// `layers.{i}.bias` in candle's layouts: conv1d `[filters, in_channels, kernel_size]`,
/// dense `[units, inputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    #[serde(rename = "conv1d")]
    Conv1d {
        filters: usize,
        kernel_size: usize,
        #[serde(default)]
        padding: Padding,
        #[serde(default)]
        activation: Activation,
    },
    #[serde(rename = "max_pooling1d")]
    MaxPooling1d { pool_size: usize },
    #[serde(rename = "global_max_pooling1d")]
    GlobalMaxPooling1d,
    #[serde(rename = "global_average_pooling1d")]
    GlobalAveragePooling1d,
    #[serde(rename = "flatten")]
    Flatten,
    #[serde(rename = "dropout")]
    Dropout {
        #[serde(default)]
        rate: f32,
    },
    #[serde(rename = "dense")]
    Dense {
        units: usize,
        #[serde(default)]
        activation: Activation,
    },
}

/// Architecture file. The embedding table is always first and reads `embedding.weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub input_length: usize,
    pub vocab_size: usize,
    pub embedding_dim: usize,
    /// Safetensors file, relative to the architecture file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<PathBuf>,
    pub layers: Vec<Layer>,
}

impl ModelArtifact {
    /// Where the weights live; defaults to the architecture path with a `.safetensors` extension.
    pub fn weights_path(&self, architecture: &Path) -> PathBuf {
        match &self.weights {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => architecture.parent().unwrap_or(Path::new("")).join(p),
            None => architecture.with_extension("safetensors"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Sequence { steps: usize, channels: usize },
    Vector(usize),
}

impl Layer {
    fn name(&self) -> &'static str {
        match self {
            Layer::Conv1d { .. } => "conv1d",
            Layer::MaxPooling1d { .. } => "max_pooling1d",
            Layer::GlobalMaxPooling1d => "global_max_pooling1d",
            Layer::GlobalAveragePooling1d => "global_average_pooling1d",
            Layer::Flatten => "flatten",
            Layer::Dropout { .. } => "dropout",
            Layer::Dense { .. } => "dense",
        }
    }

    fn output_shape(&self, input: Shape) -> std::result::Result<Shape, String> {
        match (self, input) {
            (
                Layer::Conv1d {
                    filters,
                    kernel_size,
                    padding,
                    ..
                },
                Shape::Sequence { steps, .. },
            ) => {
                if *filters == 0 || *kernel_size == 0 {
                    return Err("filters and kernel_size must be greater than zero".to_string());
                }
                let out_steps = match padding {
                    Padding::Valid => (steps + 1).saturating_sub(*kernel_size),
                    Padding::Same => steps,
                };
                if out_steps == 0 {
                    return Err(format!(
                        "kernel size {} is longer than the {} input steps",
                        kernel_size, steps
                    ));
                }
                Ok(Shape::Sequence {
                    steps: out_steps,
                    channels: *filters,
                })
            }
            (Layer::MaxPooling1d { pool_size }, Shape::Sequence { steps, channels }) => {
                if *pool_size == 0 || steps / pool_size == 0 {
                    return Err(format!("pool size {} does not fit {} steps", pool_size, steps));
                }
                Ok(Shape::Sequence {
                    steps: steps / pool_size,
                    channels,
                })
            }
            (
                Layer::GlobalMaxPooling1d | Layer::GlobalAveragePooling1d,
                Shape::Sequence { channels, .. },
            ) => Ok(Shape::Vector(channels)),
            (Layer::Flatten, Shape::Sequence { steps, channels }) => {
                Ok(Shape::Vector(steps * channels))
            }
            (Layer::Flatten, Shape::Vector(n)) => Ok(Shape::Vector(n)),
            (Layer::Dropout { rate }, shape) => {
                if !(0.0..1.0).contains(rate) {
                    return Err(format!("dropout rate {} outside [0, 1)", rate));
                }
                Ok(shape)
            }
            (Layer::Dense { units, .. }, Shape::Vector(_)) => {
                if *units == 0 {
                    return Err("units must be greater than zero".to_string());
                }
                Ok(Shape::Vector(*units))
            }
            (layer, shape) => Err(format!("{} cannot take input of shape {:?}", layer.name(), shape)),
        }
    }

    fn build(&self, input: Shape, vb: VarBuilder) -> std::result::Result<Block, String> {
        let block = match (self, input) {
            (
                Layer::Conv1d {
                    filters,
                    kernel_size,
                    padding,
                    activation,
                },
                Shape::Sequence { channels, .. },
            ) => {
                let conv = candle_nn::conv1d(channels, *filters, *kernel_size, Conv1dConfig::default(), vb)
                    .map_err(|e| e.to_string())?;
                check_finite(conv.weight())?;
                if let Some(bias) = conv.bias() {
                    check_finite(bias)?;
                }
                // Keras "same" puts the odd padding step on the right.
                let pad = match padding {
                    Padding::Valid => (0, 0),
                    Padding::Same => {
                        let total = kernel_size - 1;
                        (total / 2, total - total / 2)
                    }
                };
                Block::Conv {
                    conv,
                    pad,
                    activation: *activation,
                }
            }
            (Layer::MaxPooling1d { pool_size }, _) => Block::MaxPool(*pool_size),
            (Layer::GlobalMaxPooling1d, _) => Block::GlobalMax,
            (Layer::GlobalAveragePooling1d, _) => Block::GlobalAverage,
            (Layer::Flatten, Shape::Sequence { .. }) => Block::Flatten,
            (Layer::Flatten, Shape::Vector(_)) | (Layer::Dropout { .. }, _) => Block::Identity,
            (Layer::Dense { units, activation }, Shape::Vector(inputs)) => {
                let linear = candle_nn::linear(inputs, *units, vb).map_err(|e| e.to_string())?;
                check_finite(linear.weight())?;
                if let Some(bias) = linear.bias() {
                    check_finite(bias)?;
                }
                Block::Dense {
                    linear,
                    activation: *activation,
                }
            }
            (layer, shape) => {
                return Err(format!("{} cannot take input of shape {:?}", layer.name(), shape))
            }
        };
        Ok(block)
    }
}

fn check_finite(t: &Tensor) -> std::result::Result<(), String> {
    let values = t
        .flatten_all()
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(|e| e.to_string())?;
    if values.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err("contains non-finite weights".to_string())
    }
}

/// A loaded layer. Sequences flow as `[batch, channels, steps]`.
#[derive(Debug, Clone)]
enum Block {
    Conv {
        conv: Conv1d,
        pad: (usize, usize),
        activation: Activation,
    },
    MaxPool(usize),
    GlobalMax,
    GlobalAverage,
    Flatten,
    Dense {
        linear: Linear,
        activation: Activation,
    },
    Identity,
}

impl Block {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Block::Conv {
                conv,
                pad: (left, right),
                activation,
            } => {
                let padded = if *left + *right > 0 {
                    x.pad_with_zeros(D::Minus1, *left, *right)?
                } else {
                    x.clone()
                };
                activation.apply(&conv.forward(&padded)?)
            }
            Block::MaxPool(size) => x
                .unsqueeze(2)?
                .max_pool2d_with_stride((1, *size), (1, *size))?
                .squeeze(2),
            Block::GlobalMax => x.max(D::Minus1),
            Block::GlobalAverage => x.mean(D::Minus1),
            // Keras flattens step-major.
            Block::Flatten => x.transpose(1, 2)?.contiguous()?.flatten_from(1),
            Block::Dense { linear, activation } => activation.apply(&linear.forward(x)?),
            Block::Identity => Ok(x.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CnnClassifier {
    input_length: usize,
    vocab_size: usize,
    embedding: Embedding,
    blocks: Vec<Block>,
    device: Device,
}

impl CnnClassifier {
    /// Builds the network from `artifact`, reading every weight through `vb`.
    pub fn new(artifact: &ModelArtifact, vb: VarBuilder) -> Result<Self> {
        if artifact.format != FORMAT_NAME {
            return Err(Error::InvalidModel(format!(
                "unknown format {:?}, expected {:?}",
                artifact.format, FORMAT_NAME
            )));
        }
        if artifact.input_length == 0 || artifact.vocab_size == 0 || artifact.embedding_dim == 0 {
            return Err(Error::InvalidModel(
                "input_length, vocab_size and embedding_dim must be greater than zero".to_string(),
            ));
        }
        let embedding = candle_nn::embedding(artifact.vocab_size, artifact.embedding_dim, vb.pp("embedding"))
            .map_err(|e| Error::InvalidModel(format!("embedding: {}", e)))?;
        check_finite(embedding.embeddings()).map_err(|e| Error::InvalidModel(format!("embedding {}", e)))?;

        let mut shape = Shape::Sequence {
            steps: artifact.input_length,
            channels: artifact.embedding_dim,
        };
        let mut blocks = Vec::with_capacity(artifact.layers.len());
        for (i, layer) in artifact.layers.iter().enumerate() {
            let invalid = |msg: String| Error::InvalidModel(format!("layer {} ({}): {}", i, layer.name(), msg));
            let out = layer.output_shape(shape).map_err(invalid)?;
            blocks.push(layer.build(shape, vb.pp(format!("layers.{}", i))).map_err(invalid)?);
            shape = out;
        }
        if shape != Shape::Vector(1) {
            return Err(Error::InvalidModel(format!(
                "network must end in a single output, ends in {:?}",
                shape
            )));
        }

        Ok(Self {
            input_length: artifact.input_length,
            vocab_size: artifact.vocab_size,
            embedding,
            blocks,
            device: vb.device().clone(),
        })
    }

    /// Reads the architecture JSON at `path` and the safetensors weights it points to.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_str(&raw).map_err(|source| Error::ArtifactFormat {
                path: path.to_path_buf(),
                source,
            })?;
        let weights_path = artifact.weights_path(path);
        let weights = fs::read(&weights_path).map_err(|source| Error::ArtifactIo {
            path: weights_path.clone(),
            source,
        })?;
        debug!(path = %weights_path.display(), bytes = weights.len(), "read model weights");
        let vb = VarBuilder::from_buffered_safetensors(weights, DType::F32, &Device::Cpu)
            .map_err(|e| Error::InvalidModel(format!("{}: {}", weights_path.display(), e)))?;
        Self::new(&artifact, vb)
    }

    fn forward(&self, sequence: &[u32]) -> candle_core::Result<f32> {
        let ids = Tensor::new(sequence, &self.device)?.unsqueeze(0)?;
        let mut x = self.embedding.forward(&ids)?.transpose(1, 2)?.contiguous()?;
        for block in &self.blocks {
            x = block.forward(&x)?;
        }
        let out = x.flatten_all()?.to_vec1::<f32>()?;
        match out.as_slice() {
            [p] => Ok(*p),
            _ => candle_core::bail!("classifier produced {} values instead of one", out.len()),
        }
    }
}

impl Classifier for CnnClassifier {
    fn input_length(&self) -> usize {
        self.input_length
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn predict(&self, sequence: &[u32]) -> Result<f32> {
        if sequence.len() != self.input_length {
            return Err(Error::Inference(format!(
                "expected a sequence of {} ids, got {}",
                self.input_length,
                sequence.len()
            )));
        }
        if let Some(&id) = sequence.iter().find(|&&id| id as usize >= self.vocab_size) {
            return Err(Error::Inference(format!(
                "token id {} outside embedding of {} rows",
                id, self.vocab_size
            )));
        }
        let p = self
            .forward(sequence)
            .map_err(|e| Error::Inference(e.to_string()))?;
        if p.is_finite() && (0.0..=1.0).contains(&p) {
            Ok(p)
        } else {
            Err(Error::Inference(format!("classifier output {} is not a probability", p)))
        }
    }
}
