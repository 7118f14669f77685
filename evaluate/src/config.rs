//! Evaluation program configuration format.

use crate::common::*;

/// The main evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub evaluation: EvaluationConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

/// The model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Traced TorchScript model file.
    pub file: PathBuf,
    /// Optional checkpoint with trained parameters.
    pub checkpoint: Option<PathBuf>,
}

/// Dataset options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Tensor-archive directory used for evaluation.
    pub dir: PathBuf,
}

/// The evaluation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Path of the serialized results artifact.
    pub results: PathBuf,
    /// Iteration cap for result generation; negative runs the full set.
    pub iters: i64,
    #[serde(with = "tch_serde::serde_device")]
    pub device: Device,
}
