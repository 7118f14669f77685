//! Training program configuration format.

use crate::common::*;

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub evaluation: EvaluationConfig,
    pub logging: LoggingConfig,
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
}

/// Dataset options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Tensor-archive directory used for training.
    pub train_dir: PathBuf,
    /// Tensor-archive directory used for evaluation.
    pub val_dir: PathBuf,
}

/// The training options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// The number of epochs to run.
    pub epochs: usize,
    /// The base learning rate.
    pub lr: f64,
    /// Epochs at which the learning rate decays by `lr_gamma`.
    pub lr_steps: Vec<usize>,
    pub lr_gamma: f64,
    /// The momentum parameter for optimizer.
    pub momentum: f64,
    /// The weight decay parameter for optimizer.
    pub weight_decay: f64,
    /// Length of the linear learning-rate ramp in iterations.
    pub warmup_iters: i64,
    /// Iteration cap per epoch; negative runs the full dataset.
    pub iters: i64,
    /// Emit a progress line every this many iterations.
    pub print_freq: usize,
    /// Checkpoint file loading method.
    pub load_checkpoint: LoadCheckpoint,
    #[serde(with = "tch_serde::serde_device")]
    pub device: Device,
}

impl TrainingConfig {
    /// Step-decayed base learning rate for an epoch.
    pub fn lr_at_epoch(&self, epoch: usize) -> f64 {
        let decays = self.lr_steps.iter().filter(|&&step| step <= epoch).count();
        self.lr * self.lr_gamma.powi(decays as i32)
    }
}

/// Checkpoint file loading method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoadCheckpoint {
    /// Disable checkpoint file loading.
    Disabled,
    /// Load the most recent checkpoint file.
    FromRecent,
    /// Load the checkpoint file at specified path.
    FromFile { file: PathBuf },
}

/// The evaluation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Path of the serialized results artifact.
    pub results: PathBuf,
    /// Iteration cap for result generation; negative runs the full set.
    pub iters: i64,
}

/// Data logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}
