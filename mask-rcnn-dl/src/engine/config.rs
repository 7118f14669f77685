use crate::common::*;

/// Per-invocation engine options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base learning rate for the epoch.
    pub lr_epoch: f64,
    /// Length of the linear learning-rate ramp in iterations. Zero or
    /// negative disables warmup.
    pub warmup_iters: i64,
    /// Iteration cap per invocation; negative runs the full dataset.
    pub iters: i64,
    /// Emit a progress line every this many iterations.
    pub print_freq: usize,
    /// Path of the serialized results artifact.
    pub results: PathBuf,
}

impl EngineConfig {
    /// Number of batches to process for a data source of a given length.
    pub fn num_iters(&self, num_batches: usize) -> usize {
        if self.iters < 0 {
            num_batches
        } else {
            cmp::min(num_batches, self.iters as usize)
        }
    }
}
