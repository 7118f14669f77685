use super::Batch;
use crate::{common::*, eval::GroundTruth};

/// The generic detection dataset trait.
pub trait DetectionDataset
where
    Self: Debug,
{
    /// The number of batches in one pass.
    fn num_batches(&self) -> usize;

    /// Enumerate batches in a fixed order.
    fn batches(&self) -> Result<Box<dyn Iterator<Item = Result<Batch>> + '_>>;

    /// The ground-truth annotations consumed by the evaluator.
    fn ground_truth(&self) -> &GroundTruth;
}
