use super::{generate_results, EngineConfig};
use crate::{
    common::*,
    dataset::DetectionDataset,
    eval::{load_results, ApValues, CocoEvaluator, Evaluator, IouType, SummaryBuffer},
    model::DetectionModel,
};

/// Run the two-phase evaluation protocol with the built-in COCO-style
/// evaluator bound to the dataset's ground truth.
///
/// When `generate` is false the results artifact must already exist at
/// `config.results`.
pub fn evaluate<M, D>(
    model: &mut M,
    data: &D,
    device: Device,
    config: &EngineConfig,
    generate: bool,
) -> Result<(SummaryBuffer, Option<f64>, ApValues)>
where
    M: DetectionModel,
    D: DetectionDataset + ?Sized,
{
    let evaluator = CocoEvaluator::new(data.ground_truth(), &[IouType::Bbox, IouType::Segm])?;
    evaluate_with(evaluator, model, data, device, config, generate)
}

/// Same as [`evaluate`] but with a caller-supplied evaluator.
pub fn evaluate_with<E, M, D>(
    mut evaluator: E,
    model: &mut M,
    data: &D,
    device: Device,
    config: &EngineConfig,
    generate: bool,
) -> Result<(SummaryBuffer, Option<f64>, ApValues)>
where
    E: Evaluator,
    M: DetectionModel,
    D: DetectionDataset + ?Sized,
{
    let iter_eval = if generate {
        Some(generate_results(model, data, device, config)?)
    } else {
        None
    };

    let results = load_results(&config.results)?;

    let start = Instant::now();
    evaluator.accumulate(&results);
    info!("accumulate: {:.1}s", start.elapsed().as_secs_f64());

    let mut summary = SummaryBuffer::new();
    evaluator.summarize(&mut summary)?;

    let ap_values = summary.ap_values()?;
    info!(
        "bbox AP: {:?}, mask AP: {:?}",
        ap_values.bbox_ap, ap_values.mask_ap
    );

    Ok((summary, iter_eval, ap_values))
}
