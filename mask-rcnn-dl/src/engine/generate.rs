use super::EngineConfig;
use crate::{
    common::*,
    dataset::{Batch, DetectionDataset},
    eval::{prepare_for_coco, save_results},
    model::DetectionModel,
    utils::Meter,
};

/// Run inference over the data source and persist COCO-format records.
///
/// Gradient tracking is disabled for the whole pass. The results file is
/// rewritten from scratch on every invocation; it is the only channel to
/// the evaluation phase. Returns the average wall-clock seconds per
/// iteration.
pub fn generate_results<M, D>(
    model: &mut M,
    data: &D,
    device: Device,
    config: &EngineConfig,
) -> Result<f64>
where
    M: DetectionModel,
    D: DetectionDataset + ?Sized,
{
    let num_batches = data.num_batches();
    let iters = config.num_iters(num_batches);
    ensure!(iters > 0, "the data source is empty");

    let mut total_meter = Meter::new("total");
    let mut model_meter = Meter::new("model");
    let mut coco_results = vec![];

    model.set_eval();
    let start = Instant::now();

    tch::no_grad(|| -> Result<()> {
        for (index, batch) in data.batches()?.enumerate() {
            let iter_start = Instant::now();
            let Batch { image, target } = batch?;

            let image = image.to_device(device);
            let target = target.to_device(device);

            let forward_start = Instant::now();
            let output = model.forward(&image)?;
            model_meter.update(forward_start.elapsed().as_secs_f64());

            let prediction = output.detach_to(Device::Cpu);
            coco_results.extend(prepare_for_coco(target.image_id, &prediction)?);

            total_meter.update(iter_start.elapsed().as_secs_f64());
            if index >= iters - 1 {
                break;
            }
        }
        Ok(())
    })?;

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "iter: {:.1}, total: {:.1}, model: {:.1}",
        1000.0 * elapsed / iters as f64,
        1000.0 * total_meter.avg(),
        1000.0 * model_meter.avg(),
    );

    save_results(&coco_results, &config.results)?;

    Ok(elapsed / iters as f64)
}
