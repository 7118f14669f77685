use super::EngineConfig;
use crate::{
    common::*,
    dataset::{Batch, DetectionDataset},
    model::DetectionModel,
    optim::Optimizer,
    utils::Meter,
};

/// Run one training epoch.
///
/// Processes up to `min(num_batches, iters)` batches, or the full pass
/// when `iters` is negative, and returns the average wall-clock seconds
/// per iteration. The learning rate ramps linearly over the first
/// `warmup_iters` global iterations and stays pinned at `lr_epoch`
/// afterwards; a non-positive `warmup_iters` disables the ramp.
pub fn train_one_epoch<M, O, D>(
    model: &mut M,
    optimizer: &mut O,
    data: &D,
    device: Device,
    epoch: usize,
    config: &EngineConfig,
) -> Result<f64>
where
    M: DetectionModel,
    O: Optimizer,
    D: DetectionDataset + ?Sized,
{
    ensure!(config.print_freq > 0, "print_freq must be positive");

    let num_batches = data.num_batches();
    let iters = config.num_iters(num_batches);
    ensure!(iters > 0, "the data source is empty");

    optimizer.set_lr(config.lr_epoch);

    let mut total_meter = Meter::new("total");
    let mut model_meter = Meter::new("model");
    let mut backward_meter = Meter::new("backward");

    model.set_train();
    let epoch_start = Instant::now();

    for (index, batch) in data.batches()?.enumerate() {
        let iter_start = Instant::now();
        let Batch { image, target } = batch?;
        let num_iters = epoch * num_batches + index;

        if config.warmup_iters > 0 && (num_iters as i64) <= config.warmup_iters {
            let ratio = num_iters as f64 / config.warmup_iters as f64;
            optimizer.set_lr(ratio * config.lr_epoch);
        }

        let image = image.to_device(device);
        let target = target.to_device(device);

        let forward_start = Instant::now();
        let losses = model.forward_train(&image, &target)?;
        let total_loss = losses.total()?;
        model_meter.update(forward_start.elapsed().as_secs_f64());

        let backward_start = Instant::now();
        total_loss.backward();
        backward_meter.update(backward_start.elapsed().as_secs_f64());

        optimizer.step();
        optimizer.zero_grad();

        if num_iters % config.print_freq == 0 {
            info!("{}\t{}", num_iters, losses.format());
        }

        total_meter.update(iter_start.elapsed().as_secs_f64());
        if index >= iters - 1 {
            break;
        }
    }

    let elapsed = epoch_start.elapsed().as_secs_f64();
    info!(
        "iter: {:.1}, total: {:.1}, model: {:.1}, backward: {:.1}",
        1000.0 * elapsed / iters as f64,
        1000.0 * total_meter.avg(),
        1000.0 * model_meter.avg(),
        1000.0 * backward_meter.avg(),
    );

    Ok(elapsed / iters as f64)
}
