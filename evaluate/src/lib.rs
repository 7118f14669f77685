//! The evaluation program for the mask-rcnn-dl project.

pub mod common;
pub mod config;

use crate::{common::*, config::Config};

/// The entry of the evaluation program.
pub fn start(config: Config, generate: bool) -> Result<()> {
    let device = config.evaluation.device;

    info!("loading dataset");
    let data = ArchiveDataset::load(&config.dataset.dir)?;

    info!("initializing model");
    let mut vs = nn::VarStore::new(device);
    let mut model = TorchScriptModel::load(&config.model.file, vs.root())?;
    if let Some(checkpoint) = &config.model.checkpoint {
        info!("load checkpoint file {}", checkpoint.display());
        vs.load_partial(checkpoint)?;
    }

    let engine_config = EngineConfig {
        lr_epoch: 0.0,
        warmup_iters: 0,
        iters: config.evaluation.iters,
        print_freq: 1,
        results: config.evaluation.results.clone(),
    };
    let (summary, iter_eval, ap_values) =
        engine::evaluate(&mut model, &data, device, &engine_config, generate)?;

    print!("{}", summary.text());
    if let Some(iter_eval) = iter_eval {
        info!("generation: {:.1} ms/iter", 1000.0 * iter_eval);
    }
    info!(
        "bbox AP: {:?}\tmask AP: {:?}",
        ap_values.bbox_ap, ap_values.mask_ap
    );

    Ok(())
}
