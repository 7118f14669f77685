//! The training program for the mask-rcnn-dl project.

pub mod common;
pub mod config;
pub mod utils;

use crate::{common::*, config::Config};

/// The entry of the training program.
pub fn start(config: Config) -> Result<()> {
    let start_time = Local::now();
    let logging_dir = config
        .logging
        .dir
        .join(format!("{}", start_time.format(utils::FILE_STRFTIME)));
    let checkpoint_dir = logging_dir.join("checkpoints");

    // create dirs and save config
    fs::create_dir_all(&logging_dir)?;
    fs::create_dir_all(&checkpoint_dir)?;
    {
        let path = logging_dir.join("config.json");
        let text = serde_json::to_string_pretty(&config)?;
        fs::write(&path, text)?;
    }

    let device = config.training.device;

    // load datasets
    info!("loading dataset");
    let train_data = ArchiveDataset::load(&config.dataset.train_dir)?;
    let val_data = ArchiveDataset::load(&config.dataset.val_dir)?;

    // init model
    info!("initializing model");
    let mut vs = nn::VarStore::new(device);
    let mut model = TorchScriptModel::load(&config.model.file, vs.root())?;
    let mut optimizer = SgdOptimizer::new(
        &vs,
        config.training.lr,
        config.training.momentum,
        config.training.weight_decay,
    )?;

    // resume from checkpoint
    let init_epoch = utils::try_load_checkpoint(
        &mut vs,
        &config.logging.dir,
        &config.training.load_checkpoint,
    )?;

    info!("start training");
    for epoch in init_epoch..config.training.epochs {
        let lr_epoch = config.training.lr_at_epoch(epoch);
        info!("epoch: {}\tlr: {:.5}", epoch, lr_epoch);

        let train_config = EngineConfig {
            lr_epoch,
            warmup_iters: config.training.warmup_iters,
            iters: config.training.iters,
            print_freq: config.training.print_freq,
            results: config.evaluation.results.clone(),
        };
        engine::train_one_epoch(&mut model, &mut optimizer, &train_data, device, epoch, &train_config)?;

        utils::save_checkpoint(&vs, &checkpoint_dir, epoch)?;

        let eval_config = EngineConfig {
            iters: config.evaluation.iters,
            ..train_config
        };
        let (summary, _iter_eval, ap_values) =
            engine::evaluate(&mut model, &val_data, device, &eval_config, true)?;
        info!("{}", summary.text());
        info!(
            "epoch: {}\tbbox AP: {:?}\tmask AP: {:?}",
            epoch, ap_values.bbox_ap, ap_values.mask_ap
        );
    }

    Ok(())
}
