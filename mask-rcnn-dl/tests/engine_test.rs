use anyhow::Result;
use indexmap::IndexMap;
use mask_rcnn_dl::{
    dataset::{Batch, DetectionDataset, ImageTarget},
    engine::{self, EngineConfig},
    eval::{load_results, save_results, CocoRecord, Evaluator, GroundTruth, SummaryBuffer},
    model::{DetectionModel, Detections, Losses},
    optim::Optimizer,
};
use std::{io, io::Write as _, path::PathBuf};
use tch::{Device, Kind, Tensor};

#[derive(Debug, Default)]
struct FakeModel {
    train_calls: usize,
    infer_calls: usize,
}

impl DetectionModel for FakeModel {
    fn forward_train(&mut self, _image: &Tensor, _target: &ImageTarget) -> Result<Losses> {
        self.train_calls += 1;
        let mut losses = IndexMap::new();
        losses.insert(
            "loss_classifier".to_owned(),
            Tensor::from(0.25f64).set_requires_grad(true),
        );
        losses.insert(
            "loss_box_reg".to_owned(),
            Tensor::from(0.5f64).set_requires_grad(true),
        );
        Ok(Losses(losses))
    }

    fn forward(&mut self, _image: &Tensor) -> Result<Detections> {
        self.infer_calls += 1;
        Ok(Detections {
            boxes: Tensor::of_slice(&[10.0f32, 10.0, 20.0, 20.0]).view([1, 4]),
            labels: Tensor::of_slice(&[1i64]),
            scores: Tensor::of_slice(&[0.9f32]),
            masks: None,
        })
    }

    fn set_train(&mut self) {}

    fn set_eval(&mut self) {}
}

#[derive(Debug, Default)]
struct FakeOptimizer {
    lrs: Vec<f64>,
    steps: usize,
    zero_grads: usize,
}

impl Optimizer for FakeOptimizer {
    fn set_lr(&mut self, lr: f64) {
        self.lrs.push(lr);
    }

    fn step(&mut self) {
        self.steps += 1;
    }

    fn zero_grad(&mut self) {
        self.zero_grads += 1;
    }
}

#[derive(Debug)]
struct FakeDataset {
    num_batches: usize,
    ground_truth: GroundTruth,
}

impl FakeDataset {
    fn new(num_batches: usize) -> Self {
        Self {
            num_batches,
            ground_truth: GroundTruth {
                images: vec![],
                annotations: vec![],
                categories: vec![],
            },
        }
    }
}

impl DetectionDataset for FakeDataset {
    fn num_batches(&self) -> usize {
        self.num_batches
    }

    fn batches(&self) -> Result<Box<dyn Iterator<Item = Result<Batch>> + '_>> {
        let iter = (0..self.num_batches).map(|index| {
            Ok(Batch {
                image: Tensor::zeros(&[3, 4, 4], (Kind::Float, Device::Cpu)),
                target: ImageTarget {
                    image_id: index as i64,
                    boxes: Tensor::zeros(&[0, 4], (Kind::Float, Device::Cpu)),
                    labels: Tensor::zeros(&[0], (Kind::Int64, Device::Cpu)),
                    masks: None,
                },
            })
        });
        Ok(Box::new(iter))
    }

    fn ground_truth(&self) -> &GroundTruth {
        &self.ground_truth
    }
}

#[derive(Debug, Default)]
struct FakeEvaluator {
    accumulated: usize,
}

impl Evaluator for FakeEvaluator {
    fn accumulate(&mut self, results: &[CocoRecord]) {
        self.accumulated += results.len();
    }

    fn summarize(&mut self, writer: &mut dyn io::Write) -> Result<()> {
        writeln!(writer, "IoU metric: bbox")?;
        writeln!(
            writer,
            " Average Precision  (AP) @[ IoU=0.50:0.95 | area=   all | maxDets=100 ] = 0.500"
        )?;
        Ok(())
    }
}

fn config(results: PathBuf, iters: i64, warmup_iters: i64) -> EngineConfig {
    EngineConfig {
        lr_epoch: 0.02,
        warmup_iters,
        iters,
        print_freq: 1,
        results,
    }
}

#[test]
fn iteration_cap_limits_batches() -> Result<()> {
    let mut model = FakeModel::default();
    let mut optimizer = FakeOptimizer::default();
    let data = FakeDataset::new(5);
    let config = config(PathBuf::from("unused.json"), 3, 0);

    let avg = engine::train_one_epoch(&mut model, &mut optimizer, &data, Device::Cpu, 0, &config)?;

    assert_eq!(model.train_calls, 3);
    assert_eq!(optimizer.steps, 3);
    assert_eq!(optimizer.zero_grads, 3);
    assert!(avg > 0.0);
    Ok(())
}

#[test]
fn negative_cap_runs_full_dataset() -> Result<()> {
    let mut model = FakeModel::default();
    let mut optimizer = FakeOptimizer::default();
    let data = FakeDataset::new(5);
    let config = config(PathBuf::from("unused.json"), -1, 0);

    engine::train_one_epoch(&mut model, &mut optimizer, &data, Device::Cpu, 0, &config)?;

    assert_eq!(model.train_calls, 5);
    Ok(())
}

#[test]
fn warmup_ramps_linearly() -> Result<()> {
    let mut model = FakeModel::default();
    let mut optimizer = FakeOptimizer::default();
    let data = FakeDataset::new(5);
    let config = config(PathBuf::from("unused.json"), -1, 100);

    // epoch 10 with 5 batches per epoch puts batch 0 at global iteration 50
    engine::train_one_epoch(&mut model, &mut optimizer, &data, Device::Cpu, 10, &config)?;

    // entry pin, then one ramp value per batch
    assert_eq!(optimizer.lrs.len(), 6);
    assert_eq!(optimizer.lrs[0], 0.02);
    assert!((optimizer.lrs[1] - 0.5 * 0.02).abs() < 1e-12);
    assert!((optimizer.lrs[2] - 0.51 * 0.02).abs() < 1e-12);
    Ok(())
}

#[test]
fn lr_pinned_after_warmup_window() -> Result<()> {
    let mut model = FakeModel::default();
    let mut optimizer = FakeOptimizer::default();
    let data = FakeDataset::new(5);
    let config = config(PathBuf::from("unused.json"), -1, 2);

    engine::train_one_epoch(&mut model, &mut optimizer, &data, Device::Cpu, 0, &config)?;

    // ramp hits lr_epoch exactly at the window boundary, then no more sets
    assert_eq!(optimizer.lrs.len(), 4);
    assert_eq!(optimizer.lrs[0], 0.02);
    assert_eq!(optimizer.lrs[1], 0.0);
    assert!((optimizer.lrs[2] - 0.01).abs() < 1e-12);
    assert!((optimizer.lrs[3] - 0.02).abs() < 1e-12);
    Ok(())
}

#[test]
fn zero_warmup_iters_disables_the_ramp() -> Result<()> {
    let mut model = FakeModel::default();
    let mut optimizer = FakeOptimizer::default();
    let data = FakeDataset::new(3);
    let config = config(PathBuf::from("unused.json"), -1, 0);

    engine::train_one_epoch(&mut model, &mut optimizer, &data, Device::Cpu, 0, &config)?;

    assert_eq!(optimizer.lrs, vec![0.02]);
    Ok(())
}

#[test]
fn generator_overwrites_prior_results() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let results = dir.path().join("results.json");

    let mut model = FakeModel::default();
    let data = FakeDataset::new(2);
    engine::generate_results(&mut model, &data, Device::Cpu, &config(results.clone(), -1, 0))?;
    assert_eq!(load_results(&results)?.len(), 2);

    engine::generate_results(&mut model, &data, Device::Cpu, &config(results.clone(), 1, 0))?;
    assert_eq!(load_results(&results)?.len(), 1);
    Ok(())
}

#[test]
fn evaluate_without_generation_reuses_the_artifact() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let results = dir.path().join("results.json");
    save_results(
        &[CocoRecord {
            image_id: 0,
            category_id: 1,
            bbox: [10.0, 10.0, 10.0, 10.0],
            score: 0.9,
            segmentation: None,
        }],
        &results,
    )?;

    let mut model = FakeModel::default();
    let data = FakeDataset::new(2);
    let (summary, iter_eval, ap_values) = engine::evaluate_with(
        FakeEvaluator::default(),
        &mut model,
        &data,
        Device::Cpu,
        &config(results, -1, 0),
        false,
    )?;

    assert_eq!(model.infer_calls, 0);
    assert_eq!(iter_eval, None);
    assert_eq!(ap_values.bbox_ap, Some(0.5));
    assert_eq!(ap_values.mask_ap, None);
    assert!(summary.text().contains("IoU metric: bbox"));
    Ok(())
}

#[test]
fn evaluate_with_generation_runs_inference_first() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let results = dir.path().join("results.json");

    let mut model = FakeModel::default();
    let data = FakeDataset::new(3);
    let (_summary, iter_eval, _ap_values) = engine::evaluate_with(
        FakeEvaluator::default(),
        &mut model,
        &data,
        Device::Cpu,
        &config(results.clone(), -1, 0),
        true,
    )?;

    assert_eq!(model.infer_calls, 3);
    assert!(iter_eval.is_some());
    assert_eq!(load_results(&results)?.len(), 3);
    Ok(())
}

#[test]
fn evaluate_without_artifact_fails() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("missing.json");

    let mut model = FakeModel::default();
    let data = FakeDataset::new(1);
    let outcome = engine::evaluate_with(
        FakeEvaluator::default(),
        &mut model,
        &data,
        Device::Cpu,
        &config(results, -1, 0),
        false,
    );

    assert!(outcome.is_err());
}
