use super::{
    bbox_iou, ApCalculator, CocoRecord, GroundTruth, GtAnnotation, PrecRec,
};
use crate::common::*;

/// The evaluation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IouType {
    Bbox,
    Segm,
}

impl fmt::Display for IouType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bbox => "bbox",
            Self::Segm => "segm",
        };
        write!(formatter, "{}", name)
    }
}

/// The evaluator contract.
pub trait Evaluator {
    /// Fold prediction records into the evaluator state.
    fn accumulate(&mut self, results: &[CocoRecord]);

    /// Write the human-readable summary.
    fn summarize(&mut self, writer: &mut dyn io::Write) -> Result<()>;
}

/// COCO-style evaluator over bbox and mask IoU.
///
/// Matching is greedy in decreasing score order per image and class;
/// average precision uses the 101-point interpolation over IoU
/// thresholds 0.50:0.05:0.95.
#[derive(Debug)]
pub struct CocoEvaluator {
    ground_truth: GroundTruth,
    iou_types: Vec<IouType>,
    records: Vec<CocoRecord>,
    ap_calculator: ApCalculator,
}

#[derive(Debug, Clone, Copy)]
struct TypeMetrics {
    ap: f64,
    ap50: f64,
    ap75: f64,
}

impl CocoEvaluator {
    /// Bind the evaluator to ground-truth annotations and a task set.
    pub fn new(ground_truth: &GroundTruth, iou_types: &[IouType]) -> Result<Self> {
        ensure!(!iou_types.is_empty(), "iou_types must be non-empty");
        Ok(Self {
            ground_truth: ground_truth.clone(),
            iou_types: iou_types.to_vec(),
            records: vec![],
            ap_calculator: ApCalculator::new_coco(),
        })
    }

    fn evaluate_type(&self, iou_type: IouType) -> TypeMetrics {
        let thresholds: Vec<f64> = (0..10).map(|step| 0.5 + 0.05 * step as f64).collect();

        let num_gt_per_class: HashMap<i64, usize> = self
            .ground_truth
            .annotations
            .iter()
            .map(|ann| ann.category_id)
            .counts();

        let mut class_aps: Vec<Vec<f64>> = vec![];
        for class in self.ground_truth.annotated_category_ids() {
            let num_gt = num_gt_per_class[&class];
            let scored_per_threshold = self.match_class(class, iou_type, &thresholds);
            let aps: Vec<f64> = scored_per_threshold
                .into_iter()
                .map(|scored| self.ap_from_scored(scored, num_gt))
                .collect();
            class_aps.push(aps);
        }

        if class_aps.is_empty() {
            return TypeMetrics {
                ap: 0.0,
                ap50: 0.0,
                ap75: 0.0,
            };
        }

        let num_classes = class_aps.len() as f64;
        let ap = class_aps
            .iter()
            .map(|aps| aps.iter().sum::<f64>() / aps.len() as f64)
            .sum::<f64>()
            / num_classes;
        let ap50 = class_aps.iter().map(|aps| aps[0]).sum::<f64>() / num_classes;
        let ap75 = class_aps.iter().map(|aps| aps[5]).sum::<f64>() / num_classes;

        TypeMetrics { ap, ap50, ap75 }
    }

    /// Match one class's detections against its ground truth; one
    /// `(score, is_tp)` list per IoU threshold.
    fn match_class(
        &self,
        class: i64,
        iou_type: IouType,
        thresholds: &[f64],
    ) -> Vec<Vec<(R64, bool)>> {
        let gts_per_image: HashMap<i64, Vec<&GtAnnotation>> = self
            .ground_truth
            .annotations
            .iter()
            .filter(|ann| ann.category_id == class)
            .map(|ann| (ann.image_id, ann))
            .into_group_map();
        let dets_per_image: HashMap<i64, Vec<&CocoRecord>> = self
            .records
            .iter()
            .filter(|record| record.category_id == class)
            .map(|record| (record.image_id, record))
            .into_group_map();

        let mut scored_per_threshold = vec![vec![]; thresholds.len()];
        for (image_id, mut dets) in dets_per_image {
            dets.sort_by_key(|det| -r64(det.score));
            let gts = gts_per_image
                .get(&image_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let ious: Vec<Vec<f64>> = dets
                .iter()
                .map(|&det| gts.iter().map(|&gt| pair_iou(iou_type, det, gt)).collect())
                .collect();

            for (threshold_index, &threshold) in thresholds.iter().enumerate() {
                let mut matched = vec![false; gts.len()];
                for (det_index, det) in dets.iter().enumerate() {
                    let best = ious[det_index]
                        .iter()
                        .enumerate()
                        .filter(|&(gt_index, &iou)| !matched[gt_index] && iou >= threshold)
                        .max_by_key(|&(_, &iou)| r64(iou))
                        .map(|(gt_index, _)| gt_index);

                    if let Some(gt_index) = best {
                        matched[gt_index] = true;
                    }
                    scored_per_threshold[threshold_index].push((r64(det.score), best.is_some()));
                }
            }
        }
        scored_per_threshold
    }

    /// Average precision from `(score, is_tp)` pairs and a ground-truth
    /// count.
    fn ap_from_scored(&self, mut scored: Vec<(R64, bool)>, num_gt: usize) -> f64 {
        if scored.is_empty() || num_gt == 0 {
            return 0.0;
        }

        scored.sort_by_key(|&(score, _)| -score);
        let prec_rec: Vec<PrecRec> = scored
            .iter()
            .scan((0usize, 0usize), |(tp, fp), &(_, is_tp)| {
                if is_tp {
                    *tp += 1;
                } else {
                    *fp += 1;
                }
                Some(PrecRec {
                    precision: r64(*tp as f64 / (*tp + *fp) as f64),
                    recall: r64(*tp as f64 / num_gt as f64),
                })
            })
            .collect();

        self.ap_calculator.compute_by_prec_rec(&prec_rec).raw()
    }
}

impl Evaluator for CocoEvaluator {
    fn accumulate(&mut self, results: &[CocoRecord]) {
        self.records.extend_from_slice(results);
    }

    fn summarize(&mut self, writer: &mut dyn io::Write) -> Result<()> {
        for &iou_type in &self.iou_types {
            let TypeMetrics { ap, ap50, ap75 } = self.evaluate_type(iou_type);
            writeln!(writer, "IoU metric: {}", iou_type)?;
            writeln!(
                writer,
                " Average Precision  (AP) @[ IoU=0.50:0.95 | area=   all | maxDets=100 ] = {:.3}",
                ap
            )?;
            writeln!(
                writer,
                " Average Precision  (AP) @[ IoU=0.50      | area=   all | maxDets=100 ] = {:.3}",
                ap50
            )?;
            writeln!(
                writer,
                " Average Precision  (AP) @[ IoU=0.75      | area=   all | maxDets=100 ] = {:.3}",
                ap75
            )?;
        }
        Ok(())
    }
}

fn pair_iou(iou_type: IouType, det: &CocoRecord, gt: &GtAnnotation) -> f64 {
    match iou_type {
        IouType::Bbox => bbox_iou(&det.bbox, &gt.bbox),
        IouType::Segm => match (&det.segmentation, &gt.segmentation) {
            (Some(det_rle), Some(gt_rle)) => det_rle.iou(gt_rle),
            _ => 0.0,
        },
    }
}
