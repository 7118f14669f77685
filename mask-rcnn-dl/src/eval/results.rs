use crate::{common::*, model::Detections};

/// One serialized prediction record in the evaluator's expected schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CocoRecord {
    pub image_id: i64,
    pub category_id: i64,
    /// `[x, y, w, h]` in pixels.
    pub bbox: [f64; 4],
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Rle>,
}

/// Uncompressed run-length encoding of a binary mask.
///
/// Runs are counted over a column-major scan and start with the zero run,
/// matching the COCO mask layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rle {
    /// `[height, width]`.
    pub size: [i64; 2],
    pub counts: Vec<u32>,
}

impl Rle {
    /// Encode a row-major bitmap.
    pub fn encode(mask: &[bool], height: usize, width: usize) -> Result<Self> {
        ensure!(
            mask.len() == height * width,
            "mask has {} pixels, expected {}",
            mask.len(),
            height * width
        );

        let mut counts = vec![];
        let mut current = false;
        let mut run = 0u32;
        for col in 0..width {
            for row in 0..height {
                let value = mask[row * width + col];
                if value == current {
                    run += 1;
                } else {
                    counts.push(run);
                    current = value;
                    run = 1;
                }
            }
        }
        counts.push(run);

        Ok(Self {
            size: [height as i64, width as i64],
            counts,
        })
    }

    /// Decode into a row-major bitmap.
    pub fn decode(&self) -> Vec<bool> {
        let [height, width] = self.size;
        let (height, width) = (height as usize, width as usize);
        let mut mask = vec![false; height * width];

        let mut offset = 0;
        let mut value = false;
        for &count in &self.counts {
            if value {
                for index in offset..offset + count as usize {
                    let (col, row) = (index / height, index % height);
                    mask[row * width + col] = true;
                }
            }
            offset += count as usize;
            value = !value;
        }
        mask
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.counts
            .iter()
            .skip(1)
            .step_by(2)
            .map(|&count| count as u64)
            .sum()
    }

    /// Intersection-over-union with another mask of the same size.
    pub fn iou(&self, other: &Rle) -> f64 {
        if self.size != other.size {
            return 0.0;
        }

        let lhs = self.decode();
        let rhs = other.decode();
        let mut intersection = 0u64;
        let mut union = 0u64;
        for (&a, &b) in lhs.iter().zip(&rhs) {
            intersection += (a && b) as u64;
            union += (a || b) as u64;
        }

        if union == 0 {
            0.0
        } else {
            intersection as f64 / union as f64
        }
    }
}

/// Intersection-over-union of two `[x, y, w, h]` boxes.
pub fn bbox_iou(lhs: &[f64; 4], rhs: &[f64; 4]) -> f64 {
    let inter_w = (lhs[0] + lhs[2]).min(rhs[0] + rhs[2]) - lhs[0].max(rhs[0]);
    let inter_h = (lhs[1] + lhs[3]).min(rhs[1] + rhs[3]) - lhs[1].max(rhs[1]);
    if inter_w <= 0.0 || inter_h <= 0.0 {
        return 0.0;
    }

    let intersection = inter_w * inter_h;
    let union = lhs[2] * lhs[3] + rhs[2] * rhs[3] - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Convert detached per-image outputs to COCO-format records.
///
/// Boxes are converted from corner `[x1, y1, x2, y2]` form to
/// `[x, y, w, h]`; masks are thresholded at 0.5 and run-length encoded.
pub fn prepare_for_coco(image_id: i64, detections: &Detections) -> Result<Vec<CocoRecord>> {
    let Detections {
        boxes,
        labels,
        scores,
        masks,
    } = detections;

    let (num_dets, _) = boxes.size2()?;
    let num_dets = num_dets as usize;
    let boxes = Vec::<f64>::from(&boxes.contiguous().view([-1]).to_kind(Kind::Double));
    let labels = Vec::<i64>::from(&labels.to_kind(Kind::Int64));
    let scores = Vec::<f64>::from(&scores.to_kind(Kind::Double));
    ensure!(
        labels.len() == num_dets && scores.len() == num_dets,
        "model outputs disagree on the number of detections"
    );

    let rles = masks
        .as_ref()
        .map(|masks| -> Result<Vec<Rle>> {
            let (num_masks, height, width) = masks.size3()?;
            ensure!(
                num_masks as usize == num_dets,
                "model outputs disagree on the number of detections"
            );
            let (height, width) = (height as usize, width as usize);
            let flat = Vec::<u8>::from(
                &masks
                    .ge(0.5)
                    .to_kind(Kind::Uint8)
                    .contiguous()
                    .view([-1]),
            );

            (0..num_dets)
                .map(|index| {
                    let pixels: Vec<bool> = flat[index * height * width..(index + 1) * height * width]
                        .iter()
                        .map(|&value| value != 0)
                        .collect();
                    Rle::encode(&pixels, height, width)
                })
                .try_collect()
        })
        .transpose()?;

    let records = (0..num_dets)
        .map(|index| {
            let [x1, y1, x2, y2] = [
                boxes[4 * index],
                boxes[4 * index + 1],
                boxes[4 * index + 2],
                boxes[4 * index + 3],
            ];
            CocoRecord {
                image_id,
                category_id: labels[index],
                bbox: [x1, y1, x2 - x1, y2 - y1],
                score: scores[index],
                segmentation: rles.as_ref().map(|rles| rles[index].clone()),
            }
        })
        .collect();

    Ok(records)
}

/// Write the record list to the results path, replacing prior content.
pub fn save_results(records: &[CocoRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string(records)?;
    fs::write(path, text)
        .with_context(|| format!("failed to write results file '{}'", path.display()))?;
    Ok(())
}

/// Load a record list from the results path.
pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<CocoRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read results file '{}'", path.display()))?;
    let records = serde_json::from_str(&text)
        .with_context(|| format!("malformed results file '{}'", path.display()))?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::abs_diff_eq;

    #[test]
    fn rle_encodes_column_major_runs() {
        // 2x3 mask:
        //   0 1 1
        //   0 0 1
        let mask = [false, true, true, false, false, true];
        let rle = Rle::encode(&mask, 2, 3).unwrap();
        assert_eq!(rle.size, [2, 3]);
        assert_eq!(rle.counts, vec![2, 1, 1, 2]);
        assert_eq!(rle.area(), 3);
        assert_eq!(rle.decode(), mask);
    }

    #[test]
    fn rle_of_empty_mask_is_one_run() {
        let mask = [false; 6];
        let rle = Rle::encode(&mask, 2, 3).unwrap();
        assert_eq!(rle.counts, vec![6]);
        assert_eq!(rle.area(), 0);
    }

    #[test]
    fn bbox_iou_of_identical_boxes_is_one() {
        let bbox = [10.0, 20.0, 30.0, 40.0];
        assert!(abs_diff_eq!(bbox_iou(&bbox, &bbox), 1.0));
    }

    #[test]
    fn bbox_iou_of_disjoint_boxes_is_zero() {
        let lhs = [0.0, 0.0, 10.0, 10.0];
        let rhs = [20.0, 20.0, 10.0, 10.0];
        assert_eq!(bbox_iou(&lhs, &rhs), 0.0);
    }

    #[test]
    fn bbox_iou_of_half_overlap() {
        let lhs = [0.0, 0.0, 10.0, 10.0];
        let rhs = [5.0, 0.0, 10.0, 10.0];
        assert!(abs_diff_eq!(bbox_iou(&lhs, &rhs), 50.0 / 150.0));
    }
}
