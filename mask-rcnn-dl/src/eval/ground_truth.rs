use super::Rle;
use crate::common::*;

/// Ground-truth annotations in COCO layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruth {
    pub images: Vec<GtImage>,
    pub annotations: Vec<GtAnnotation>,
    pub categories: Vec<GtCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtImage {
    pub id: i64,
    pub height: i64,
    pub width: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtAnnotation {
    pub id: i64,
    pub image_id: i64,
    pub category_id: i64,
    /// `[x, y, w, h]` in pixels.
    pub bbox: [f64; 4],
    #[serde(default)]
    pub segmentation: Option<Rle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtCategory {
    pub id: i64,
    pub name: String,
}

impl GroundTruth {
    /// Load annotations from a JSON file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;
        let ground_truth = serde_json::from_str(&text)
            .with_context(|| format!("malformed annotation file '{}'", path.display()))?;
        Ok(ground_truth)
    }

    /// Category ids with at least one annotation, in increasing order.
    pub fn annotated_category_ids(&self) -> Vec<i64> {
        self.annotations
            .iter()
            .map(|ann| ann.category_id)
            .unique()
            .sorted()
            .collect()
    }
}
