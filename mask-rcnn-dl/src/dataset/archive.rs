use super::{Batch, DetectionDataset, ImageTarget};
use crate::{common::*, eval::GroundTruth};

/// Manifest of a tensor-archive dataset directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub samples: Vec<ArchiveEntry>,
    /// Ground-truth annotation file, relative to the dataset directory.
    pub annotations: PathBuf,
}

/// One sample of the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub image_id: i64,
    /// Named-tensor archive, relative to the dataset directory.
    pub tensors: PathBuf,
}

/// Dataset backed by per-sample named-tensor archives.
///
/// The directory holds an `index.json` manifest. Each entry points to an
/// archive with `image`, `boxes` and `labels` tensors and an optional
/// `masks` tensor.
#[derive(Debug)]
pub struct ArchiveDataset {
    dir: PathBuf,
    index: ArchiveIndex,
    ground_truth: GroundTruth,
}

impl ArchiveDataset {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_owned();
        let index_path = dir.join("index.json");
        let text = fs::read_to_string(&index_path)
            .with_context(|| format!("failed to read manifest '{}'", index_path.display()))?;
        let index: ArchiveIndex = serde_json::from_str(&text)
            .with_context(|| format!("malformed manifest '{}'", index_path.display()))?;
        let ground_truth = GroundTruth::open(dir.join(&index.annotations))?;

        Ok(Self {
            dir,
            index,
            ground_truth,
        })
    }

    fn load_batch(&self, entry: &ArchiveEntry) -> Result<Batch> {
        let path = self.dir.join(&entry.tensors);
        let mut tensors: HashMap<String, Tensor> = Tensor::load_multi(&path)
            .with_context(|| format!("failed to load tensor archive '{}'", path.display()))?
            .into_iter()
            .collect();

        let image = take_tensor(&mut tensors, "image", &path)?;
        let boxes = take_tensor(&mut tensors, "boxes", &path)?;
        let labels = take_tensor(&mut tensors, "labels", &path)?;
        let masks = tensors.remove("masks");

        Ok(Batch {
            image,
            target: ImageTarget {
                image_id: entry.image_id,
                boxes,
                labels,
                masks,
            },
        })
    }
}

impl DetectionDataset for ArchiveDataset {
    fn num_batches(&self) -> usize {
        self.index.samples.len()
    }

    fn batches(&self) -> Result<Box<dyn Iterator<Item = Result<Batch>> + '_>> {
        let iter = self
            .index
            .samples
            .iter()
            .map(move |entry| self.load_batch(entry));
        Ok(Box::new(iter))
    }

    fn ground_truth(&self) -> &GroundTruth {
        &self.ground_truth
    }
}

fn take_tensor(tensors: &mut HashMap<String, Tensor>, name: &str, path: &Path) -> Result<Tensor> {
    tensors
        .remove(name)
        .ok_or_else(|| format_err!("missing '{}' tensor in archive '{}'", name, path.display()))
}
