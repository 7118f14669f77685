//! The model adaptor.

use crate::{common::*, dataset::ImageTarget};

/// The detection model contract.
///
/// In training mode the model maps an image and its target to named
/// losses. In evaluation mode it maps an image alone to detection
/// outputs.
pub trait DetectionModel {
    fn forward_train(&mut self, image: &Tensor, target: &ImageTarget) -> Result<Losses>;

    fn forward(&mut self, image: &Tensor) -> Result<Detections>;

    fn set_train(&mut self);

    fn set_eval(&mut self);
}

/// Named loss values of one training step.
#[derive(Debug)]
pub struct Losses(pub IndexMap<String, Tensor>);

impl Losses {
    /// Sum all loss values into a single scalar.
    pub fn total(&self) -> Result<Tensor> {
        let mut values = self.0.values();
        let first = values
            .next()
            .ok_or_else(|| format_err!("the model returned no losses"))?;
        let total = values.fold(first.shallow_clone(), |acc, value| acc + value);
        Ok(total)
    }

    /// Tab-separated loss values formatted to 3 decimal places.
    pub fn format(&self) -> String {
        self.0
            .values()
            .map(|value| format!("{:.3}", f64::from(value)))
            .join("\t")
    }
}

/// Detection outputs for one image.
#[derive(Debug)]
pub struct Detections {
    /// Boxes in `[x1, y1, x2, y2]` rows, shape `[n, 4]`.
    pub boxes: Tensor,
    /// Class labels, shape `[n]`.
    pub labels: Tensor,
    /// Confidence scores, shape `[n]`.
    pub scores: Tensor,
    /// Instance mask probabilities, shape `[n, height, width]`.
    pub masks: Option<Tensor>,
}

impl Detections {
    /// Detach every output from the graph and move it to a device.
    pub fn detach_to(&self, device: Device) -> Self {
        Self {
            boxes: self.boxes.detach().to_device(device),
            labels: self.labels.detach().to_device(device),
            scores: self.scores.detach().to_device(device),
            masks: self
                .masks
                .as_ref()
                .map(|masks| masks.detach().to_device(device)),
        }
    }
}

/// Model adaptor backed by a traced TorchScript module.
///
/// The module must expose a `forward_train(image, target)` method
/// returning a string-to-scalar dict of losses, and a `forward(image)`
/// method returning a dict with `boxes`, `labels` and `scores` entries
/// plus an optional `masks` entry.
pub struct TorchScriptModel {
    module: TrainableCModule,
}

impl TorchScriptModel {
    /// Load a traced module and register its parameters under a variable
    /// store path.
    pub fn load(file: impl AsRef<Path>, vs: nn::Path<'_>) -> Result<Self> {
        let file = file.as_ref();
        let module = TrainableCModule::load(file, vs)
            .with_context(|| format!("failed to load model file '{}'", file.display()))?;
        Ok(Self { module })
    }
}

impl DetectionModel for TorchScriptModel {
    fn forward_train(&mut self, image: &Tensor, target: &ImageTarget) -> Result<Losses> {
        let target = IValue::GenericDict(target.to_ivalue_entries());
        let output = self
            .module
            .method_is("forward_train", &[IValue::Tensor(image.shallow_clone()), target])?;
        losses_from_ivalue(output)
    }

    fn forward(&mut self, image: &Tensor) -> Result<Detections> {
        let output = self
            .module
            .method_is("forward", &[IValue::Tensor(image.shallow_clone())])?;
        detections_from_ivalue(output)
    }

    fn set_train(&mut self) {
        self.module.set_train();
    }

    fn set_eval(&mut self) {
        self.module.set_eval();
    }
}

fn dict_from_ivalue(output: IValue) -> Result<Vec<(String, Tensor)>> {
    let entries = match output {
        IValue::GenericDict(entries) => entries,
        other => bail!("expected a dict of tensors, got {:?}", other),
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            (IValue::String(name), IValue::Tensor(value)) => Ok((name, value)),
            (key, value) => bail!("unexpected dict entry {:?}: {:?}", key, value),
        })
        .try_collect()
}

fn losses_from_ivalue(output: IValue) -> Result<Losses> {
    let losses: IndexMap<_, _> = dict_from_ivalue(output)?.into_iter().collect();
    ensure!(!losses.is_empty(), "the model returned no losses");
    Ok(Losses(losses))
}

fn detections_from_ivalue(output: IValue) -> Result<Detections> {
    let mut outputs: HashMap<_, _> = dict_from_ivalue(output)?.into_iter().collect();
    let mut take = |name: &str| -> Result<Tensor> {
        outputs
            .remove(name)
            .ok_or_else(|| format_err!("missing '{}' entry in model output", name))
    };

    let boxes = take("boxes")?;
    let labels = take("labels")?;
    let scores = take("scores")?;
    let masks = outputs.remove("masks");

    Ok(Detections {
        boxes,
        labels,
        scores,
        masks,
    })
}
