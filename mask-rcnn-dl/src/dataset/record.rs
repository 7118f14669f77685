use crate::common::*;

/// One (image, target) example drawn from a data source.
#[derive(Debug)]
pub struct Batch {
    /// Image pixels, shape `[channels, height, width]`.
    pub image: Tensor,
    pub target: ImageTarget,
}

/// Ground-truth target for one image.
#[derive(Debug)]
pub struct ImageTarget {
    pub image_id: i64,
    /// Boxes in `[x1, y1, x2, y2]` rows, shape `[n, 4]`.
    pub boxes: Tensor,
    /// Class labels, shape `[n]`.
    pub labels: Tensor,
    /// Binary instance masks, shape `[n, height, width]`.
    pub masks: Option<Tensor>,
}

impl ImageTarget {
    /// Move every target tensor to a device.
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            image_id: self.image_id,
            boxes: self.boxes.to_device(device),
            labels: self.labels.to_device(device),
            masks: self.masks.as_ref().map(|masks| masks.to_device(device)),
        }
    }

    /// The target as TorchScript dict entries.
    pub fn to_ivalue_entries(&self) -> Vec<(IValue, IValue)> {
        let mut entries = vec![
            (
                IValue::String("image_id".to_owned()),
                IValue::Tensor(Tensor::from(self.image_id)),
            ),
            (
                IValue::String("boxes".to_owned()),
                IValue::Tensor(self.boxes.shallow_clone()),
            ),
            (
                IValue::String("labels".to_owned()),
                IValue::Tensor(self.labels.shallow_clone()),
            ),
        ];
        if let Some(masks) = &self.masks {
            entries.push((
                IValue::String("masks".to_owned()),
                IValue::Tensor(masks.shallow_clone()),
            ));
        }
        entries
    }
}
