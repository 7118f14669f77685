//! Common imports from external crates.

pub use anyhow::{Context as _, Error, Result};
pub use mask_rcnn_dl::{
    dataset::ArchiveDataset,
    engine::{self, EngineConfig},
    model::TorchScriptModel,
};
pub use serde::{Deserialize, Serialize};
pub use std::path::{Path, PathBuf};
pub use tch::{nn, Device};
pub use tracing::info;
