//! Common imports from external crates.

pub use anyhow::{Context as _, Error, Result};
pub use chrono::{DateTime, Local};
pub use itertools::Itertools as _;
pub use mask_rcnn_dl::{
    dataset::ArchiveDataset,
    engine::{self, EngineConfig},
    model::TorchScriptModel,
    optim::SgdOptimizer,
};
pub use serde::{Deserialize, Serialize};
pub use std::{
    fs,
    path::{Path, PathBuf},
};
pub use tch::{nn, Device};
pub use tracing::{info, warn};
