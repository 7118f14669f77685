//! Training and evaluation engine for Mask R-CNN style detection models.

mod common;
pub mod dataset;
pub mod engine;
pub mod eval;
pub mod model;
pub mod optim;
pub mod utils;
