//! The optimizer adaptor.

use crate::common::*;

/// The optimizer contract.
pub trait Optimizer {
    /// Apply a learning rate to every parameter group.
    fn set_lr(&mut self, lr: f64);

    fn step(&mut self);

    fn zero_grad(&mut self);
}

/// SGD optimizer over a variable store.
pub struct SgdOptimizer {
    inner: nn::Optimizer<nn::Sgd>,
}

impl SgdOptimizer {
    pub fn new(vs: &nn::VarStore, lr: f64, momentum: f64, weight_decay: f64) -> Result<Self> {
        let inner = nn::Sgd {
            momentum,
            wd: weight_decay,
            ..Default::default()
        }
        .build(vs, lr)?;
        Ok(Self { inner })
    }
}

impl Optimizer for SgdOptimizer {
    fn set_lr(&mut self, lr: f64) {
        self.inner.set_lr(lr);
    }

    fn step(&mut self) {
        self.inner.step();
    }

    fn zero_grad(&mut self) {
        self.inner.zero_grad();
    }
}
