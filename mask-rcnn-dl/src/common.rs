//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    cmp::{self, Ordering},
    collections::{HashMap, HashSet},
    fmt,
    fmt::Debug,
    fs, io,
    io::Write as _,
    iter,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
pub use tch::{
    nn::{self, OptimizerConfig as _},
    Device, IValue, Kind, Tensor, TrainableCModule,
};
