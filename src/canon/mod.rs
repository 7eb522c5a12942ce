// SPDX-License-Identifier: Apache-2.0

//! Function classification under permutation, complementation, and linear
//! input/output transforms.

pub mod classify;
pub mod transform;

pub use classify::{Classified, Classifier, DEFAULT_STEP_BUDGET};
pub use transform::{Transform, apply_all, transform_arrivals};
