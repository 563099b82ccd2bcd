//! # normr
//!
//! **Parallel layer-normalization compute engine for Rust.**
//!
//! normr implements the forward and backward kernels of layer normalization
//! over a batch of feature vectors: per-row mean and reciprocal standard
//! deviation, elementwise normalization with an optional learned affine
//! transform, and the full training-time gradient set (input gradient plus
//! gamma/beta parameter gradients).
//!
//! ## Why normr?
//!
//! - **Cooperative reduction kernels**: warp- and block-level butterfly sum
//!   reductions, reproduced deterministically on the CPU backend
//! - **Fused backward pass**: per-row gradient coefficients are derived
//!   algebraically so the input gradient needs a single elementwise sweep
//!   instead of a second reduction sweep
//! - **Dual-strategy parameter gradients**: a serial per-column scan for
//!   short batches and a tiled transpose reduction for tall ones
//! - **Deterministic**: results are bitwise identical regardless of thread
//!   count
//!
//! ## Quick Start
//!
//! ```rust
//! use normr::prelude::*;
//!
//! let device = CpuDevice::new();
//! let client = CpuRuntime::default_client(&device);
//!
//! // 2 rows of 4 features, no affine parameters.
//! let params = LayerNormParams::new(2, 4, 1e-5, false)?;
//! let mut state = LayerNormState::new(&params)?;
//!
//! let x = [1.0f32, 2.0, 3.0, 4.0, -1.0, 0.0, 1.0, 2.0];
//! let mut y = [0.0f32; 8];
//! client.layer_norm_forward(&params, &mut state, &x, None, None, &mut y)?;
//! # Ok::<(), normr::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded kernel launches

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod layer_norm;
pub mod ops;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::layer_norm::{LayerNormParams, LayerNormState};
    pub use crate::ops::LayerNormOps;
    pub use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
    pub use crate::runtime::{Device, Runtime, RuntimeClient};
}
