//! Layer-normalization operations
//!
//! Operations are defined as traits implemented by a backend's
//! `RuntimeClient`, giving each backend control over validation, launch
//! configuration and parallelism while sharing one contract.
//!
//! ```text
//! RuntimeClient<R>
//!   └── implements LayerNormOps<R>
//!         ├── layer_norm_forward   (moments -> normalize)
//!         └── layer_norm_backward  (internal grads -> fused coeffs
//!                                   -> input grad -> gamma/beta grads)
//! ```
//!
//! Every operation validates buffer lengths against the params before any
//! kernel launch and returns `Err` without touching the outputs on a
//! precondition violation.

mod cpu;
mod traits;

pub use traits::LayerNormOps;
