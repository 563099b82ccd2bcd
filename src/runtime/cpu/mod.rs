//! CPU runtime implementation
//!
//! The CPU runtime executes every kernel launch synchronously on the host,
//! distributing independent blocks (rows, column tiles) over a rayon pool
//! when the `rayon` feature is enabled.
//!
//! # Determinism
//!
//! Each simulated block runs its lanes in a fixed phase order, so kernel
//! results are bitwise identical regardless of thread count - the thread
//! pool only decides which blocks run where, never the combination order
//! inside a reduction.

mod client;
mod device;
pub(crate) mod kernels;
mod runtime;

pub use client::CpuClient;
pub use device::CpuDevice;
pub use runtime::CpuRuntime;
