//! Runtime backends for kernel execution
//!
//! This module defines the `Runtime` trait and provides the CPU
//! implementation.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies a specific compute unit)
//! └── Client (dispatches kernel launches, owns the execution stream)
//! ```
//!
//! A client represents one execution stream: launches submitted through a
//! client retire in submission order, and `synchronize` blocks until every
//! pending launch has completed. The kernels rely on this ordering (moments
//! before normalize, internal gradients before fused coefficients) instead
//! of any cross-phase barrier. On the CPU backend every launch completes
//! before the call returns, so both guarantees hold trivially.

pub mod cpu;

/// Core trait for compute backends
///
/// `Runtime` abstracts over compute devices using static dispatch via
/// generics for zero-cost abstraction.
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Client for dispatching kernel launches
    type Client: RuntimeClient<Self>;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Get the default client for a device
    fn default_client(device: &Self::Device) -> Self::Client;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }
}

/// Trait for runtime clients that handle kernel dispatch
pub trait RuntimeClient<R: Runtime>: Clone + Send + Sync {
    /// Get the device this client operates on
    fn device(&self) -> &R::Device;

    /// Synchronize: wait for all pending launches to complete
    fn synchronize(&self);
}
