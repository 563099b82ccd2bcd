//! CPU client implementation

use super::device::CpuDevice;
use super::runtime::CpuRuntime;
use crate::runtime::RuntimeClient;
use std::fmt;
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// Minimum number of blocks a rayon worker takes per steal.
///
/// Row blocks are coarse work units already, so the default grain is one
/// block; `rayon_min_len` exists so a client can be tuned for workloads
/// with very cheap rows.
#[cfg(feature = "rayon")]
const DEFAULT_RAYON_MIN_LEN: usize = 1;

/// CPU client for kernel dispatch
///
/// One client represents one execution stream: launches run to completion
/// in submission order. By default launches fan out over the global rayon
/// pool; `with_num_threads` builds a client with a dedicated pool.
#[derive(Clone)]
pub struct CpuClient {
    pub(crate) device: CpuDevice,
    #[cfg(feature = "rayon")]
    rayon_min_len: usize,
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl CpuClient {
    /// Create a new CPU client using the global thread pool
    pub fn new(device: CpuDevice) -> Self {
        Self {
            device,
            #[cfg(feature = "rayon")]
            rayon_min_len: DEFAULT_RAYON_MIN_LEN,
            #[cfg(feature = "rayon")]
            pool: None,
        }
    }

    /// Create a client with a dedicated thread pool of `num_threads` workers
    ///
    /// Panics if the pool cannot be built (e.g. `num_threads == 0` on a
    /// platform where rayon rejects it).
    #[cfg(feature = "rayon")]
    pub fn with_num_threads(device: CpuDevice, num_threads: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .expect("failed to build rayon thread pool");
        Self {
            device,
            rayon_min_len: DEFAULT_RAYON_MIN_LEN,
            pool: Some(Arc::new(pool)),
        }
    }

    /// Minimum per-worker chunk length for parallel launches
    #[cfg(feature = "rayon")]
    pub(crate) fn rayon_min_len(&self) -> usize {
        self.rayon_min_len
    }

    /// Run `f` with this client's parallelism installed
    ///
    /// Parallel iterators inside `f` execute on the client's dedicated pool
    /// if it has one, otherwise on the global pool.
    #[cfg(feature = "rayon")]
    pub(crate) fn install_parallelism<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl fmt::Debug for CpuClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CpuClient");
        s.field("device", &self.device);
        #[cfg(feature = "rayon")]
        s.field(
            "pool_threads",
            &self.pool.as_ref().map(|p| p.current_num_threads()),
        );
        s.finish()
    }
}

impl RuntimeClient<CpuRuntime> for CpuClient {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn synchronize(&self) {
        // CPU launches complete before the call returns, nothing to do
    }
}
