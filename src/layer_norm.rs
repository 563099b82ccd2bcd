//! Layer-normalization configuration and per-instance state
//!
//! [`LayerNormParams`] fixes the problem shape for the lifetime of the
//! value: `m` rows (the effective batch size - product of every
//! non-normalized dimension), `n` columns (the effective element count -
//! product of the normalized dimensions), the variance floor `eps`, and
//! whether a learned affine transform is applied.
//!
//! [`LayerNormState`] owns the per-row scratch the kernels write: the
//! forward statistics (mean, rstd) and the backward aggregates (ds, db)
//! and fused coefficients (scale, bias). One state instance belongs to one
//! in-flight forward/backward pair; exclusive ownership is enforced by the
//! `&mut` it is passed by.

use crate::error::{Error, Result};

/// Fixed configuration of one layer-normalization instance
#[derive(Clone, Debug, PartialEq)]
pub struct LayerNormParams {
    m: usize,
    n: usize,
    eps: f64,
    elementwise_affine: bool,
}

impl LayerNormParams {
    /// Create params for `m` rows of `n` elements.
    ///
    /// Rejects `m == 0`, `n == 0` and a non-finite or non-positive `eps`
    /// before any kernel can be launched with them.
    pub fn new(m: usize, n: usize, eps: f64, elementwise_affine: bool) -> Result<Self> {
        if m == 0 {
            return Err(Error::invalid_argument("m", "effective batch size must be positive"));
        }
        if n == 0 {
            return Err(Error::invalid_argument(
                "n",
                "effective number of elements must be positive",
            ));
        }
        if eps <= 0.0 || !eps.is_finite() {
            return Err(Error::invalid_argument(
                "eps",
                format!("variance floor must be finite and positive, got {eps}"),
            ));
        }
        Ok(Self {
            m,
            n,
            eps,
            elementwise_affine,
        })
    }

    /// Derive params from a tensor shape.
    ///
    /// The trailing `num_norm_dims` dimensions are normalized over
    /// (their product is `n`); everything in front of them is batch
    /// (product is `m`, empty product = 1).
    pub fn from_shape(
        shape: &[usize],
        num_norm_dims: usize,
        eps: f64,
        elementwise_affine: bool,
    ) -> Result<Self> {
        if num_norm_dims == 0 || num_norm_dims > shape.len() {
            return Err(Error::invalid_argument(
                "num_norm_dims",
                format!(
                    "must be in 1..={} for a rank-{} shape, got {}",
                    shape.len(),
                    shape.len(),
                    num_norm_dims
                ),
            ));
        }
        if shape.contains(&0) {
            return Err(Error::invalid_argument("shape", "dimensions must be positive"));
        }
        let split = shape.len() - num_norm_dims;
        let m = shape[..split].iter().product::<usize>().max(1);
        let n = shape[split..].iter().product();
        Self::new(m, n, eps, elementwise_affine)
    }

    /// Effective batch size (number of rows)
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    /// Effective number of elements per row
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Variance floor added before the reciprocal square root
    #[inline]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Whether the learned affine transform (gamma/beta) is applied
    #[inline]
    pub fn elementwise_affine(&self) -> bool {
        self.elementwise_affine
    }
}

/// Per-instance scratch of one layer-normalization instance
///
/// All buffers are in the f64 accumulator type the reductions run in.
/// Forward overwrites `mean`/`rstd`; backward recomputes `ds`/`db`/
/// `scale`/`bias` from scratch on every call.
#[derive(Clone, Debug)]
pub struct LayerNormState {
    pub(crate) m: usize,
    pub(crate) mean: Vec<f64>,
    pub(crate) rstd: Vec<f64>,
    pub(crate) ds: Vec<f64>,
    pub(crate) db: Vec<f64>,
    pub(crate) scale: Vec<f64>,
    pub(crate) bias: Vec<f64>,
    pub(crate) has_moments: bool,
}

impl LayerNormState {
    /// Allocate scratch for `params.m()` rows.
    ///
    /// Allocation failure is surfaced as [`Error::AllocationFailure`] with
    /// no partial state retained.
    pub fn new(params: &LayerNormParams) -> Result<Self> {
        let m = params.m();
        Ok(Self {
            m,
            mean: alloc_scratch(m)?,
            rstd: alloc_scratch(m)?,
            ds: alloc_scratch(m)?,
            db: alloc_scratch(m)?,
            scale: alloc_scratch(m)?,
            bias: alloc_scratch(m)?,
            has_moments: false,
        })
    }

    /// Per-row means written by the last forward call
    #[inline]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-row reciprocal standard deviations written by the last forward
    /// call
    #[inline]
    pub fn rstd(&self) -> &[f64] {
        &self.rstd
    }

    /// Whether a forward call has populated the row statistics
    #[inline]
    pub fn has_moments(&self) -> bool {
        self.has_moments
    }
}

fn alloc_scratch(m: usize) -> Result<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(m).map_err(|_| Error::AllocationFailure {
        size: m * std::mem::size_of::<f64>(),
    })?;
    buf.resize(m, 0.0);
    Ok(buf)
}
