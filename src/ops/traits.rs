//! Layer-normalization operation trait

use crate::dtype::Element;
use crate::error::Result;
use crate::layer_norm::{LayerNormParams, LayerNormState};
use crate::runtime::Runtime;

/// Forward and backward layer normalization
///
/// Both operations treat the activation buffers as row-major `m x n`
/// matrices as configured by the params. The state carries the per-row
/// statistics from forward to backward; passing it by `&mut` serializes
/// overlapping calls against one instance at compile time.
pub trait LayerNormOps<R: Runtime> {
    /// Forward pass: `y = (x - mean) * rstd * gamma + beta` per row.
    ///
    /// Writes the per-row `mean` and `rstd` into the state for the
    /// matching backward call. `gamma`/`beta` of `None` mean identity
    /// scale and zero shift.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if any buffer length disagrees with the params,
    /// `InvalidArgument` if affine parameters are passed to a
    /// non-affine instance.
    fn layer_norm_forward<T: Element>(
        &self,
        params: &LayerNormParams,
        state: &mut LayerNormState,
        x: &[T],
        gamma: Option<&[T]>,
        beta: Option<&[T]>,
        y: &mut [T],
    ) -> Result<()>;

    /// Backward pass: input gradient plus optional parameter gradients.
    ///
    /// Requires a prior forward call against the same state (the row
    /// statistics are reused; the ds/db aggregates are recomputed from
    /// scratch). A `None` output gradient slot suppresses that
    /// computation entirely - the would-be buffer is never touched.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` on any length disagreement, `InvalidArgument` if
    /// called before forward or if parameter gradients are requested on a
    /// non-affine instance.
    #[allow(clippy::too_many_arguments)]
    fn layer_norm_backward<T: Element>(
        &self,
        params: &LayerNormParams,
        state: &mut LayerNormState,
        dy: &[T],
        x: &[T],
        gamma: Option<&[T]>,
        dx: &mut [T],
        dgamma: Option<&mut [T]>,
        dbeta: Option<&mut [T]>,
    ) -> Result<()>;
}
