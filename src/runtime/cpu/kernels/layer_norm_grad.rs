//! Backward layer-normalization kernels: internal gradients, fused
//! coefficients, input gradient
//!
//! The backward pass is fused: one reduction sweep per row produces the
//! aggregates `ds = sum(dY * X * gamma)` and `db = sum(dY * gamma)`, an
//! O(M) pass folds them with the forward statistics into two per-row
//! coefficients, and the input gradient then needs only a single
//! elementwise sweep `dX = rstd * dY * gamma + scale * X + bias` - no
//! second reduction over the row.

use super::reduce::{BLOCK_DIM, BLOCK_WARPS, block_reduce_sum};
use crate::dtype::Element;

/// Reduce one row of the output gradient into the `ds`/`db` aggregates.
///
/// One block per row, lane-strided accumulation, two block reductions.
/// Absent gamma contributes identity scale; the check is hoisted out of
/// the lane loop.
///
/// # Safety
/// - `dy` and `x` must be valid for `(row + 1) * n` elements
/// - `gamma`, when non-null, must be valid for `n` elements
/// - `ds` and `db` must be valid for `row + 1` elements
#[inline]
#[allow(unsafe_op_in_unsafe_fn)]
pub unsafe fn row_internal_grad_kernel<T: Element>(
    dy: *const T,
    x: *const T,
    gamma: *const T,
    row: usize,
    n: usize,
    ds: *mut f64,
    db: *mut f64,
) {
    let dy_row = std::slice::from_raw_parts(dy.add(row * n), n);
    let x_row = std::slice::from_raw_parts(x.add(row * n), n);

    let mut sum1 = [0.0f64; BLOCK_DIM];
    let mut sum2 = [0.0f64; BLOCK_DIM];
    if gamma.is_null() {
        for j in 0..n {
            let lane = j % BLOCK_DIM;
            let g = dy_row[j].to_f64();
            sum1[lane] += g * x_row[j].to_f64();
            sum2[lane] += g;
        }
    } else {
        let gamma = std::slice::from_raw_parts(gamma, n);
        for j in 0..n {
            let lane = j % BLOCK_DIM;
            let g = dy_row[j].to_f64() * gamma[j].to_f64();
            sum1[lane] += g * x_row[j].to_f64();
            sum2[lane] += g;
        }
    }

    let mut shared = [0.0f64; BLOCK_WARPS];
    *ds.add(row) = block_reduce_sum(&mut sum1, &mut shared);
    let mut shared = [0.0f64; BLOCK_WARPS];
    *db.add(row) = block_reduce_sum(&mut sum2, &mut shared);
}

/// Fold per-row aggregates into the two fused gradient coefficients.
///
/// One logical thread per row, O(M) total:
///
/// ```text
/// a     = (db * mean - ds) * rstd^3 / n
/// scale = a
/// bias  = -(a * mean + db * rstd / n)
/// ```
///
/// The remaining coefficient of the input-gradient formula is `rstd`
/// itself, re-read by the elementwise kernel instead of being stored.
///
/// # Safety
/// - `mean`, `rstd`, `ds`, `db`, `scale`, `bias` must be valid for `m`
///   elements
#[inline]
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(clippy::too_many_arguments)]
pub unsafe fn fused_coeffs_kernel(
    m: usize,
    n: usize,
    mean: *const f64,
    rstd: *const f64,
    ds: *const f64,
    db: *const f64,
    scale: *mut f64,
    bias: *mut f64,
) {
    let mean = std::slice::from_raw_parts(mean, m);
    let rstd = std::slice::from_raw_parts(rstd, m);
    let ds = std::slice::from_raw_parts(ds, m);
    let db = std::slice::from_raw_parts(db, m);
    let scale = std::slice::from_raw_parts_mut(scale, m);
    let bias = std::slice::from_raw_parts_mut(bias, m);

    let inv_n = 1.0 / n as f64;
    for i in 0..m {
        let r = rstd[i];
        let a = (db[i] * mean[i] - ds[i]) * r * r * r * inv_n;
        scale[i] = a;
        bias[i] = -(a * mean[i] + db[i] * r * inv_n);
    }
}

/// Compute the input gradient for one row:
/// `dX = rstd * dY * gamma + scale * X + bias`.
///
/// Pure elementwise map over the fused coefficients; gamma check hoisted.
///
/// # Safety
/// - `dy`, `x` and `dx` must be valid for `(row + 1) * n` elements
/// - `gamma`, when non-null, must be valid for `n` elements
/// - `rstd`, `scale` and `bias` must be valid for `row + 1` elements
#[inline]
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(clippy::too_many_arguments)]
pub unsafe fn row_input_grad_kernel<T: Element>(
    dy: *const T,
    x: *const T,
    gamma: *const T,
    row: usize,
    n: usize,
    rstd: *const f64,
    scale: *const f64,
    bias: *const f64,
    dx: *mut T,
) {
    let dy_row = std::slice::from_raw_parts(dy.add(row * n), n);
    let x_row = std::slice::from_raw_parts(x.add(row * n), n);
    let dx_row = std::slice::from_raw_parts_mut(dx.add(row * n), n);
    let r = *rstd.add(row);
    let a = *scale.add(row);
    let c = *bias.add(row);

    if gamma.is_null() {
        for j in 0..n {
            dx_row[j] = T::from_f64(r * dy_row[j].to_f64() + a * x_row[j].to_f64() + c);
        }
    } else {
        let gamma = std::slice::from_raw_parts(gamma, n);
        for j in 0..n {
            let g = dy_row[j].to_f64() * gamma[j].to_f64();
            dx_row[j] = T::from_f64(r * g + a * x_row[j].to_f64() + c);
        }
    }
}
