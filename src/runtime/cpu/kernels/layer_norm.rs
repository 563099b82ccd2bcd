//! Forward layer-normalization kernels: row moments and normalization

use super::reduce::{BLOCK_DIM, BLOCK_WARPS, block_reduce_sum};
use crate::dtype::Element;

/// Compute mean and reciprocal standard deviation for one row.
///
/// One block per row: each lane strides the row accumulating a running sum
/// and sum of squares, both are block-reduced, and lane 0 derives
/// `mean = sum1/n`, `var = max(sum2/n - mean^2, 0)` and
/// `rstd = 1/sqrt(var + eps)`. The negative-variance clamp absorbs
/// floating-point cancellation in the one-pass formula.
///
/// # Safety
/// - `x` must be valid for `(row + 1) * n` elements
/// - `mean` and `rstd` must be valid for `row + 1` elements
#[inline]
#[allow(unsafe_op_in_unsafe_fn)]
pub unsafe fn row_moments_kernel<T: Element>(
    x: *const T,
    row: usize,
    n: usize,
    eps: f64,
    mean: *mut f64,
    rstd: *mut f64,
) {
    let src = std::slice::from_raw_parts(x.add(row * n), n);

    let mut sum1 = [0.0f64; BLOCK_DIM];
    let mut sum2 = [0.0f64; BLOCK_DIM];
    for (j, &v) in src.iter().enumerate() {
        let v = v.to_f64();
        let lane = j % BLOCK_DIM;
        sum1[lane] += v;
        sum2[lane] += v * v;
    }

    let mut shared = [0.0f64; BLOCK_WARPS];
    let s1 = block_reduce_sum(&mut sum1, &mut shared);
    let mut shared = [0.0f64; BLOCK_WARPS];
    let s2 = block_reduce_sum(&mut sum2, &mut shared);

    let m = s1 / n as f64;
    let var = (s2 / n as f64 - m * m).max(0.0);
    *mean.add(row) = m;
    *rstd.add(row) = 1.0 / (var + eps).sqrt();
}

/// Normalize one row: `y = (x - mean) * rstd * gamma + beta`.
///
/// Pure elementwise map; absent gamma/beta mean identity scale and zero
/// shift. The presence check is one match per row, never per element.
///
/// # Safety
/// - `x` and `y` must be valid for `(row + 1) * n` elements
/// - `gamma` and `beta`, when non-null, must be valid for `n` elements
/// - `mean` and `rstd` must be valid for `row + 1` elements
#[inline]
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(clippy::too_many_arguments)]
pub unsafe fn row_normalize_kernel<T: Element>(
    x: *const T,
    row: usize,
    n: usize,
    mean: *const f64,
    rstd: *const f64,
    gamma: *const T,
    beta: *const T,
    y: *mut T,
) {
    let src = std::slice::from_raw_parts(x.add(row * n), n);
    let dst = std::slice::from_raw_parts_mut(y.add(row * n), n);
    let m = *mean.add(row);
    let r = *rstd.add(row);

    match (gamma.is_null(), beta.is_null()) {
        (false, false) => {
            let g = std::slice::from_raw_parts(gamma, n);
            let b = std::slice::from_raw_parts(beta, n);
            for j in 0..n {
                let v = (src[j].to_f64() - m) * r;
                dst[j] = T::from_f64(v * g[j].to_f64() + b[j].to_f64());
            }
        }
        (false, true) => {
            let g = std::slice::from_raw_parts(gamma, n);
            for j in 0..n {
                let v = (src[j].to_f64() - m) * r;
                dst[j] = T::from_f64(v * g[j].to_f64());
            }
        }
        (true, false) => {
            let b = std::slice::from_raw_parts(beta, n);
            for j in 0..n {
                let v = (src[j].to_f64() - m) * r;
                dst[j] = T::from_f64(v + b[j].to_f64());
            }
        }
        (true, true) => {
            for j in 0..n {
                dst[j] = T::from_f64((src[j].to_f64() - m) * r);
            }
        }
    }
}
