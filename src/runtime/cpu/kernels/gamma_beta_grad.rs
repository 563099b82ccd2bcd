//! Parameter-gradient kernels: per-column reduction of dgamma/dbeta
//!
//! The goal is a column-wise reduction across all rows:
//!
//! ```text
//! dgamma[j] = sum_i dY[i,j] * (X[i,j] - mean[i]) * rstd[i]
//! dbeta[j]  = sum_i dY[i,j]
//! ```
//!
//! Two strategies with identical numerics, selected by row count:
//!
//! - **Simple** (`m < GAMMA_BETA_SIMPLE_MAX_ROWS`): one logical thread per
//!   column scans every row serially. No synchronization, cheap for short
//!   batches.
//! - **Tiled** (`m >= GAMMA_BETA_SIMPLE_MAX_ROWS`): each block owns a
//!   32-column tile. A 32x16 thread tile accumulates two row bands per
//!   iteration into a 32x32 shared tile, the tile is read back transposed,
//!   and a warp reduction across the transposed axis produces one column
//!   total per lane group. Amortizes the row reduction across the tile
//!   when the serial scan would dominate.
//!
//! Either output may be suppressed independently (null pointer); the
//! presence match happens once per thread, outside the row loop.

use super::reduce::{WARP_SIZE, warp_reduce_sum};
use crate::dtype::Element;

/// Row-count threshold below which the simple strategy is used.
///
/// A tuning heuristic, not a correctness boundary - both strategies
/// produce equivalent results for any m.
pub(crate) const GAMMA_BETA_SIMPLE_MAX_ROWS: usize = 512;

/// Column-tile width of the tiled strategy (one warp of columns)
pub(crate) const GAMMA_BETA_TILE: usize = WARP_SIZE;

const TILE: usize = GAMMA_BETA_TILE;
const TILE_HALF: usize = TILE / 2;

/// Simple strategy: serial row scan for one column.
///
/// # Safety
/// - `dy` and `x` must be valid for `m * n` elements, `j < n`
/// - `mean` and `rstd` must be valid for `m` elements
/// - `dgamma`/`dbeta`, when non-null, must be valid for `n` elements
/// - at least one of `dgamma`, `dbeta` must be non-null
#[inline]
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(clippy::too_many_arguments)]
pub unsafe fn gamma_beta_grad_simple_kernel<T: Element>(
    dy: *const T,
    x: *const T,
    mean: *const f64,
    rstd: *const f64,
    m: usize,
    n: usize,
    j: usize,
    dgamma: *mut T,
    dbeta: *mut T,
) {
    debug_assert!(!dgamma.is_null() || !dbeta.is_null());
    let mean = std::slice::from_raw_parts(mean, m);
    let rstd = std::slice::from_raw_parts(rstd, m);

    match (dgamma.is_null(), dbeta.is_null()) {
        (false, false) => {
            let mut sum1 = 0.0f64;
            let mut sum2 = 0.0f64;
            for i in 0..m {
                let dyv = (*dy.add(i * n + j)).to_f64();
                let xv = (*x.add(i * n + j)).to_f64();
                sum1 += dyv * (xv - mean[i]) * rstd[i];
                sum2 += dyv;
            }
            *dgamma.add(j) = T::from_f64(sum1);
            *dbeta.add(j) = T::from_f64(sum2);
        }
        (false, true) => {
            let mut sum1 = 0.0f64;
            for i in 0..m {
                let dyv = (*dy.add(i * n + j)).to_f64();
                let xv = (*x.add(i * n + j)).to_f64();
                sum1 += dyv * (xv - mean[i]) * rstd[i];
            }
            *dgamma.add(j) = T::from_f64(sum1);
        }
        (true, false) => {
            let mut sum2 = 0.0f64;
            for i in 0..m {
                sum2 += (*dy.add(i * n + j)).to_f64();
            }
            *dbeta.add(j) = T::from_f64(sum2);
        }
        (true, true) => {}
    }
}

/// Tiled strategy: one 32-column tile block.
///
/// `tile` indexes the column tile; the block covers columns
/// `tile * 32 .. tile * 32 + 32` (clipped to `n`). Threads are arranged
/// 32x16; each accumulates the row bands `i` and `i + 16` with row stride
/// 32, parks partials in the shared 32x32 tiles, and the transposed warp
/// reduction writes columns `j` and `j + 16` of the tile.
///
/// # Safety
/// Same contract as [`gamma_beta_grad_simple_kernel`], with
/// `tile * 32 < n + 32`.
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(clippy::too_many_arguments)]
#[allow(clippy::needless_range_loop)]
pub unsafe fn gamma_beta_grad_tile_kernel<T: Element>(
    dy: *const T,
    x: *const T,
    mean: *const f64,
    rstd: *const f64,
    m: usize,
    n: usize,
    tile: usize,
    dgamma: *mut T,
    dbeta: *mut T,
) {
    debug_assert!(!dgamma.is_null() || !dbeta.is_null());
    let mean = std::slice::from_raw_parts(mean, m);
    let rstd = std::slice::from_raw_parts(rstd, m);
    let col0 = tile * TILE;

    let mut g_shared = [[0.0f64; TILE]; TILE];
    let mut b_shared = [[0.0f64; TILE]; TILE];
    let need_dg = !dgamma.is_null();
    let need_db = !dbeta.is_null();

    // Accumulation phase: thread (tx, ty) owns column col0 + tx and the
    // row bands ty and ty + 16 (stride 32). Partial sums land in the
    // shared tile with the band offset in the row coordinate.
    for ty in 0..TILE_HALF {
        for tx in 0..TILE {
            let j = col0 + tx;
            let mut dg1 = 0.0f64;
            let mut dg2 = 0.0f64;
            let mut db1 = 0.0f64;
            let mut db2 = 0.0f64;
            if j < n {
                match (need_dg, need_db) {
                    (true, true) => {
                        let mut i = ty;
                        while i < m {
                            let i2 = i + TILE_HALF;
                            let dyv = (*dy.add(i * n + j)).to_f64();
                            let xv = (*x.add(i * n + j)).to_f64();
                            dg1 += dyv * (xv - mean[i]) * rstd[i];
                            db1 += dyv;
                            if i2 < m {
                                let dyv = (*dy.add(i2 * n + j)).to_f64();
                                let xv = (*x.add(i2 * n + j)).to_f64();
                                dg2 += dyv * (xv - mean[i2]) * rstd[i2];
                                db2 += dyv;
                            }
                            i += TILE;
                        }
                    }
                    (true, false) => {
                        let mut i = ty;
                        while i < m {
                            let i2 = i + TILE_HALF;
                            let dyv = (*dy.add(i * n + j)).to_f64();
                            let xv = (*x.add(i * n + j)).to_f64();
                            dg1 += dyv * (xv - mean[i]) * rstd[i];
                            if i2 < m {
                                let dyv = (*dy.add(i2 * n + j)).to_f64();
                                let xv = (*x.add(i2 * n + j)).to_f64();
                                dg2 += dyv * (xv - mean[i2]) * rstd[i2];
                            }
                            i += TILE;
                        }
                    }
                    (false, true) => {
                        let mut i = ty;
                        while i < m {
                            let i2 = i + TILE_HALF;
                            db1 += (*dy.add(i * n + j)).to_f64();
                            if i2 < m {
                                db2 += (*dy.add(i2 * n + j)).to_f64();
                            }
                            i += TILE;
                        }
                    }
                    (false, false) => {}
                }
            }
            g_shared[ty][tx] = dg1;
            g_shared[ty + TILE_HALF][tx] = dg2;
            b_shared[ty][tx] = db1;
            b_shared[ty + TILE_HALF][tx] = db2;
        }
    }

    // Reduction phase, after the tile barrier: lanes read the shared tile
    // with swapped coordinates, so one warp pass sums a full column. The
    // two passes cover the upper and lower halves of the tile's columns.
    let mut lanes = [0.0f64; TILE];
    for ty in 0..TILE_HALF {
        for half in 0..2 {
            let c = ty + half * TILE_HALF;
            let j = col0 + c;
            if j >= n {
                continue;
            }
            if need_dg {
                for tx in 0..TILE {
                    lanes[tx] = g_shared[tx][c];
                }
                *dgamma.add(j) = T::from_f64(warp_reduce_sum(&mut lanes));
            }
            if need_db {
                for tx in 0..TILE {
                    lanes[tx] = b_shared[tx][c];
                }
                *dbeta.add(j) = T::from_f64(warp_reduce_sum(&mut lanes));
            }
        }
    }
}
