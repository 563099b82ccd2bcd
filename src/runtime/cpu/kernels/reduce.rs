//! Warp- and block-level sum reduction primitives
//!
//! These are the two reduction tiers every row-oriented kernel in this
//! module is built on:
//!
//! - [`warp_reduce_sum`] reduces the lanes of one warp with a butterfly
//!   (pairwise, offset-halving) combination tree. No scratch needed.
//! - [`block_reduce_sum`] reduces a full block: each warp reduces itself,
//!   parks its partial in the shared scratch array, and a final warp-level
//!   pass reduces the partials.
//!
//! The reduction runs over lane-value arrays rather than hardware shuffle
//! registers, but the combination order is identical, so a sum produced
//! here is bit-for-bit the sum a shuffle-based device reduction produces.

use crate::dtype::Element;

/// Number of lanes in one warp
pub(crate) const WARP_SIZE: usize = 32;

/// Number of lanes in one block
pub(crate) const BLOCK_DIM: usize = 256;

/// Number of warps in one block
pub(crate) const BLOCK_WARPS: usize = BLOCK_DIM / WARP_SIZE;

/// Butterfly sum reduction across the lanes of one warp.
///
/// `lanes.len()` must be a power of two and at most [`WARP_SIZE`]
/// (debug-asserted; anything else is outside the primitive's contract).
/// After the reduction only lane 0 holds the full sum - higher lanes hold
/// the partial sums a shuffle-down reduction leaves behind.
#[inline]
pub(crate) fn warp_reduce_sum<T: Element>(lanes: &mut [T]) -> T {
    debug_assert!(lanes.len().is_power_of_two());
    debug_assert!(lanes.len() <= WARP_SIZE);

    let mut offset = lanes.len() / 2;
    while offset > 0 {
        for lane in 0..offset {
            lanes[lane] = lanes[lane] + lanes[lane + offset];
        }
        offset /= 2;
    }
    lanes[0]
}

/// Block-wide sum reduction over `lanes`, one warp at a time.
///
/// `shared` is the per-block scratch holding one partial sum per warp; its
/// length must equal `lanes.len() / WARP_SIZE`, which must itself be a
/// power of two no larger than a warp. The result lands in block lane 0
/// and is returned.
#[inline]
pub(crate) fn block_reduce_sum<T: Element>(lanes: &mut [T], shared: &mut [T]) -> T {
    debug_assert_eq!(lanes.len() % WARP_SIZE, 0);
    debug_assert_eq!(shared.len(), lanes.len() / WARP_SIZE);

    for (warp, chunk) in lanes.chunks_mut(WARP_SIZE).enumerate() {
        shared[warp] = warp_reduce_sum(chunk);
    }
    // Lanes of warp 0 pick up the per-warp partials after the barrier and
    // run one more warp-level pass.
    warp_reduce_sum(shared)
}
