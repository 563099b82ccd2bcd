//! Layer-normalization CPU kernels
//!
//! The kernels reproduce the cooperative execution model the algorithms
//! were designed for: a block of `BLOCK_DIM` lanes per row, partitioned
//! into warps of `WARP_SIZE` lanes, with per-warp partial sums parked in a
//! shared scratch array between the two reduction tiers. Lane-private
//! accumulators are materialized as arrays indexed by lane, and every
//! reduction walks the same pairwise combination tree a hardware shuffle
//! reduction walks, so results match a device implementation combination
//! for combination.
//!
//! Kernels are `unsafe` typed pointer functions in the style of the rest
//! of this runtime: the caller validates shapes and guarantees pointer
//! validity, the kernel does the arithmetic.

mod gamma_beta_grad;
mod layer_norm;
mod layer_norm_grad;
pub(crate) mod reduce;

pub(crate) use gamma_beta_grad::{
    GAMMA_BETA_SIMPLE_MAX_ROWS, GAMMA_BETA_TILE, gamma_beta_grad_simple_kernel,
    gamma_beta_grad_tile_kernel,
};
pub(crate) use layer_norm::{row_moments_kernel, row_normalize_kernel};
pub(crate) use layer_norm_grad::{
    fused_coeffs_kernel, row_input_grad_kernel, row_internal_grad_kernel,
};
