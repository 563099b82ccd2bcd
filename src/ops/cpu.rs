//! CPU implementation of layer-normalization operations

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::layer_norm::{LayerNormParams, LayerNormState};
use crate::ops::LayerNormOps;
use crate::runtime::cpu::{CpuClient, CpuRuntime, kernels};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

impl LayerNormOps<CpuRuntime> for CpuClient {
    fn layer_norm_forward<T: Element>(
        &self,
        params: &LayerNormParams,
        state: &mut LayerNormState,
        x: &[T],
        gamma: Option<&[T]>,
        beta: Option<&[T]>,
        y: &mut [T],
    ) -> Result<()> {
        let (m, n) = (params.m(), params.n());
        check_state(params, state)?;
        check_affine(params, gamma.is_some() || beta.is_some())?;
        check_len("x", m * n, x.len())?;
        check_len("y", m * n, y.len())?;
        if let Some(g) = gamma {
            check_len("gamma", n, g.len())?;
        }
        if let Some(b) = beta {
            check_len("beta", n, b.len())?;
        }

        let eps = params.eps();
        let x_addr = x.as_ptr() as usize;
        let y_addr = y.as_mut_ptr() as usize;
        let gamma_addr = gamma.map_or(0, |g| g.as_ptr() as usize);
        let beta_addr = beta.map_or(0, |b| b.as_ptr() as usize);
        let mean_addr = state.mean.as_mut_ptr() as usize;
        let rstd_addr = state.rstd.as_mut_ptr() as usize;

        // Phase 1: per-row moments. Phase 2 depends on the statistics
        // being complete, which submission order on this client provides.
        launch_blocks(self, m, move |row| unsafe {
            kernels::row_moments_kernel::<T>(
                x_addr as *const T,
                row,
                n,
                eps,
                mean_addr as *mut f64,
                rstd_addr as *mut f64,
            );
        });

        // Phase 2: elementwise normalization.
        launch_blocks(self, m, move |row| unsafe {
            kernels::row_normalize_kernel::<T>(
                x_addr as *const T,
                row,
                n,
                mean_addr as *const f64,
                rstd_addr as *const f64,
                gamma_addr as *const T,
                beta_addr as *const T,
                y_addr as *mut T,
            );
        });

        state.has_moments = true;
        Ok(())
    }

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
    ) -> Result<()> {
        let (m, n) = (params.m(), params.n());
        check_state(params, state)?;
        if !state.has_moments {
            return Err(Error::invalid_argument(
                "state",
                "backward requires a prior forward call against this state",
            ));
        }
        check_affine(
            params,
            gamma.is_some() || dgamma.is_some() || dbeta.is_some(),
        )?;
        check_len("dy", m * n, dy.len())?;
        check_len("x", m * n, x.len())?;
        check_len("dx", m * n, dx.len())?;
        if let Some(g) = gamma {
            check_len("gamma", n, g.len())?;
        }
        if let Some(g) = &dgamma {
            check_len("dgamma", n, g.len())?;
        }
        if let Some(b) = &dbeta {
            check_len("dbeta", n, b.len())?;
        }

        let dy_addr = dy.as_ptr() as usize;
        let x_addr = x.as_ptr() as usize;
        let gamma_addr = gamma.map_or(0, |g| g.as_ptr() as usize);
        let dx_addr = dx.as_mut_ptr() as usize;
        let mean_addr = state.mean.as_ptr() as usize;
        let rstd_addr = state.rstd.as_ptr() as usize;
        let ds_addr = state.ds.as_mut_ptr() as usize;
        let db_addr = state.db.as_mut_ptr() as usize;
        let scale_addr = state.scale.as_mut_ptr() as usize;
        let bias_addr = state.bias.as_mut_ptr() as usize;

        // Phase 1: per-row ds/db aggregates.
        launch_blocks(self, m, move |row| unsafe {
            kernels::row_internal_grad_kernel::<T>(
                dy_addr as *const T,
                x_addr as *const T,
                gamma_addr as *const T,
                row,
                n,
                ds_addr as *mut f64,
                db_addr as *mut f64,
            );
        });

        // Phase 2: fold into the fused coefficients. O(m) - one serial
        // launch is cheaper than fanning out.
        unsafe {
            kernels::fused_coeffs_kernel(
                m,
                n,
                mean_addr as *const f64,
                rstd_addr as *const f64,
                ds_addr as *const f64,
                db_addr as *const f64,
                scale_addr as *mut f64,
                bias_addr as *mut f64,
            );
        }

        // Phase 3: elementwise input gradient.
        launch_blocks(self, m, move |row| unsafe {
            kernels::row_input_grad_kernel::<T>(
                dy_addr as *const T,
                x_addr as *const T,
                gamma_addr as *const T,
                row,
                n,
                rstd_addr as *const f64,
                scale_addr as *const f64,
                bias_addr as *const f64,
                dx_addr as *mut T,
            );
        });

        // Phase 4: parameter gradients, unless both outputs are
        // suppressed. Strategy picked by row count; both paths are
        // numerically equivalent.
        let dgamma_addr = dgamma.map_or(0, |g| g.as_mut_ptr() as usize);
        let dbeta_addr = dbeta.map_or(0, |b| b.as_mut_ptr() as usize);
        if dgamma_addr == 0 && dbeta_addr == 0 {
            return Ok(());
        }

        if m < kernels::GAMMA_BETA_SIMPLE_MAX_ROWS {
            launch_blocks(self, n, move |j| unsafe {
                kernels::gamma_beta_grad_simple_kernel::<T>(
                    dy_addr as *const T,
                    x_addr as *const T,
                    mean_addr as *const f64,
                    rstd_addr as *const f64,
                    m,
                    n,
                    j,
                    dgamma_addr as *mut T,
                    dbeta_addr as *mut T,
                );
            });
        } else {
            let tiles = n.div_ceil(kernels::GAMMA_BETA_TILE);
            launch_blocks(self, tiles, move |tile| unsafe {
                kernels::gamma_beta_grad_tile_kernel::<T>(
                    dy_addr as *const T,
                    x_addr as *const T,
                    mean_addr as *const f64,
                    rstd_addr as *const f64,
                    m,
                    n,
                    tile,
                    dgamma_addr as *mut T,
                    dbeta_addr as *mut T,
                );
            });
        }

        Ok(())
    }
}

/// Fan `blocks` independent block indices out over the client's pool.
///
/// Blocks write disjoint output regions, so the distribution is free to
/// pick any assignment; per-block execution order is fixed, keeping
/// results bitwise deterministic.
fn launch_blocks<F>(client: &CpuClient, blocks: usize, f: F)
where
    F: Fn(usize) + Send + Sync,
{
    #[cfg(feature = "rayon")]
    {
        if blocks > 1 {
            let min_len = client.rayon_min_len();
            client.install_parallelism(|| {
                (0..blocks)
                    .into_par_iter()
                    .with_min_len(min_len)
                    .for_each(&f);
            });
            return;
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = client;

    for b in 0..blocks {
        f(b);
    }
}

fn check_len(arg: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::shape_mismatch(arg, expected, got));
    }
    Ok(())
}

fn check_state(params: &LayerNormParams, state: &LayerNormState) -> Result<()> {
    if state.m != params.m() {
        return Err(Error::shape_mismatch("state", params.m(), state.m));
    }
    Ok(())
}

fn check_affine(params: &LayerNormParams, affine_buffers_present: bool) -> Result<()> {
    if affine_buffers_present && !params.elementwise_affine() {
        return Err(Error::invalid_argument(
            "gamma",
            "affine buffers passed to a non-affine instance",
        ));
    }
    Ok(())
}
