//! Common test utilities
#![allow(dead_code)]

use normr::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

/// Create a CPU client and device for testing
pub fn create_cpu_client() -> (CpuClient, CpuDevice) {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device);
    (client, device)
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Uniform random values in [-1, 1)
pub fn rand_uniform(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Standard normal random values
pub fn rand_normal(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| StandardNormal.sample(&mut rng)).collect()
}

pub fn to_f32(v: &[f64]) -> Vec<f32> {
    v.iter().map(|&x| x as f32).collect()
}

pub fn to_f64(v: &[f32]) -> Vec<f64> {
    v.iter().map(|&x| x as f64).collect()
}

/// Naive two-pass reference forward in f64.
///
/// Deliberately arranged differently from the engine (two-pass variance,
/// no cooperative reduction) so it is an independent oracle.
pub fn reference_forward(
    x: &[f64],
    m: usize,
    n: usize,
    eps: f64,
    gamma: Option<&[f64]>,
    beta: Option<&[f64]>,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut y = vec![0.0; m * n];
    let mut mean = vec![0.0; m];
    let mut rstd = vec![0.0; m];
    for i in 0..m {
        let row = &x[i * n..(i + 1) * n];
        let mu = row.iter().sum::<f64>() / n as f64;
        let var = row.iter().map(|&v| (v - mu) * (v - mu)).sum::<f64>() / n as f64;
        let r = 1.0 / (var + eps).sqrt();
        mean[i] = mu;
        rstd[i] = r;
        for j in 0..n {
            let mut v = (row[j] - mu) * r;
            if let Some(g) = gamma {
                v *= g[j];
            }
            if let Some(b) = beta {
                v += b[j];
            }
            y[i * n + j] = v;
        }
    }
    (y, mean, rstd)
}

/// Naive reference backward in f64, from the textbook arrangement of the
/// layer-norm gradient (per-row projections of the normalized input),
/// not the engine's fused-coefficient form.
#[allow(clippy::too_many_arguments)]
pub fn reference_backward(
    dy: &[f64],
    x: &[f64],
    gamma: Option<&[f64]>,
    mean: &[f64],
    rstd: &[f64],
    m: usize,
    n: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut dx = vec![0.0; m * n];
    let mut dgamma = vec![0.0; n];
    let mut dbeta = vec![0.0; n];
    for i in 0..m {
        let mut sum_gdy = 0.0;
        let mut sum_gdy_xhat = 0.0;
        for j in 0..n {
            let xhat = (x[i * n + j] - mean[i]) * rstd[i];
            let gdy = dy[i * n + j] * gamma.map_or(1.0, |g| g[j]);
            sum_gdy += gdy;
            sum_gdy_xhat += gdy * xhat;
            dgamma[j] += dy[i * n + j] * xhat;
            dbeta[j] += dy[i * n + j];
        }
        for j in 0..n {
            let xhat = (x[i * n + j] - mean[i]) * rstd[i];
            let gdy = dy[i * n + j] * gamma.map_or(1.0, |g| g[j]);
            dx[i * n + j] =
                rstd[i] * (gdy - sum_gdy / n as f64 - xhat * sum_gdy_xhat / n as f64);
        }
    }
    (dx, dgamma, dbeta)
}
