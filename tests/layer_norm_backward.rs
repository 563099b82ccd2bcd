//! Backward layer-normalization tests: analytic gradients against finite
//! differences and a naive reference

mod common;

use common::{
    assert_allclose_f64, create_cpu_client, rand_normal, rand_uniform, reference_backward, to_f32,
    to_f64,
};
use normr::prelude::*;

/// Scalar loss `L = sum(w * y)` so that `dL/dy = w`.
fn loss(y: &[f64], w: &[f64]) -> f64 {
    y.iter().zip(w).map(|(a, b)| a * b).sum()
}

fn forward_f64(
    client: &CpuClient,
    params: &LayerNormParams,
    state: &mut LayerNormState,
    x: &[f64],
    gamma: Option<&[f64]>,
    beta: Option<&[f64]>,
) -> Vec<f64> {
    let mut y = vec![0.0; x.len()];
    client
        .layer_norm_forward(params, state, x, gamma, beta, &mut y)
        .unwrap();
    y
}

#[test]
fn test_gradient_check_input() {
    let (client, _device) = create_cpu_client();
    let (m, n) = (4usize, 8usize);
    let eps = 1e-5;
    let params = LayerNormParams::new(m, n, eps, true).unwrap();
    let mut state = LayerNormState::new(&params).unwrap();

    let mut x = rand_normal(m * n, 31);
    let gamma = rand_uniform(n, 32);
    let beta = rand_uniform(n, 33);
    let w = rand_uniform(m * n, 34);

    forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta));
    let mut dx = vec![0.0f64; m * n];
    client
        .layer_norm_backward(
            &params, &mut state, &w, &x, Some(&gamma), &mut dx, None, None,
        )
        .unwrap();

    let h = 1e-6;
    let mut numeric = vec![0.0f64; m * n];
    for k in 0..m * n {
        let orig = x[k];
        x[k] = orig + h;
        let lp = loss(
            &forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta)),
            &w,
        );
        x[k] = orig - h;
        let lm = loss(
            &forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta)),
            &w,
        );
        x[k] = orig;
        numeric[k] = (lp - lm) / (2.0 * h);
    }

    assert_allclose_f64(&dx, &numeric, 1e-3, 1e-6, "dx vs finite differences");
}

#[test]
fn test_gradient_check_gamma_beta() {
    let (client, _device) = create_cpu_client();
    let (m, n) = (4usize, 8usize);
    let eps = 1e-5;
    let params = LayerNormParams::new(m, n, eps, true).unwrap();
    let mut state = LayerNormState::new(&params).unwrap();

    let x = rand_normal(m * n, 41);
    let mut gamma = rand_uniform(n, 42);
    let mut beta = rand_uniform(n, 43);
    let w = rand_uniform(m * n, 44);

    forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta));
    let mut dx = vec![0.0f64; m * n];
    let mut dgamma = vec![0.0f64; n];
    let mut dbeta = vec![0.0f64; n];
    client
        .layer_norm_backward(
            &params,
            &mut state,
            &w,
            &x,
            Some(&gamma),
            &mut dx,
            Some(&mut dgamma),
            Some(&mut dbeta),
        )
        .unwrap();

    let h = 1e-6;
    let mut numeric_dg = vec![0.0f64; n];
    let mut numeric_db = vec![0.0f64; n];
    for k in 0..n {
        let orig = gamma[k];
        gamma[k] = orig + h;
        let lp = loss(
            &forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta)),
            &w,
        );
        gamma[k] = orig - h;
        let lm = loss(
            &forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta)),
            &w,
        );
        gamma[k] = orig;
        numeric_dg[k] = (lp - lm) / (2.0 * h);

        let orig = beta[k];
        beta[k] = orig + h;
        let lp = loss(
            &forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta)),
            &w,
        );
        beta[k] = orig - h;
        let lm = loss(
            &forward_f64(&client, &params, &mut state, &x, Some(&gamma), Some(&beta)),
            &w,
        );
        beta[k] = orig;
        numeric_db[k] = (lp - lm) / (2.0 * h);
    }

    assert_allclose_f64(&dgamma, &numeric_dg, 1e-3, 1e-6, "dgamma vs finite differences");
    assert_allclose_f64(&dbeta, &numeric_db, 1e-3, 1e-6, "dbeta vs finite differences");
}

#[test]
fn test_backward_matches_reference_f32() {
    let (client, _device) = create_cpu_client();
    let (m, n) = (12usize, 33usize);
    let eps = 1e-5;
    let params = LayerNormParams::new(m, n, eps, true).unwrap();
    let mut state = LayerNormState::new(&params).unwrap();

    let x64 = rand_normal(m * n, 51);
    let dy64 = rand_normal(m * n, 52);
    let gamma64 = rand_uniform(n, 53);

    let x = to_f32(&x64);
    let dy = to_f32(&dy64);
    let gamma = to_f32(&gamma64);
    let mut y = vec![0.0f32; m * n];
    client
        .layer_norm_forward(&params, &mut state, &x, Some(&gamma), None, &mut y)
        .unwrap();

    let mut dx = vec![0.0f32; m * n];
    let mut dgamma = vec![0.0f32; n];
    let mut dbeta = vec![0.0f32; n];
    client
        .layer_norm_backward(
            &params,
            &mut state,
            &dy,
            &x,
            Some(&gamma),
            &mut dx,
            Some(&mut dgamma),
            Some(&mut dbeta),
        )
        .unwrap();

    // Reference over the f32-rounded inputs and the engine's statistics.
    let (dx_ref, dgamma_ref, dbeta_ref) = reference_backward(
        &to_f64(&dy),
        &to_f64(&x),
        Some(&to_f64(&gamma)),
        state.mean(),
        state.rstd(),
        m,
        n,
    );

    assert_allclose_f64(&to_f64(&dx), &dx_ref, 1e-4, 1e-5, "dx");
    assert_allclose_f64(&to_f64(&dgamma), &dgamma_ref, 1e-4, 1e-4, "dgamma");
    assert_allclose_f64(&to_f64(&dbeta), &dbeta_ref, 1e-4, 1e-4, "dbeta");
}

#[test]
fn test_backward_without_affine() {
    let (client, _device) = create_cpu_client();
    let (m, n) = (6usize, 17usize);
    let eps = 1e-5;
    let params = LayerNormParams::new(m, n, eps, false).unwrap();
    let mut state = LayerNormState::new(&params).unwrap();

    let x = rand_normal(m * n, 61);
    let dy = rand_normal(m * n, 62);
    forward_f64(&client, &params, &mut state, &x, None, None);

    let mut dx = vec![0.0f64; m * n];
    client
        .layer_norm_backward(&params, &mut state, &dy, &x, None, &mut dx, None, None)
        .unwrap();

    let (dx_ref, _, _) =
        reference_backward(&dy, &x, None, state.mean(), state.rstd(), m, n);
    assert_allclose_f64(&dx, &dx_ref, 1e-9, 1e-10, "dx without affine");
}

#[test]
fn test_null_suppression() {
    let (client, _device) = create_cpu_client();
    let (m, n) = (5usize, 9usize);
    let params = LayerNormParams::new(m, n, 1e-5, true).unwrap();
    let mut state = LayerNormState::new(&params).unwrap();

    let x = rand_normal(m * n, 71);
    let dy = rand_normal(m * n, 72);
    let gamma = rand_uniform(n, 73);
    forward_f64(&client, &params, &mut state, &x, Some(&gamma), None);

    // Only dbeta requested: must succeed and match the full run.
    let mut dx = vec![0.0f64; m * n];
    let mut dbeta = vec![0.0f64; n];
    client
        .layer_norm_backward(
            &params,
            &mut state,
            &dy,
            &x,
            Some(&gamma),
            &mut dx,
            None,
            Some(&mut dbeta),
        )
        .unwrap();

    let (dx_ref, _, dbeta_ref) =
        reference_backward(&dy, &x, Some(&gamma), state.mean(), state.rstd(), m, n);
    assert_allclose_f64(&dbeta, &dbeta_ref, 1e-9, 1e-10, "dbeta only");
    assert_allclose_f64(&dx, &dx_ref, 1e-9, 1e-10, "dx with dgamma suppressed");

    // Both parameter gradients suppressed: input gradient still computed.
    let mut dx2 = vec![0.0f64; m * n];
    client
        .layer_norm_backward(
            &params, &mut state, &dy, &x, Some(&gamma), &mut dx2, None, None,
        )
        .unwrap();
    assert_eq!(dx, dx2);
}

#[test]
fn test_backward_before_forward_errors() {
    let (client, _device) = create_cpu_client();
    let params = LayerNormParams::new(2, 4, 1e-5, false).unwrap();
    let mut state = LayerNormState::new(&params).unwrap();

    let dy = vec![0.0f32; 8];
    let x = vec![0.0f32; 8];
    let mut dx = vec![0.0f32; 8];
    let err = client
        .layer_norm_backward(&params, &mut state, &dy, &x, None, &mut dx, None, None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "state", .. }), "{err}");
}

#[test]
fn test_backward_rejects_mismatched_buffers() {
    let (client, _device) = create_cpu_client();
    let (m, n) = (3usize, 4usize);
    let params = LayerNormParams::new(m, n, 1e-5, true).unwrap();
    let mut state = LayerNormState::new(&params).unwrap();

    let x = vec![0.0f32; m * n];
    let mut y = vec![0.0f32; m * n];
    client
        .layer_norm_forward(&params, &mut state, &x, None, None, &mut y)
        .unwrap();

    let dy = vec![0.0f32; m * n];
    let mut dx = vec![0.0f32; m * n];
    let mut dgamma_short = vec![0.0f32; n - 1];
    let err = client
        .layer_norm_backward(
            &params,
            &mut state,
            &dy,
            &x,
            None,
            &mut dx,
            Some(&mut dgamma_short),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { arg: "dgamma", .. }), "{err}");
}
