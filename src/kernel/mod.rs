//! Elementwise numeric kernels (§4.E) that optimizers compose: vanilla SGD,
//! Adam/AMSGrad's moment updates, and the summation helper duplicate-merge
//! reuses. All kernels operate on flat `f32` slices — the only dtype the
//! attached gradients are specified to carry.

use crate::errors::{PsError, PsResult};

fn check_len(grad: &[f32], target: &[f32]) -> PsResult<()> {
    if grad.len() != target.len() {
        return Err(PsError::SizeMismatch {
            grad_len: grad.len(),
            target_len: target.len(),
        });
    }
    Ok(())
}

/// `param -= lr * grad`, in place.
#[tracing::instrument(skip(grad, param), name = "kernel_sgd")]
pub fn sgd(grad: &[f32], param: &mut [f32], lr: f32) -> PsResult<()> {
    check_len(grad, param)?;
    apply_pairs(grad, param, |g, p| *p -= lr * g);
    Ok(())
}

/// Adam / AMSGrad (§4.F), one coordinate at a time:
///
/// ```text
/// m  = beta1*m + (1-beta1)*g
/// v  = beta2*v + (1-beta2)*g^2
/// mhat = m / (1 - beta1^step)
/// vhat = v / (1 - beta2^step)          (or max_square if amsgrad)
/// param -= lr * mhat / (sqrt(vhat) + eps)
/// ```
///
/// `max_square` is only read/written when `amsgrad` is set; callers pass an
/// empty slice otherwise.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip(grad, param, m, v, max_square), name = "kernel_adam")]
pub fn adam(
    grad: &[f32],
    param: &mut [f32],
    m: &mut [f32],
    v: &mut [f32],
    max_square: &mut [f32],
    lr: f32,
    step: i64,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    amsgrad: bool,
) -> PsResult<()> {
    check_len(grad, param)?;
    check_len(grad, m)?;
    check_len(grad, v)?;
    if amsgrad {
        check_len(grad, max_square)?;
    }

    let bias_correction1 = 1.0 - beta1.powi(step as i32);
    let bias_correction2 = 1.0 - beta2.powi(step as i32);

    for i in 0..grad.len() {
        let g = grad[i];
        m[i] = beta1 * m[i] + (1.0 - beta1) * g;
        v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;

        let mhat = m[i] / bias_correction1;
        let vhat = if amsgrad {
            max_square[i] = max_square[i].max(v[i]);
            max_square[i] / bias_correction2
        } else {
            v[i] / bias_correction2
        };

        param[i] -= lr * mhat / (vhat.sqrt() + epsilon);
    }
    Ok(())
}

/// Sums `rows` element-wise into a fresh `Vec`, used by duplicate-merge and
/// by multi-worker gradient aggregation alike. Empty input yields an empty
/// vector, not an error — there's nothing to sum.
pub fn sum(rows: &[&[f32]]) -> Vec<f32> {
    let Some(width) = rows.first().map(|r| r.len()) else {
        return Vec::new();
    };
    let mut acc = vec![0.0f32; width];
    for row in rows {
        debug_assert_eq!(row.len(), width, "sum: ragged rows");
        for (a, &x) in acc.iter_mut().zip(row.iter()) {
            *a += x;
        }
    }
    acc
}

#[cfg(feature = "rayon")]
fn apply_pairs(grad: &[f32], param: &mut [f32], f: impl Fn(f32, &mut f32) + Sync) {
    use rayon::prelude::*;
    param
        .par_iter_mut()
        .zip(grad.par_iter())
        .for_each(|(p, &g)| f(g, p));
}

#[cfg(not(feature = "rayon"))]
fn apply_pairs(grad: &[f32], param: &mut [f32], f: impl Fn(f32, &mut f32)) {
    for (p, &g) in param.iter_mut().zip(grad.iter()) {
        f(g, p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgd_subtracts_scaled_gradient() {
        let grad = [1.0f32, 2.0, 3.0];
        let mut param = [10.0f32, 10.0, 10.0];
        sgd(&grad, &mut param, 0.1).unwrap();
        assert_eq!(param, [9.9, 9.8, 9.7]);
    }

    #[test]
    fn sgd_rejects_length_mismatch() {
        let grad = [1.0f32, 2.0];
        let mut param = [10.0f32, 10.0, 10.0];
        assert!(sgd(&grad, &mut param, 0.1).is_err());
    }

    #[test]
    fn adam_first_step_matches_closed_form() {
        let grad = [1.0f32];
        let mut param = [0.0f32];
        let mut m = [0.0f32];
        let mut v = [0.0f32];
        let mut max_sq: [f32; 0] = [];
        adam(
            &grad, &mut param, &mut m, &mut v, &mut max_sq, 0.1, 1, 0.9, 0.999, 1e-8, false,
        )
        .unwrap();
        // m = 0.1, bias_correction1 = 0.1 -> mhat = 1.0
        // v = 0.001, bias_correction2 = 0.001 -> vhat = 1.0
        // param -= 0.1 * 1.0 / (1.0 + 1e-8)
        assert!((param[0] - (-0.1)).abs() < 1e-4);
    }

    #[test]
    fn adam_amsgrad_tracks_running_max_of_v() {
        let grad = [2.0f32, 0.1];
        let mut param = [0.0f32, 0.0];
        let mut m = [0.0f32, 0.0];
        let mut v = [0.0f32, 0.0];
        let mut max_sq = [0.0f32, 0.0];
        adam(
            &grad, &mut param, &mut m, &mut v, &mut max_sq, 0.1, 1, 0.9, 0.999, 1e-8, true,
        )
        .unwrap();
        // v after step 1 == max_sq after step 1 (first observation).
        assert_eq!(v, max_sq);

        let grad2 = [0.01f32, 0.01];
        adam(
            &grad2, &mut param, &mut m, &mut v, &mut max_sq, 0.1, 2, 0.9, 0.999, 1e-8, true,
        )
        .unwrap();
        // v shrinks toward the small new gradient, max_sq keeps the peak.
        assert!(max_sq[0] >= v[0]);
    }

    #[test]
    fn sum_of_no_rows_is_empty() {
        assert!(sum(&[]).is_empty());
    }

    #[test]
    fn sum_adds_rows_element_wise() {
        let a = [1.0f32, 2.0];
        let b = [10.0f32, 20.0];
        assert_eq!(sum(&[&a, &b]), vec![11.0, 22.0]);
    }
}
