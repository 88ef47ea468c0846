use ndarray::{Array1, ArrayView1};

/// Advances `state` by `dt` with the classic fourth-order Runge-Kutta scheme.
pub fn rk4_step<F>(state: ArrayView1<f64>, dt: f64, derivatives: F) -> Array1<f64>
where
    F: Fn(ArrayView1<f64>) -> Array1<f64>,
{
    let k1 = derivatives(state);
    let s2 = &state + &(&k1 * (dt / 2.0));
    let k2 = derivatives(s2.view());
    let s3 = &state + &(&k2 * (dt / 2.0));
    let k3 = derivatives(s3.view());
    let s4 = &state + &(&k3 * dt);
    let k4 = derivatives(s4.view());
    let slope = (&k1 + &(&k2 * 2.0) + &(&k3 * 2.0) + &k4) / 6.0;
    &state + &(slope * dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn exponential_decay_is_tracked_closely() {
        let mut state = array![1.0];
        for _ in 0..10 {
            state = rk4_step(state.view(), 0.1, |s| s.mapv(|v| -v));
        }
        assert!((state[0] - (-1.0_f64).exp()).abs() < 1e-6);
    }
}
