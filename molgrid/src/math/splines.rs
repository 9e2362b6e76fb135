use ndarray::{Array2, ArrayViewMut1, Axis, Zip};

use crate::Error;
use super::solve_tridiagonal;

/// Cubic spline interpolation of functions `R -> R^n`, stored in [Hermit
/// form][splines-wiki]: the value and first derivative of all outputs at each
/// knot.
///
/// Splines are usually created with [`CubicSpline::natural`], which picks the
/// derivatives giving a twice continuously differentiable interpolant with
/// vanishing second derivative at both ends.
///
/// [splines-wiki]: https://en.wikipedia.org/wiki/Cubic_Hermite_spline
#[derive(Debug, Clone)]
pub struct CubicSpline {
    knots: Vec<f64>,
    /// values at the knots, with shape `(n_knots, n_outputs)`
    values: Array2<f64>,
    /// derivatives at the knots, with shape `(n_knots, n_outputs)`
    derivatives: Array2<f64>,
}

fn check_knots(knots: &[f64], values: &Array2<f64>) -> Result<(), Error> {
    if knots.len() < 2 {
        return Err(Error::InvalidParameter(format!(
            "we need at least two knots to create a spline, got {}", knots.len()
        )));
    }

    if values.nrows() != knots.len() {
        return Err(Error::SizeMismatch { expected: knots.len(), got: values.nrows() });
    }

    if knots.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidParameter("spline knots must be finite".into()));
    }

    if knots.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::InvalidParameter(
            "spline knots must be strictly increasing".into()
        ));
    }

    return Ok(());
}

impl CubicSpline {
    /// Create a natural cubic spline passing through `values[i, :]` at
    /// `knots[i]`. All outputs (columns of `values`) share the same knots, and
    /// are fitted together.
    pub fn natural(knots: Vec<f64>, values: Array2<f64>) -> Result<CubicSpline, Error> {
        check_knots(&knots, &values)?;

        let n = knots.len();
        let steps = knots.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>();

        // second derivatives at the knots, zero at both ends
        let mut lower = vec![0.0; n];
        let mut diagonal = vec![1.0; n];
        let mut upper = vec![0.0; n];
        let mut second = Array2::zeros(values.raw_dim());
        for i in 1..(n - 1) {
            lower[i] = steps[i - 1];
            diagonal[i] = 2.0 * (steps[i - 1] + steps[i]);
            upper[i] = steps[i];

            let mut row = second.row_mut(i);
            Zip::from(&mut row)
                .and(values.row(i - 1))
                .and(values.row(i))
                .and(values.row(i + 1))
                .for_each(|s, &previous, &current, &next| {
                    *s = 6.0 * ((next - current) / steps[i] - (current - previous) / steps[i - 1]);
                });
        }
        solve_tridiagonal(&lower, &diagonal, &upper, second.view_mut())?;

        let mut derivatives = Array2::zeros(values.raw_dim());
        for k in 0..(n - 1) {
            let h = steps[k];
            Zip::from(derivatives.row_mut(k))
                .and(values.row(k))
                .and(values.row(k + 1))
                .and(second.row(k))
                .and(second.row(k + 1))
                .for_each(|d, &y_k, &y_k_1, &m_k, &m_k_1| {
                    *d = (y_k_1 - y_k) / h - h * (2.0 * m_k + m_k_1) / 6.0;
                });
        }

        let h = steps[n - 2];
        Zip::from(derivatives.row_mut(n - 1))
            .and(values.row(n - 2))
            .and(values.row(n - 1))
            .and(second.row(n - 2))
            .and(second.row(n - 1))
            .for_each(|d, &y_k, &y_k_1, &m_k, &m_k_1| {
                *d = (y_k_1 - y_k) / h + h * (m_k + 2.0 * m_k_1) / 6.0;
            });

        return Ok(CubicSpline {
            knots: knots,
            values: values,
            derivatives: derivatives,
        });
    }

    /// Get the first knot of this spline
    pub fn start(&self) -> f64 {
        self.knots[0]
    }

    /// Get the last knot of this spline
    pub fn stop(&self) -> f64 {
        self.knots[self.knots.len() - 1]
    }

    /// Get the number of outputs of the splined function
    pub fn n_outputs(&self) -> usize {
        self.values.ncols()
    }

    /// Get the position of the knots for this spline
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Compute the spline at point `x`, storing the results in `values` and
    /// optionally the derivatives with respect to `x` in `gradients`.
    ///
    /// `x` must be inside `[self.start(), self.stop()]`.
    pub fn compute(&self, x: f64, mut values: ArrayViewMut1<'_, f64>, gradients: Option<ArrayViewMut1<'_, f64>>) {
        debug_assert!(x.is_finite());
        debug_assert!(x >= self.start() && x <= self.stop());
        debug_assert_eq!(values.len(), self.n_outputs());

        // notation in this function follows
        // https://en.wikipedia.org/wiki/Cubic_Hermite_spline
        let last_interval = self.knots.len() - 2;
        let k = match self.knots.binary_search_by(|v| v.total_cmp(&x)) {
            Ok(k) => usize::min(k, last_interval),
            Err(k) => usize::min(k.saturating_sub(1), last_interval),
        };

        let x_k = self.knots[k];
        let x_k_1 = self.knots[k + 1];

        let delta = x_k_1 - x_k;
        let t = (x - x_k) / delta;
        let t_2 = t * t;
        let t_3 = t_2 * t;

        // Hermit base polynomials
        let h00 = 2.0 * t_3 - 3.0 * t_2 + 1.0;
        let h10 = t_3 - 2.0 * t_2 + t;
        let h01 = -2.0 * t_3 + 3.0 * t_2;
        let h11 = t_3 - t_2;

        let p_k = self.values.index_axis(Axis(0), k);
        let p_k_1 = self.values.index_axis(Axis(0), k + 1);
        let m_k = self.derivatives.index_axis(Axis(0), k);
        let m_k_1 = self.derivatives.index_axis(Axis(0), k + 1);

        Zip::from(&mut values).and(&p_k).and(&p_k_1).and(&m_k).and(&m_k_1)
            .for_each(|v, p_k, p_k_1, m_k, m_k_1| {
                *v = h00 * p_k + h10 * delta * m_k + h01 * p_k_1 + h11 * delta * m_k_1;
            });

        if let Some(mut gradients) = gradients {
            debug_assert_eq!(gradients.len(), self.n_outputs());

            let d_h00_dt = 6.0 * (t_2 - t);
            let d_h10_dt = 3.0 * t_2 - 4.0 * t + 1.0;
            let d_h01_dt = -d_h00_dt;
            let d_h11_dt = 3.0 * t_2 - 2.0 * t;

            let dx_dt = 1.0 / delta;

            Zip::from(&mut gradients).and(&p_k).and(&p_k_1).and(&m_k).and(&m_k_1)
                .for_each(|g, p_k, p_k_1, m_k, m_k_1| {
                    *g = d_h00_dt * p_k * dx_dt + d_h10_dt * m_k + d_h01_dt * p_k_1 * dx_dt + d_h11_dt * m_k_1;
                });
        }
    }
}
