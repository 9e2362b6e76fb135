use std::f64::consts::PI;

use ndarray::{Array1, ArrayView1};

use crate::Error;
use crate::errors::check_size;

/// Maximal number of Newton iterations when looking for polynomial roots
const MAX_NEWTON_ITERATIONS: usize = 100;

/// Above this size, the Gauss-Laguerre weights `w e^x` overflow
const MAX_LAGUERRE_POINTS: usize = 150;

/// Families of one-dimensional quadrature rules on the canonical `[-1, 1]`
/// interval, or `[0, ∞)` for [`OneDQuadrature::GaussLaguerre`].
///
/// All families approximate the plain integral `∫ f(x) dx` over their
/// domain; the Chebyshev and Laguerre rules fold their weight function into
/// the weights.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum OneDQuadrature {
    /// Gauss-Legendre rule, exact for polynomials of degree `2 * points - 1`
    GaussLegendre {
        /// number of nodes
        points: usize,
    },
    /// Gauss-Chebyshev rule of the first kind, with nodes
    /// `cos((2i - 1) π / 2n)`
    GaussChebyshev {
        /// number of nodes
        points: usize,
    },
    /// Gauss-Chebyshev rule of the second kind, with nodes `cos(i π / (n + 1))`
    GaussChebyshevType2 {
        /// number of nodes
        points: usize,
    },
    /// Composite trapezoidal rule on uniformly spaced nodes, including both
    /// ends of the interval
    Trapezoid {
        /// number of nodes, at least 2
        points: usize,
    },
    /// Composite Simpson rule on uniformly spaced nodes, including both ends
    /// of the interval
    Simpson {
        /// number of nodes, odd and at least 3
        points: usize,
    },
    /// Clenshaw-Curtis rule on the Chebyshev extrema, including both ends of
    /// the interval
    ClenshawCurtis {
        /// number of nodes, at least 2
        points: usize,
    },
    /// Gauss-Laguerre rule on `[0, ∞)`, for integrands decaying like `e^-x`.
    /// The weights include the `e^x` factor, and are meant to be used with
    /// the identity radial transform.
    GaussLaguerre {
        /// number of nodes, between 1 and 150
        points: usize,
    },
}

impl OneDQuadrature {
    /// Get the number of nodes requested for this rule
    pub fn points(&self) -> usize {
        match *self {
            OneDQuadrature::GaussLegendre { points } |
            OneDQuadrature::GaussChebyshev { points } |
            OneDQuadrature::GaussChebyshevType2 { points } |
            OneDQuadrature::Trapezoid { points } |
            OneDQuadrature::Simpson { points } |
            OneDQuadrature::ClenshawCurtis { points } |
            OneDQuadrature::GaussLaguerre { points } => points,
        }
    }

    /// Get the interval covered by the nodes of this rule
    pub fn domain(&self) -> (f64, f64) {
        match self {
            OneDQuadrature::GaussLaguerre { .. } => (0.0, f64::INFINITY),
            _ => (-1.0, 1.0),
        }
    }

    /// Get the highest polynomial degree this rule integrates exactly, if
    /// this is well defined. Chebyshev and Laguerre rules are exact with
    /// respect to their own weight function, and return `None`. Rules with
    /// an invalid number of points also return `None`.
    pub fn degree_of_precision(&self) -> Option<usize> {
        self.validate().ok()?;
        match *self {
            OneDQuadrature::GaussLegendre { points } => Some(2 * points - 1),
            OneDQuadrature::GaussChebyshev { .. } |
            OneDQuadrature::GaussChebyshevType2 { .. } |
            OneDQuadrature::GaussLaguerre { .. } => None,
            OneDQuadrature::Trapezoid { .. } => Some(1),
            OneDQuadrature::Simpson { .. } => Some(3),
            OneDQuadrature::ClenshawCurtis { points } => Some(points - 1),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        let n = self.points();
        let (minimum, name) = match self {
            OneDQuadrature::GaussLegendre { .. } => (1, "Gauss-Legendre"),
            OneDQuadrature::GaussChebyshev { .. } => (1, "Gauss-Chebyshev"),
            OneDQuadrature::GaussChebyshevType2 { .. } => (1, "Gauss-Chebyshev type 2"),
            OneDQuadrature::Trapezoid { .. } => (2, "trapezoid"),
            OneDQuadrature::Simpson { .. } => (3, "Simpson"),
            OneDQuadrature::ClenshawCurtis { .. } => (2, "Clenshaw-Curtis"),
            OneDQuadrature::GaussLaguerre { .. } => (1, "Gauss-Laguerre"),
        };

        if n < minimum {
            return Err(Error::InvalidSize(format!(
                "{} quadrature needs at least {} points, got {}", name, minimum, n
            )));
        }

        if matches!(self, OneDQuadrature::GaussLaguerre { .. }) && n > MAX_LAGUERRE_POINTS {
            return Err(Error::InvalidSize(format!(
                "Gauss-Laguerre quadrature supports at most {} points, got {}", MAX_LAGUERRE_POINTS, n
            )));
        }

        if matches!(self, OneDQuadrature::Simpson { .. }) && n % 2 == 0 {
            return Err(Error::InvalidSize(format!(
                "Simpson quadrature needs an odd number of points, got {}", n
            )));
        }

        return Ok(());
    }

    /// Build the nodes and weights of this rule
    pub fn build(&self) -> Result<OneDGrid, Error> {
        self.validate()?;

        let n = self.points();
        let (mut points, mut weights): (Vec<f64>, Vec<f64>) = match self {
            OneDQuadrature::GaussLegendre { .. } => gauss_legendre(n)?,
            OneDQuadrature::GaussChebyshev { .. } => {
                (1..=n).map(|i| {
                    let x = f64::cos((2 * i - 1) as f64 * PI / (2 * n) as f64);
                    (x, PI / n as f64 * f64::sqrt(1.0 - x * x))
                }).unzip()
            }
            OneDQuadrature::GaussChebyshevType2 { .. } => {
                (1..=n).map(|i| {
                    let theta = i as f64 * PI / (n + 1) as f64;
                    (f64::cos(theta), PI / (n + 1) as f64 * f64::sin(theta))
                }).unzip()
            }
            OneDQuadrature::Trapezoid { .. } => {
                let step = 2.0 / (n - 1) as f64;
                (0..n).map(|i| {
                    let weight = if i == 0 || i == n - 1 { 0.5 * step } else { step };
                    (-1.0 + i as f64 * step, weight)
                }).unzip()
            }
            OneDQuadrature::Simpson { .. } => {
                let step = 2.0 / (n - 1) as f64;
                (0..n).map(|i| {
                    let factor = if i == 0 || i == n - 1 {
                        1.0
                    } else if i % 2 == 1 {
                        4.0
                    } else {
                        2.0
                    };
                    (-1.0 + i as f64 * step, factor * step / 3.0)
                }).unzip()
            }
            OneDQuadrature::ClenshawCurtis { .. } => clenshaw_curtis(n),
            OneDQuadrature::GaussLaguerre { .. } => gauss_laguerre(n)?,
        };

        sort_ascending(&mut points, &mut weights);

        return Ok(OneDGrid {
            points: Array1::from(points),
            weights: Array1::from(weights),
            domain: self.domain(),
        });
    }
}

fn sort_ascending(points: &mut Vec<f64>, weights: &mut Vec<f64>) {
    let mut pairs = points.iter().copied().zip(weights.iter().copied()).collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (sorted_points, sorted_weights): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    *points = sorted_points;
    *weights = sorted_weights;
}

/// Nodes and weights of the `n` points Gauss-Legendre rule, using Newton
/// iterations on the three-term recurrence
fn gauss_legendre(n: usize) -> Result<(Vec<f64>, Vec<f64>), Error> {
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 0..n {
        let mut x = f64::cos(PI * (i as f64 + 0.75) / (n as f64 + 0.5));
        let mut derivative = 0.0;
        let mut converged = false;
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let mut p_previous = 1.0;
            let mut p = x;
            for k in 2..=n {
                let k = k as f64;
                let p_next = ((2.0 * k - 1.0) * x * p - (k - 1.0) * p_previous) / k;
                p_previous = p;
                p = p_next;
            }

            derivative = n as f64 * (x * p - p_previous) / (x * x - 1.0);
            let delta = p / derivative;
            x -= delta;
            if delta.abs() < 1e-15 {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(Error::Internal(format!(
                "Newton iterations did not converge for the root {} of the Legendre polynomial of order {}",
                i, n
            )));
        }

        points.push(x);
        weights.push(2.0 / ((1.0 - x * x) * derivative * derivative));
    }

    return Ok((points, weights));
}

/// Nodes and weights of the `n` points Gauss-Laguerre rule, with the `e^x`
/// factor folded into the weights. The initial guesses for the Newton
/// iterations extrapolate from the previous roots.
fn gauss_laguerre(n: usize) -> Result<(Vec<f64>, Vec<f64>), Error> {
    let mut points: Vec<f64> = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    let order = n as f64;
    let mut z = 0.0;
    for i in 0..n {
        if i == 0 {
            z = 3.0 / (1.0 + 2.4 * order);
        } else if i == 1 {
            z += 15.0 / (1.0 + 2.5 * order);
        } else {
            let ai = (i - 1) as f64;
            z += (1.0 + 2.55 * ai) / (1.9 * ai) * (z - points[i - 2]);
        }

        let mut derivative = 0.0;
        let mut p_previous = 0.0;
        let mut delta = f64::INFINITY;
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let mut p = 1.0;
            p_previous = 0.0;
            for j in 1..=n {
                let j = j as f64;
                let p_next = ((2.0 * j - 1.0 - z) * p - (j - 1.0) * p_previous) / j;
                p_previous = p;
                p = p_next;
            }

            derivative = order * (p - p_previous) / z;
            delta = p / derivative;
            z -= delta;
            if delta.abs() <= 1e-15 * f64::max(1.0, z) {
                break;
            }
        }

        // the last digits of large roots can oscillate without settling
        if !(delta.abs() <= 1e-10 * f64::max(1.0, z)) {
            return Err(Error::Internal(format!(
                "Newton iterations did not converge for the root {} of the Laguerre polynomial of order {}",
                i, n
            )));
        }

        points.push(z);
        weights.push(-f64::exp(z) / (derivative * order * p_previous));
    }

    return Ok((points, weights));
}

/// Nodes and weights of the `n` points Clenshaw-Curtis rule
fn clenshaw_curtis(n: usize) -> (Vec<f64>, Vec<f64>) {
    let order = n - 1;
    (0..n).map(|i| {
        let theta = i as f64 * PI / order as f64;
        let mut sum = 0.0;
        for j in 1..=(order / 2) {
            let b = if 2 * j == order { 1.0 } else { 2.0 };
            sum += b / (4 * j * j - 1) as f64 * f64::cos(2.0 * j as f64 * theta);
        }
        let c = if i == 0 || i == order { 1.0 } else { 2.0 };
        (f64::cos(theta), c / order as f64 * (1.0 - sum))
    }).unzip()
}

/// A one-dimensional grid: nodes, weights and the interval they cover
#[derive(Debug, Clone)]
pub struct OneDGrid {
    points: Array1<f64>,
    weights: Array1<f64>,
    domain: (f64, f64),
}

impl OneDGrid {
    /// Create a grid from explicit nodes and weights on `domain`
    pub fn new(points: Array1<f64>, weights: Array1<f64>, domain: (f64, f64)) -> Result<OneDGrid, Error> {
        check_size(points.len(), weights.len())?;
        if !(domain.0 < domain.1) {
            return Err(Error::InvalidParameter(format!(
                "invalid domain for one-dimensional grid: [{}, {}]", domain.0, domain.1
            )));
        }

        if points.iter().any(|&x| x < domain.0 || x > domain.1) {
            return Err(Error::InvalidParameter(format!(
                "one-dimensional grid points must be inside [{}, {}]", domain.0, domain.1
            )));
        }

        return Ok(OneDGrid { points, weights, domain });
    }

    /// Get the nodes of this grid
    pub fn points(&self) -> ArrayView1<'_, f64> {
        self.points.view()
    }

    /// Get the weights of this grid
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.weights.view()
    }

    /// Get the interval covered by this grid
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Get the number of points in this grid
    pub fn size(&self) -> usize {
        self.points.len()
    }

    /// Integrate a function sampled on the grid nodes
    pub fn integrate(&self, values: ArrayView1<'_, f64>) -> Result<f64, Error> {
        check_size(self.size(), values.len())?;
        return Ok(self.weights.dot(&values));
    }
}
