//! Non-quadratic contrast functions used to approximate negentropy
//!
//! FastICA measures non-Gaussianity of a projection `y = wᵀx` through
//!
//! ```text
//! J(y) ≈ (E[f(y)] - E[f(ν)])²,   ν ~ N(0, 1)
//! ```
//!
//! and the fixed-point update only needs the first and second derivatives
//! `g = f'` and `dg = g'`. Two families are available:
//!
//! - [`Contrast::General`]: `f(x) = log(cosh(x))`, a good all-round choice
//! - [`Contrast::Robust`]: `f(x) = -exp(-x²/2)`, less sensitive to outliers
//!   and better suited to strongly super-Gaussian sources

use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A contrast function together with its first two derivatives
pub trait ContrastFunction {
    /// The non-quadratic contrast itself
    fn f<F: Float>(x: F) -> F;
    /// First derivative of `f`, used in the fixed-point update
    fn g<F: Float>(x: F) -> F;
    /// Second derivative of `f`, used for the normalising term of the update
    fn dg<F: Float>(x: F) -> F;
    /// `E[f(ν)]` for a standard normal `ν`
    fn gaussian_expectation<F: Float>() -> F;
}

/// `f(x) = log(cosh(x))`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LogCosh;

impl ContrastFunction for LogCosh {
    fn f<F: Float>(x: F) -> F {
        // log(cosh(x)) = |x| + log(1 + exp(-2|x|)) - log(2), without overflowing cosh
        let ax = x.abs();
        ax + (-F::cast(2.) * ax).exp().ln_1p() - F::cast(2.).ln()
    }

    fn g<F: Float>(x: F) -> F {
        x.tanh()
    }

    fn dg<F: Float>(x: F) -> F {
        let t = x.tanh();
        F::one() - t * t
    }

    fn gaussian_expectation<F: Float>() -> F {
        F::cast(0.374_567_207_491_4)
    }
}

/// `f(x) = -exp(-x²/2)`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Gauss;

impl ContrastFunction for Gauss {
    fn f<F: Float>(x: F) -> F {
        -(-x * x / F::cast(2.)).exp()
    }

    fn g<F: Float>(x: F) -> F {
        x * (-x * x / F::cast(2.)).exp()
    }

    fn dg<F: Float>(x: F) -> F {
        (F::one() - x * x) * (-x * x / F::cast(2.)).exp()
    }

    fn gaussian_expectation<F: Float>() -> F {
        -F::cast(std::f64::consts::FRAC_1_SQRT_2)
    }
}

/// Choice of contrast function family
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Contrast {
    /// Log-cosh family, see [`LogCosh`]
    #[default]
    General,
    /// Gaussian kernel family, see [`Gauss`]
    Robust,
}

impl Contrast {
    /// `General` when `general` is true, `Robust` otherwise
    pub fn from_general(general: bool) -> Self {
        if general {
            Contrast::General
        } else {
            Contrast::Robust
        }
    }

    pub fn f<F: Float>(&self, x: F) -> F {
        match self {
            Contrast::General => LogCosh::f(x),
            Contrast::Robust => Gauss::f(x),
        }
    }

    pub fn g<F: Float>(&self, x: F) -> F {
        match self {
            Contrast::General => LogCosh::g(x),
            Contrast::Robust => Gauss::g(x),
        }
    }

    pub fn dg<F: Float>(&self, x: F) -> F {
        match self {
            Contrast::General => LogCosh::dg(x),
            Contrast::Robust => Gauss::dg(x),
        }
    }

    pub fn gaussian_expectation<F: Float>(&self) -> F {
        match self {
            Contrast::General => LogCosh::gaussian_expectation(),
            Contrast::Robust => Gauss::gaussian_expectation(),
        }
    }

    // Evaluates `g` on every projection and returns it together with the
    // sample mean of `dg`, the two terms of the fixed-point update
    pub(crate) fn exec<F: Float, D: Data<Elem = F>>(
        &self,
        y: &ArrayBase<D, Ix1>,
    ) -> (Array1<F>, F) {
        let gy = y.mapv(|v| self.g(v));
        let n = F::cast(y.len().max(1));
        let dg_mean = y.iter().fold(F::zero(), |acc, &v| acc + self.dg(v)) / n;

        (gy, dg_mean)
    }

    /// Approximate negentropy of a zero-mean, unit-variance signal
    ///
    /// Zero for Gaussian data and positive otherwise; larger values mean the
    /// signal is further from Gaussian.
    pub fn negentropy<F: Float, D: Data<Elem = F>>(&self, y: &ArrayBase<D, Ix1>) -> F {
        if y.is_empty() {
            return F::zero();
        }
        let n = F::cast(y.len());
        let ef = y.iter().fold(F::zero(), |acc, &v| acc + self.f(v)) / n;
        let diff = ef - self.gaussian_expectation();

        diff * diff
    }
}
