use crate::{contrast::Contrast, error::FastIcaError, fast_ica::FastIca};
use linfa::{Float, ParamGuard};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Fast Independent Component Analysis (ICA), deflation variant
///
/// Checked hyperparameters. The whitening and extraction steps are exposed as
/// methods on this type, see [`FastIcaValidParams::whiten`],
/// [`FastIcaValidParams::extract_one`] and [`FastIcaValidParams::extract_many`].
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FastIcaValidParams<F: Float> {
    ncomponents: Option<usize>,
    contrast: Contrast,
    max_iter: usize,
    tol: F,
    random_state: Option<usize>,
}

impl<F: Float> FastIcaValidParams<F> {
    pub fn ncomponents(&self) -> &Option<usize> {
        &self.ncomponents
    }

    pub fn contrast(&self) -> &Contrast {
        &self.contrast
    }

    /// Whether the general (log-cosh) contrast is selected
    pub fn general(&self) -> bool {
        self.contrast == Contrast::General
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn tol(&self) -> F {
        self.tol
    }

    pub fn random_state(&self) -> &Option<usize> {
        &self.random_state
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FastIcaParams<F: Float>(FastIcaValidParams<F>);

impl<F: Float> Default for FastIcaParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> FastIca<F> {
    pub fn params() -> FastIcaParams<F> {
        FastIcaParams::new()
    }
}

impl<F: Float> FastIcaParams<F> {
    /// Create new FastICA algorithm with default values for its parameters
    pub fn new() -> Self {
        Self(FastIcaValidParams {
            ncomponents: None,
            contrast: Contrast::General,
            max_iter: 200,
            tol: F::cast(1e-4),
            random_state: None,
        })
    }

    /// Set the number of components to be extracted when fitting a dataset,
    /// defaults to the number of channels
    pub fn ncomponents(mut self, ncomponents: usize) -> Self {
        self.0.ncomponents = Some(ncomponents);
        self
    }

    /// Contrast function used to approximate negentropy, refer [`Contrast`]
    pub fn contrast(mut self, contrast: Contrast) -> Self {
        self.0.contrast = contrast;
        self
    }

    /// `true` selects [`Contrast::General`], `false` selects [`Contrast::Robust`]
    pub fn general(mut self, general: bool) -> Self {
        self.0.contrast = Contrast::from_general(general);
        self
    }

    /// Set maximum number of fixed-point iterations per component
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.0.max_iter = max_iter;
        self
    }

    /// Set tolerance on `1 - |w_newᵀ w_old|` for convergence
    pub fn tol(mut self, tol: F) -> Self {
        self.0.tol = tol;
        self
    }

    /// Set seed for random number generator for reproducible results.
    pub fn random_state(mut self, random_state: usize) -> Self {
        self.0.random_state = Some(random_state);
        self
    }
}

impl<F: Float> ParamGuard for FastIcaParams<F> {
    type Checked = FastIcaValidParams<F>;
    type Error = FastIcaError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if !(self.0.tol > F::zero()) {
            Err(FastIcaError::InvalidTolerance(
                self.0.tol.to_f32().unwrap_or(f32::NAN),
            ))
        } else if self.0.max_iter == 0 {
            Err(FastIcaError::InvalidMaxIter)
        } else if self.0.ncomponents == Some(0) {
            Err(FastIcaError::InvalidValue(
                "ncomponents must be at least 1".to_string(),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
