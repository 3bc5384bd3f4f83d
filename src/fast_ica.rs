//! Fast algorithm for Independent Component Analysis (ICA)
//!
//! Components are estimated one at a time (deflation). For every component a
//! unit weight vector `w` is driven to a fixed point of
//!
//! ```text
//! w ← E[z · g(wᵀz)] - E[dg(wᵀz)] · w
//! ```
//!
//! on whitened data `z`, followed by Gram-Schmidt deflation against the
//! components found so far and renormalisation.

use linfa::{
    dataset::{DatasetBase, Records},
    traits::*,
    Float,
};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};
use ndarray_rand::{rand::SeedableRng, rand_distr::StandardNormal, RandomExt};
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{FastIcaError, Result};
use crate::hyperparams::FastIcaValidParams;
use crate::whitening::{self, Whitening};

impl<F: Float, D: Data<Elem = F>, T> Fit<ArrayBase<D, Ix2>, T, FastIcaError>
    for FastIcaValidParams<F>
{
    type Object = FastIca<F>;

    /// Fit the model
    ///
    /// Records are expected in the usual `(nsamples, nfeatures)` layout, every
    /// feature being one observed channel.
    ///
    /// # Errors
    ///
    /// If the [`FastIcaParams::ncomponents`](crate::FastIcaParams::ncomponents) is set
    /// to a number greater than the number of features. This is checked before any
    /// numerical work is done.
    ///
    /// If the data cannot be whitened or a component does not converge, see
    /// [`FastIcaValidParams::whiten`] and [`FastIcaValidParams::extract_many`].
    fn fit(&self, dataset: &DatasetBase<ArrayBase<D, Ix2>, T>) -> Result<Self::Object> {
        let x = &dataset.records;
        let (nsamples, nfeatures) = (x.nsamples(), x.nfeatures());
        if nsamples == 0 {
            return Err(FastIcaError::NotEnoughSamples {
                channels: nfeatures,
                samples: nsamples,
            });
        }

        // If the number of components is not set, we extract one per feature
        let ncomponents = self.ncomponents().unwrap_or(nfeatures);
        if ncomponents > nfeatures {
            return Err(FastIcaError::InvalidValue(format!(
                "ncomponents cannot be greater than the number of features ({}), got {}",
                nfeatures, ncomponents
            )));
        }

        log::debug!(
            "fitting FastICA: {} components from {} samples x {} features",
            ncomponents,
            nsamples,
            nfeatures
        );

        // Channels become rows for whitening and extraction
        let xchannels = x.t();
        let whitening = Whitening::fit(&xchannels)?;
        let xwhitened = whitening.transform(&xchannels)?;

        let Components {
            weights,
            iterations,
            negentropy,
            ..
        } = self.extract_many(&xwhitened, ncomponents)?;

        // Unmixing of the raw (centered) data, and its pseudo-inverse
        let components = weights.dot(&whitening.whitening_matrix());
        let mixing = whitening.dewhitening_matrix().dot(&weights.t());

        Ok(FastIca {
            mean: whitening.mean().to_owned(),
            components,
            unmixing: weights,
            mixing,
            iterations,
            negentropy,
        })
    }
}

impl<F: Float> FastIcaValidParams<F> {
    /// Whiten a channel-major matrix `(N, M)`, see [`whitening::whiten`]
    pub fn whiten<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix2>) -> Result<Array2<F>> {
        whitening::whiten(x)
    }

    /// Estimate a single independent component of whitened data `(N, M)`
    ///
    /// Starts from `initial` when given, or from a random standard normal vector
    /// otherwise. Returns the unit-norm unmixing direction `w`; the separated
    /// signal is `w.dot(x)`.
    ///
    /// # Errors
    ///
    /// [`FastIcaError::InvalidValue`] if `x` is empty or `initial` does not have one
    /// entry per channel, [`FastIcaError::NotConverged`] if the direction does not
    /// settle within `max_iter` iterations.
    pub fn extract_one<D: Data<Elem = F>>(
        &self,
        x: &ArrayBase<D, Ix2>,
        initial: Option<&Array1<F>>,
    ) -> Result<Array1<F>> {
        let (nchannels, nsamples) = x.dim();
        check_whitened_dim(nchannels, nsamples)?;

        let w0 = match initial {
            Some(w0) if w0.len() != nchannels => {
                return Err(FastIcaError::InvalidValue(format!(
                    "initial weight vector must have {} entries, got {}",
                    nchannels,
                    w0.len()
                )))
            }
            Some(w0) => w0.to_owned(),
            None => self.random_weights(1, nchannels).row(0).to_owned(),
        };

        let found = Array2::zeros((0, nchannels));
        let (w, _) = self.fixed_point(x, w0, found.view(), 0)?;

        Ok(w)
    }

    /// Estimate `ncomponents` independent components of whitened data `(N, M)`
    ///
    /// Each component is searched in the orthogonal complement of the ones
    /// found before it, so the returned weights are orthonormal. They are
    /// ordered by extraction, not by significance.
    ///
    /// # Errors
    ///
    /// [`FastIcaError::InvalidValue`] unless `1 <= ncomponents <= N`, checked before
    /// any numerical work. [`FastIcaError::NotConverged`] with the failing component
    /// index if any extraction does not converge.
    pub fn extract_many<D: Data<Elem = F>>(
        &self,
        x: &ArrayBase<D, Ix2>,
        ncomponents: usize,
    ) -> Result<Components<F>> {
        let (nchannels, nsamples) = x.dim();
        check_ncomponents(ncomponents, nchannels)?;
        check_whitened_dim(nchannels, nsamples)?;

        let initial = self.random_weights(ncomponents, nchannels);
        self.extract_many_from(x, &initial)
    }

    /// Like [`extract_many`](Self::extract_many), starting component `k` from row
    /// `k` of `initial` (shape `(c, N)`)
    ///
    /// Useful to retry a failed extraction with explicitly chosen starting points.
    pub fn extract_many_from<D: Data<Elem = F>, S: Data<Elem = F>>(
        &self,
        x: &ArrayBase<D, Ix2>,
        initial: &ArrayBase<S, Ix2>,
    ) -> Result<Components<F>> {
        let (nchannels, nsamples) = x.dim();
        let ncomponents = initial.nrows();
        check_ncomponents(ncomponents, nchannels)?;
        check_whitened_dim(nchannels, nsamples)?;
        if initial.ncols() != nchannels {
            return Err(FastIcaError::InvalidValue(format!(
                "initial weight vectors must have {} entries, got {}",
                nchannels,
                initial.ncols()
            )));
        }

        let mut weights = Array2::zeros((ncomponents, nchannels));
        let mut iterations = Vec::with_capacity(ncomponents);
        for (k, w0) in initial.outer_iter().enumerate() {
            let (w, niter) =
                self.fixed_point(x, w0.to_owned(), weights.slice(s![..k, ..]), k)?;
            weights.row_mut(k).assign(&w);
            iterations.push(niter);
        }

        let sources = weights.dot(x);
        let negentropy = sources
            .outer_iter()
            .map(|s| self.contrast().negentropy(&s))
            .collect();

        Ok(Components {
            weights,
            sources,
            iterations,
            negentropy,
        })
    }

    // One-unit FastICA, confined to the orthogonal complement of the rows of `found`
    fn fixed_point<D: Data<Elem = F>>(
        &self,
        x: &ArrayBase<D, Ix2>,
        w0: Array1<F>,
        found: ArrayView2<F>,
        component: usize,
    ) -> Result<(Array1<F>, usize)> {
        let nsamples = F::cast(x.ncols());
        let mut w = normalize(deflate(w0, found), component)?;
        let mut lim = F::infinity();

        for iter in 0..self.max_iter() {
            let (gwtx, g_wtx) = self.contrast().exec(&w.dot(x));

            let wnew = x.dot(&gwtx) / nsamples - &w * g_wtx;
            let wnew = normalize(deflate(wnew, found), component)?;

            // The sign of `w` may flip between iterations, only its direction
            // has to settle
            lim = (wnew.dot(&w).abs() - F::one()).abs();
            w = wnew;

            log::trace!("component {} iteration {}: lim = {}", component, iter, lim);
            if lim < self.tol() {
                log::debug!("component {} converged after {} iterations", component, iter + 1);
                return Ok((w, iter + 1));
            }
        }

        Err(FastIcaError::NotConverged {
            component,
            max_iter: self.max_iter(),
            error: lim.to_f64().unwrap_or(f64::NAN),
        })
    }

    // Standard normal starting points, one per row
    fn random_weights(&self, nrows: usize, ncols: usize) -> Array2<F> {
        let w: Array2<f64> = if let Some(seed) = self.random_state() {
            let mut rng = Xoshiro256Plus::seed_from_u64(*seed as u64);
            Array2::random_using((nrows, ncols), StandardNormal, &mut rng)
        } else {
            let mut rng = Xoshiro256Plus::from_entropy();
            Array2::random_using((nrows, ncols), StandardNormal, &mut rng)
        };
        w.mapv(F::cast)
    }
}

fn check_ncomponents(ncomponents: usize, nchannels: usize) -> Result<()> {
    if ncomponents == 0 || ncomponents > nchannels {
        return Err(FastIcaError::InvalidValue(format!(
            "number of components must be between 1 and the number of channels ({}), got {}",
            nchannels, ncomponents
        )));
    }
    Ok(())
}

fn check_whitened_dim(nchannels: usize, nsamples: usize) -> Result<()> {
    if nchannels == 0 || nsamples == 0 {
        return Err(FastIcaError::InvalidValue(format!(
            "whitened data must be non-empty, got shape ({}, {})",
            nchannels, nsamples
        )));
    }
    Ok(())
}

// Gram-Schmidt: w ← w - Σ (wᵀb) b over the orthonormal rows b of `found`
fn deflate<F: Float>(w: Array1<F>, found: ArrayView2<F>) -> Array1<F> {
    if found.nrows() == 0 {
        return w;
    }
    let projections = found.dot(&w);
    w - found.t().dot(&projections)
}

fn normalize<F: Float>(w: Array1<F>, component: usize) -> Result<Array1<F>> {
    let norm = w.dot(&w).sqrt();
    if !norm.is_finite() || norm <= F::epsilon() {
        return Err(FastIcaError::DegenerateDirection(component));
    }
    Ok(w / norm)
}

/// Independent components extracted from whitened data
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Components<F> {
    weights: Array2<F>,
    sources: Array2<F>,
    iterations: Vec<usize>,
    negentropy: Array1<F>,
}

impl<F: Float> Components<F> {
    /// Unit-norm, mutually orthogonal unmixing vectors, one per row `(c, N)`
    pub fn weights(&self) -> ArrayView2<F> {
        self.weights.view()
    }

    /// Separated signals `weights · x`, one per row `(c, M)`
    pub fn sources(&self) -> ArrayView2<F> {
        self.sources.view()
    }

    /// Fixed-point iterations spent on every component
    pub fn iterations(&self) -> &[usize] {
        &self.iterations
    }

    /// Approximate negentropy of every separated signal
    pub fn negentropy(&self) -> ArrayView1<F> {
        self.negentropy.view()
    }

    pub fn ncomponents(&self) -> usize {
        self.weights.nrows()
    }

    pub fn into_weights(self) -> Array2<F> {
        self.weights
    }
}

/// Fitted FastICA model for recovering the sources
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct FastIca<F> {
    mean: Array1<F>,
    components: Array2<F>,
    unmixing: Array2<F>,
    mixing: Array2<F>,
    iterations: Vec<usize>,
    negentropy: Array1<F>,
}

impl<F: Float> FastIca<F> {
    /// Unmixing matrix applied to centered records, `(ncomponents, nfeatures)`
    pub fn components(&self) -> ArrayView2<F> {
        self.components.view()
    }

    /// Orthonormal unmixing matrix in the whitened space, `(ncomponents, nfeatures)`
    pub fn unmixing(&self) -> ArrayView2<F> {
        self.unmixing.view()
    }

    /// Estimated mixing matrix, `(nfeatures, ncomponents)`
    ///
    /// Column `k` is the contribution of source `k` to every observed feature.
    pub fn mixing(&self) -> ArrayView2<F> {
        self.mixing.view()
    }

    /// Feature means removed before unmixing
    pub fn mean(&self) -> ArrayView1<F> {
        self.mean.view()
    }

    pub fn iterations(&self) -> &[usize] {
        &self.iterations
    }

    pub fn negentropy(&self) -> ArrayView1<F> {
        self.negentropy.view()
    }

    pub fn ncomponents(&self) -> usize {
        self.components.nrows()
    }
}

impl<F: Float> PredictInplace<Array2<F>, Array2<F>> for FastIca<F> {
    /// Recover the sources
    fn predict_inplace(&self, x: &Array2<F>, y: &mut Array2<F>) {
        assert_eq!(
            y.shape(),
            &[x.nrows(), self.components.nrows()],
            "The number of data points must match the number of output targets."
        );

        let xcentered = x - &self.mean.view().insert_axis(Axis(0));
        *y = xcentered.dot(&self.components.t());
    }

    fn default_target(&self, x: &Array2<F>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.components.nrows()))
    }
}
