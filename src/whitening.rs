//! Decorrelation of observed mixtures
//!
//! Given an observation matrix `X` of shape `(N, M)` (one channel per row, one
//! sample per column), whitening finds a matrix `W` such that the covariance of
//! `W·(X - mean)` is the identity. This uses the symmetric (ZCA) form
//!
//! ```text
//! W = V · D^(-1/2) · Vᵀ,    cov(X) = V · D · Vᵀ
//! ```
//!
//! which keeps the whitened channels as close as possible to the originals.
//! The input is never modified: centering produces a new matrix.

use linfa::dataset::{WithLapack, WithoutLapack};
use linfa::Float;
#[cfg(not(feature = "blas"))]
use linfa_linalg::eigh::EighInto;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};
#[cfg(feature = "blas")]
use ndarray_linalg::{eigh::Eigh, solveh::UPLO};
use ndarray_stats::QuantileExt;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{FastIcaError, Result};

/// Fitted whitening transform
///
/// Obtained with [`Whitening::fit`]; applying [`Whitening::transform`] to the
/// data it was fitted on yields rows with zero mean and identity covariance.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Whitening<F> {
    mean: Array1<F>,
    eigenvalues: Array1<F>,
    eigenvectors: Array2<F>,
    whitening: Array2<F>,
}

impl<F: Float> Whitening<F> {
    /// Estimate the whitening transform of a channel-major matrix `(N, M)`
    ///
    /// # Errors
    ///
    /// - [`FastIcaError::InvalidValue`] if `x` is empty or contains NaN/infinite values
    /// - [`FastIcaError::NotEnoughSamples`] if there are fewer samples than channels
    /// - [`FastIcaError::SingularCovariance`] if an eigenvalue of the covariance
    ///   matrix is (numerically) zero
    pub fn fit<D: Data<Elem = F>>(x: &ArrayBase<D, Ix2>) -> Result<Self> {
        let (nchannels, nsamples) = x.dim();
        if nchannels == 0 || nsamples == 0 {
            return Err(FastIcaError::InvalidValue(format!(
                "observation matrix must be non-empty, got shape ({}, {})",
                nchannels, nsamples
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FastIcaError::InvalidValue(
                "observation matrix contains NaN or infinite values".to_string(),
            ));
        }
        if nsamples < nchannels {
            return Err(FastIcaError::NotEnoughSamples {
                channels: nchannels,
                samples: nsamples,
            });
        }

        let mean = x.mean_axis(Axis(1)).ok_or(FastIcaError::NotEnoughSamples {
            channels: nchannels,
            samples: nsamples,
        })?;
        let xcentered = x - &mean.view().insert_axis(Axis(1));

        // population covariance, so that the sample average of z·zᵀ is exactly I
        let cov = xcentered.dot(&xcentered.t()) / F::cast(nsamples);
        if cov.diag().iter().all(|&v| v <= F::zero()) {
            return Err(FastIcaError::SingularCovariance {
                eigenvalue: 0.,
                largest: 0.,
            });
        }
        let (eigenvalues, eigenvectors) = eigh(cov)?;

        let largest = *eigenvalues
            .max()
            .map_err(|_| FastIcaError::SingularCovariance {
                eigenvalue: f64::NAN,
                largest: f64::NAN,
            })?;
        // relative rank tolerance: anything below this is eigensolver noise
        let threshold = largest.max(F::zero()) * F::epsilon() * F::cast(nchannels);
        if let Some(&smallest) = eigenvalues
            .iter()
            .find(|&&v| !v.is_finite() || v <= threshold)
        {
            return Err(FastIcaError::SingularCovariance {
                eigenvalue: smallest.to_f64().unwrap_or(f64::NAN),
                largest: largest.to_f64().unwrap_or(f64::NAN),
            });
        }

        log::debug!(
            "whitening {} channels x {} samples, covariance eigenvalues in [{}, {}]",
            nchannels,
            nsamples,
            eigenvalues.min().map(|v| *v).unwrap_or(largest),
            largest
        );

        let inv_sqrt = eigenvalues.mapv(|v| v.sqrt().recip());
        let whitening = (&eigenvectors * &inv_sqrt.insert_axis(Axis(0))).dot(&eigenvectors.t());

        Ok(Whitening {
            mean,
            eigenvalues,
            eigenvectors,
            whitening,
        })
    }

    /// Center `x` with the fitted channel means and apply the whitening matrix
    pub fn transform<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix2>) -> Result<Array2<F>> {
        if x.nrows() != self.mean.len() {
            return Err(FastIcaError::InvalidValue(format!(
                "expected {} channels, got {}",
                self.mean.len(),
                x.nrows()
            )));
        }
        let xcentered = x - &self.mean.view().insert_axis(Axis(1));

        Ok(self.whitening.dot(&xcentered))
    }

    /// The whitening operator `V · D^(-1/2) · Vᵀ`
    pub fn whitening_matrix(&self) -> ArrayView2<F> {
        self.whitening.view()
    }

    /// Inverse of the whitening operator, `V · D^(1/2) · Vᵀ`
    pub fn dewhitening_matrix(&self) -> Array2<F> {
        let sqrt = self.eigenvalues.mapv(|v| v.sqrt());
        (&self.eigenvectors * &sqrt.insert_axis(Axis(0))).dot(&self.eigenvectors.t())
    }

    /// Per-channel means subtracted before whitening
    pub fn mean(&self) -> ArrayView1<F> {
        self.mean.view()
    }

    /// Eigenvalues of the covariance matrix
    pub fn eigenvalues(&self) -> ArrayView1<F> {
        self.eigenvalues.view()
    }

    pub fn nchannels(&self) -> usize {
        self.mean.len()
    }
}

/// Whiten a channel-major matrix `(N, M)`, returning a new matrix of the same
/// shape whose covariance is the identity
///
/// Shorthand for [`Whitening::fit`] followed by [`Whitening::transform`].
pub fn whiten<F: Float, D: Data<Elem = F>>(x: &ArrayBase<D, Ix2>) -> Result<Array2<F>> {
    Whitening::fit(x)?.transform(x)
}

#[cfg(not(feature = "blas"))]
fn eigh<F: Float>(cov: Array2<F>) -> Result<(Array1<F>, Array2<F>)> {
    let (eig_val, eig_vec) = cov.with_lapack().eigh_into()?;
    Ok((eig_val.mapv(F::cast), eig_vec.without_lapack()))
}

#[cfg(feature = "blas")]
fn eigh<F: Float>(cov: Array2<F>) -> Result<(Array1<F>, Array2<F>)> {
    let (eig_val, eig_vec) = cov.with_lapack().eigh(UPLO::Upper)?;
    Ok((eig_val.mapv(F::cast), eig_vec.without_lapack()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::{
        rand::SeedableRng,
        rand_distr::{StandardNormal, Uniform},
        RandomExt,
    };
    use rand_xoshiro::Xoshiro256Plus;

    fn cov<D: Data<Elem = f64>>(x: &ArrayBase<D, Ix2>) -> Array2<f64> {
        let mean = x.mean_axis(Axis(1)).unwrap();
        let xc = x - &mean.insert_axis(Axis(1));
        xc.dot(&xc.t()) / (x.ncols() as f64)
    }

    // A correlated (7, 1000) mixture of uniform signals
    fn correlated(seed: u64) -> Array2<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let sources = Array2::random_using((7, 1000), Uniform::new(-30., 30.), &mut rng);
        let mixing = Array2::random_using((7, 7), Uniform::new(-1., 1.), &mut rng)
            + Array2::<f64>::eye(7) * 2.;
        mixing.dot(&sources)
    }

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<Whitening<f64>>();
    }

    #[test]
    fn test_whitened_covariance_is_identity() {
        for seed in [1, 17, 42].iter() {
            let x = correlated(*seed);
            let xw = whiten(&x).unwrap();
            assert_eq!(xw.dim(), x.dim());

            let residual = cov(&xw) - Array2::<f64>::eye(7);
            let frobenius = residual.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!(frobenius < 1e-6, "‖cov - I‖ = {}", frobenius);
            assert_abs_diff_eq!(xw.mean_axis(Axis(1)).unwrap(), Array1::zeros(7), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_whitening_matrix_inverts_covariance() {
        let x = correlated(3);
        let whitening = Whitening::fit(&x).unwrap();
        let w = whitening.whitening_matrix();

        assert_abs_diff_eq!(w, w.t(), epsilon = 1e-10);
        assert_abs_diff_eq!(
            w.dot(&cov(&x)).dot(&w.t()),
            Array2::eye(7),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            whitening.dewhitening_matrix().dot(&w),
            Array2::eye(7),
            epsilon = 1e-9
        );
        assert!(whitening.eigenvalues().iter().all(|&v| v > 0.));
        assert_eq!(whitening.nchannels(), 7);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let x = correlated(5);
        let before = x.clone();
        let _ = whiten(&x).unwrap();
        assert_eq!(x, before);
    }

    #[test]
    fn test_whitening_whitened_data() {
        let xw = whiten(&correlated(11)).unwrap();
        let whitening = Whitening::fit(&xw).unwrap();
        assert_abs_diff_eq!(whitening.whitening_matrix(), Array2::eye(7), epsilon = 1e-6);

        let xww = whitening.transform(&xw).unwrap();
        assert_abs_diff_eq!(cov(&xww), Array2::eye(7), epsilon = 1e-9);
    }

    #[test]
    fn test_transform_held_out_data() {
        let mut rng = Xoshiro256Plus::seed_from_u64(8);
        let mixing = array![[2., 1., 0.], [0.5, 1., 0.3], [0., 0.2, 1.]];
        let train = mixing.dot(&Array2::<f64>::random_using((3, 5000), StandardNormal, &mut rng));
        let test = mixing.dot(&Array2::<f64>::random_using((3, 5000), StandardNormal, &mut rng));

        let whitening = Whitening::fit(&train).unwrap();
        let tw = whitening.transform(&test).unwrap();
        assert_abs_diff_eq!(cov(&tw), Array2::eye(3), epsilon = 0.1);
    }

    #[test]
    fn test_whiten_f32() {
        let x = correlated(21).mapv(|v| v as f32);
        let xw = whiten(&x).unwrap();
        let xw = xw.mapv(|v| v as f64);
        assert_abs_diff_eq!(cov(&xw), Array2::eye(7), epsilon = 1e-2);
    }

    // Badly scaled but independent channels are well conditioned enough for f32
    #[test]
    fn test_whiten_f32_scaled_channels() {
        let mut rng = Xoshiro256Plus::seed_from_u64(30);
        let mut x = Array2::<f32>::random_using((2, 2000), Uniform::new(-1f32, 1.), &mut rng);
        x.row_mut(1).mapv_inplace(|v| v * 100.);

        let whitening = Whitening::fit(&x).unwrap();
        let eig = whitening.eigenvalues();
        assert!(eig.iter().all(|&v| v > 0.3), "{:?}", eig);

        let xw = whitening.transform(&x).unwrap().mapv(|v| v as f64);
        assert_abs_diff_eq!(cov(&xw), Array2::eye(2), epsilon = 1e-2);
    }

    #[test]
    fn test_not_enough_samples() {
        let x = Array::linspace(0., 1., 6).into_shape((3, 2)).unwrap();
        assert!(matches!(
            whiten(&x),
            Err(FastIcaError::NotEnoughSamples {
                channels: 3,
                samples: 2
            })
        ));
    }

    #[test]
    fn test_empty_and_non_finite_input() {
        let empty = Array2::<f64>::zeros((0, 10));
        assert!(matches!(whiten(&empty), Err(FastIcaError::InvalidValue(_))));

        let mut x = correlated(2);
        x[[3, 100]] = f64::NAN;
        assert!(matches!(whiten(&x), Err(FastIcaError::InvalidValue(_))));
    }

    #[test]
    fn test_duplicate_channel_is_singular() {
        let mut rng = Xoshiro256Plus::seed_from_u64(4);
        let row = Array1::<f64>::random_using(500, StandardNormal, &mut rng);
        let mut x = Array2::<f64>::zeros((2, 500));
        x.row_mut(0).assign(&row);
        x.row_mut(1).assign(&row);

        let err = whiten(&x).unwrap_err();
        assert!(matches!(err, FastIcaError::SingularCovariance { .. }), "{}", err);
    }

    #[test]
    fn test_near_degenerate_input_is_singular() {
        let mut rng = Xoshiro256Plus::seed_from_u64(9);
        let row: Array1<f64> = Array1::random_using(500, StandardNormal, &mut rng);
        let noise: Array1<f64> = Array1::random_using(500, StandardNormal, &mut rng);
        let mut x = Array2::<f64>::zeros((3, 500));
        x.row_mut(0).assign(&row);
        x.row_mut(1).assign(&(&row * 2. + &noise * 1e-9));
        x.row_mut(2).assign(&noise);

        let err = whiten(&x).unwrap_err();
        assert!(matches!(err, FastIcaError::SingularCovariance { .. }), "{}", err);
    }

    #[test]
    fn test_constant_channel_is_singular() {
        let mut x = correlated(6);
        x.row_mut(2).fill(4.2);
        assert!(matches!(
            Whitening::fit(&x),
            Err(FastIcaError::SingularCovariance { .. })
        ));
    }

    #[test]
    fn test_transform_channel_mismatch() {
        let whitening = Whitening::fit(&correlated(1)).unwrap();
        let other = Array2::<f64>::zeros((3, 10));
        assert!(matches!(
            whitening.transform(&other),
            Err(FastIcaError::InvalidValue(_))
        ));
    }
}
