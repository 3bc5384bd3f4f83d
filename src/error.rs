//! Error types for FastICA
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FastIcaError>;

/// An error when whitening data or extracting independent components
#[derive(Error, Debug)]
pub enum FastIcaError {
    /// When any of the inputs or hyperparameters have an invalid value
    #[error("Invalid value encountered: {0}")]
    InvalidValue(String),
    /// When there are fewer samples than channels, the covariance matrix
    /// cannot have full rank
    #[error("not enough samples: {channels} channels need at least {channels} samples, got {samples}")]
    NotEnoughSamples { channels: usize, samples: usize },
    /// When the covariance matrix has an eigenvalue too close to zero to take
    /// its inverse square root
    #[error("covariance matrix is singular or ill-conditioned (eigenvalue {eigenvalue:e}, largest {largest:e})")]
    SingularCovariance { eigenvalue: f64, largest: f64 },
    /// When the fixed-point update collapses onto the already extracted subspace
    #[error("weight vector of component {0} vanished after deflation")]
    DegenerateDirection(usize),
    /// When the fixed-point iteration did not settle within `max_iter` steps
    #[error("component {component} did not converge in {max_iter} iterations (|1 - |w'w_old|| = {error:e})")]
    NotConverged {
        component: usize,
        max_iter: usize,
        error: f64,
    },
    #[error("tolerance should be positive but is {0}")]
    InvalidTolerance(f32),
    #[error("max_iter should be at least 1")]
    InvalidMaxIter,
    /// Errors encountered during linear algebra operations
    #[cfg(feature = "blas")]
    #[error("Linalg BLAS error: {0}")]
    LinalgBlasError(#[from] ndarray_linalg::error::LinalgError),
    #[error("Linalg error: {0}")]
    LinalgError(#[from] linfa_linalg::LinalgError),
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
