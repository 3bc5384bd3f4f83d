//! # Independent Component Analysis (ICA)
//!
//! `linfa-fastica` provides a pure Rust implementation of the deflationary
//! FastICA algorithm for blind source separation.
//!
//! ICA separates multivariate signals into their additive, independent
//! subcomponents. Given observations that are linear mixtures of statistically
//! independent, non-Gaussian sources, it recovers an unmixing transform up to
//! the sign, scale and order of the sources.
//!
//! ## The Big Picture
//!
//! `linfa-fastica` is a crate in the [`linfa`](https://crates.io/crates/linfa) ecosystem,
//! an effort to create a toolkit for classical Machine Learning implemented in pure Rust,
//! akin to Python's `scikit-learn`.
//!
//! ## Current state
//!
//! The estimation pipeline has two stages:
//!
//! - [`whitening`]: center every channel and decorrelate the data with the
//!   inverse square root of its covariance matrix
//! - [`fast_ica`]: extract one component at a time with the FastICA fixed-point
//!   iteration, deflating against the components already found
//!
//! The non-linearity used to measure non-Gaussianity is selected with
//! [`Contrast`], either the general log-cosh family or the robust Gaussian one.
//!
//! ## Example
//!
//! ```no_run
//! use linfa::prelude::*;
//! use linfa_fastica::{FastIca, Contrast};
//! use ndarray::array;
//!
//! // (nsamples, nfeatures): every feature is one observed mixture
//! let records = array![[1.0, 2.1], [0.3, -0.5], [-1.2, 0.4], [0.8, -2.0], [0.1, 0.9]];
//! let dataset = DatasetBase::from(records.clone());
//!
//! let ica = FastIca::params()
//!     .contrast(Contrast::General)
//!     .random_state(42)
//!     .fit(&dataset)?;
//! let sources = ica.predict(&records);
//! # Ok::<(), linfa_fastica::FastIcaError>(())
//! ```
//!
//! The two stages can also be driven by hand on channel-major `(N, M)` data:
//!
//! ```no_run
//! use linfa::ParamGuard;
//! use linfa_fastica::FastIca;
//! use ndarray::Array2;
//!
//! let x: Array2<f64> = Array2::zeros((2, 1000));
//! let params = FastIca::params().general(false).check()?;
//! let xw = params.whiten(&x)?;
//! let components = params.extract_many(&xw, 2)?;
//! let sources = components.sources();
//! # Ok::<(), linfa_fastica::FastIcaError>(())
//! ```

#[macro_use]
extern crate ndarray;

pub mod contrast;
pub mod error;
pub mod fast_ica;
mod hyperparams;
pub mod whitening;

pub use contrast::{Contrast, ContrastFunction, Gauss, LogCosh};
pub use error::{FastIcaError, Result};
pub use fast_ica::{Components, FastIca};
pub use hyperparams::{FastIcaParams, FastIcaValidParams};
pub use whitening::{whiten, Whitening};
