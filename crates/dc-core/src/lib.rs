//! # dc-core
//!
//! Shared vocabulary of the discrete-choice workspace: the error type, the
//! distribution/selection seams and the ordered map aliases used to pass
//! utilities and probabilities around.

#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{DistributionFunction, SelectionFunction};
pub use types::{ChoiceReport, Probabilities, Utilities, label};
