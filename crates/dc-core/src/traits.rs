//! Core traits for the discrete-choice engine
//!
//! A choice model is assembled from two seams: a distribution function that
//! turns utilities into probabilities, and a selection function that turns
//! probabilities into one alternative. Both are object safe so models can
//! hold them boxed.

use crate::Result;
use crate::types::{Probabilities, Utilities};

/// Turns a map of precomputed utilities into a probability distribution.
///
/// Implementations must return probabilities for exactly the submitted
/// alternatives, summing to one.
pub trait DistributionFunction<A, P>: Send + Sync {
    /// Compute `alternative -> probability` for the given utilities.
    fn calculate_probabilities(
        &self,
        utilities: &Utilities<A>,
        parameters: &P,
    ) -> Result<Probabilities<A>>;
}

/// Picks one alternative out of a probability map given a uniform draw in `[0, 1)`.
pub trait SelectionFunction<A>: Send + Sync {
    /// Select one of the keys of `options`.
    fn select(&self, options: &Probabilities<A>, draw: f64) -> Result<A>;
}

impl<A, P, T> DistributionFunction<A, P> for Box<T>
where
    T: DistributionFunction<A, P> + ?Sized,
{
    fn calculate_probabilities(
        &self,
        utilities: &Utilities<A>,
        parameters: &P,
    ) -> Result<Probabilities<A>> {
        (**self).calculate_probabilities(utilities, parameters)
    }
}

impl<A, T> SelectionFunction<A> for Box<T>
where
    T: SelectionFunction<A> + ?Sized,
{
    fn select(&self, options: &Probabilities<A>, draw: f64) -> Result<A> {
        (**self).select(options, draw)
    }
}
