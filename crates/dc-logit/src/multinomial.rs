//! Multinomial logit: flat softmax over the submitted utilities.

use dc_core::{DistributionFunction, Error, Probabilities, Result, Utilities};
use dc_prob::softmax_map;

/// Flat logit distribution. Parameters are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultinomialLogit;

impl MultinomialLogit {
    /// Create the distribution.
    pub fn new() -> Self {
        Self
    }

    /// Probabilities for `utilities` without a parameter object.
    pub fn probabilities<A: Ord + Clone>(
        &self,
        utilities: &Utilities<A>,
    ) -> Result<Probabilities<A>> {
        if utilities.is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(bad) = utilities.values().find(|u| u.is_nan()) {
            return Err(Error::Validation(format!("utility must not be NaN, got {bad}")));
        }
        Ok(softmax_map(utilities))
    }
}

impl<A, P> DistributionFunction<A, P> for MultinomialLogit
where
    A: Ord + Clone + Send + Sync,
{
    fn calculate_probabilities(
        &self,
        utilities: &Utilities<A>,
        _parameters: &P,
    ) -> Result<Probabilities<A>> {
        self.probabilities(utilities)
    }
}
