//! Cross-nested logit: alternatives may belong to several nests.
//!
//! Each membership carries an allocation weight `alpha`; for every submitted
//! alternative the weights over all claiming nests must sum to one. An
//! alternative's probability is the sum over its leaves.

use std::fmt::Debug;

use dc_core::{DistributionFunction, Error, Probabilities, Result, Utilities, label};
use rayon::prelude::*;

use crate::engine::{Situation, evaluate, situations};
use crate::structure::{NestStructure, NodeKind};

/// Absolute tolerance on `Σ alpha = 1`.
pub const ALLOCATION_TOLERANCE: f64 = 1e-9;

/// Cross-nested logit distribution.
#[derive(Debug, Clone)]
pub struct CrossNestedLogit<A, P> {
    structure: NestStructure<A, P>,
}

impl<A, P> CrossNestedLogit<A, P>
where
    A: Ord + Clone + Debug,
{
    /// Wrap a structure. Tree-shaped structures are accepted as the
    /// degenerate case where every alternative has one leaf with alpha 1.
    pub fn new(structure: NestStructure<A, P>) -> Self {
        Self { structure }
    }

    /// Underlying structure.
    pub fn structure(&self) -> &NestStructure<A, P> {
        &self.structure
    }

    /// Probabilities over exactly the alternatives in `utilities`.
    pub fn probabilities(
        &self,
        utilities: &Utilities<A>,
        parameters: &P,
    ) -> Result<Probabilities<A>> {
        let sits = situations(&self.structure, utilities)?;
        self.check_allocation(utilities, parameters)?;
        let scratch = evaluate(&self.structure, &sits, parameters)?;

        let mut out = Probabilities::new();
        for Situation { alternative, leaf, .. } in &sits {
            *out.entry((*alternative).clone()).or_insert(0.0) += scratch.probability(*leaf);
        }
        Ok(out)
    }

    /// Every submitted alternative's alphas must lie in `(0, 1]` and sum to one.
    fn check_allocation(&self, utilities: &Utilities<A>, parameters: &P) -> Result<()> {
        let mut offenders = Vec::new();
        for alternative in utilities.keys() {
            let Some(leaves) = self.structure.leaves_of(alternative) else {
                continue;
            };
            let mut sum = 0.0;
            let mut valid = true;
            for &leaf in leaves {
                if let NodeKind::Leaf { alpha } = self.structure.node(leaf).kind() {
                    let a = alpha.resolve(parameters);
                    valid &= a > 0.0 && a <= 1.0;
                    sum += a;
                }
            }
            if !valid || (sum - 1.0).abs() > ALLOCATION_TOLERANCE {
                offenders.push((label(alternative), sum));
            }
        }
        if offenders.is_empty() { Ok(()) } else { Err(Error::InvalidAllocationWeights(offenders)) }
    }
}

impl<A, P> CrossNestedLogit<A, P>
where
    A: Ord + Clone + Debug + Send + Sync,
    P: Sync,
{
    /// Evaluate many utility maps in parallel, one result per input.
    pub fn probabilities_batch(
        &self,
        inputs: &[Utilities<A>],
        parameters: &P,
    ) -> Vec<Result<Probabilities<A>>> {
        inputs.par_iter().map(|u| self.probabilities(u, parameters)).collect()
    }
}

impl<A, P> DistributionFunction<A, P> for CrossNestedLogit<A, P>
where
    A: Ord + Clone + Debug + Send + Sync,
{
    fn calculate_probabilities(
        &self,
        utilities: &Utilities<A>,
        parameters: &P,
    ) -> Result<Probabilities<A>> {
        self.probabilities(utilities, parameters)
    }
}
