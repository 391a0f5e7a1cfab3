//! Nested logit over a tree-shaped [`NestStructure`].

use std::fmt::Debug;

use dc_core::{DistributionFunction, Error, Probabilities, Result, Utilities};
use rayon::prelude::*;

use crate::engine::{evaluate, situations};
use crate::structure::{NestStructure, Nesting};

/// Nested logit distribution.
///
/// Evaluation allocates its own scratch, so one instance can be shared
/// between threads without locking.
#[derive(Debug, Clone)]
pub struct NestedLogit<A, P> {
    structure: NestStructure<A, P>,
}

impl<A, P> NestedLogit<A, P>
where
    A: Ord + Clone + Debug,
{
    /// Wrap a structure built with [`NestStructure::nested`].
    pub fn new(structure: NestStructure<A, P>) -> Result<Self> {
        if structure.nesting() != Nesting::Tree {
            return Err(Error::Structure(
                "nested logit requires a nested structure; use CrossNestedLogit for cross-nesting"
                    .to_string(),
            ));
        }
        Ok(Self { structure })
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
        let scratch = evaluate(&self.structure, &sits, parameters)?;
        Ok(sits.iter().map(|s| (s.alternative.clone(), scratch.probability(s.leaf))).collect())
    }
}

impl<A, P> NestedLogit<A, P>
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

impl<A, P> DistributionFunction<A, P> for NestedLogit<A, P>
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn red_bus(lambda: f64) -> NestedLogit<&'static str, ()> {
        NestedLogit::new(
            NestStructure::nested(|root| {
                root.option("car");
                root.nest("bus", lambda, |bus| {
                    bus.option("red").option("blue");
                });
            })
            .unwrap(),
        )
        .unwrap()
    }

    fn zeros(alts: &[&'static str]) -> Utilities<&'static str> {
        alts.iter().map(|&a| (a, 0.0)).collect()
    }

    #[test]
    fn test_independent_nest() {
        let p = red_bus(1.0).probabilities(&zeros(&["car", "red", "blue"]), &()).unwrap();
        for v in p.values() {
            assert_relative_eq!(*v, 1.0 / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_perfectly_correlated_nest() {
        let p =
            red_bus(f64::from_bits(1)).probabilities(&zeros(&["car", "red", "blue"]), &()).unwrap();
        assert_relative_eq!(p["car"], 0.5, epsilon = 1e-12);
        assert_relative_eq!(p["red"], 0.25, epsilon = 1e-12);
        assert_relative_eq!(p["blue"], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_subset_of_alternatives() {
        let model = red_bus(0.5);
        let p = model.probabilities(&zeros(&["car", "red"]), &()).unwrap();
        assert_eq!(p.len(), 2);
        assert_relative_eq!(p["car"], 0.5, epsilon = 1e-12);
        assert_relative_eq!(p["red"], 0.5, epsilon = 1e-12);

        let single = model.probabilities(&zeros(&["blue"]), &()).unwrap();
        assert_eq!(single["blue"], 1.0);
    }

    #[test]
    fn test_input_errors() {
        let model = red_bus(0.5);
        assert!(matches!(model.probabilities(&Utilities::new(), &()), Err(Error::EmptyInput)));

        let err = model.probabilities(&zeros(&["car", "train", "plane"]), &()).unwrap_err();
        match err {
            Error::UnknownAlternative(names) => assert_eq!(names, vec!["\"plane\"", "\"train\""]),
            other => panic!("unexpected error: {other}"),
        }

        let nan: Utilities<&str> = [("car", f64::NAN)].into_iter().collect();
        assert!(matches!(model.probabilities(&nan, &()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_rejects_cross_structure() {
        let s = NestStructure::<u32, ()>::cross_nested(|root| {
            root.option(1);
        })
        .unwrap();
        assert!(matches!(NestedLogit::new(s), Err(Error::Structure(_))));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let model = red_bus(0.3);
        let inputs: Vec<Utilities<&str>> = (0..32)
            .map(|i| [("car", i as f64 * 0.1), ("red", -0.2), ("blue", 0.4)].into_iter().collect())
            .collect();
        let batch = model.probabilities_batch(&inputs, &());
        for (u, got) in inputs.iter().zip(batch) {
            assert_eq!(got.unwrap(), model.probabilities(u, &()).unwrap());
        }
    }
}
