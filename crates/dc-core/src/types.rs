//! Common data types for the discrete-choice engine

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// Utilities keyed by alternative.
///
/// Ordered maps keep iteration (and therefore cumulative selection) stable
/// across runs.
pub type Utilities<A> = BTreeMap<A, f64>;

/// Probabilities keyed by alternative.
pub type Probabilities<A> = BTreeMap<A, f64>;

/// Render an alternative for error messages and reports.
pub fn label<A: Debug>(alternative: &A) -> String {
    format!("{alternative:?}")
}

/// Outcome of evaluating a model for one decision situation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceReport {
    /// Model name
    pub model: String,

    /// Utility per alternative label
    pub utilities: BTreeMap<String, f64>,

    /// Probability per alternative label
    pub probabilities: BTreeMap<String, f64>,
}

impl ChoiceReport {
    /// Build a report from typed maps, keyed by each alternative's `Display` form.
    pub fn new<A: Display>(
        model: impl Into<String>,
        utilities: &Utilities<A>,
        probabilities: &Probabilities<A>,
    ) -> Self {
        Self {
            model: model.into(),
            utilities: utilities.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            probabilities: probabilities.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    /// Sum of all probabilities (should be 1 within floating tolerance).
    pub fn total_probability(&self) -> f64 {
        self.probabilities.values().sum()
    }
}
