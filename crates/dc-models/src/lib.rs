//! # dc-models
//!
//! Composition layer on top of the distribution functions: utility
//! functions and their assignment to alternatives, choice models with fixed
//! or filtered choice sets, and parameter files with a small expression
//! language.

#![warn(missing_docs)]

pub mod expr;
pub mod model;
pub mod params;
pub mod utility;

pub use expr::CompiledExpr;
pub use model::{
    ChoiceFilter, ChoiceModel, DiscreteChoiceModel, FilteredChoiceModel, FixedChoiceModel,
    FixedOrderChoiceModel, Injection, RandomChoiceModel, cross_nested_logit, multinomial_logit,
    nested_logit,
};
pub use params::ParameterSet;
pub use utility::{
    RuleBasedUtilityAssignment, SharedUtility, StaticUtilityAssignment, UtilityAssignment,
    UtilityEnumeration, UtilityFunction,
};
