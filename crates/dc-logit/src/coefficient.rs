//! Scale (`lambda`) and allocation (`alpha`) coefficients.
//!
//! Coefficients are resolved against the caller's parameter object at
//! evaluation time, so one structure can serve many parameter sets.

use std::fmt;
use std::sync::Arc;

/// A real-valued coefficient that is either fixed or derived from the parameters.
pub enum Coefficient<P> {
    /// Constant value.
    Fixed(f64),
    /// Value computed from the parameter object on every evaluation.
    Derived(Arc<dyn Fn(&P) -> f64 + Send + Sync>),
}

impl<P> Coefficient<P> {
    /// Coefficient derived from the parameters.
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&P) -> f64 + Send + Sync + 'static,
    {
        Self::Derived(Arc::new(f))
    }

    /// Resolve against a parameter object.
    #[inline]
    pub fn resolve(&self, parameters: &P) -> f64 {
        match self {
            Self::Fixed(v) => *v,
            Self::Derived(f) => f(parameters),
        }
    }

    /// `true` for a fixed coefficient equal to `value`.
    pub fn is_fixed(&self, value: f64) -> bool {
        matches!(self, Self::Fixed(v) if *v == value)
    }
}

impl<P> Clone for Coefficient<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(v) => Self::Fixed(*v),
            Self::Derived(f) => Self::Derived(Arc::clone(f)),
        }
    }
}

impl<P> From<f64> for Coefficient<P> {
    fn from(v: f64) -> Self {
        Self::Fixed(v)
    }
}

impl<P> fmt::Debug for Coefficient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl<P> fmt::Display for Coefficient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => write!(f, "{v}"),
            Self::Derived(_) => f.write_str("f(params)"),
        }
    }
}
