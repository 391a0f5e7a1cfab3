//! Utility functions and the strategies that assign them to alternatives.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use dc_core::{Error, Result, label};

/// Utility of `alternative` for a decision maker with `characteristics` under `parameters`.
pub trait UtilityFunction<A, C, P>: Send + Sync {
    /// Compute the utility.
    fn calculate_utility(&self, alternative: &A, characteristics: &C, parameters: &P) -> f64;
}

impl<A, C, P, F> UtilityFunction<A, C, P> for F
where
    F: Fn(&A, &C, &P) -> f64 + Send + Sync,
{
    fn calculate_utility(&self, alternative: &A, characteristics: &C, parameters: &P) -> f64 {
        self(alternative, characteristics, parameters)
    }
}

/// Shared, type-erased utility function.
pub type SharedUtility<A, C, P> = Arc<dyn UtilityFunction<A, C, P>>;

/// Looks up the utility function responsible for an alternative.
pub trait UtilityAssignment<A, C, P>: Send + Sync {
    /// Function for `alternative`, or `None` if no function covers it.
    fn utility_function_for(&self, alternative: &A) -> Option<&dyn UtilityFunction<A, C, P>>;
}

/// One utility function per known alternative.
pub struct UtilityEnumeration<A, C, P> {
    functions: BTreeMap<A, SharedUtility<A, C, P>>,
}

impl<A, C, P> UtilityEnumeration<A, C, P>
where
    A: Ord + Clone + Debug,
{
    /// Empty enumeration.
    pub fn new() -> Self {
        Self { functions: BTreeMap::new() }
    }

    /// Register `function` for `alternative`. Registering an alternative twice is an error.
    pub fn with<F>(mut self, alternative: A, function: F) -> Result<Self>
    where
        F: UtilityFunction<A, C, P> + 'static,
    {
        self.insert(alternative, Arc::new(function))?;
        Ok(self)
    }

    /// Register a shared function for `alternative`.
    pub fn insert(&mut self, alternative: A, function: SharedUtility<A, C, P>) -> Result<()> {
        if self.functions.contains_key(&alternative) {
            return Err(Error::Structure(format!(
                "a utility function for {} is already registered",
                label(&alternative)
            )));
        }
        self.functions.insert(alternative, function);
        Ok(())
    }

    /// Alternatives with a registered function, in key order.
    pub fn options(&self) -> impl Iterator<Item = &A> {
        self.functions.keys()
    }

    /// Number of registered alternatives.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<A, C, P> Default for UtilityEnumeration<A, C, P>
where
    A: Ord + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, C, P> UtilityAssignment<A, C, P> for UtilityEnumeration<A, C, P>
where
    A: Ord + Send + Sync,
{
    fn utility_function_for(&self, alternative: &A) -> Option<&dyn UtilityFunction<A, C, P>> {
        self.functions.get(alternative).map(|f| f.as_ref())
    }
}

type Condition<A> = Box<dyn Fn(&A) -> bool + Send + Sync>;

/// Ordered rules; the first rule whose condition holds supplies the function.
pub struct RuleBasedUtilityAssignment<A, C, P> {
    rules: Vec<(Condition<A>, SharedUtility<A, C, P>)>,
}

impl<A, C, P> RuleBasedUtilityAssignment<A, C, P> {
    /// No rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule.
    pub fn rule<W, F>(mut self, condition: W, function: F) -> Self
    where
        W: Fn(&A) -> bool + Send + Sync + 'static,
        F: UtilityFunction<A, C, P> + 'static,
    {
        self.rules.push((Box::new(condition), Arc::new(function)));
        self
    }

    /// Append a catch-all rule.
    pub fn rule_for_all<F>(self, function: F) -> Self
    where
        F: UtilityFunction<A, C, P> + 'static,
    {
        self.rule(|_| true, function)
    }
}

impl<A, C, P> Default for RuleBasedUtilityAssignment<A, C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, C, P> UtilityAssignment<A, C, P> for RuleBasedUtilityAssignment<A, C, P> {
    fn utility_function_for(&self, alternative: &A) -> Option<&dyn UtilityFunction<A, C, P>> {
        self.rules.iter().find(|(condition, _)| condition(alternative)).map(|(_, f)| f.as_ref())
    }
}

/// The same function for every alternative.
pub struct StaticUtilityAssignment<A, C, P> {
    function: SharedUtility<A, C, P>,
}

impl<A, C, P> StaticUtilityAssignment<A, C, P> {
    /// Wrap `function`.
    pub fn new<F>(function: F) -> Self
    where
        F: UtilityFunction<A, C, P> + 'static,
    {
        Self { function: Arc::new(function) }
    }
}

impl<A, C, P> UtilityAssignment<A, C, P> for StaticUtilityAssignment<A, C, P> {
    fn utility_function_for(&self, _alternative: &A) -> Option<&dyn UtilityFunction<A, C, P>> {
        Some(self.function.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        age: f64,
    }

    struct Params {
        b_age: f64,
    }

    #[test]
    fn test_enumeration() {
        let e = UtilityEnumeration::new()
            .with("car", |_: &&str, c: &Person, p: &Params| p.b_age * c.age)
            .unwrap()
            .with("walk", |_: &&str, _: &Person, _: &Params| 0.0)
            .unwrap();
        assert_eq!(e.options().copied().collect::<Vec<_>>(), vec!["car", "walk"]);

        let f = e.utility_function_for(&"car").unwrap();
        assert_eq!(f.calculate_utility(&"car", &Person { age: 40.0 }, &Params { b_age: 0.1 }), 4.0);
        assert!(e.utility_function_for(&"bike").is_none());

        let dup = e.with("car", |_: &&str, _: &Person, _: &Params| 1.0);
        assert!(matches!(dup, Err(Error::Structure(_))));
    }

    #[test]
    fn test_rules_first_match_wins() {
        let rules = RuleBasedUtilityAssignment::<u32, (), ()>::new()
            .rule(|a| *a < 10, |_: &u32, _: &(), _: &()| 1.0)
            .rule(|a| *a < 100, |_: &u32, _: &(), _: &()| 2.0);
        let at = |a: u32| rules.utility_function_for(&a).map(|f| f.calculate_utility(&a, &(), &()));
        assert_eq!(at(5), Some(1.0));
        assert_eq!(at(50), Some(2.0));
        assert_eq!(at(500), None);

        let rules = rules.rule_for_all(|a: &u32, _: &(), _: &()| *a as f64);
        let at = |a: u32| rules.utility_function_for(&a).map(|f| f.calculate_utility(&a, &(), &()));
        assert_eq!(at(500), Some(500.0));
    }

    #[test]
    fn test_static_assignment() {
        let s = StaticUtilityAssignment::new(|a: &i32, _: &(), _: &()| -(*a as f64));
        for a in [-3, 0, 7] {
            let f = s.utility_function_for(&a).unwrap();
            assert_eq!(f.calculate_utility(&a, &(), &()), -(a as f64));
        }
    }
}
