//! Choice models: utilities, a distribution and a selection strategy combined.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Display};
use std::sync::Arc;

use dc_core::{
    ChoiceReport, DistributionFunction, Error, Probabilities, Result, SelectionFunction, Utilities,
    label,
};
use dc_logit::{CrossNestedLogit, MultinomialLogit, NestStructure, NestedLogit};
use dc_prob::{WeightedSelect, select_uniform};
use rand::{Rng, RngCore};

use crate::utility::{UtilityAssignment, UtilityEnumeration};

/// Per-alternative utility transform applied by [`DiscreteChoiceModel::select_injected`].
pub type Injection = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Anything that picks one alternative out of a choice set.
pub trait ChoiceModel<A, C> {
    /// Model name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Choose one of `choices` for a decision maker with `characteristics`.
    fn select(
        &self,
        choices: &BTreeSet<A>,
        characteristics: &C,
        rng: &mut dyn RngCore,
    ) -> Result<A>;
}

/// Utility-based choice model.
pub struct DiscreteChoiceModel<A, C, P> {
    name: String,
    assignment: Box<dyn UtilityAssignment<A, C, P>>,
    distribution: Box<dyn DistributionFunction<A, P>>,
    selection: Box<dyn SelectionFunction<A>>,
    parameters: P,
}

impl<A, C, P> DiscreteChoiceModel<A, C, P>
where
    A: Ord + Clone + Debug,
{
    /// Assemble a model from its parts.
    pub fn new(
        name: impl Into<String>,
        assignment: impl UtilityAssignment<A, C, P> + 'static,
        distribution: impl DistributionFunction<A, P> + 'static,
        selection: impl SelectionFunction<A> + 'static,
        parameters: P,
    ) -> Self {
        Self {
            name: name.into(),
            assignment: Box::new(assignment),
            distribution: Box::new(distribution),
            selection: Box::new(selection),
            parameters,
        }
    }

    /// Parameters the model evaluates with.
    pub fn parameters(&self) -> &P {
        &self.parameters
    }

    /// Utility of one alternative.
    pub fn utility(&self, alternative: &A, characteristics: &C) -> Result<f64> {
        let function = self.assignment.utility_function_for(alternative).ok_or_else(|| {
            Error::UnknownAlternative(vec![format!(
                "{} (no utility function in model '{}')",
                label(alternative),
                self.name
            )])
        })?;
        Ok(function.calculate_utility(alternative, characteristics, &self.parameters))
    }

    /// Utilities of several alternatives.
    pub fn utilities<'a, I>(&self, alternatives: I, characteristics: &C) -> Result<Utilities<A>>
    where
        I: IntoIterator<Item = &'a A>,
        A: 'a,
    {
        alternatives
            .into_iter()
            .map(|a| self.utility(a, characteristics).map(|u| (a.clone(), u)))
            .collect()
    }

    /// Probabilities over `alternatives`.
    pub fn probabilities<'a, I>(
        &self,
        alternatives: I,
        characteristics: &C,
    ) -> Result<Probabilities<A>>
    where
        I: IntoIterator<Item = &'a A>,
        A: 'a,
    {
        let utilities = self.utilities(alternatives, characteristics)?;
        self.probabilities_for_utilities(&utilities)
    }

    /// Probabilities for precomputed utilities.
    pub fn probabilities_for_utilities(
        &self,
        utilities: &Utilities<A>,
    ) -> Result<Probabilities<A>> {
        self.distribution.calculate_probabilities(utilities, &self.parameters)
    }

    /// Select after transforming some utilities. Alternatives without an
    /// injection keep their utility.
    pub fn select_injected(
        &self,
        choices: &BTreeSet<A>,
        characteristics: &C,
        injections: &BTreeMap<A, Injection>,
        rng: &mut dyn RngCore,
    ) -> Result<A> {
        let mut utilities = self.utilities(choices, characteristics)?;
        for (alternative, utility) in utilities.iter_mut() {
            if let Some(inject) = injections.get(alternative) {
                *utility = inject(*utility);
            }
        }
        let probabilities = self.probabilities_for_utilities(&utilities)?;
        self.selection.select(&probabilities, rng.random::<f64>())
    }

    /// Utilities and probabilities of `alternatives` as a serializable report.
    pub fn report<'a, I>(&self, alternatives: I, characteristics: &C) -> Result<ChoiceReport>
    where
        I: IntoIterator<Item = &'a A>,
        A: Display + 'a,
    {
        let utilities = self.utilities(alternatives, characteristics)?;
        let probabilities = self.probabilities_for_utilities(&utilities)?;
        Ok(ChoiceReport::new(self.name.clone(), &utilities, &probabilities))
    }

    /// Fix the choice set.
    pub fn with_choices(self, choices: impl IntoIterator<Item = A>) -> FixedChoiceModel<Self, A> {
        FixedChoiceModel::new(self, choices)
    }
}

impl<A, C, P> ChoiceModel<A, C> for DiscreteChoiceModel<A, C, P>
where
    A: Ord + Clone + Debug,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn select(
        &self,
        choices: &BTreeSet<A>,
        characteristics: &C,
        rng: &mut dyn RngCore,
    ) -> Result<A> {
        let probabilities = self.probabilities(choices, characteristics)?;
        let draw = rng.random::<f64>();
        let chosen = self.selection.select(&probabilities, draw)?;
        log::trace!("{}: selected {} (draw {draw})", self.name, label(&chosen));
        Ok(chosen)
    }
}

/// A model bound to a fixed choice set.
pub struct FixedChoiceModel<M, A> {
    model: M,
    choices: BTreeSet<A>,
}

impl<M, A: Ord> FixedChoiceModel<M, A> {
    /// Bind `model` to `choices`.
    pub fn new(model: M, choices: impl IntoIterator<Item = A>) -> Self {
        Self { model, choices: choices.into_iter().collect() }
    }

    /// The fixed choice set.
    pub fn choices(&self) -> &BTreeSet<A> {
        &self.choices
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Choose from the fixed choice set.
    pub fn select_fixed<C>(&self, characteristics: &C, rng: &mut dyn RngCore) -> Result<A>
    where
        M: ChoiceModel<A, C>,
    {
        self.model.select(&self.choices, characteristics, rng)
    }
}

impl<M, A, C> ChoiceModel<A, C> for FixedChoiceModel<M, A>
where
    M: ChoiceModel<A, C>,
    A: Ord,
{
    fn name(&self) -> &str {
        self.model.name()
    }

    fn select(
        &self,
        choices: &BTreeSet<A>,
        characteristics: &C,
        rng: &mut dyn RngCore,
    ) -> Result<A> {
        self.model.select(choices, characteristics, rng)
    }
}

/// Narrows a choice set for a decision maker.
pub struct ChoiceFilter<A, C> {
    filter: Arc<dyn Fn(&BTreeSet<A>, &C) -> BTreeSet<A> + Send + Sync>,
}

impl<A, C> Clone for ChoiceFilter<A, C> {
    fn clone(&self) -> Self {
        Self { filter: Arc::clone(&self.filter) }
    }
}

impl<A: Ord + Clone + 'static, C: 'static> ChoiceFilter<A, C> {
    /// Filter from a set-to-set function.
    pub fn new<F>(filter: F) -> Self
    where
        F: Fn(&BTreeSet<A>, &C) -> BTreeSet<A> + Send + Sync + 'static,
    {
        Self { filter: Arc::new(filter) }
    }

    /// Keep the alternatives for which `keep` holds.
    pub fn predicate<F>(keep: F) -> Self
    where
        F: Fn(&A, &C) -> bool + Send + Sync + 'static,
    {
        Self::new(move |choices, c| choices.iter().filter(|a| keep(*a, c)).cloned().collect())
    }

    /// Keep everything.
    pub fn no_filter() -> Self {
        Self::new(|choices, _| choices.clone())
    }

    /// Both filters applied to the same set, keeping the intersection.
    pub fn combine(&self, other: &Self) -> Self {
        let (a, b) = (self.clone(), other.clone());
        Self::new(move |choices, c| {
            let left = a.apply(choices, c);
            let right = b.apply(choices, c);
            left.intersection(&right).cloned().collect()
        })
    }

    /// Apply to `choices`.
    pub fn apply(&self, choices: &BTreeSet<A>, characteristics: &C) -> BTreeSet<A> {
        (self.filter)(choices, characteristics)
    }
}

/// Applies a [`ChoiceFilter`] before delegating to the wrapped model.
pub struct FilteredChoiceModel<M, A, C> {
    model: M,
    filter: ChoiceFilter<A, C>,
}

impl<M, A, C> FilteredChoiceModel<M, A, C>
where
    M: ChoiceModel<A, C>,
    A: Ord + Clone + 'static,
    C: 'static,
{
    /// Wrap `model` with `filter`.
    pub fn new(model: M, filter: ChoiceFilter<A, C>) -> Self {
        Self { model, filter }
    }

    /// Add another filter; only alternatives passing both remain.
    pub fn add_filter(self, filter: ChoiceFilter<A, C>) -> Self {
        let filter = self.filter.combine(&filter);
        Self { model: self.model, filter }
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M, A, C> ChoiceModel<A, C> for FilteredChoiceModel<M, A, C>
where
    M: ChoiceModel<A, C>,
    A: Ord + Clone + 'static,
    C: 'static,
{
    fn name(&self) -> &str {
        self.model.name()
    }

    fn select(
        &self,
        choices: &BTreeSet<A>,
        characteristics: &C,
        rng: &mut dyn RngCore,
    ) -> Result<A> {
        let filtered = self.filter.apply(choices, characteristics);
        log::trace!("{}: filter kept {} of {} choices", self.name(), filtered.len(), choices.len());
        self.model.select(&filtered, characteristics, rng)
    }
}

/// Picks uniformly among the offered choices.
#[derive(Debug, Clone)]
pub struct RandomChoiceModel<A> {
    name: String,
    choices: BTreeSet<A>,
}

impl<A: Ord + Clone> RandomChoiceModel<A> {
    /// Model over `choices`.
    pub fn new(name: impl Into<String>, choices: impl IntoIterator<Item = A>) -> Self {
        Self { name: name.into(), choices: choices.into_iter().collect() }
    }

    /// The model's own choice set.
    pub fn choices(&self) -> &BTreeSet<A> {
        &self.choices
    }

    /// Equal probability for every alternative of its own choice set.
    pub fn probabilities(&self) -> Probabilities<A> {
        let p = 1.0 / self.choices.len() as f64;
        self.choices.iter().map(|a| (a.clone(), p)).collect()
    }
}

impl<A: Ord + Clone, C> ChoiceModel<A, C> for RandomChoiceModel<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn select(
        &self,
        choices: &BTreeSet<A>,
        _characteristics: &C,
        rng: &mut dyn RngCore,
    ) -> Result<A> {
        let options: Probabilities<A> = choices.iter().map(|a| (a.clone(), 0.0)).collect();
        select_uniform(&options, rng.random::<f64>())
    }
}

/// Picks the first alternative of a priority list that survives its filter.
///
/// Selection is deterministic; the random number generator is not used.
pub struct FixedOrderChoiceModel<A, C> {
    name: String,
    order: Vec<A>,
    filter: ChoiceFilter<A, C>,
}

impl<A: Ord + Clone + 'static, C: 'static> FixedOrderChoiceModel<A, C> {
    /// Model over `order`, highest priority first.
    pub fn new(
        name: impl Into<String>,
        order: impl IntoIterator<Item = A>,
        filter: ChoiceFilter<A, C>,
    ) -> Self {
        Self { name: name.into(), order: order.into_iter().collect(), filter }
    }

    /// Alternatives in priority order.
    pub fn order(&self) -> &[A] {
        &self.order
    }

    /// Choose from the model's own list.
    pub fn select_first(&self, characteristics: &C) -> Result<A> {
        let choices: BTreeSet<A> = self.order.iter().cloned().collect();
        self.first_surviving(&choices, characteristics)
    }

    fn first_surviving(&self, choices: &BTreeSet<A>, characteristics: &C) -> Result<A> {
        let kept = self.filter.apply(choices, characteristics);
        self.order.iter().find(|a| kept.contains(*a)).cloned().ok_or(Error::EmptyChoiceSet)
    }
}

impl<A: Ord + Clone + 'static, C: 'static> ChoiceModel<A, C> for FixedOrderChoiceModel<A, C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn select(
        &self,
        choices: &BTreeSet<A>,
        characteristics: &C,
        _rng: &mut dyn RngCore,
    ) -> Result<A> {
        self.first_surviving(choices, characteristics)
    }
}

/// Multinomial logit over every alternative of `utilities`, with weighted selection.
pub fn multinomial_logit<A, C, P>(
    name: impl Into<String>,
    utilities: UtilityEnumeration<A, C, P>,
    parameters: P,
) -> FixedChoiceModel<DiscreteChoiceModel<A, C, P>, A>
where
    A: Ord + Clone + Debug + Send + Sync + 'static,
    C: 'static,
    P: 'static,
{
    let choices: Vec<A> = utilities.options().cloned().collect();
    DiscreteChoiceModel::new(name, utilities, MultinomialLogit, WeightedSelect, parameters)
        .with_choices(choices)
}

/// Nested logit over `structure`, with weighted selection.
///
/// Every alternative with a utility function must appear in the structure.
pub fn nested_logit<A, C, P>(
    name: impl Into<String>,
    utilities: UtilityEnumeration<A, C, P>,
    structure: NestStructure<A, P>,
    parameters: P,
) -> Result<FixedChoiceModel<DiscreteChoiceModel<A, C, P>, A>>
where
    A: Ord + Clone + Debug + Send + Sync + 'static,
    C: 'static,
    P: 'static,
{
    check_anchored(&utilities, &structure)?;
    let choices: Vec<A> = utilities.options().cloned().collect();
    let distribution = NestedLogit::new(structure)?;
    Ok(DiscreteChoiceModel::new(name, utilities, distribution, WeightedSelect, parameters)
        .with_choices(choices))
}

/// Cross-nested logit over `structure`, with weighted selection.
pub fn cross_nested_logit<A, C, P>(
    name: impl Into<String>,
    utilities: UtilityEnumeration<A, C, P>,
    structure: NestStructure<A, P>,
    parameters: P,
) -> Result<FixedChoiceModel<DiscreteChoiceModel<A, C, P>, A>>
where
    A: Ord + Clone + Debug + Send + Sync + 'static,
    C: 'static,
    P: 'static,
{
    check_anchored(&utilities, &structure)?;
    let choices: Vec<A> = utilities.options().cloned().collect();
    let distribution = CrossNestedLogit::new(structure);
    Ok(DiscreteChoiceModel::new(name, utilities, distribution, WeightedSelect, parameters)
        .with_choices(choices))
}

fn check_anchored<A, C, P>(
    utilities: &UtilityEnumeration<A, C, P>,
    structure: &NestStructure<A, P>,
) -> Result<()>
where
    A: Ord + Clone + Debug,
{
    let missing: Vec<String> =
        utilities.options().filter(|a| !structure.contains(a)).map(label).collect();
    if missing.is_empty() { Ok(()) } else { Err(Error::UnknownAlternative(missing)) }
}
