//! Turning a probability map into one concrete alternative.

use dc_core::{Error, Probabilities, Result, SelectionFunction};

use crate::math::cumulative_sum;

/// Relative drift from 1.0 above which renormalization is logged.
const DRIFT_WARN: f64 = 1e-6;

fn check_draw(draw: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&draw) {
        return Err(Error::Validation(format!("random draw must lie in [0, 1], got {draw}")));
    }
    Ok(())
}

/// Pick the alternative whose cumulative (normalized) probability first reaches `draw`.
///
/// Iteration follows the map's key order, so the result is deterministic for a
/// given map and draw. The map is renormalized first to absorb floating drift.
pub fn select_weighted<A: Clone>(options: &Probabilities<A>, draw: f64) -> Result<A> {
    if options.is_empty() {
        return Err(Error::EmptyChoiceSet);
    }
    check_draw(draw)?;

    let total: f64 = options.values().sum();
    if !total.is_finite() || total <= 0.0 || options.values().any(|&p| p < 0.0) {
        return Err(Error::Validation(format!(
            "probabilities must be non-negative with a positive finite sum, got sum {total}"
        )));
    }
    if (total - 1.0).abs() > DRIFT_WARN {
        log::warn!("renormalizing probability map with total {total}");
    }

    let weights: Vec<f64> = options.values().map(|p| p / total).collect();
    let cumulative = cumulative_sum(weights.iter().copied());
    let mut idx = cumulative.partition_point(|&c| c < draw).min(cumulative.len() - 1);
    // Never land on a zero-weight entry: later entries also reach `draw`.
    while weights[idx] == 0.0 && idx + 1 < weights.len() {
        idx += 1;
    }
    while weights[idx] == 0.0 && idx > 0 {
        idx -= 1;
    }

    options
        .keys()
        .nth(idx)
        .cloned()
        .ok_or_else(|| Error::Invariant(format!("selection index {idx} out of range")))
}

/// Pick alternative `floor(draw * n)` in key order, ignoring the probabilities.
pub fn select_uniform<A: Clone>(options: &Probabilities<A>, draw: f64) -> Result<A> {
    if options.is_empty() {
        return Err(Error::EmptyChoiceSet);
    }
    check_draw(draw)?;

    let n = options.len();
    let idx = ((draw * n as f64).floor() as usize).min(n - 1);
    options
        .keys()
        .nth(idx)
        .cloned()
        .ok_or_else(|| Error::Invariant(format!("selection index {idx} out of range")))
}

/// Weighted random selection (the default for logit models).
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSelect;

impl<A: Clone> SelectionFunction<A> for WeightedSelect {
    fn select(&self, options: &Probabilities<A>, draw: f64) -> Result<A> {
        select_weighted(options, draw)
    }
}

/// Uniform selection among the offered alternatives, for pure tie-breaking.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSelect;

impl<A: Clone> SelectionFunction<A> for UniformSelect {
    fn select(&self, options: &Probabilities<A>, draw: f64) -> Result<A> {
        select_uniform(options, draw)
    }
}
