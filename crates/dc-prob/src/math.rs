//! Small numerically-stable math utilities used by the logit distributions.

/// Largest `x` for which `exp(x)` is still finite (`ln(f64::MAX)`).
pub const EXP_OVERFLOW_THRESHOLD: f64 = 709.782_712_893_384;

/// Below this `exp(x)` rounds to exactly `0.0` (`ln` of the smallest subnormal, halved).
pub const EXP_UNDERFLOW_THRESHOLD: f64 = -745.133_219_101_941_1;

/// Normalizing constants of a scaled log-sum-exp over a set of values.
///
/// For values `v_i` and scale `lambda > 0`:
///
/// ```text
/// max = max_i v_i
/// sum = Σ_i exp((v_i - max) / lambda)
/// value = max + lambda * ln(sum)
/// ```
///
/// Subtracting `max` keeps every exponent `<= 0`, so `sum` lies in `[1, n]`
/// and never overflows. Both constants are kept so shares can be computed
/// later without a second pass over the values.
///
/// Infinite maxima follow the flat softmax policy: if any value is `+inf`
/// the `+inf` values split the mass equally; if every value is `-inf` all
/// values split it equally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSumExp {
    /// Stabilizing offset (largest value).
    pub max: f64,
    /// Sum of shifted, scaled exponentials (or the tie count for infinite maxima).
    pub sum: f64,
    /// Scale (`lambda`) the exponentials were divided by.
    pub scale: f64,
}

impl LogSumExp {
    /// Compute the constants for `values`. Returns `None` for an empty slice.
    ///
    /// `values` must not contain NaN and `scale` must be finite and positive;
    /// callers validate both.
    pub fn new(values: &[f64], scale: f64) -> Option<Self> {
        let max = values.iter().copied().reduce(f64::max)?;
        let sum = if max == f64::INFINITY {
            values.iter().filter(|&&v| v == f64::INFINITY).count() as f64
        } else if max == f64::NEG_INFINITY {
            values.len() as f64
        } else {
            values.iter().map(|&v| ((v - max) / scale).exp()).sum()
        };
        Some(Self { max, sum, scale })
    }

    /// Aggregated value `max + scale * ln(sum)`.
    #[inline]
    pub fn value(&self) -> f64 {
        if self.max.is_infinite() { self.max } else { self.max + self.scale * self.sum.ln() }
    }

    /// Share of the total mass belonging to value `v` (one of the inputs).
    #[inline]
    pub fn share(&self, v: f64) -> f64 {
        if self.max == f64::INFINITY {
            if v == f64::INFINITY { 1.0 / self.sum } else { 0.0 }
        } else if self.max == f64::NEG_INFINITY {
            1.0 / self.sum
        } else {
            ((v - self.max) / self.scale).exp() / self.sum
        }
    }
}

/// Stable `ln(Σ exp(x_i))`. Returns `-inf` for an empty slice.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    LogSumExp::new(values, 1.0).map_or(f64::NEG_INFINITY, |lse| lse.value())
}

/// Running sum of `values`.
pub fn cumulative_sum(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut acc = 0.0;
    values
        .into_iter()
        .map(|v| {
            acc += v;
            acc
        })
        .collect()
}
