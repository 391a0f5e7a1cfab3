//! Flat (non-nested) softmax with explicit overflow/underflow policy.
//!
//! `p_i = exp(u_i) / Σ_j exp(u_j)`, except:
//!
//! 1. If some `exp(u_i)` overflows to `+inf` (`u_i >= ~709.78`), the overflowing
//!    alternatives share the mass equally and every other alternative gets 0.
//! 2. Otherwise, if every `exp(u_i)` underflows to `0` (`u_i <= ~-745`), all
//!    alternatives share the mass equally.
//!
//! The branches are checked in this order. When every term is finite but the
//! plain sum overflows, the ordinary branch is computed shifted by the maximum.

use std::collections::BTreeMap;

/// Softmax over a slice, returned in input order. Empty input gives an empty vector.
pub fn softmax(utilities: &[f64]) -> Vec<f64> {
    let exps: Vec<f64> = utilities.iter().map(|u| u.exp()).collect();

    let n_overflow = exps.iter().filter(|&&e| e == f64::INFINITY).count();
    if n_overflow > 0 {
        let equal = 1.0 / n_overflow as f64;
        return exps.iter().map(|&e| if e == f64::INFINITY { equal } else { 0.0 }).collect();
    }

    let sum: f64 = exps.iter().sum();
    if sum == 0.0 {
        let equal = 1.0 / exps.len() as f64;
        return vec![equal; exps.len()];
    }

    if sum.is_finite() {
        return exps.into_iter().map(|e| e / sum).collect();
    }

    // Each term is finite but the total overflowed; shift by the maximum.
    let max = utilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let shifted: Vec<f64> = utilities.iter().map(|u| (u - max).exp()).collect();
    let sum: f64 = shifted.iter().sum();
    shifted.into_iter().map(|e| e / sum).collect()
}

/// Softmax over an ordered map, keyed like the input.
pub fn softmax_map<K: Ord + Clone>(utilities: &BTreeMap<K, f64>) -> BTreeMap<K, f64> {
    let values: Vec<f64> = utilities.values().copied().collect();
    utilities.keys().cloned().zip(softmax(&values)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ordinary_softmax() {
        let p = softmax(&[0.0, 1.0, 0.0]);
        let e = std::f64::consts::E;
        assert_relative_eq!(p[1], e / (e + 2.0), epsilon = 1e-12);
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_overflow_splits_between_overflowing() {
        let p = softmax(&[709.0, 710.0, 710.0]);
        assert!(p[0] < 0.001);
        assert!(p[1] > 0.499);
        assert!(p[2] > 0.499);
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_large_but_finite_utilities() {
        let p = softmax(&[1.0, 709.0, 709.0]);
        assert!(p[0] < 0.001);
        assert!(p[1] > 0.499);
        assert!(p[2] > 0.499);
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sum_overflow_with_finite_terms() {
        let p = softmax(&[709.0, 709.0, 709.0]);
        for v in &p {
            assert_relative_eq!(*v, 1.0 / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_underflow_gives_equal_split() {
        let p = softmax(&[-746.0, -7046.0, -746.0]);
        for v in &p {
            assert!(*v > 0.33);
        }
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_near_zero_but_not_underflowing() {
        let p = softmax(&[0.0, -744.0, -744.0]);
        assert!(p[0] > 0.999);
        assert!(p[1] < 0.001);
        assert!(p[2] < 0.001);
    }

    #[test]
    fn test_singleton_and_empty() {
        assert_eq!(softmax(&[42.0]), vec![1.0]);
        assert_eq!(softmax(&[1e6]), vec![1.0]);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_map_keeps_keys() {
        let u: BTreeMap<&str, f64> = [("a", 0.0), ("b", 0.0)].into_iter().collect();
        let p = softmax_map(&u);
        assert_eq!(p.get("a"), Some(&0.5));
        assert_eq!(p.get("b"), Some(&0.5));
    }
}
