//! Synthetic structures for benchmarks and smoke tests.

use dc_core::{Result, Utilities};

use crate::structure::NestStructure;

/// `alternatives` options spread round-robin over `nests` nests with lambda 0.5.
///
/// Fails if any nest would end up empty (`alternatives < nests`).
pub fn nested_structure<P>(alternatives: u32, nests: u32) -> Result<NestStructure<u32, P>> {
    NestStructure::nested(|root| {
        for n in 0..nests.max(1) {
            root.nest(format!("nest{n}"), 0.5, |nest| {
                nest.options((0..alternatives).filter(|a| a % nests.max(1) == n));
            });
        }
    })
}

/// Every alternative belongs to two neighbouring nests with alpha 0.5 each.
///
/// With a single nest every alternative has one leaf with alpha 1.
pub fn cross_nested_structure<P>(alternatives: u32, nests: u32) -> Result<NestStructure<u32, P>> {
    let k = nests.max(1);
    NestStructure::cross_nested(|root| {
        for n in 0..k {
            root.nest(format!("nest{n}"), 0.5, |nest| {
                for a in 0..alternatives {
                    if k == 1 {
                        nest.option(a);
                    } else if a % k == n || (a + 1) % k == n {
                        nest.option_with_alpha(a, 0.5);
                    }
                }
            });
        }
    })
}

/// Deterministic, varied utilities for alternatives `0..alternatives`.
pub fn utilities(alternatives: u32) -> Utilities<u32> {
    (0..alternatives).map(|a| (a, ((a as f64) * 0.37).sin() * 2.0)).collect()
}
