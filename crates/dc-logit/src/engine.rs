//! Two-pass evaluation of a nest structure.
//!
//! 1. Leaves present in the input are marked relevant together with their
//!    ancestors.
//! 2. Bottom-up: nests are popped from a min-heap keyed by level and
//!    aggregate their relevant children with a scaled log-sum-exp. A nest's
//!    level exceeds every descendant's, so by the time it is popped every
//!    relevant descendant has already been processed.
//! 3. Top-down: the last nest popped (the root) receives probability 1 and
//!    splits it among relevant children by their log-sum-exp shares.
//!
//! All per-call state lives in [`Scratch`]; the structure is never mutated.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use dc_core::{Error, Result, Utilities, label};
use dc_prob::LogSumExp;

use crate::structure::{NestStructure, NodeId, NodeKind};

/// Pairing of an input alternative with one of its leaves for a single call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Situation<'a, A> {
    pub(crate) alternative: &'a A,
    pub(crate) leaf: NodeId,
    pub(crate) utility: f64,
}

/// Per-call calculation state, indexed by node id.
#[derive(Debug, Clone)]
pub(crate) struct Scratch {
    relevant: Vec<bool>,
    utility: Vec<f64>,
    /// `ln(alpha) + utility`, as seen by the parent nest.
    weighted: Vec<f64>,
    probability: Vec<f64>,
    lse: Vec<Option<LogSumExp>>,
}

impl Scratch {
    fn new(n: usize) -> Self {
        Self {
            relevant: vec![false; n],
            utility: vec![0.0; n],
            weighted: vec![0.0; n],
            probability: vec![0.0; n],
            lse: vec![None; n],
        }
    }

    /// Probability mass assigned to a node.
    pub(crate) fn probability(&self, id: NodeId) -> f64 {
        self.probability[id]
    }
}

/// Pair every submitted alternative with each of its leaves.
///
/// Fails on empty input, on NaN utilities and on alternatives the structure
/// does not know (all unknown alternatives are reported together).
pub(crate) fn situations<'a, A, P>(
    structure: &NestStructure<A, P>,
    utilities: &'a Utilities<A>,
) -> Result<Vec<Situation<'a, A>>>
where
    A: Ord + std::fmt::Debug,
{
    if utilities.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut unknown = Vec::new();
    let mut out = Vec::with_capacity(utilities.len());
    for (alternative, &utility) in utilities {
        if utility.is_nan() {
            return Err(Error::Validation(format!("utility of {} is NaN", label(alternative))));
        }
        match structure.leaves_of(alternative) {
            Some(leaves) => {
                out.extend(leaves.iter().map(|&leaf| Situation { alternative, leaf, utility }))
            }
            None => unknown.push(label(alternative)),
        }
    }
    if !unknown.is_empty() {
        return Err(Error::UnknownAlternative(unknown));
    }
    Ok(out)
}

/// Run both passes for `situations` and return the filled scratch.
pub(crate) fn evaluate<A, P>(
    structure: &NestStructure<A, P>,
    situations: &[Situation<'_, A>],
    parameters: &P,
) -> Result<Scratch>
where
    A: Ord,
{
    let mut scratch = Scratch::new(structure.len());
    let mut queued = vec![false; structure.len()];
    let mut queue: BinaryHeap<Reverse<(u32, NodeId)>> = BinaryHeap::new();

    for sit in situations {
        scratch.utility[sit.leaf] = sit.utility;
        mark_relevant(structure, &mut scratch, sit.leaf);
        if let Some(parent) = structure.node(sit.leaf).parent {
            if !queued[parent] {
                queued[parent] = true;
                queue.push(Reverse((structure.node(parent).level, parent)));
            }
        }
    }

    let mut last = None;
    while let Some(Reverse((_, nest))) = queue.pop() {
        last = Some(nest);
        aggregate(structure, &mut scratch, nest, parameters)?;
        if let Some(parent) = structure.node(nest).parent {
            if !queued[parent] {
                queued[parent] = true;
                queue.push(Reverse((structure.node(parent).level, parent)));
            }
        }
    }

    let root = last.ok_or_else(|| Error::Invariant("no nest was scheduled".to_string()))?;
    if structure.node(root).parent.is_some() {
        return Err(Error::Invariant(format!(
            "last scheduled nest '{}' is not the root",
            structure.node(root).name
        )));
    }

    scratch.probability[root] = 1.0;
    distribute(structure, &mut scratch, root)?;

    log::trace!(
        "evaluated {} situations, root utility {}",
        situations.len(),
        scratch.utility[root]
    );
    Ok(scratch)
}

fn mark_relevant<A: Ord, P>(structure: &NestStructure<A, P>, scratch: &mut Scratch, leaf: NodeId) {
    let mut current = Some(leaf);
    while let Some(id) = current {
        if scratch.relevant[id] {
            break;
        }
        scratch.relevant[id] = true;
        current = structure.node(id).parent;
    }
}

/// Bottom-up step for one nest: scaled log-sum-exp over its relevant children.
fn aggregate<A: Ord, P>(
    structure: &NestStructure<A, P>,
    scratch: &mut Scratch,
    nest: NodeId,
    parameters: &P,
) -> Result<()> {
    let node = structure.node(nest);
    let NodeKind::Nest { children, lambda } = &node.kind else {
        return Err(Error::Invariant(format!("leaf '{}' was scheduled for aggregation", node.name)));
    };

    let lambda = lambda.resolve(parameters);
    if !(lambda.is_finite() && lambda > 0.0) {
        return Err(Error::Validation(format!(
            "scale parameter of nest '{}' must be positive and finite, got {lambda}",
            node.name
        )));
    }

    let mut weights = Vec::with_capacity(children.len());
    for &child in children.iter().filter(|&&c| scratch.relevant[c]) {
        let w = match &structure.node(child).kind {
            NodeKind::Leaf { alpha } => alpha.resolve(parameters).ln() + scratch.utility[child],
            NodeKind::Nest { .. } => scratch.utility[child],
        };
        if w.is_nan() {
            return Err(Error::Validation(format!(
                "weighted utility of '{}' in nest '{}' is NaN",
                structure.node(child).name,
                node.name
            )));
        }
        scratch.weighted[child] = w;
        weights.push(w);
    }

    let lse = LogSumExp::new(&weights, lambda).ok_or_else(|| {
        Error::Invariant(format!("nest '{}' aggregated without relevant children", node.name))
    })?;
    scratch.utility[nest] = lse.value();
    scratch.lse[nest] = Some(lse);
    Ok(())
}

/// Top-down pass from `root`, which must already hold its probability mass.
fn distribute<A: Ord, P>(
    structure: &NestStructure<A, P>,
    scratch: &mut Scratch,
    root: NodeId,
) -> Result<()> {
    let mut stack = vec![root];
    while let Some(nest) = stack.pop() {
        let node = structure.node(nest);
        let lse = scratch.lse[nest].ok_or_else(|| {
            Error::Invariant(format!("nest '{}' distributed before aggregation", node.name))
        })?;
        let mass = scratch.probability[nest];
        for &child in node.children().iter().filter(|&&c| scratch.relevant[c]) {
            scratch.probability[child] = mass * lse.share(scratch.weighted[child]);
            if matches!(structure.node(child).kind, NodeKind::Nest { .. }) {
                stack.push(child);
            }
        }
    }
    Ok(())
}
