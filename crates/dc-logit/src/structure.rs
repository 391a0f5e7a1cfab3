//! Nest structure: an arena of leaves and nests.
//!
//! Nodes live in a flat `Vec` and refer to each other by index. Child edges
//! form a tree rooted at an implicit `root` nest. Cross-nesting is expressed
//! by giving one alternative several leaves (one per claiming nest); the
//! alternative -> leaves index is kept separately and never owns nodes.
//!
//! A structure is immutable once built. Evaluation state lives in a
//! per-call scratch, so a structure can be shared across threads.

use std::collections::BTreeMap;
use std::fmt::{Debug, Write as _};

use dc_core::Result;

use crate::builder::{Arena, NestBuilder};
use crate::coefficient::Coefficient;

/// Index of a node inside its structure.
pub type NodeId = usize;

/// How alternatives may be anchored in the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// Every alternative has exactly one leaf (nested logit).
    Tree,
    /// An alternative may have one leaf per claiming nest (cross-nested logit).
    Cross,
}

/// Node variants.
#[derive(Debug, Clone)]
pub enum NodeKind<P> {
    /// Anchor of one alternative.
    Leaf {
        /// Allocation weight of the alternative in the parent nest.
        alpha: Coefficient<P>,
    },
    /// Group of correlated children.
    Nest {
        /// Child nodes, in declaration order. Never empty.
        children: Vec<NodeId>,
        /// Scale parameter.
        lambda: Coefficient<P>,
    },
}

/// One node of the arena.
#[derive(Debug, Clone)]
pub struct Node<P> {
    pub(crate) name: String,
    pub(crate) level: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind<P>,
}

impl<P> Node<P> {
    /// Display name (alternative label for leaves).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0 for leaves, `1 + max(child level)` for nests.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Owning nest, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Variant data.
    pub fn kind(&self) -> &NodeKind<P> {
        &self.kind
    }

    /// Children of a nest; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Nest { children, .. } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }
}

/// Immutable nest structure over alternatives `A`, parameterized by `P`.
#[derive(Debug, Clone)]
pub struct NestStructure<A, P> {
    pub(crate) nodes: Vec<Node<P>>,
    pub(crate) root: NodeId,
    pub(crate) leaves: BTreeMap<A, Vec<NodeId>>,
    pub(crate) nesting: Nesting,
}

impl<A, P> NestStructure<A, P>
where
    A: Ord + Clone + Debug,
{
    /// Build a nested-logit structure. Alternatives may appear only once.
    ///
    /// ```ignore
    /// let structure = NestStructure::nested(|root| {
    ///     root.option(Mode::Car);
    ///     root.nest("bus", 0.5, |bus| {
    ///         bus.option(Mode::RedBus).option(Mode::BlueBus);
    ///     });
    /// })?;
    /// ```
    pub fn nested<F>(content: F) -> Result<Self>
    where
        F: FnOnce(&mut NestBuilder<'_, A, P>),
    {
        Arena::new(Nesting::Tree).finish(content)
    }

    /// Build a cross-nested structure. Alternatives may appear in several
    /// nests, each occurrence carrying its own allocation weight.
    pub fn cross_nested<F>(content: F) -> Result<Self>
    where
        F: FnOnce(&mut NestBuilder<'_, A, P>),
    {
        Arena::new(Nesting::Cross).finish(content)
    }
}

impl<A, P> NestStructure<A, P>
where
    A: Ord,
{
    /// Root nest id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &Node<P> {
        &self.nodes[id]
    }

    /// Number of nodes (leaves and nests, root included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a built structure holds at least the root and one leaf.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Level of the root, i.e. the depth of the structure.
    pub fn depth(&self) -> u32 {
        self.nodes[self.root].level
    }

    /// Tree or cross nesting.
    pub fn nesting(&self) -> Nesting {
        self.nesting
    }

    /// Leaves anchoring `alternative`, or `None` if it is unknown.
    pub fn leaves_of(&self, alternative: &A) -> Option<&[NodeId]> {
        self.leaves.get(alternative).map(Vec::as_slice)
    }

    /// All alternatives known to the structure, in key order.
    pub fn alternatives(&self) -> impl Iterator<Item = &A> {
        self.leaves.keys()
    }

    /// `true` if `alternative` has at least one leaf.
    pub fn contains(&self, alternative: &A) -> bool {
        self.leaves.contains_key(alternative)
    }

    /// Pretty-print the structure as an indented tree.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root, "", "", &mut out);
        out
    }

    fn render_node(&self, id: NodeId, head: &str, tail: &str, out: &mut String) {
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Leaf { alpha } => {
                if alpha.is_fixed(1.0) {
                    let _ = writeln!(out, "{head}{}", node.name);
                } else {
                    let _ = writeln!(out, "{head}{} [alpha={alpha}]", node.name);
                }
            }
            NodeKind::Nest { children, lambda } => {
                let _ = writeln!(out, "{head}{} [lambda={lambda}]", node.name);
                for (i, &child) in children.iter().enumerate() {
                    let last = i + 1 == children.len();
                    let (branch, cont) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
                    self.render_node(
                        child,
                        &format!("{tail}{branch}"),
                        &format!("{tail}{cont}"),
                        out,
                    );
                }
            }
        }
    }
}
