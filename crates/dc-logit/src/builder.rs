//! Builder for [`NestStructure`]s.
//!
//! Nest blocks are closures receiving a [`NestBuilder`]; a block's children
//! are created before the nest itself, so levels are known when the nest
//! node is pushed. The first construction error is kept and reported by the
//! structure constructor.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use dc_core::{Error, Result, label};

use crate::coefficient::Coefficient;
use crate::structure::{NestStructure, Nesting, Node, NodeId, NodeKind};

pub(crate) struct Arena<A, P> {
    nodes: Vec<Node<P>>,
    leaves: BTreeMap<A, Vec<NodeId>>,
    nesting: Nesting,
    error: Option<Error>,
}

impl<A, P> Arena<A, P>
where
    A: Ord + Clone + Debug,
{
    pub(crate) fn new(nesting: Nesting) -> Self {
        Self { nodes: Vec::new(), leaves: BTreeMap::new(), nesting, error: None }
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Run the root block and close the implicit root nest.
    pub(crate) fn finish<F>(mut self, content: F) -> Result<NestStructure<A, P>>
    where
        F: FnOnce(&mut NestBuilder<'_, A, P>),
    {
        let mut root = NestBuilder::new(&mut self);
        content(&mut root);
        let children = root.children;

        if let Some(err) = self.error.take() {
            return Err(err);
        }
        if children.is_empty() {
            return Err(Error::Structure(
                "cannot create an empty structure: add at least one option to the root block"
                    .to_string(),
            ));
        }
        let root = self.push_nest("root".to_string(), Coefficient::Fixed(1.0), children);

        log::debug!(
            "built {:?} structure: {} nodes, {} alternatives, depth {}",
            self.nesting,
            self.nodes.len(),
            self.leaves.len(),
            self.nodes[root].level
        );
        Ok(NestStructure { nodes: self.nodes, root, leaves: self.leaves, nesting: self.nesting })
    }

    fn push_leaf(&mut self, alternative: A, alpha: Coefficient<P>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: label(&alternative),
            level: 0,
            parent: None,
            kind: NodeKind::Leaf { alpha },
        });
        self.leaves.entry(alternative).or_default().push(id);
        id
    }

    fn push_nest(&mut self, name: String, lambda: Coefficient<P>, children: Vec<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let level = 1 + children.iter().map(|&c| self.nodes[c].level).max().unwrap_or(0);
        for &c in &children {
            self.nodes[c].parent = Some(id);
        }
        self.nodes.push(Node {
            name,
            level,
            parent: None,
            kind: NodeKind::Nest { children, lambda },
        });
        id
    }
}

/// Collects the children of one nest block.
pub struct NestBuilder<'s, A, P> {
    arena: &'s mut Arena<A, P>,
    children: Vec<NodeId>,
    seen: BTreeSet<A>,
}

impl<'s, A, P> NestBuilder<'s, A, P>
where
    A: Ord + Clone + Debug,
{
    fn new(arena: &'s mut Arena<A, P>) -> Self {
        Self { arena, children: Vec::new(), seen: BTreeSet::new() }
    }

    /// Add an alternative with allocation weight 1.
    pub fn option(&mut self, alternative: A) -> &mut Self {
        self.add_leaf(alternative, Coefficient::Fixed(1.0))
    }

    /// Add an alternative carrying an allocation weight in this nest.
    ///
    /// Only meaningful for cross-nested structures; in a nested structure any
    /// weight other than a fixed 1 is rejected.
    pub fn option_with_alpha(
        &mut self,
        alternative: A,
        alpha: impl Into<Coefficient<P>>,
    ) -> &mut Self {
        let alpha = alpha.into();
        if self.arena.nesting == Nesting::Tree && !alpha.is_fixed(1.0) {
            self.arena.fail(Error::Structure(format!(
                "allocation weight on {} requires a cross-nested structure",
                label(&alternative)
            )));
            return self;
        }
        self.add_leaf(alternative, alpha)
    }

    /// Add several alternatives with allocation weight 1.
    pub fn options<I>(&mut self, alternatives: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
    {
        for alternative in alternatives {
            self.option(alternative);
        }
        self
    }

    /// Add a sub-nest with scale `lambda`; `content` declares its children.
    pub fn nest<F>(
        &mut self,
        name: impl Into<String>,
        lambda: impl Into<Coefficient<P>>,
        content: F,
    ) -> &mut Self
    where
        F: FnOnce(&mut NestBuilder<'_, A, P>),
    {
        let name = name.into();
        let mut block = NestBuilder::new(&mut *self.arena);
        content(&mut block);
        let children = block.children;

        if children.is_empty() {
            self.arena.fail(Error::Structure(format!(
                "cannot create an empty nest '{name}': add at least one option to the nest block"
            )));
            return self;
        }
        let id = self.arena.push_nest(name, lambda.into(), children);
        self.children.push(id);
        self
    }

    fn add_leaf(&mut self, alternative: A, alpha: Coefficient<P>) -> &mut Self {
        let duplicate = match self.arena.nesting {
            Nesting::Tree => self.arena.leaves.contains_key(&alternative),
            Nesting::Cross => self.seen.contains(&alternative),
        };
        if duplicate {
            let scope = match self.arena.nesting {
                Nesting::Tree => "this structure",
                Nesting::Cross => "this nest",
            };
            self.arena.fail(Error::Structure(format!(
                "alternative {} is already registered in {scope}",
                label(&alternative)
            )));
            return self;
        }
        self.seen.insert(alternative.clone());
        let id = self.arena.push_leaf(alternative, alpha);
        self.children.push(id);
        self
    }
}
