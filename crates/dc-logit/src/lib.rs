//! # dc-logit
//!
//! Logit-family distribution functions:
//! - [`MultinomialLogit`]: flat softmax
//! - [`NestedLogit`]: tree of nests with per-nest scale parameters
//! - [`CrossNestedLogit`]: alternatives shared between nests via allocation weights
//!
//! Hierarchical models are described once as an immutable [`NestStructure`]
//! and evaluated per call with a fresh scratch, so they are `Send + Sync`
//! and can be evaluated concurrently.
//!
//! ```ignore
//! let structure = NestStructure::nested(|root| {
//!     root.option("car");
//!     root.nest("bus", 0.5, |bus| {
//!         bus.option("red").option("blue");
//!     });
//! })?;
//! let model = NestedLogit::new(structure)?;
//! let p = model.probabilities(&utilities, &())?;
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod coefficient;
pub mod cross_nested;
mod engine;
pub mod multinomial;
pub mod nested;
pub mod structure;
pub mod synthetic;

pub use builder::NestBuilder;
pub use coefficient::Coefficient;
pub use cross_nested::{ALLOCATION_TOLERANCE, CrossNestedLogit};
pub use multinomial::MultinomialLogit;
pub use nested::NestedLogit;
pub use structure::{NestStructure, Nesting, Node, NodeId, NodeKind};
