//! # Newick Module
//!
//! Minimal phylogenetic tree support for the pruning step.
//!
//! ## Tree representation
//! [`Tree`] stores its nodes in a single vector and refers to them by
//! [`NodeId`]. Leaves are nodes without children; internal nodes may carry
//! a label (usually a support value) and every node may carry the length of
//! the branch above it.
//!
//! ## Example
//! ```rust
//! use phylo_pipeline::core::newick::parse;
//!
//! let tree = parse("((A:1,B:2):0.5,(C:1,D:1):0.5,O:3);").unwrap();
//! let quartet = tree.restrict(&["A", "B", "D", "O"]).unwrap();
//! assert_eq!(quartet.to_newick(), "((A:1,B:2):0.5,D:1.5,O:3);");
//! ```

mod parser;
mod prune;
mod tree;

pub use parser::parse;
pub use tree::{Node, NodeId, Tree};
