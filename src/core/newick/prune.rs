//! Restricting a tree to a subset of its leaves.

use super::tree::{Node, NodeId, Tree};
use crate::error::TaskError;
use std::collections::{HashMap, HashSet};

impl Tree {
    /// Restrict this tree to exactly the leaves labelled `taxa`.
    ///
    /// Internal nodes left with a single child are collapsed into that
    /// child, and the collapsed branch length is added to the child's, so
    /// root-to-tip distances among the kept leaves are unchanged.
    ///
    /// Fails when a taxon is absent or labels more than one leaf.
    pub fn restrict<S: AsRef<str>>(&self, taxa: &[S]) -> Result<Tree, TaskError> {
        let wanted: Vec<&str> = {
            let mut seen = HashSet::new();
            taxa.iter()
                .map(|t| t.as_ref())
                .filter(|t| seen.insert(*t))
                .collect()
        };

        let mut by_label: HashMap<&str, Vec<NodeId>> = HashMap::new();
        for id in self.leaves() {
            if let Some(label) = self.node(id).label.as_deref() {
                by_label.entry(label).or_default().push(id);
            }
        }

        let missing: Vec<String> = wanted
            .iter()
            .filter(|t| !by_label.contains_key(*t))
            .map(|t| t.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TaskError::MissingTaxa { taxa: missing });
        }

        let mut keep = HashSet::with_capacity(wanted.len());
        for taxon in &wanted {
            let ids = &by_label[taxon];
            if ids.len() > 1 {
                return Err(TaskError::AmbiguousTaxon {
                    taxon: taxon.to_string(),
                    count: ids.len(),
                });
            }
            keep.insert(ids[0]);
        }

        let mut nodes = Vec::with_capacity(wanted.len() * 2);
        let root = self
            .rebuild(&keep, &mut nodes)
            .ok_or_else(|| TaskError::MissingTaxa {
                taxa: wanted.iter().map(|t| t.to_string()).collect(),
            })?;
        Ok(Tree::from_parts(nodes, root))
    }

    /// Copy the kept leaves and their branching ancestors into `out`.
    ///
    /// Walks in post-order so every child is settled before its parent.
    /// Returns the new root, or `None` when nothing was kept.
    fn rebuild(&self, keep: &HashSet<NodeId>, out: &mut Vec<Node>) -> Option<NodeId> {
        let mut rebuilt: HashMap<NodeId, NodeId> = HashMap::new();
        for id in self.postorder() {
            let node = self.node(id);
            if node.is_leaf() {
                if keep.contains(&id) {
                    out.push(node.clone());
                    rebuilt.insert(id, out.len() - 1);
                }
                continue;
            }

            let kept: Vec<NodeId> = node
                .children
                .iter()
                .filter_map(|child| rebuilt.get(child).copied())
                .collect();

            match kept.len() {
                0 => {}
                1 => {
                    let only = kept[0];
                    out[only].length = add_lengths(out[only].length, node.length);
                    rebuilt.insert(id, only);
                }
                _ => {
                    out.push(Node {
                        label: node.label.clone(),
                        length: node.length,
                        children: kept,
                    });
                    rebuilt.insert(id, out.len() - 1);
                }
            }
        }
        rebuilt.get(&self.root()).copied()
    }
}

fn add_lengths(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use crate::core::newick::parse;
    use crate::error::TaskError;

    const SIX_TAXA: &str = "((A:1,B:2):0.5,(C:1,(D:1,E:1):0.25):0.5,O:3);";

    #[test]
    fn collapses_unary_nodes_and_sums_lengths() {
        let tree = parse(SIX_TAXA).unwrap();
        let pruned = tree.restrict(&["A", "B", "D", "O"]).unwrap();
        assert_eq!(pruned.to_newick(), "((A:1,B:2):0.5,D:1.75,O:3);");
    }

    #[test]
    fn keeps_only_requested_leaves() {
        let tree = parse(SIX_TAXA).unwrap();
        let pruned = tree.restrict(&["B", "C", "E", "O"]).unwrap();
        let mut labels = pruned.leaf_labels();
        labels.sort_unstable();
        assert_eq!(labels, vec!["B", "C", "E", "O"]);
        assert_eq!(pruned.to_newick(), "(B:2.5,(C:1,E:1.25):0.5,O:3);");
    }

    #[test]
    fn taxon_order_does_not_matter() {
        let tree = parse(SIX_TAXA).unwrap();
        let a = tree.restrict(&["O", "D", "B", "A"]).unwrap();
        let b = tree.restrict(&["A", "B", "D", "O"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_taxon_is_reported() {
        let tree = parse("((A:1,B:1):1,(C:1,O:1):1);").unwrap();
        let err = tree.restrict(&["A", "B", "D", "O"]).unwrap_err();
        assert_eq!(
            err,
            TaskError::MissingTaxa {
                taxa: vec!["D".to_string()]
            }
        );
    }

    #[test]
    fn duplicate_leaf_label_is_ambiguous() {
        let tree = parse("((A:1,A:1):1,(B:1,O:1):1,C:1);").unwrap();
        let err = tree.restrict(&["A", "B", "C", "O"]).unwrap_err();
        assert!(matches!(err, TaskError::AmbiguousTaxon { count: 2, .. }));
    }

    #[test]
    fn trees_without_lengths_prune_cleanly() {
        let tree = parse("((A,B),(C,(D,E)),O);").unwrap();
        let pruned = tree.restrict(&["A", "B", "D", "O"]).unwrap();
        assert_eq!(pruned.to_newick(), "((A,B),D,O);");
    }

    /// `(L0:1,(L1:1,(...(L{n-1}:1,X:1)...):1):1);`
    fn ladder(depth: usize) -> String {
        let mut newick: String = (0..depth - 1).map(|level| format!("(L{level}:1,")).collect();
        newick.push_str(&format!("(L{}:1,X:1)", depth - 1));
        newick.push_str(&":1)".repeat(depth - 1));
        newick.push(';');
        newick
    }

    #[test]
    fn deep_ladder_restricts_and_writes_without_recursion() {
        let text = ladder(10_000);
        let tree = parse(&text).unwrap();
        assert_eq!(tree.to_newick(), text);

        let pruned = tree.restrict(&["L0", "L1", "L2", "X"]).unwrap();
        assert_eq!(pruned.to_newick(), "(L0:1,(L1:1,(L2:1,X:9998):1):1);");
    }
}
