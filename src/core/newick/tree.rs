//! Arena-backed rooted tree and its Newick writer.

/// Index of a node in a [`Tree`] arena
pub type NodeId = usize;

/// A single vertex: a leaf when it has no children
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Taxon name for leaves, support or clade name for internal nodes
    pub label: Option<String>,
    /// Length of the branch leading to this node
    pub length: Option<f64>,
    /// Child nodes in input order
    pub children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn empty() -> Self {
        Self {
            label: None,
            length: None,
            children: Vec::new(),
        }
    }

    /// True when this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted tree whose nodes live in one vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Leaf node ids in left-to-right order
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() {
                leaves.push(id);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }

    /// Every node id, children before parents, left to right
    pub(crate) fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            stack.extend(self.nodes[id].children.iter().rev().map(|&c| (c, false)));
        }
        order
    }

    /// Labels of all named leaves, left to right
    pub fn leaf_labels(&self) -> Vec<&str> {
        self.leaves()
            .into_iter()
            .filter_map(|id| self.nodes[id].label.as_deref())
            .collect()
    }

    /// Serialize as a single-line Newick string terminated by `;`.
    ///
    /// The root's own branch length is not written.
    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![Visit::Enter(self.root)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    let node = &self.nodes[id];
                    if node.is_leaf() {
                        self.write_tail(id, &mut out);
                        continue;
                    }
                    out.push('(');
                    stack.push(Visit::Exit(id));
                    for (i, &child) in node.children.iter().enumerate().rev() {
                        stack.push(Visit::Enter(child));
                        if i > 0 {
                            stack.push(Visit::Comma);
                        }
                    }
                }
                Visit::Comma => out.push(','),
                Visit::Exit(id) => {
                    out.push(')');
                    self.write_tail(id, &mut out);
                }
            }
        }
        out.push(';');
        out
    }

    /// Label and branch length written after a node's subtree
    fn write_tail(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id];
        if let Some(label) = &node.label {
            write_label(label, out);
        }
        if id != self.root {
            if let Some(length) = node.length {
                out.push(':');
                out.push_str(&format_length(length));
            }
        }
    }
}

enum Visit {
    Enter(NodeId),
    Comma,
    Exit(NodeId),
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_newick())
    }
}

/// Characters that force a label into single quotes
const RESERVED: &[char] = &['(', ')', '[', ']', '\'', ':', ';', ','];

fn write_label(label: &str, out: &mut String) {
    let needs_quotes = label
        .chars()
        .any(|c| c.is_whitespace() || RESERVED.contains(&c));
    if needs_quotes {
        out.push('\'');
        out.push_str(&label.replace('\'', "''"));
        out.push('\'');
    } else {
        out.push_str(label);
    }
}

/// Round away float noise from summed lengths (0.1 + 0.2 prints as 0.3).
fn format_length(length: f64) -> String {
    let rounded = (length * 1e10).round() / 1e10;
    format!("{}", rounded)
}
