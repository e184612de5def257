//! Newick parser.
//!
//! Accepts unquoted and single-quoted labels, labels on internal nodes,
//! `:length` suffixes, `[...]` comments and an optional trailing `;`.
//! Nesting is tracked on an explicit stack so deep caterpillar trees do not
//! recurse.

use super::tree::{Node, NodeId, Tree};
use crate::error::TaskError;

/// Parse one Newick tree string
pub fn parse(input: &str) -> Result<Tree, TaskError> {
    let mut parser = Parser::new(input);
    let root = parser.parse_tree()?;
    Ok(Tree::from_parts(parser.nodes, root))
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    nodes: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            nodes: Vec::new(),
        }
    }

    fn parse_tree(&mut self) -> Result<NodeId, TaskError> {
        self.skip_trivia()?;
        if matches!(self.peek(), None | Some(b';')) {
            return Err(self.error("empty tree"));
        }

        let mut open: Vec<NodeId> = Vec::new();
        let root = 'subtrees: loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'(') {
                self.pos += 1;
                let id = self.push_node();
                open.push(id);
                continue;
            }

            let leaf = self.push_node();
            self.parse_label_and_length(leaf)?;
            let mut finished = leaf;

            loop {
                self.skip_trivia()?;
                let Some(&parent) = open.last() else {
                    break 'subtrees finished;
                };
                self.nodes[parent].children.push(finished);
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        break;
                    }
                    Some(b')') => {
                        self.pos += 1;
                        open.pop();
                        self.parse_label_and_length(parent)?;
                        finished = parent;
                    }
                    Some(other) => {
                        return Err(self.error(format!("unexpected '{}'", other as char)))
                    }
                    None => return Err(self.error("unbalanced parentheses")),
                }
            }
        };

        self.skip_trivia()?;
        if self.peek() == Some(b';') {
            self.pos += 1;
            self.skip_trivia()?;
        }
        if self.pos < self.bytes.len() {
            return Err(self.error("trailing characters after tree"));
        }
        Ok(root)
    }

    fn push_node(&mut self) -> NodeId {
        self.nodes.push(Node::empty());
        self.nodes.len() - 1
    }

    fn parse_label_and_length(&mut self, id: NodeId) -> Result<(), TaskError> {
        self.skip_trivia()?;
        let label = if self.peek() == Some(b'\'') {
            Some(self.quoted_label()?)
        } else {
            let raw = self.take_until_delimiter();
            (!raw.is_empty()).then(|| raw.to_string())
        };
        self.nodes[id].label = label;

        self.skip_trivia()?;
        if self.peek() == Some(b':') {
            self.pos += 1;
            self.skip_trivia()?;
            let start = self.pos;
            let raw = self.take_until_delimiter();
            let length = raw.parse::<f64>().map_err(|_| TaskError::Parse {
                position: start,
                reason: format!("invalid branch length '{}'", raw),
            })?;
            self.nodes[id].length = Some(length);
        }
        Ok(())
    }

    fn quoted_label(&mut self) -> Result<String, TaskError> {
        let start = self.pos;
        self.pos += 1;
        let mut label = String::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(offset) = rest.find('\'') else {
                return Err(TaskError::Parse {
                    position: start,
                    reason: "unterminated quoted label".to_string(),
                });
            };
            label.push_str(&rest[..offset]);
            self.pos += offset + 1;
            if self.peek() == Some(b'\'') {
                label.push('\'');
                self.pos += 1;
            } else {
                return Ok(label);
            }
        }
    }

    fn take_until_delimiter(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b"(),:;[".contains(&b) {
                break;
            }
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_trivia(&mut self) -> Result<(), TaskError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'[') => {
                    let start = self.pos;
                    match self.src[self.pos..].find(']') {
                        Some(offset) => self.pos += offset + 1,
                        None => {
                            return Err(TaskError::Parse {
                                position: start,
                                reason: "unterminated comment".to_string(),
                            })
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> TaskError {
        TaskError::Parse {
            position: self.pos,
            reason: reason.into(),
        }
    }
}
