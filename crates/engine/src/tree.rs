// SPDX-FileCopyrightText: 2026 Quarry Contributors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arena-backed syntax trees and the per-file [`SourceUnit`] bundle.
//!
//! Front-ends build a [`SyntaxTree`] with [`TreeBuilder`]; the engine only
//! reads it. Nodes live in one `Vec` and refer to each other by [`NodeId`],
//! so parent links cost nothing and there are no ownership cycles. Node
//! labels are front-end vocabulary (`"call"`, `"binary"`, ...); the engine
//! never interprets them, it asks the semantic oracle instead.
//!
//! Node spans must be token-tight: a node starts at the first byte of its
//! first token and ends at the last byte of its last token. The matcher's
//! span-alignment checks rely on this.

use std::ops::Range;
use std::path::PathBuf;

use serde::Serialize;
use smallvec::SmallVec;

use crate::token::{Token, canonical_text};

/// Stable index of a node within its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub label: String,
    pub span: Range<usize>,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
}

/// An immutable syntax tree over one file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    #[must_use]
    pub fn builder() -> TreeBuilder {
        TreeBuilder::default()
    }

    /// The root node. Trees always have one; `TreeBuilder::finish` enforces it.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn label(&self, id: NodeId) -> &str {
        &self.get(id).label
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Range<usize> {
        self.get(id).span.clone()
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub fn children(&self, id: NodeId) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        self.get(id).children.iter().copied()
    }

    /// Pre-order traversal from the root.
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = if self.nodes.is_empty() {
            vec![]
        } else {
            vec![self.root()]
        };
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.get(id).children.iter().rev().copied());
            Some(id)
        })
    }

    /// The deepest node whose span contains `span`.
    #[must_use]
    pub fn covering(&self, span: &Range<usize>) -> NodeId {
        let mut cur = self.root();
        'descend: loop {
            for child in self.children(cur) {
                let cs = self.span(child);
                if cs.start <= span.start && span.end <= cs.end {
                    cur = child;
                    continue 'descend;
                }
            }
            return cur;
        }
    }

    /// Whether `span` properly crosses the boundary of any node: the two
    /// intervals intersect and neither contains the other. A capture with a
    /// crossing span does not correspond to any subtree or sibling run and
    /// is rejected by the matcher.
    #[must_use]
    pub fn crosses_any_node(&self, span: &Range<usize>) -> bool {
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let ns = self.span(id);
            if ns.start >= span.end || span.start >= ns.end {
                continue;
            }
            let node_inside = span.start <= ns.start && ns.end <= span.end;
            let span_inside = ns.start <= span.start && span.end <= ns.end;
            if !node_inside && !span_inside {
                return true;
            }
            if span_inside {
                stack.extend(self.children(id));
            }
        }
        false
    }
}

/// Incremental builder used by front-ends.
///
/// `start_node`/`finish_node` calls must nest; `finish` checks that exactly
/// one root was produced. [`TreeBuilder::start_node_at`] retroactively wraps
/// already-built siblings, which is how parsers produce left-associative
/// operator nests without lookahead.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
}

/// A position among the children of the currently open node. See
/// [`TreeBuilder::checkpoint`].
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    child_index: usize,
}

impl TreeBuilder {
    pub fn start_node(&mut self, label: impl Into<String>, start: usize) {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();
        self.nodes.push(NodeData {
            label: label.into(),
            span: start..start,
            parent,
            children: SmallVec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }
        self.stack.push(id);
    }

    pub fn finish_node(&mut self, end: usize) {
        let id = self.stack.pop().expect("finish_node without start_node");
        self.nodes[id.index()].span.end = end;
    }

    /// Remember the current position among the open node's children so a
    /// node started later can adopt everything built from here on.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        let top = self.stack.last().expect("checkpoint outside a node");
        Checkpoint {
            child_index: self.nodes[top.index()].children.len(),
        }
    }

    /// Open a node that adopts all children built since `cp`. The new node
    /// must still be closed with `finish_node`. Requires at least one child
    /// built since the checkpoint; its start becomes the new node's start.
    pub fn start_node_at(&mut self, cp: Checkpoint, label: impl Into<String>) {
        let top = *self.stack.last().expect("start_node_at outside a node");
        let adopted: SmallVec<[NodeId; 4]> = self.nodes[top.index()]
            .children
            .drain(cp.child_index..)
            .collect();
        let first = adopted.first().expect("checkpoint adopted no children");
        let start = self.nodes[first.index()].span.start;
        let id = NodeId(self.nodes.len() as u32);
        for child in &adopted {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(NodeData {
            label: label.into(),
            span: start..start,
            parent: Some(top),
            children: adopted,
        });
        self.nodes[top.index()].children.push(id);
        self.stack.push(id);
    }

    /// Consume the builder. Panics if nodes are still open or no root exists;
    /// both are front-end bugs, not user errors.
    #[must_use]
    pub fn finish(self) -> SyntaxTree {
        assert!(self.stack.is_empty(), "unfinished nodes in TreeBuilder");
        assert!(!self.nodes.is_empty(), "empty tree");
        SyntaxTree { nodes: self.nodes }
    }
}

/// Everything the engine needs to know about one parsed file: its path, raw
/// text, syntax tree and aligned token stream.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
    pub tree: SyntaxTree,
    pub tokens: Vec<Token>,
    line_starts: Vec<usize>,
}

impl SourceUnit {
    #[must_use]
    pub fn new(path: PathBuf, text: String, tree: SyntaxTree, tokens: Vec<Token>) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.bytes().enumerate().filter(|(_, b)| *b == b'\n').map(|(i, _)| i + 1));
        Self {
            path,
            text,
            tree,
            tokens,
            line_starts,
        }
    }

    /// The surface text of a byte range, exactly as written.
    #[must_use]
    pub fn surface(&self, span: &Range<usize>) -> &str {
        &self.text[span.clone()]
    }

    /// Tokens lying entirely within `span`.
    #[must_use]
    pub fn tokens_in(&self, span: &Range<usize>) -> &[Token] {
        let first = self.tokens.partition_point(|t| t.span.start < span.start);
        let mut last = first;
        while last < self.tokens.len() && self.tokens[last].span.end <= span.end {
            last += 1;
        }
        &self.tokens[first..last]
    }

    /// Canonical (single-spaced) rendering of the tokens within `span`.
    #[must_use]
    pub fn canonical(&self, span: &Range<usize>) -> String {
        canonical_text(self.tokens_in(span))
    }

    /// One-based line and column of a byte offset. Columns count characters,
    /// not bytes.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let col = self.text[self.line_starts[line]..offset].chars().count();
        (line + 1, col + 1)
    }

    /// The whitespace prefix of the line containing `offset`. Tabs and
    /// spaces are preserved as found.
    #[must_use]
    pub fn line_indent(&self, offset: usize) -> &str {
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let start = self.line_starts[line];
        let rest = &self.text[start..];
        let end = rest
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(rest.len());
        &rest[..end]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::tokenize;

    fn leaf(b: &mut TreeBuilder, label: &str, span: Range<usize>) {
        b.start_node(label, span.start);
        b.finish_node(span.end);
    }

    // builds a tree for "a + b" with a binary node over two idents
    fn sample() -> SyntaxTree {
        let mut b = SyntaxTree::builder();
        b.start_node("binary", 0);
        leaf(&mut b, "ident", 0..1);
        leaf(&mut b, "ident", 4..5);
        b.finish_node(5);
        b.finish()
    }

    #[test]
    fn test_parent_child_links() {
        let tree = sample();
        let root = tree.root();
        let kids: Vec<_> = tree.children(root).collect();
        assert_eq!(kids.len(), 2);
        assert_eq!(tree.parent(kids[0]), Some(root));
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn test_preorder_is_depth_first() {
        let tree = sample();
        let labels: Vec<_> = tree.preorder().map(|n| tree.label(n).to_string()).collect();
        assert_eq!(labels, vec!["binary", "ident", "ident"]);
    }

    #[test]
    fn test_covering_descends_to_deepest() {
        let tree = sample();
        let id = tree.covering(&(0..1));
        assert_eq!(tree.label(id), "ident");
        let id = tree.covering(&(0..5));
        assert_eq!(tree.label(id), "binary");
    }

    #[test]
    fn test_crossing_detection() {
        let tree = sample();
        // [0,1) is the first ident: no crossing
        assert!(!tree.crosses_any_node(&(0..1)));
        // [0,5) is the whole binary: no crossing
        assert!(!tree.crosses_any_node(&(0..5)));
    }

    #[test]
    fn test_crossing_partial_overlap() {
        // "f(a)" with call > ident(f), args(1..4)
        let mut b = SyntaxTree::builder();
        b.start_node("call", 0);
        leaf(&mut b, "ident", 0..1);
        b.start_node("arg_list", 1);
        leaf(&mut b, "ident", 2..3);
        b.finish_node(4);
        b.finish_node(4);
        let tree = b.finish();
        // span [0,2) covers "f(" - it cuts into the arg_list
        assert!(tree.crosses_any_node(&(0..2)));
    }

    #[test]
    fn test_checkpoint_wraps_left_associative() {
        // simulate parsing "a + b + c" into ((a+b)+c)
        let mut b = SyntaxTree::builder();
        b.start_node("file", 0);
        let cp = b.checkpoint();
        leaf(&mut b, "ident", 0..1);
        b.start_node_at(cp, "binary");
        leaf(&mut b, "ident", 4..5);
        b.finish_node(5);
        b.start_node_at(cp, "binary");
        leaf(&mut b, "ident", 8..9);
        b.finish_node(9);
        b.finish_node(9);
        let tree = b.finish();
        let outer = tree.children(tree.root()).next().unwrap();
        assert_eq!(tree.label(outer), "binary");
        assert_eq!(tree.span(outer), 0..9);
        let kids: Vec<_> = tree.children(outer).collect();
        assert_eq!(tree.label(kids[0]), "binary");
        assert_eq!(tree.span(kids[0]), 0..5);
        assert_eq!(tree.label(kids[1]), "ident");
        assert_eq!(tree.parent(kids[0]), Some(outer));
    }

    #[test]
    fn test_unit_positions() {
        let text = "ab\n  cd\n".to_string();
        let tokens = tokenize(&text);
        let mut b = SyntaxTree::builder();
        b.start_node("file", 0);
        b.finish_node(text.len());
        let unit = SourceUnit::new(PathBuf::from("x"), text, b.finish(), tokens);
        assert_eq!(unit.line_col(0), (1, 1));
        assert_eq!(unit.line_col(5), (2, 3));
        assert_eq!(unit.line_indent(5), "  ");
        assert_eq!(unit.line_indent(0), "");
    }

    #[test]
    fn test_tokens_in_window() {
        let text = "f(a, b)".to_string();
        let tokens = tokenize(&text);
        let mut b = SyntaxTree::builder();
        b.start_node("file", 0);
        b.finish_node(text.len());
        let unit = SourceUnit::new(PathBuf::from("x"), text, b.finish(), tokens);
        let inner: Vec<_> = unit.tokens_in(&(2..6)).iter().map(|t| t.text.clone()).collect();
        assert_eq!(inner, vec!["a", ",", "b"]);
    }
}
