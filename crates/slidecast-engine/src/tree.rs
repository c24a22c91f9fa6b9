//! # Node Tree
//!
//! The parsed document is an arena of [`Node`]s addressed by [`NodeId`].
//! Every node owns an ordered list of child ids; the parent link is a plain
//! index used for traversal only, so dropping a [`Document`] never has to
//! untangle cycles.
//!
//! A `Document` is produced by one parse call and is read-only to callers
//! afterwards. The mutating helpers are crate-private and used by the parser
//! while the tree is under construction.

use std::fmt::{self, Write as _};

/// Index of a node inside its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// An inclusive, 1-based range of code block lines selected for emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A range covering exactly one line.
    pub fn single(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// `![label|WxH](path)`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageNode {
    pub label: String,
    pub path: String,
    /// Requested width in cells, 0 for the backend default.
    pub width: u32,
    /// Requested height in cells, 0 for the backend default.
    pub height: u32,
}

/// A fenced code block with its line-emphasis ranges and display flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockNode {
    /// Language tag, empty when none was given.
    pub language: String,
    /// Ranges in parse order. Empty means every line is emphasised.
    pub ranges: Vec<LineRange>,
    pub show_line_numbers: bool,
    /// Number displayed next to the first line.
    pub start_line: u32,
    /// Fence interior with surrounding newlines trimmed.
    pub code: String,
}

impl Default for CodeBlockNode {
    fn default() -> Self {
        Self {
            language: String::new(),
            ranges: Vec::new(),
            show_line_numbers: false,
            start_line: 1,
            code: String::new(),
        }
    }
}

impl CodeBlockNode {
    /// Whether the 1-based `line` falls inside the emphasised ranges.
    pub fn in_range(&self, line: u32) -> bool {
        self.ranges.is_empty() || self.ranges.iter().any(|r| r.contains(line))
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// A raw markdown chunk handed to the base styler untouched.
    Text(String),
    Image(ImageNode),
    CodeBlock(CodeBlockNode),
    /// Layout container; only [`NodeKind::Column`] children are kept.
    Grid,
    Column,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::Text(_) => "Text",
            NodeKind::Image(_) => "Image",
            NodeKind::CodeBlock(_) => "CodeBlock",
            NodeKind::Grid => "Grid",
            NodeKind::Column => "Column",
        }
    }

    /// Child-acceptance rule applied whenever a node is attached.
    pub fn accepts(&self, child: &NodeKind) -> bool {
        match (self, child) {
            (_, NodeKind::Root) => false,
            (NodeKind::Grid, NodeKind::Column) => true,
            (NodeKind::Grid, _) => false,
            _ => true,
        }
    }
}

/// One arena slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A parsed document: an arena whose slot 0 is always the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(Node::kind)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Number of arena slots, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].children.is_empty()
    }

    /// Pre-order iterator over `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// Allocates a detached node.
    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Attaches a detached node under `parent` if the parent's kind accepts
    /// it. Returns false (leaving `child` detached) otherwise.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
        let accepted = match (self.nodes.get(parent.0), self.nodes.get(child.0)) {
            (Some(p), Some(c)) => c.parent.is_none() && p.kind.accepts(&c.kind),
            _ => false,
        };
        if accepted {
            self.nodes[child.0].parent = Some(parent);
            self.nodes[parent.0].children.push(child);
        }
        accepted
    }

    /// Links `child` under `parent` without the acceptance check, so tests
    /// can build trees the parser never would.
    #[cfg(test)]
    pub(crate) fn force_attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Allocates a node and attaches it in one step, discarding it when the
    /// parent refuses it.
    pub(crate) fn push(&mut self, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mark = self.nodes.len();
        let id = self.alloc(kind);
        if self.attach(parent, id) {
            Some(id)
        } else {
            self.truncate(mark);
            None
        }
    }

    /// Drops every slot at or after `len`.
    ///
    /// Only valid for slots allocated after a checkpoint whose subtree was
    /// never attached to an older node.
    pub(crate) fn truncate(&mut self, len: usize) {
        debug_assert!(
            self.nodes[..len.min(self.nodes.len())]
                .iter()
                .all(|n| n.children.iter().all(|c| c.0 < len)),
            "truncating an attached subtree"
        );
        self.nodes.truncate(len.max(1));
    }

    /// Indented, one-node-per-line description of the tree.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root(), 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        if depth > 0 {
            out.push('\n');
        }
        out.push_str(&"  ".repeat(depth));
        // Writing into a String cannot fail.
        let _ = match &node.kind {
            NodeKind::Text(text) => write!(out, "Text {text:?}"),
            NodeKind::Image(img) => write!(
                out,
                "Image label={:?} path={:?} size={}x{}",
                img.label, img.path, img.width, img.height
            ),
            NodeKind::CodeBlock(cb) => {
                let ranges = cb
                    .ranges
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(
                    out,
                    "CodeBlock lang={:?} ranges={{{ranges}}} numbered={} start={} code={:?}",
                    cb.language, cb.show_line_numbers, cb.start_line, cb.code
                )
            }
            other => write!(out, "{}", other.name()),
        };
        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

/// See [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
