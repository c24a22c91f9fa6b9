//! # Extension Parsing
//!
//! Byte-triggered, priority-ordered dispatch over pluggable block parsers.
//!
//! ## Architecture
//!
//! The [`MarkdownParser`] scans the source one byte at a time. Bytes that
//! no registered parser is interested in accumulate as pending literal text.
//! When a trigger byte is read, every [`BlockParser`] registered for it is
//! tried in ascending priority order:
//!
//! - a [`Checkpoint`] (cursor position + arena length) is taken first
//! - a parser that declines returns `None` and the checkpoint is restored, so
//!   the next candidate sees exactly the same bytes
//! - the first parser that produces a node wins; pending text is flushed into
//!   a `Text` node ahead of it
//!
//! Parsers may re-enter the dispatch loop through
//! [`ParseContext::parse_children`], which is how a column can hold a nested
//! grid. Nesting stops at [`MAX_DEPTH`]; deeper tags stay literal text.
//!
//! ## Failure policy
//!
//! Malformed extension syntax is never an error. A declined parse leaves the
//! bytes in the literal buffer, so the text reaches the base styler verbatim.
//!
//! ## Modules
//!
//! - **`cursor`**: `Cursor` with mark/reset for backtracking
//! - **`kinds`**: the image, code block, grid and column parsers

pub mod cursor;
pub mod kinds;

use std::borrow::Cow;
use std::collections::HashMap;

use crate::tree::{Document, NodeId, NodeKind};

use cursor::Cursor;
use kinds::{CodeBlockParser, ColumnParser, GridParser, ImageParser};

/// How many containers may be open at once.
pub const MAX_DEPTH: usize = 64;

/// A pluggable parser for one extension construct.
pub trait BlockParser {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Bytes that make this parser a candidate at the current position.
    fn triggers(&self) -> &'static [u8];

    /// Attempts to parse a node. The trigger byte has already been consumed
    /// (it is available as [`Cursor::prev`]).
    ///
    /// Returns a detached node on success. Returning `None` makes the caller
    /// restore the cursor and discard anything allocated during the attempt.
    fn parse(&self, cx: &mut ParseContext<'_, '_>) -> Option<NodeId>;
}

/// A registered parser and its priority; lower values are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityEntry {
    parser: usize,
    pub priority: i32,
}

/// The trigger registry plus the dispatch loop.
#[derive(Default)]
pub struct MarkdownParser {
    parsers: Vec<Box<dyn BlockParser>>,
    registry: HashMap<u8, Vec<PriorityEntry>>,
}

impl MarkdownParser {
    /// A parser with an empty registry: everything parses as text.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser with the image, code block, grid and column parsers
    /// registered.
    pub fn with_default_parsers() -> Self {
        let mut p = Self::new();
        p.register(ImageParser, 1);
        p.register(CodeBlockParser, 1);
        p.register(GridParser, 1);
        p.register(ColumnParser, 2);
        p
    }

    /// Associates `parser` with each of its trigger bytes.
    ///
    /// Entries sharing a byte stay sorted by priority; equal priorities keep
    /// registration order.
    pub fn register(&mut self, parser: impl BlockParser + 'static, priority: i32) {
        let index = self.parsers.len();
        for &b in parser.triggers() {
            let entries = self.registry.entry(b).or_default();
            entries.push(PriorityEntry {
                parser: index,
                priority,
            });
            entries.sort_by_key(|e| e.priority);
        }
        self.parsers.push(Box::new(parser));
    }

    /// The entries registered for `b`, in the order they are attempted.
    pub fn entries(&self, b: u8) -> &[PriorityEntry] {
        self.registry.get(&b).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the parsers tried for `b`, in order.
    pub fn candidates(&self, b: u8) -> impl Iterator<Item = &'static str> + '_ {
        self.entries(b)
            .iter()
            .map(|e| self.parsers[e.parser].name())
    }

    /// Parses a whole document into a fresh tree. CRLF line endings are
    /// read as LF.
    pub fn parse(&self, src: &str) -> Document {
        let src = normalize_newlines(src);
        let mut cx = ParseContext::new(self, &src);
        let root = cx.doc.root();
        cx.parse_children(root, None);
        cx.doc
    }
}

/// Position to return to when a parse attempt is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pos: usize,
    nodes: usize,
}

/// State threaded through one parse call.
pub struct ParseContext<'p, 's> {
    parser: &'p MarkdownParser,
    pub cursor: Cursor<'s>,
    pub doc: Document,
    depth: usize,
    last_close: HashMap<Vec<u8>, Option<usize>>,
}

impl<'p, 's> ParseContext<'p, 's> {
    pub fn new(parser: &'p MarkdownParser, src: &'s str) -> Self {
        Self {
            parser,
            cursor: Cursor::new(src),
            doc: Document::new(),
            depth: 0,
            last_close: HashMap::new(),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.cursor.mark(),
            nodes: self.doc.len(),
        }
    }

    pub fn restore(&mut self, cp: Checkpoint) {
        self.cursor.reset(cp.pos);
        self.doc.truncate(cp.nodes);
    }

    /// Allocates a detached node for a parser to return.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.doc.alloc(kind)
    }

    /// Skips spaces, tabs and line breaks.
    pub fn skip_blank(&mut self) {
        self.cursor.take_while(is_blank);
    }

    /// Runs the dispatch loop, attaching everything produced under `parent`.
    ///
    /// With `close == None` the loop runs to end of input. Otherwise it stops
    /// right after the first `close` sequence seen at the top of the loop;
    /// blank text directly before it is dropped. Reaching end of input
    /// before `close` returns false and the caller should decline, as does
    /// opening a container past [`MAX_DEPTH`] or one whose `close` never
    /// appears again.
    pub fn parse_children(&mut self, parent: NodeId, close: Option<&[u8]>) -> bool {
        let Some(close) = close else {
            return self.parse_body(parent, None);
        };
        if self.depth >= MAX_DEPTH || !self.closes_ahead(close) {
            return false;
        }

        self.depth += 1;
        let closed = self.parse_body(parent, Some(close));
        self.depth -= 1;
        closed
    }

    /// True when `close` still occurs at or after the cursor.
    fn closes_ahead(&mut self, close: &[u8]) -> bool {
        let cursor = &self.cursor;
        let last = *self
            .last_close
            .entry(close.to_vec())
            .or_insert_with(|| cursor.rfind(close));
        last.is_some_and(|at| at >= self.cursor.pos())
    }

    fn parse_body(&mut self, parent: NodeId, close: Option<&[u8]>) -> bool {
        let mut text_start = self.cursor.pos();

        loop {
            if let Some(close) = close
                && self.cursor.starts_with(close)
            {
                let text_end = self.cursor.pos();
                self.cursor.bump_n(close.len());
                let text = self.cursor.slice(text_start, text_end);
                self.flush_text(parent, text.trim_end_matches(is_blank_char));
                return true;
            }

            let literal_end = self.cursor.pos();
            let Some(b) = self.cursor.bump() else {
                break;
            };

            if let Some((id, cp)) = self.dispatch(b) {
                let accepted = match (self.doc.kind(parent), self.doc.kind(id)) {
                    (Some(p), Some(c)) => p.accepts(c),
                    _ => false,
                };
                if !accepted {
                    log::debug!("dropping node not accepted by its container");
                    self.doc.truncate(cp.nodes);
                }
                let text = self.cursor.slice(text_start, literal_end);
                self.flush_text(parent, text);
                if accepted {
                    self.doc.attach(parent, id);
                }
                text_start = self.cursor.pos();
            }
        }

        if close.is_some() {
            return false;
        }
        let text = self.cursor.slice(text_start, self.cursor.pos());
        self.flush_text(parent, text);
        true
    }

    /// Tries every candidate for `b` (already consumed), restoring state
    /// between attempts.
    fn dispatch(&mut self, b: u8) -> Option<(NodeId, Checkpoint)> {
        let parser = self.parser;
        for entry in parser.entries(b) {
            let candidate = &parser.parsers[entry.parser];
            let cp = self.checkpoint();
            if let Some(id) = candidate.parse(self) {
                return Some((id, cp));
            }
            log::debug!(
                "{} parser declined at byte {}",
                candidate.name(),
                cp.pos.saturating_sub(1)
            );
            self.restore(cp);
        }
        None
    }

    fn flush_text(&mut self, parent: NodeId, text: &str) {
        if !text.is_empty() {
            self.doc.push(parent, NodeKind::Text(text.to_string()));
        }
    }
}

fn normalize_newlines(src: &str) -> Cow<'_, str> {
    if src.contains("\r\n") {
        Cow::Owned(src.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(src)
    }
}

pub(crate) fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_blank_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Parses `src` with the default parser set.
pub fn parse_document(src: &str) -> Document {
    MarkdownParser::with_default_parsers().parse(src)
}
