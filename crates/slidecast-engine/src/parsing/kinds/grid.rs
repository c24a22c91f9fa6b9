use crate::parsing::{BlockParser, ParseContext};
use crate::tree::{NodeId, NodeKind};

/// `[grid] … [/grid]`. Only columns survive as children.
pub struct GridParser;

impl GridParser {
    /// The opening tag after its `[` trigger.
    pub const OPEN: &'static [u8] = b"grid]";
    pub const CLOSE: &'static [u8] = b"[/grid]";
}

/// `[column] … [/column]`, with a body that may hold anything.
pub struct ColumnParser;

impl ColumnParser {
    pub const OPEN: &'static [u8] = b"column]";
    pub const CLOSE: &'static [u8] = b"[/column]";
}

/// Shared container parse: opening tag, blank run, re-entrant body, close.
fn parse_container(
    cx: &mut ParseContext<'_, '_>,
    open: &[u8],
    close: &[u8],
    kind: NodeKind,
) -> Option<NodeId> {
    if !cx.cursor.eat(open) {
        return None;
    }
    cx.skip_blank();
    let id = cx.alloc(kind);
    cx.parse_children(id, Some(close)).then_some(id)
}

impl BlockParser for GridParser {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn triggers(&self) -> &'static [u8] {
        b"["
    }

    fn parse(&self, cx: &mut ParseContext<'_, '_>) -> Option<NodeId> {
        parse_container(cx, Self::OPEN, Self::CLOSE, NodeKind::Grid)
    }
}

impl BlockParser for ColumnParser {
    fn name(&self) -> &'static str {
        "column"
    }

    fn triggers(&self) -> &'static [u8] {
        b"["
    }

    fn parse(&self, cx: &mut ParseContext<'_, '_>) -> Option<NodeId> {
        parse_container(cx, Self::OPEN, Self::CLOSE, NodeKind::Column)
    }
}
