//! # Frame Rendering
//!
//! Turns a parsed [`Document`] into one styled terminal frame. The walk is
//! depth-first and pre-order; containers contribute nothing of their own.
//!
//! The renderer owns no styling knowledge. Three collaborators do the work
//! and can be swapped independently:
//!
//! - [`TextStyler`] for literal markdown chunks
//! - [`SyntaxHighlighter`] for code block bodies
//! - [`ImageBackend`] for image rasterisation
//!
//! A collaborator error never aborts a frame: the failed piece falls back to
//! plain text or an inline placeholder and a warning is logged. Only a
//! malformed tree is a [`RenderError`].
//!
//! Tabs in the finished frame are expanded to spaces, so every column the
//! transition compositors count is a real terminal column.
//!
//! ## Modules
//!
//! - **`code`**: code block layout (gutter, emphasis ranges, fixed width)
//! - **`highlight`**: `SyntectHighlighter`
//! - **`image`**: `TerminalImageBackend` (half-block symbols, kitty graphics)
//! - **`styler`**: `MarkdownStyler`, a pulldown-cmark based text styler

pub mod code;
pub mod highlight;
pub mod image;
pub mod styler;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ansi;
use crate::tree::{Document, ImageNode, NodeId, NodeKind};

pub use highlight::SyntectHighlighter;
pub use image::{GraphicsMode, TerminalImageBackend};
pub use styler::{MarkdownStyler, Theme};

/// Saves the cursor position (DECSC).
pub const SAVE_CURSOR: &str = "\x1b7";
/// Restores the cursor position (DECRC).
pub const RESTORE_CURSOR: &str = "\x1b8";

/// A defect in the tree handed to the renderer. Never caused by user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("node {0:?} is not part of the document")]
    DanglingNode(NodeId),

    #[error("{child} node cannot appear inside {parent}")]
    Misplaced {
        parent: &'static str,
        child: &'static str,
    },
}

/// Failure inside a collaborator. Rendering recovers from all of these.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("failed to encode image {path}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("no syntax highlighting theme named {0}")]
    UnknownSyntaxTheme(String),

    #[error("highlighting failed: {0}")]
    Highlight(String),

    #[error("styling failed: {0}")]
    Style(String),
}

/// Styles a literal markdown chunk for the terminal.
pub trait TextStyler {
    fn style(&self, markdown: &str) -> Result<String, CollaboratorError>;
}

/// Highlights a complete code block. The output is split on `\n` and lined
/// up with the source lines.
pub trait SyntaxHighlighter {
    fn highlight(&self, code: &str, language: &str) -> Result<String, CollaboratorError>;
}

/// Rasterises images for the terminal.
pub trait ImageBackend {
    /// Renders `path` into a `width`×`height` cell box (0 means the backend
    /// default). `symbols_only` asks for plain character art.
    fn render(
        &self,
        path: &str,
        width: u32,
        height: u32,
        symbols_only: bool,
    ) -> Result<String, CollaboratorError>;

    /// True when the backend cannot do anything better than symbols, so a
    /// second high-resolution pass is pointless.
    fn symbols_only(&self) -> bool;
}

/// Renders `doc` with explicit collaborators.
pub fn render(
    doc: &Document,
    styler: &dyn TextStyler,
    highlighter: &dyn SyntaxHighlighter,
    images: &dyn ImageBackend,
    animating: bool,
) -> Result<String, RenderError> {
    let walk = Walk {
        doc,
        styler,
        highlighter,
        images,
        animating,
    };
    let mut out = String::new();
    walk.node(doc.root(), None, &mut out)?;
    Ok(match ansi::expand_tabs(&out, ansi::TAB_WIDTH) {
        Cow::Borrowed(_) => out,
        Cow::Owned(expanded) => expanded,
    })
}

/// A renderer bundled with owned collaborators.
pub struct FrameRenderer {
    styler: Box<dyn TextStyler>,
    highlighter: Box<dyn SyntaxHighlighter>,
    images: Box<dyn ImageBackend>,
}

impl FrameRenderer {
    pub fn new(
        styler: Box<dyn TextStyler>,
        highlighter: Box<dyn SyntaxHighlighter>,
        images: Box<dyn ImageBackend>,
    ) -> Self {
        Self {
            styler,
            highlighter,
            images,
        }
    }

    /// The built-in collaborators for `theme`, with images drawn in `mode`.
    /// Relative image paths resolve against the working directory.
    pub fn with_theme(theme: Theme, mode: GraphicsMode) -> Result<Self, CollaboratorError> {
        Self::for_deck(theme, mode, Path::new(""))
    }

    /// Like [`FrameRenderer::with_theme`], with relative image paths resolved
    /// against `deck_dir`.
    pub fn for_deck(
        theme: Theme,
        mode: GraphicsMode,
        deck_dir: &Path,
    ) -> Result<Self, CollaboratorError> {
        let highlighter = SyntectHighlighter::new(theme.syntax_theme)?;
        Ok(Self::new(
            Box::new(MarkdownStyler::new(theme)),
            Box::new(highlighter),
            Box::new(TerminalImageBackend::new(mode).with_base_dir(deck_dir)),
        ))
    }

    pub fn render(&self, doc: &Document, animating: bool) -> Result<String, RenderError> {
        render(
            doc,
            self.styler.as_ref(),
            self.highlighter.as_ref(),
            self.images.as_ref(),
            animating,
        )
    }
}

struct Walk<'a> {
    doc: &'a Document,
    styler: &'a dyn TextStyler,
    highlighter: &'a dyn SyntaxHighlighter,
    images: &'a dyn ImageBackend,
    animating: bool,
}

impl Walk<'_> {
    fn node(
        &self,
        id: NodeId,
        parent: Option<&NodeKind>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let kind = self.doc.kind(id).ok_or(RenderError::DanglingNode(id))?;

        if let Some(parent) = parent
            && !parent.accepts(kind)
        {
            return Err(RenderError::Misplaced {
                parent: parent.name(),
                child: kind.name(),
            });
        }

        match kind {
            NodeKind::Root | NodeKind::Grid | NodeKind::Column => {}
            NodeKind::Text(text) => self.text(text, out),
            NodeKind::Image(image) => self.image(image, out),
            NodeKind::CodeBlock(block) => {
                out.push_str(&code::render_code_block(block, self.highlighter));
            }
        }

        for &child in self.doc.children(id) {
            self.node(child, Some(kind), out)?;
        }
        Ok(())
    }

    fn text(&self, text: &str, out: &mut String) {
        match self.styler.style(text) {
            Ok(styled) => out.push_str(&styled),
            Err(err) => {
                log::warn!("text styling failed, showing raw markdown: {err}");
                out.push_str(text);
            }
        }
    }

    fn image(&self, image: &ImageNode, out: &mut String) {
        let symbols = match self.images.render(&image.path, image.width, image.height, true) {
            Ok(symbols) => symbols,
            Err(err) => return image_failed(image, &err, out),
        };

        if self.animating || self.images.symbols_only() {
            out.push_str(&symbols);
            return;
        }

        match self.images.render(&image.path, image.width, image.height, false) {
            Ok(high) => {
                out.push_str(SAVE_CURSOR);
                out.push_str(&symbols);
                out.push_str(RESTORE_CURSOR);
                out.push_str(&high);
            }
            Err(err) => image_failed(image, &err, out),
        }
    }
}

fn image_failed(image: &ImageNode, err: &CollaboratorError, out: &mut String) {
    log::warn!("image {} failed to render: {err}", image.path);
    out.push_str("[Error rendering image: ");
    out.push_str(&image.label);
    out.push(']');
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::RefCell;

    use super::*;

    /// Wraps text in brackets so tests can see what went through the styler.
    pub struct Brackets;

    impl TextStyler for Brackets {
        fn style(&self, markdown: &str) -> Result<String, CollaboratorError> {
            Ok(format!("<{markdown}>"))
        }
    }

    pub struct FailingStyler;

    impl TextStyler for FailingStyler {
        fn style(&self, _: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Style("boom".into()))
        }
    }

    /// Upper-cases code and tags it with the language.
    pub struct Shout;

    impl SyntaxHighlighter for Shout {
        fn highlight(&self, code: &str, _language: &str) -> Result<String, CollaboratorError> {
            Ok(code.to_uppercase())
        }
    }

    /// Returns a fixed string regardless of input.
    pub struct Canned(pub &'static str);

    impl SyntaxHighlighter for Canned {
        fn highlight(&self, _: &str, _: &str) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    pub struct BrokenHighlighter;

    impl SyntaxHighlighter for BrokenHighlighter {
        fn highlight(&self, _: &str, _: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Highlight("no lexer".into()))
        }
    }

    /// Records every call and answers with `lo:`/`hi:` markers.
    #[derive(Default)]
    pub struct Recorder {
        pub symbols_only: bool,
        pub fail_high: bool,
        pub fail_all: bool,
        pub calls: RefCell<Vec<(String, u32, u32, bool)>>,
    }

    impl ImageBackend for Recorder {
        fn render(
            &self,
            path: &str,
            width: u32,
            height: u32,
            symbols_only: bool,
        ) -> Result<String, CollaboratorError> {
            self.calls
                .borrow_mut()
                .push((path.to_string(), width, height, symbols_only));
            let failed = self.fail_all || (self.fail_high && !symbols_only);
            if failed {
                return Err(CollaboratorError::ImageRead {
                    path: path.into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            let tag = if symbols_only { "lo" } else { "hi" };
            Ok(format!("{tag}:{path}"))
        }

        fn symbols_only(&self) -> bool {
            self.symbols_only
        }
    }
}
