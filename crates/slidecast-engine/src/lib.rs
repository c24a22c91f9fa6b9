//! # slidecast-engine
//!
//! The presentation core behind `slidecast`: it turns extended markdown into
//! terminal frames and animates between them.
//!
//! ## Pipeline
//!
//! ```text
//! deck source → split_deck → slide markdown → MarkdownParser → Document
//!             → FrameRenderer → ANSI frame → Transition::view → screen
//! ```
//!
//! 1. [`deck`] cuts a presentation into slides and reads per-slide front
//!    matter.
//! 2. [`parsing`] recognises the extension syntax (images, code fences with
//!    line ranges, grids of columns) and leaves everything else as text.
//! 3. [`tree`] holds the result in an arena of nodes addressed by
//!    [`NodeId`].
//! 4. [`render`] walks the tree and delegates text styling, highlighting and
//!    image drawing to replaceable collaborators.
//! 5. [`transition`] blends two rendered frames with spring-driven effects.
//!
//! [`ansi`] provides the escape-aware width and cutting helpers shared by
//! the renderer and the compositors.

pub mod ansi;
pub mod deck;
pub mod parsing;
pub mod render;
pub mod transition;
pub mod tree;

pub use deck::{DeckError, Slide, SlideProperties, split_deck};
pub use parsing::{BlockParser, MarkdownParser, ParseContext, parse_document};
pub use render::{
    CollaboratorError, FrameRenderer, ImageBackend, RenderError, SyntaxHighlighter, TextStyler,
    render,
};
pub use transition::{Direction, Transition, TransitionKind};
pub use tree::{CodeBlockNode, Document, ImageNode, LineRange, Node, NodeId, NodeKind};
