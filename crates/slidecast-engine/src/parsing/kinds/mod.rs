//! # Block Kinds
//!
//! One parser per extension construct. Each type owns its delimiter
//! constants; the dispatch loop never hardcodes `[grid]` or a fence.
//!
//! ## Types
//!
//! - **`ImageParser`**: `![label|WxH](path)`, triggered by `!`
//! - **`CodeBlockParser`**: fenced code with `{ranges}` and flags, triggered
//!   by `` ` `` and `~`
//! - **`GridParser`** / **`ColumnParser`**: `[grid]` and `[column]`
//!   containers, both triggered by `[`

pub mod code_block;
pub mod grid;
pub mod image;

pub use code_block::{CodeBlockParser, CodeFlags, FenceError};
pub use grid::{ColumnParser, GridParser};
pub use image::ImageParser;
