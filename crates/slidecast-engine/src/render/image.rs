//! Terminal image output.
//!
//! Two encodings are produced:
//!
//! - **symbols**: one `▀` per cell, foreground = upper pixel, background =
//!   lower pixel, 24-bit colour. Works everywhere.
//! - **kitty**: the kitty graphics protocol, a base64 PNG sent in chunks and
//!   scaled by the terminal into the same cell box.
//!
//! Results are memoised per (path, width, height, symbols-only) since the
//! same slide is re-rendered on every animation tick.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba};

use crate::ansi::RESET;
use crate::render::{CollaboratorError, ImageBackend};

/// Cell box used when a dimension is requested as 0.
pub const DEFAULT_WIDTH: u32 = 40;
pub const DEFAULT_HEIGHT: u32 = 20;

/// Terminal cells are twice as tall as they are wide.
const PIXELS_PER_CELL_ROW: u32 = 2;
/// Extra zoom applied after fitting the image into its box.
const SCALE: f64 = 1.0;
/// Base64 bytes per kitty graphics escape.
const KITTY_CHUNK: usize = 4096;
const HALF_BLOCK: char = '▀';

/// How high-resolution images reach the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphicsMode {
    /// Pick from the environment at construction.
    #[default]
    Auto,
    Symbols,
    Kitty,
}

impl GraphicsMode {
    /// Resolves `Auto` from `TERM` and `TERM_PROGRAM`.
    pub fn resolve(self) -> GraphicsMode {
        match self {
            GraphicsMode::Auto => Self::detect(
                std::env::var("TERM").ok().as_deref(),
                std::env::var("TERM_PROGRAM").ok().as_deref(),
            ),
            other => other,
        }
    }

    fn detect(term: Option<&str>, term_program: Option<&str>) -> GraphicsMode {
        let kitty_term = term.is_some_and(|t| t.contains("kitty") || t.contains("ghostty"));
        let kitty_program =
            term_program.is_some_and(|p| matches!(p, "WezTerm" | "ghostty" | "kitty"));
        if kitty_term || kitty_program {
            GraphicsMode::Kitty
        } else {
            GraphicsMode::Symbols
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: String,
    width: u32,
    height: u32,
    symbols_only: bool,
}

/// Default [`ImageBackend`]: decodes with `image`, draws symbols or kitty
/// graphics depending on the resolved [`GraphicsMode`].
pub struct TerminalImageBackend {
    mode: GraphicsMode,
    base_dir: PathBuf,
    cache: RefCell<HashMap<CacheKey, String>>,
}

impl TerminalImageBackend {
    pub fn new(mode: GraphicsMode) -> Self {
        Self {
            mode: mode.resolve(),
            base_dir: PathBuf::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves relative image paths against `dir` instead of the working
    /// directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn mode(&self) -> GraphicsMode {
        self.mode
    }

    fn draw(
        &self,
        path: &str,
        width: u32,
        height: u32,
        symbols_only: bool,
    ) -> Result<String, CollaboratorError> {
        let path = self.base_dir.join(path);
        let img = load(&path)?;
        let (cols, rows) = fit_cells(img.width(), img.height(), width, height);
        if symbols_only || self.mode != GraphicsMode::Kitty {
            Ok(half_blocks(&img, cols, rows))
        } else {
            kitty(&img, &path, cols, rows)
        }
    }
}

impl ImageBackend for TerminalImageBackend {
    fn render(
        &self,
        path: &str,
        width: u32,
        height: u32,
        symbols_only: bool,
    ) -> Result<String, CollaboratorError> {
        let key = CacheKey {
            path: path.to_string(),
            width,
            height,
            symbols_only,
        };
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }

        let out = self.draw(path, width, height, symbols_only)?;
        self.cache.borrow_mut().insert(key, out.clone());
        Ok(out)
    }

    fn symbols_only(&self) -> bool {
        self.mode != GraphicsMode::Kitty
    }
}

fn load(path: &Path) -> Result<DynamicImage, CollaboratorError> {
    let read_err = |source| CollaboratorError::ImageRead {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .map_err(read_err)?
        .with_guessed_format()
        .map_err(read_err)?
        .decode()
        .map_err(|source| CollaboratorError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })
}

/// Largest cell box inside `max_cols`×`max_rows` that keeps the image's
/// aspect ratio. A zero bound selects the default box.
pub fn fit_cells(img_w: u32, img_h: u32, max_cols: u32, max_rows: u32) -> (u32, u32) {
    let max_cols = if max_cols == 0 { DEFAULT_WIDTH } else { max_cols };
    let max_rows = if max_rows == 0 { DEFAULT_HEIGHT } else { max_rows };
    if img_w == 0 || img_h == 0 {
        return (max_cols, max_rows);
    }

    let box_w = f64::from(max_cols);
    let box_h = f64::from(max_rows * PIXELS_PER_CELL_ROW);
    let scale = (box_w / f64::from(img_w)).min(box_h / f64::from(img_h)) * SCALE;

    let cols = (f64::from(img_w) * scale).round().clamp(1.0, box_w) as u32;
    let px_rows = (f64::from(img_h) * scale).round().clamp(1.0, box_h) as u32;
    (cols, px_rows.div_ceil(PIXELS_PER_CELL_ROW))
}

fn half_blocks(img: &DynamicImage, cols: u32, rows: u32) -> String {
    let pixels = img
        .resize_exact(cols, rows * PIXELS_PER_CELL_ROW, FilterType::Triangle)
        .to_rgba8();

    let mut out = String::new();
    for row in 0..rows {
        if row > 0 {
            out.push('\n');
        }
        for col in 0..cols {
            let top = pixels.get_pixel(col, row * 2);
            let bottom = pixels.get_pixel(col, row * 2 + 1);
            push_cell(&mut out, top, bottom);
        }
        out.push_str(RESET);
    }
    out
}

fn push_cell(out: &mut String, top: &Rgba<u8>, bottom: &Rgba<u8>) {
    let visible = |p: &Rgba<u8>| p[3] >= 128;
    match (visible(top), visible(bottom)) {
        (true, true) => {
            let [r, g, b, _] = top.0;
            let [br, bg, bb, _] = bottom.0;
            out.push_str(&format!(
                "\x1b[38;2;{r};{g};{b}m\x1b[48;2;{br};{bg};{bb}m{HALF_BLOCK}"
            ));
        }
        (true, false) => {
            let [r, g, b, _] = top.0;
            out.push_str(&format!("\x1b[38;2;{r};{g};{b}m\x1b[49m{HALF_BLOCK}"));
        }
        (false, true) => {
            let [r, g, b, _] = bottom.0;
            out.push_str(&format!("\x1b[38;2;{r};{g};{b}m\x1b[49m▄"));
        }
        (false, false) => out.push_str("\x1b[39;49m "),
    }
}

/// Transmits the image as PNG and places it over `cols`×`rows` cells.
fn kitty(
    img: &DynamicImage,
    path: &Path,
    cols: u32,
    rows: u32,
) -> Result<String, CollaboratorError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|source| CollaboratorError::ImageEncode {
            path: path.to_path_buf(),
            source,
        })?;
    let payload = STANDARD.encode(&png);

    let mut out = String::with_capacity(payload.len() + 64);
    let chunks: Vec<&[u8]> = payload.as_bytes().chunks(KITTY_CHUNK).collect();
    for (i, chunk) in chunks.iter().enumerate() {
        let more = u8::from(i + 1 < chunks.len());
        // Base64 output is ASCII.
        let chunk = std::str::from_utf8(chunk).unwrap_or_default();
        if i == 0 {
            out.push_str(&format!(
                "\x1b_Gf=100,a=T,q=2,c={cols},r={rows},m={more};{chunk}\x1b\\"
            ));
        } else {
            out.push_str(&format!("\x1b_Gm={more};{chunk}\x1b\\"));
        }
    }
    Ok(out)
}
