//! # Styled Text Geometry
//!
//! Column arithmetic over text that carries terminal escape sequences.
//! Escapes occupy no columns and are never split: they are recognised as
//! whole units before any cut is made.
//!
//! Recognised forms:
//! - CSI: `ESC [` ... final byte (0x40-0x7E)
//! - OSC: `ESC ]` ... BEL or ST (`ESC \`)
//! - DCS/PM/APC: `ESC P` / `ESC ^` / `ESC _` ... BEL or ST
//! - two-byte sequences: `ESC` + one byte
//!
//! A wide character that straddles a cut is replaced by spaces so that
//! the result still has exactly the requested number of columns.

use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

const ESC: u8 = 0x1B;

/// Resets every SGR attribute.
pub const RESET: &str = "\x1b[0m";

/// Columns between tab stops in rendered frames.
pub const TAB_WIDTH: usize = 4;

/// Deletes every kitty graphics placement on screen.
pub const CLEAR_KITTY_IMAGES: &str = "\x1b_Ga=d\x1b\\";

/// One unit of styled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Escape(&'a str),
    Char(char, usize),
}

struct Tokens<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.s.as_bytes();
        let start = self.i;
        if *bytes.get(start)? == ESC {
            self.i = skip_escape_sequence(bytes, start);
            return Some(Token::Escape(self.s.get(start..self.i).unwrap_or("")));
        }
        let c = self.s.get(start..)?.chars().next()?;
        self.i += c.len_utf8();
        Some(Token::Char(c, c.width().unwrap_or(0)))
    }
}

fn tokens(s: &str) -> Tokens<'_> {
    Tokens { s, i: 0 }
}

/// Index just past the escape sequence starting at `pos`.
fn skip_escape_sequence(bytes: &[u8], pos: usize) -> usize {
    let next = pos + 1;
    if next >= bytes.len() {
        return bytes.len();
    }
    match bytes[next] {
        b'[' => skip_csi(bytes, next + 1),
        b']' | b'P' | b'^' | b'_' => skip_string_terminated(bytes, next + 1),
        _ => next + 1,
    }
}

fn skip_csi(bytes: &[u8], pos: usize) -> usize {
    for (i, &b) in bytes.iter().enumerate().skip(pos) {
        if (0x40..=0x7E).contains(&b) {
            return i + 1;
        }
        if !(0x20..=0x7E).contains(&b) {
            return i;
        }
    }
    bytes.len()
}

fn skip_string_terminated(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            0x07 => return i + 1,
            ESC if bytes.get(i + 1) == Some(&b'\\') => return i + 2,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// SGR sequences carry colour state across a cut; anything else does not.
fn is_sgr(esc: &str) -> bool {
    esc.starts_with("\x1b[") && esc.ends_with('m')
}

/// True when the last SGR sequence in `s` leaves some attribute set.
fn style_open(s: &str) -> bool {
    let last = tokens(s)
        .filter_map(|t| match t {
            Token::Escape(esc) if is_sgr(esc) => Some(esc),
            _ => None,
        })
        .last();
    last.is_some_and(|esc| !matches!(esc, RESET | "\x1b[m"))
}

pub fn has_escapes(s: &str) -> bool {
    s.as_bytes().contains(&ESC)
}

/// `s` without any escape sequences.
pub fn strip(s: &str) -> Cow<'_, str> {
    if !has_escapes(s) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    for token in tokens(s) {
        if let Token::Char(c, _) = token {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Replaces each tab with spaces up to the next multiple of `tab_width`
/// columns, counted from the start of its line.
pub fn expand_tabs(s: &str, tab_width: usize) -> Cow<'_, str> {
    if !s.contains('\t') {
        return Cow::Borrowed(s);
    }
    let tab_width = tab_width.max(1);
    let mut out = String::with_capacity(s.len());
    let mut column = 0;
    for token in tokens(s) {
        match token {
            Token::Escape(esc) => out.push_str(esc),
            Token::Char('\t', _) => {
                let pad = tab_width - column % tab_width;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            Token::Char('\n', _) => {
                out.push('\n');
                column = 0;
            }
            Token::Char(c, width) => {
                out.push(c);
                column += width;
            }
        }
    }
    Cow::Owned(out)
}

/// Terminal columns occupied by `s`.
pub fn visible_width(s: &str) -> usize {
    tokens(s)
        .map(|t| match t {
            Token::Char(_, w) => w,
            Token::Escape(_) => 0,
        })
        .sum()
}

/// The first `width` columns of `s`, escapes included.
pub fn truncate(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len().min(width * 4));
    let mut col = 0;
    for token in tokens(s) {
        match token {
            Token::Escape(esc) => {
                if col < width {
                    out.push_str(esc);
                }
            }
            Token::Char(c, w) => {
                if col + w > width {
                    out.extend(std::iter::repeat_n(' ', width - col));
                    break;
                }
                out.push(c);
                col += w;
            }
        }
    }
    out
}

/// `s` with its first `width` columns removed. Colour changes inside the
/// removed part are kept so the remainder renders with the right style.
pub fn skip(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut col = 0;
    for token in tokens(s) {
        match token {
            Token::Escape(esc) => {
                if col >= width || is_sgr(esc) {
                    out.push_str(esc);
                }
            }
            Token::Char(c, w) => {
                if col >= width {
                    out.push(c);
                } else if col + w > width {
                    // Wide character split by the cut: keep its right half.
                    out.extend(std::iter::repeat_n(' ', col + w - width));
                }
                col += w;
            }
        }
    }
    out
}

/// Columns `start..end` of `s`.
pub fn slice(s: &str, start: usize, end: usize) -> String {
    if end <= start {
        return String::new();
    }
    truncate(&skip(s, start), end - start)
}

/// `s` cut or padded to exactly `width` columns. Styled input is closed
/// with a reset before the padding so styles never bleed.
pub fn fit(s: &str, width: usize) -> String {
    let mut out = truncate(s, width);
    if style_open(&out) {
        out.push_str(RESET);
    }
    let pad = width.saturating_sub(visible_width(&out));
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

/// Splits a frame into its lines.
pub fn lines(frame: &str) -> Vec<&str> {
    frame.split('\n').collect()
}
