//! Placing rendered slides on the screen.
//!
//! Frames come out of the engine anchored at the top-left. Everything the
//! terminal shows goes through [`place`] first, which centres the slide in a
//! `width`×`height` block. Transitions composite these placed frames, so
//! both sides of an animation line up cell for cell.

use slidecast_engine::ansi;

pub const TOO_LARGE: &str = "Unable to render slide: content exceeds terminal size.";

/// Centres `frame` on a `width`×`height` screen.
///
/// The result has exactly `height` lines of exactly `width` columns. A
/// frame taller than the screen is replaced by [`TOO_LARGE`].
pub fn place(frame: &str, width: usize, height: usize) -> String {
    let mut lines = ansi::lines(frame);
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    if lines.len() > height {
        return place(TOO_LARGE, width, height.max(1));
    }

    let block = lines
        .iter()
        .map(|l| ansi::visible_width(l))
        .max()
        .unwrap_or(0)
        .min(width);
    let margin = " ".repeat((width - block) / 2);
    let top = (height - lines.len()) / 2;

    let blank = " ".repeat(width);
    let mut out = Vec::with_capacity(height);
    out.extend(std::iter::repeat_n(blank.clone(), top));
    out.extend(
        lines
            .iter()
            .map(|line| ansi::fit(&format!("{margin}{line}"), width)),
    );
    out.resize(height, blank);
    out.join("\n")
}

/// Writes `text` over the bottom line of a placed frame, centred.
pub fn status_line(placed: &str, text: &str, width: usize) -> String {
    let text = ansi::truncate(text, width);
    let margin = " ".repeat(width.saturating_sub(ansi::visible_width(&text)) / 2);
    let status = ansi::fit(&format!("{margin}{text}"), width);

    let mut lines = ansi::lines(placed);
    lines.pop();
    lines.push(&status);
    lines.join("\n")
}
