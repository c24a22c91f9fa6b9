//! Vertical slides. Both frames are stacked as one tall strip and the
//! viewport scrolls along it by `round(progress * height)` lines.

use super::{compose, portion};
use crate::ansi;

/// `prev` leaves through the top while `next` rises from the bottom.
pub fn slide_up(prev: &str, next: &str, width: usize, progress: f64) -> String {
    let (prev_lines, next_lines) = (ansi::lines(prev), ansi::lines(next));
    let height = prev_lines.len().max(next_lines.len());
    let shift = portion(progress, height);

    compose(prev, next, width, |i, _, _| {
        let j = i + shift;
        let line = if j < height {
            prev_lines.get(j)
        } else {
            next_lines.get(j - height)
        };
        line.copied().unwrap_or("").to_string()
    })
}

/// `prev` leaves through the bottom while `next` drops in from the top.
pub fn slide_down(prev: &str, next: &str, width: usize, progress: f64) -> String {
    let (prev_lines, next_lines) = (ansi::lines(prev), ansi::lines(next));
    let height = prev_lines.len().max(next_lines.len());
    let shift = portion(progress, height);

    compose(prev, next, width, |i, _, _| {
        let line = if i < shift {
            next_lines.get(height - shift + i)
        } else {
            prev_lines.get(i - shift)
        };
        line.copied().unwrap_or("").to_string()
    })
}
