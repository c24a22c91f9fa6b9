//! Horizontal swipes. Both frames sit side by side and the viewport moves
//! across them by `round(progress * width)` columns.

use super::{compose, portion, segment};
use crate::ansi;

/// `prev` leaves to the left while `next` enters from the right.
pub fn swipe_left(prev: &str, next: &str, width: usize, progress: f64) -> String {
    let shift = portion(progress, width);
    compose(prev, next, width, |_, prev, next| {
        let mut line = ansi::fit(&ansi::skip(prev, shift), width - shift);
        line.push_str(&segment(next, 0, shift));
        line
    })
}

/// `prev` leaves to the right while `next` enters from the left.
pub fn swipe_right(prev: &str, next: &str, width: usize, progress: f64) -> String {
    let shift = portion(progress, width);
    compose(prev, next, width, |_, prev, next| {
        let mut line = segment(next, width - shift, width);
        line.push_str(&segment(prev, 0, width - shift));
        line
    })
}
