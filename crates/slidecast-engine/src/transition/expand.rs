//! Centre-out reveal and its mirror.

use super::{compose, segment};

/// Half the visible width of the opening (or closing) band at `progress`.
fn reach(progress: f64, width: usize) -> usize {
    (progress * width as f64 / 2.0).round().max(0.0) as usize
}

/// `next` grows out of a vertical band centred on the screen, pushing
/// `prev` aside until it fills the width.
pub fn expand(prev: &str, next: &str, width: usize, progress: f64) -> String {
    let half = width / 2;
    let reach = reach(progress, width);
    if reach >= half {
        return compose(prev, next, width, |_, _, next| next.to_string());
    }

    let (start, end) = (half - reach, half + reach);
    compose(prev, next, width, |_, prev, next| {
        let mut line = segment(prev, 0, start);
        line.push_str(&segment(next, start, end));
        line.push_str(&segment(prev, end, width));
        line
    })
}

/// `prev` shrinks into a vertical band at the centre while `next` takes
/// over from both edges.
pub fn collapse(prev: &str, next: &str, width: usize, progress: f64) -> String {
    let half = width / 2;
    let reach = reach(1.0 - progress, width);
    if reach == 0 {
        return compose(prev, next, width, |_, _, next| next.to_string());
    }

    let start = half.saturating_sub(reach);
    let end = (half + reach).min(width);
    compose(prev, next, width, |_, prev, next| {
        let mut line = segment(next, 0, start);
        line.push_str(&segment(prev, start, end));
        line.push_str(&segment(next, end, width));
        line
    })
}
