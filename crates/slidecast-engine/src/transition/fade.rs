//! Tile dissolve: the screen is cut into 2×2 cell tiles which flip from the
//! old frame to the new one in a fixed pseudo-random order.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{compose, segment};

const TILE: usize = 2;
const SEED: u64 = 42;

/// Reveal order for one screen size. The same size always yields the same
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    columns: usize,
    rows: usize,
    order: Vec<usize>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        let columns = width.div_ceil(TILE);
        let rows = height.div_ceil(TILE);
        let mut order: Vec<usize> = (0..columns * rows).collect();
        order.shuffle(&mut StdRng::seed_from_u64(SEED));
        Self { columns, rows, order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tiles showing `next` at `progress`: `ceil(progress * len)`.
    pub fn revealed(&self, progress: f64) -> usize {
        let amount = (progress * self.len() as f64).ceil();
        if amount <= 0.0 {
            0
        } else {
            (amount as usize).min(self.len())
        }
    }

    pub fn view(&self, prev: &str, next: &str, width: usize, progress: f64) -> String {
        let count = self.revealed(progress);
        if count >= self.len() {
            return compose(prev, next, width, |_, _, next| next.to_string());
        }

        let mut shown = vec![false; self.len()];
        for &tile in &self.order[..count] {
            shown[tile] = true;
        }

        compose(prev, next, width, |i, prev, next| {
            // Lines past the grid reuse its last tile row.
            let row = (i / TILE).min(self.rows - 1);
            let mut line = String::new();
            for column in 0..self.columns {
                let start = column * TILE;
                let end = (start + TILE).min(width);
                let source = if shown[row * self.columns + column] {
                    next
                } else {
                    prev
                };
                line.push_str(&segment(source, start, end));
            }
            line
        })
    }
}
