//! # Transitions
//!
//! Spring-driven compositors that blend two pre-rendered frames while the
//! presentation moves between slides.
//!
//! A [`Transition`] is a plain value. The caller drives it:
//!
//! 1. [`Transition::start`] with the terminal size and navigation direction
//! 2. [`Transition::update`] once per tick; it returns the delay before the
//!    next tick, or `None` once the transition has settled
//! 3. [`Transition::view`] to composite the outgoing and incoming frames
//!
//! There is no clock or thread inside. Starting a new navigation simply
//! replaces the value.
//!
//! ## Compositing
//!
//! Every compositor walks `max(lines(prev), lines(next))` lines, treats a
//! missing line as empty and fits each output line to exactly the terminal
//! width. Cuts are escape-aware (see [`crate::ansi`]).
//!
//! ## Modules
//!
//! - **`spring`**: the damped harmonic oscillator
//! - **`expand`**: `expand` and its mirror `collapse`
//! - **`slide`**: vertical `slideUp` / `slideDown`
//! - **`swipe`**: horizontal `swipeLeft` / `swipeRight`
//! - **`fade`**: seeded tile dissolve

pub mod expand;
pub mod fade;
pub mod slide;
pub mod spring;
pub mod swipe;

use std::fmt;
use std::time::Duration;

use crate::ansi;

use fade::TileGrid;
use spring::Spring;

/// Progress at which a transition is considered settled.
const SETTLED: f64 = 0.99;

/// Default frame rate.
pub const DEFAULT_FPS: u32 = 60;

/// Which neighbour the presentation is moving to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// The frame being left: the previous slide when moving forward, the
    /// following slide when moving back.
    pub fn outgoing<'a>(self, previous: &'a str, following: &'a str) -> &'a str {
        match self {
            Direction::Forward => previous,
            Direction::Backward => following,
        }
    }
}

/// The available effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransitionKind {
    #[default]
    None,
    Expand,
    Collapse,
    Fade,
    SlideUp,
    SlideDown,
    SwipeLeft,
    SwipeRight,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 8] = [
        TransitionKind::None,
        TransitionKind::Expand,
        TransitionKind::Collapse,
        TransitionKind::Fade,
        TransitionKind::SlideUp,
        TransitionKind::SlideDown,
        TransitionKind::SwipeLeft,
        TransitionKind::SwipeRight,
    ];

    /// The name used in slide front matter and configuration.
    pub fn name(self) -> &'static str {
        match self {
            TransitionKind::None => "none",
            TransitionKind::Expand => "expand",
            TransitionKind::Collapse => "collapse",
            TransitionKind::Fade => "fade",
            TransitionKind::SlideUp => "slideUp",
            TransitionKind::SlideDown => "slideDown",
            TransitionKind::SwipeLeft => "swipeLeft",
            TransitionKind::SwipeRight => "swipeRight",
        }
    }

    pub fn from_name(name: &str) -> Option<TransitionKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The effect that undoes this one when navigating backwards.
    pub fn opposite(self) -> TransitionKind {
        match self {
            TransitionKind::None => TransitionKind::None,
            TransitionKind::Expand => TransitionKind::Collapse,
            TransitionKind::Collapse => TransitionKind::Expand,
            TransitionKind::Fade => TransitionKind::Fade,
            TransitionKind::SlideUp => TransitionKind::SlideDown,
            TransitionKind::SlideDown => TransitionKind::SlideUp,
            TransitionKind::SwipeLeft => TransitionKind::SwipeRight,
            TransitionKind::SwipeRight => TransitionKind::SwipeLeft,
        }
    }

    /// Spring `(angular frequency, damping ratio)`.
    fn spring_constants(self) -> (f64, f64) {
        match self {
            TransitionKind::None => (0.0, 0.0),
            TransitionKind::Expand | TransitionKind::Collapse => (7.0, 0.6),
            TransitionKind::Fade => (15.0, 0.65),
            TransitionKind::SlideUp
            | TransitionKind::SlideDown
            | TransitionKind::SwipeLeft
            | TransitionKind::SwipeRight => (8.0, 0.7),
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One in-flight (or idle) transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    kind: TransitionKind,
    fps: u32,
    spring: Spring,
    width: usize,
    height: usize,
    progress: f64,
    velocity: f64,
    animating: bool,
    direction: Direction,
    tiles: Option<TileGrid>,
}

impl Transition {
    pub fn new(kind: TransitionKind, fps: u32) -> Self {
        let (frequency, damping) = kind.spring_constants();
        Self {
            kind,
            fps: fps.max(1),
            spring: Spring::new(Spring::delta_time(fps), frequency, damping),
            width: 0,
            height: 0,
            progress: 1.0,
            velocity: 0.0,
            animating: false,
            direction: Direction::Forward,
            tiles: None,
        }
    }

    /// Looks a transition up by name. Unknown names fall back to `none`.
    pub fn by_name(name: &str, fps: u32) -> Self {
        let kind = TransitionKind::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown transition {name:?}, using none");
            TransitionKind::None
        });
        Self::new(kind, fps)
    }

    /// Resets to the first frame of the effect for a `width`×`height` screen.
    pub fn start(mut self, width: usize, height: usize, direction: Direction) -> Self {
        self.width = width;
        self.height = height;
        self.direction = direction;
        self.velocity = 0.0;
        if self.kind == TransitionKind::None {
            self.progress = 1.0;
            self.animating = false;
            self.tiles = None;
            return self;
        }
        self.progress = 0.0;
        self.animating = true;
        self.tiles = (self.kind == TransitionKind::Fade).then(|| TileGrid::new(width, height));
        self
    }

    /// Advances one spring step. Returns the delay before the next tick, or
    /// `None` when the transition has settled.
    pub fn update(mut self) -> (Self, Option<Duration>) {
        if !self.animating {
            return (self, None);
        }
        (self.progress, self.velocity) = self.spring.update(self.progress, self.velocity, 1.0);
        if self.progress >= SETTLED {
            self.progress = 1.0;
            self.animating = false;
            return (self, None);
        }
        let tick = self.tick();
        (self, Some(tick))
    }

    /// Composites the outgoing frame `prev` with the incoming frame `next`.
    pub fn view(&self, prev: &str, next: &str) -> String {
        let (w, p) = (self.width, self.progress);
        match self.kind {
            TransitionKind::None => compose(prev, next, w, |_, _, next| next.to_string()),
            TransitionKind::Expand => expand::expand(prev, next, w, p),
            TransitionKind::Collapse => expand::collapse(prev, next, w, p),
            TransitionKind::SlideUp => slide::slide_up(prev, next, w, p),
            TransitionKind::SlideDown => slide::slide_down(prev, next, w, p),
            TransitionKind::SwipeLeft => swipe::swipe_left(prev, next, w, p),
            TransitionKind::SwipeRight => swipe::swipe_right(prev, next, w, p),
            TransitionKind::Fade => match &self.tiles {
                Some(tiles) => tiles.view(prev, next, w, p),
                None => compose(prev, next, w, |_, _, next| next.to_string()),
            },
        }
    }

    /// A fresh, idle transition of the opposite kind.
    pub fn opposite(&self) -> Self {
        Self::new(self.kind.opposite(), self.fps)
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn animating(&self) -> bool {
        self.animating
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Interval between ticks.
    pub fn tick(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new(TransitionKind::None, DEFAULT_FPS)
    }
}

/// Line-by-line driver shared by the compositors. `compose_line` receives
/// the line index and both source lines (empty past either frame's end);
/// its result is fitted to `width`.
pub(crate) fn compose(
    prev: &str,
    next: &str,
    width: usize,
    mut compose_line: impl FnMut(usize, &str, &str) -> String,
) -> String {
    let prev = ansi::lines(prev);
    let next = ansi::lines(next);
    let count = prev.len().max(next.len());

    let mut out = String::new();
    for i in 0..count {
        if i > 0 {
            out.push('\n');
        }
        let p = prev.get(i).copied().unwrap_or("");
        let n = next.get(i).copied().unwrap_or("");
        out.push_str(&ansi::fit(&compose_line(i, p, n), width));
    }
    out
}

/// Columns `start..end` of `line`, fitted to exactly that many columns.
pub(crate) fn segment(line: &str, start: usize, end: usize) -> String {
    ansi::fit(&ansi::slice(line, start, end), end.saturating_sub(start))
}

/// Rounds `progress * total` to a whole amount within `0..=total`.
pub(crate) fn portion(progress: f64, total: usize) -> usize {
    let amount = (progress * total as f64).round();
    if amount <= 0.0 {
        0
    } else {
        (amount as usize).min(total)
    }
}
