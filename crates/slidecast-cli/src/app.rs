use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use slidecast_config::{Config, ImageMode};
use slidecast_engine::ansi::CLEAR_KITTY_IMAGES;
use slidecast_engine::render::{GraphicsMode, Theme};
use slidecast_engine::{
    Direction, FrameRenderer, Slide, SlideProperties, Transition, TransitionKind,
    parse_document, split_deck,
};

use crate::layout;
use crate::prompt::{Outcome, Prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Next,
    Previous,
    First,
    Last,
    /// Zero-based slide index.
    GoTo(usize),
    /// Relative move, clamped to the deck.
    Jump(isize),
    Reload,
    Quit,
}

pub fn is_ctrl_c(key: KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Keys that act immediately. Prompts are opened by [`App::key`].
pub fn action_for(key: KeyEvent) -> Option<Action> {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        _ if is_ctrl_c(key) => Some(Action::Quit),
        KeyCode::Right | KeyCode::Char('l' | ' ' | 'n') => Some(Action::Next),
        KeyCode::Left | KeyCode::Char('h' | 'p') => Some(Action::Previous),
        KeyCode::Home | KeyCode::Char('0') => Some(Action::First),
        KeyCode::Up if shift => Some(Action::First),
        KeyCode::End | KeyCode::Char('$') => Some(Action::Last),
        KeyCode::Down if shift => Some(Action::Last),
        KeyCode::Char('r') => Some(Action::Reload),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

pub fn graphics_mode(mode: ImageMode) -> GraphicsMode {
    match mode {
        ImageMode::Auto => GraphicsMode::Auto,
        ImageMode::Symbols => GraphicsMode::Symbols,
        ImageMode::Kitty => GraphicsMode::Kitty,
    }
}

fn load_deck(path: &Path) -> Result<Vec<Slide>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let slides =
        split_deck(&src).with_context(|| format!("Failed to split {}", path.display()))?;
    Ok(slides)
}

/// The slide shown in place of the deck after a failed reload.
fn error_slide(err: &anyhow::Error) -> Slide {
    Slide {
        source: format!(
            "# Error while updating\n\n{err:#}\n\nFix the file and press r to reload."
        ),
        properties: SlideProperties::default(),
    }
}

/// Presentation state: the deck, the visible slide and the transition that
/// brought it on screen.
pub struct App {
    path: PathBuf,
    config: Config,
    slides: Vec<Slide>,
    current: usize,
    transition: Transition,
    tick: Option<Duration>,
    width: u16,
    height: u16,
    renderers: HashMap<&'static str, FrameRenderer>,
    /// Symbols-only frames for animation, by slide index.
    moving: HashMap<usize, String>,
    prompt: Option<Prompt>,
    /// Set while the file on disk fails to load; shown instead of the deck.
    failed: Option<Slide>,
}

impl App {
    pub fn new(path: PathBuf, config: Config, (width, height): (u16, u16)) -> Result<Self> {
        let slides = load_deck(&path)?;
        log::info!("loaded {} slides from {}", slides.len(), path.display());
        let transition = Transition::new(TransitionKind::None, config.fps);
        Ok(Self {
            path,
            config,
            slides,
            current: 0,
            transition,
            tick: None,
            width,
            height,
            renderers: HashMap::new(),
            moving: HashMap::new(),
            prompt: None,
            failed: None,
        })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    pub fn animating(&self) -> bool {
        self.transition.animating()
    }

    /// Delay before the next animation step, `None` when idle.
    pub fn tick(&self) -> Option<Duration> {
        self.tick
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    /// Handles one key press. Returns false when the presentation should end.
    pub fn key(&mut self, key: KeyEvent) -> bool {
        if let Some(prompt) = &mut self.prompt {
            match prompt.key(key) {
                Outcome::Pending => {}
                Outcome::Cancelled => self.prompt = None,
                Outcome::Done(action) => {
                    self.prompt = None;
                    return self.apply(action);
                }
            }
            return true;
        }

        match key.code {
            KeyCode::Char('g' | ':') if self.failed.is_none() => {
                self.prompt = Some(Prompt::GoTo(String::new()));
            }
            KeyCode::Char(c @ '1'..='9') if self.failed.is_none() => {
                self.prompt = Some(Prompt::Jump(c.to_string()));
            }
            _ => {
                if let Some(action) = action_for(key) {
                    return self.apply(action);
                }
            }
        }
        true
    }

    /// Returns false when the presentation should end.
    pub fn apply(&mut self, action: Action) -> bool {
        if self.failed.is_some() && !matches!(action, Action::Reload | Action::Quit) {
            return true;
        }
        match action {
            Action::Next => self.next(),
            Action::Previous => self.previous(),
            Action::First => self.go_to(0),
            Action::Last => self.go_to(self.slides.len().saturating_sub(1)),
            Action::GoTo(index) => {
                if index < self.slides.len() {
                    self.go_to(index);
                }
            }
            Action::Jump(steps) => {
                let last = self.slides.len().saturating_sub(1);
                let target = self.current.saturating_add_signed(steps).min(last);
                self.go_to(target);
            }
            Action::Reload => self.reload(),
            Action::Quit => return false,
        }
        true
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// One spring step of the running transition.
    pub fn advance(&mut self) {
        let (transition, tick) = std::mem::take(&mut self.transition).update();
        self.transition = transition;
        self.tick = tick;
    }

    /// The frame to put on screen now: the slide centred on the screen,
    /// with any open prompt on the bottom line.
    pub fn view(&mut self) -> Result<String> {
        let (width, height) = (usize::from(self.width), usize::from(self.height));

        if let Some(slide) = self.failed.clone() {
            let theme = self.config.theme.clone();
            let frame = self.renderer(&theme)?.render(&parse_document(&slide.source), false)?;
            let placed = layout::place(&frame, width, height);
            return Ok(format!("{CLEAR_KITTY_IMAGES}{placed}"));
        }

        if !self.transition.animating() {
            // High-resolution images would draw over an open prompt.
            let frame = self.frame(self.current, self.prompt.is_some())?;
            let mut placed = layout::place(&frame, width, height);
            if let Some(prompt) = &self.prompt {
                placed = layout::status_line(&placed, &prompt.status(self.slides.len()), width);
            }
            return Ok(format!("{CLEAR_KITTY_IMAGES}{placed}"));
        }

        let previous = match self.current.checked_sub(1) {
            Some(index) => self.frame(index, true)?,
            None => String::new(),
        };
        let following = self.frame(self.current + 1, true)?;
        let incoming = layout::place(&self.frame(self.current, true)?, width, height);
        let outgoing = layout::place(
            self.transition.direction().outgoing(&previous, &following),
            width,
            height,
        );
        Ok(format!(
            "{CLEAR_KITTY_IMAGES}{}",
            self.transition.view(&outgoing, &incoming)
        ))
    }

    fn next(&mut self) {
        if self.current + 1 >= self.slides.len() {
            return;
        }
        self.current += 1;
        let transition = Transition::by_name(self.transition_into(self.current), self.config.fps);
        self.begin(transition, Direction::Forward);
    }

    fn previous(&mut self) {
        if self.current == 0 {
            return;
        }
        // Undo the effect that brought the current slide in.
        let transition = Transition::by_name(self.transition_into(self.current), self.config.fps);
        self.current -= 1;
        self.begin(transition.opposite(), Direction::Backward);
    }

    /// Jumps straight to `index` with no transition.
    fn go_to(&mut self, index: usize) {
        self.current = index;
        self.transition = Transition::new(TransitionKind::None, self.config.fps);
        self.tick = None;
        log::debug!("slide {}", self.current + 1);
    }

    /// Re-reads the file. On failure an error slide replaces the deck until
    /// a later reload succeeds; the slide position is kept either way.
    fn reload(&mut self) {
        self.renderers.clear();
        self.moving.clear();
        self.transition = Transition::new(TransitionKind::None, self.config.fps);
        self.tick = None;
        match load_deck(&self.path) {
            Ok(slides) => {
                log::info!("reloaded {} slides", slides.len());
                self.slides = slides;
                self.current = self.current.min(self.slides.len().saturating_sub(1));
                self.failed = None;
            }
            Err(e) => {
                log::error!("reload failed: {e:#}");
                self.failed = Some(error_slide(&e));
            }
        }
    }

    fn transition_into(&self, index: usize) -> &str {
        self.slides
            .get(index)
            .and_then(|slide| slide.properties.transition.as_deref())
            .unwrap_or(&self.config.transition)
    }

    fn begin(&mut self, transition: Transition, direction: Direction) {
        self.transition = transition.start(self.width.into(), self.height.into(), direction);
        self.tick = self.transition.animating().then(|| self.transition.tick());
        log::debug!(
            "slide {} via {} ({direction:?})",
            self.current + 1,
            self.transition.name()
        );
    }

    fn frame(&mut self, index: usize, animating: bool) -> Result<String> {
        if animating && let Some(frame) = self.moving.get(&index) {
            return Ok(frame.clone());
        }
        let Some(slide) = self.slides.get(index) else {
            return Ok(String::new());
        };
        let doc = parse_document(&slide.source);
        let theme = slide
            .properties
            .theme
            .clone()
            .unwrap_or_else(|| self.config.theme.clone());

        let frame = self.renderer(&theme)?.render(&doc, animating)?;
        if animating {
            self.moving.insert(index, frame.clone());
        }
        Ok(frame)
    }

    fn renderer(&mut self, name: &str) -> Result<&FrameRenderer> {
        let theme = Theme::named(name).unwrap_or_else(|| {
            log::warn!("unknown theme {name:?}, using dark");
            Theme::DARK
        });
        let renderer = match self.renderers.entry(theme.name) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mode = graphics_mode(self.config.image_mode);
                let deck_dir = self.path.parent().unwrap_or(Path::new(""));
                entry.insert(FrameRenderer::for_deck(theme, mode, deck_dir)?)
            }
        };
        Ok(renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use slidecast_engine::ansi;
    use tempfile::TempDir;

    /// A 1x1 red PNG.
    const DOT_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
        0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, 0xC9, 0xFE, 0x92, 0xEF, 0x00, 0x00, 0x00,
        0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    const DECK: &str = "# One\n\
                        ----\n\
                        ---\n\
                        transition = \"swipeLeft\"\n\
                        ---\n\
                        # Two\n\
                        ----\n\
                        # Three\n";

    fn config() -> Config {
        Config {
            theme: "notty".to_string(),
            transition: "fade".to_string(),
            image_mode: ImageMode::Symbols,
            ..Config::default()
        }
    }

    fn app_with(deck: &str) -> (TempDir, App) {
        app_sized(deck, (40, 6))
    }

    fn app_sized(deck: &str, size: (u16, u16)) -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("talk.md");
        std::fs::write(&path, deck).unwrap();
        let app = App::new(path, config(), size).unwrap();
        (dir, app)
    }

    fn settle(app: &mut App) {
        let mut steps = 0;
        while app.tick().is_some() {
            app.advance();
            steps += 1;
            assert!(steps < 1_000);
        }
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[rstest]
    #[case(KeyCode::Right, Some(Action::Next))]
    #[case(KeyCode::Char('l'), Some(Action::Next))]
    #[case(KeyCode::Char(' '), Some(Action::Next))]
    #[case(KeyCode::Char('n'), Some(Action::Next))]
    #[case(KeyCode::Left, Some(Action::Previous))]
    #[case(KeyCode::Char('h'), Some(Action::Previous))]
    #[case(KeyCode::Char('p'), Some(Action::Previous))]
    #[case(KeyCode::Home, Some(Action::First))]
    #[case(KeyCode::Char('0'), Some(Action::First))]
    #[case(KeyCode::End, Some(Action::Last))]
    #[case(KeyCode::Char('$'), Some(Action::Last))]
    #[case(KeyCode::Char('r'), Some(Action::Reload))]
    #[case(KeyCode::Char('q'), Some(Action::Quit))]
    #[case(KeyCode::Esc, Some(Action::Quit))]
    #[case(KeyCode::Char('c'), None)]
    #[case(KeyCode::Up, None)]
    fn key_bindings(#[case] code: KeyCode, #[case] action: Option<Action>) {
        assert_eq!(action_for(key(code, KeyModifiers::NONE)), action);
    }

    #[rstest]
    #[case(KeyCode::Up, Action::First)]
    #[case(KeyCode::Down, Action::Last)]
    fn shifted_arrows_go_to_the_ends(#[case] code: KeyCode, #[case] action: Action) {
        assert_eq!(action_for(key(code, KeyModifiers::SHIFT)), Some(action));
    }

    fn press(app: &mut App, codes: &[KeyCode]) -> bool {
        codes
            .iter()
            .all(|&code| app.key(key(code, KeyModifiers::NONE)))
    }

    #[test]
    fn ctrl_c_quits() {
        assert_eq!(
            action_for(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn starts_on_first_slide_without_animation() {
        let (_dir, mut app) = app_with(DECK);
        assert_eq!(app.slide_count(), 3);
        assert_eq!(app.current(), 0);
        assert!(!app.animating());
        assert_eq!(app.tick(), None);

        let view = app.view().unwrap();
        assert!(view.starts_with(CLEAR_KITTY_IMAGES));
        assert!(ansi::strip(&view).contains("One"));
    }

    #[test]
    fn forward_uses_the_slide_transition() {
        let (_dir, mut app) = app_with(DECK);
        assert!(app.apply(Action::Next));
        assert_eq!(app.current(), 1);
        assert_eq!(app.transition().name(), "swipeLeft");
        assert_eq!(app.transition().direction(), Direction::Forward);
        assert!(app.tick().is_some());
    }

    #[test]
    fn slides_without_front_matter_use_the_configured_transition() {
        let (_dir, mut app) = app_with(DECK);
        app.apply(Action::Next);
        app.apply(Action::Next);
        assert_eq!(app.current(), 2);
        assert_eq!(app.transition().name(), "fade");
    }

    #[test]
    fn backward_reverses_the_transition_into_the_slide_being_left() {
        let (_dir, mut app) = app_with(DECK);
        app.apply(Action::Next);
        settle(&mut app);
        app.apply(Action::Previous);
        assert_eq!(app.current(), 0);
        assert_eq!(app.transition().name(), "swipeRight");
        assert_eq!(app.transition().direction(), Direction::Backward);
    }

    #[test]
    fn navigation_stops_at_the_ends() {
        let (_dir, mut app) = app_with(DECK);
        app.apply(Action::Previous);
        assert_eq!(app.current(), 0);
        assert!(!app.animating());

        for _ in 0..5 {
            app.apply(Action::Next);
        }
        assert_eq!(app.current(), 2);
    }

    #[test]
    fn animation_frames_fill_the_screen_and_settle() {
        let (_dir, mut app) = app_with(DECK);
        app.apply(Action::Next);

        let view = app.view().unwrap();
        let body = view.strip_prefix(CLEAR_KITTY_IMAGES).unwrap();
        let lines = ansi::lines(body);
        assert_eq!(lines.len(), 6);
        for line in lines {
            assert_eq!(ansi::visible_width(line), 40);
        }

        settle(&mut app);
        assert!(!app.animating());
        assert!(ansi::strip(&app.view().unwrap()).contains("Two"));
    }

    #[test]
    fn quit_ends_the_presentation() {
        let (_dir, mut app) = app_with(DECK);
        assert!(!app.apply(Action::Quit));
    }

    #[test]
    fn reload_picks_up_edits_and_keeps_position() {
        let (dir, mut app) = app_with(DECK);
        app.apply(Action::Next);
        app.apply(Action::Next);

        std::fs::write(dir.path().join("talk.md"), "# Only\n----\n# Edited\n").unwrap();
        app.apply(Action::Reload);

        assert_eq!(app.slide_count(), 2);
        assert_eq!(app.current(), 1);
        assert!(!app.animating());
        assert!(ansi::strip(&app.view().unwrap()).contains("Edited"));
    }

    #[test]
    fn failed_reload_shows_an_error_slide_until_fixed() {
        let (dir, mut app) = app_sized(DECK, (200, 40));
        app.apply(Action::Next);
        std::fs::write(dir.path().join("talk.md"), "---\ntheme = \n---\n").unwrap();
        app.apply(Action::Reload);

        let view = ansi::strip(&app.view().unwrap()).into_owned();
        assert!(view.contains("Error while updating"));
        assert!(view.contains("invalid front matter"));

        // Navigation waits for a good file.
        app.apply(Action::Next);
        assert_eq!(app.current(), 1);
        assert!(!app.animating());

        std::fs::write(dir.path().join("talk.md"), DECK).unwrap();
        app.apply(Action::Reload);
        assert_eq!(app.current(), 1);
        assert!(ansi::strip(&app.view().unwrap()).contains("Two"));
    }

    #[test]
    fn still_frames_are_centred() {
        let (_dir, mut app) = app_with("hi");
        let view = app.view().unwrap();
        let body = view.strip_prefix(CLEAR_KITTY_IMAGES).unwrap();
        let lines: Vec<String> = ansi::lines(body)
            .iter()
            .map(|l| ansi::strip(l).into_owned())
            .collect();
        assert_eq!(lines.len(), 6);
        let row = lines.iter().position(|l| l.contains("hi")).unwrap();
        assert_eq!(row, 2);
        // "  hi" from the styler, centred as a four-column block.
        assert_eq!(lines[row].find("hi"), Some(20));
    }

    #[test]
    fn goto_prompt_moves_without_a_transition() {
        let (_dir, mut app) = app_with(DECK);
        assert!(press(&mut app, &[KeyCode::Char('g'), KeyCode::Char('3')]));
        assert_eq!(app.prompt(), Some(&Prompt::GoTo("3".into())));
        assert!(ansi::strip(&app.view().unwrap()).contains("Go to slide: 3_  (1-3)"));

        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.prompt(), None);
        assert_eq!(app.current(), 2);
        assert!(!app.animating());
    }

    #[test]
    fn goto_past_the_end_stays_put() {
        let (_dir, mut app) = app_with(DECK);
        press(&mut app, &[KeyCode::Char(':'), KeyCode::Char('9'), KeyCode::Enter]);
        assert_eq!(app.current(), 0);
    }

    #[test]
    fn escape_closes_a_prompt_without_quitting() {
        let (_dir, mut app) = app_with(DECK);
        assert!(press(&mut app, &[KeyCode::Char('g'), KeyCode::Esc]));
        assert_eq!(app.prompt(), None);
        assert_eq!(app.current(), 0);
    }

    #[test]
    fn jump_moves_by_a_count_and_clamps() {
        let (_dir, mut app) = app_with(DECK);
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('l')]);
        assert_eq!(app.current(), 2);

        press(&mut app, &[KeyCode::Char('1'), KeyCode::Char('h')]);
        assert_eq!(app.current(), 1);

        press(&mut app, &[KeyCode::Char('9'), KeyCode::Char('h')]);
        assert_eq!(app.current(), 0);

        press(&mut app, &[KeyCode::Char('9'), KeyCode::Right]);
        assert_eq!(app.current(), 2);
    }

    #[test]
    fn first_and_last() {
        let (_dir, mut app) = app_with(DECK);
        app.apply(Action::Last);
        assert_eq!(app.current(), 2);
        app.apply(Action::First);
        assert_eq!(app.current(), 0);
        assert!(!app.animating());
    }

    #[test]
    fn images_resolve_next_to_the_deck() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("img/dot.png"), DOT_PNG).unwrap();
        let path = dir.path().join("talk.md");
        std::fs::write(&path, "![dot|4x2](img/dot.png)\n").unwrap();

        let mut app = App::new(path, config(), (40, 6)).unwrap();
        let view = app.view().unwrap();
        assert!(!view.contains("Error rendering image"));
        assert!(view.contains('▀'));
    }

    #[test]
    fn unknown_theme_falls_back_to_dark() {
        let (_dir, mut app) = app_with("---\ntheme = \"neon\"\n---\n# Hi\n");
        let view = app.view().unwrap();
        assert!(ansi::strip(&view).contains("Hi"));
        assert!(app.renderers.contains_key("dark"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = App::new(dir.path().join("nope.md"), config(), (40, 6));
        assert!(result.is_err());
    }
}
