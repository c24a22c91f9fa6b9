//! Base markdown styling for literal text chunks.
//!
//! A single pass over pulldown-cmark events writes styled lines. Styles are
//! kept on a stack: closing one resets everything and re-applies the rest,
//! which keeps nested emphasis correct on terminals without SGR pop.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::ansi::RESET;
use crate::render::{CollaboratorError, SyntectHighlighter, TextStyler};

/// Escape sequences for each styled element. Empty strings disable styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub title: &'static str,
    pub heading: &'static str,
    pub emphasis: &'static str,
    pub strong: &'static str,
    pub strikethrough: &'static str,
    pub code: &'static str,
    pub quote: &'static str,
    pub link: &'static str,
    pub rule: &'static str,
    pub bullet: &'static str,
    /// syntect theme for code blocks, `None` for no highlighting.
    pub syntax_theme: Option<&'static str>,
}

impl Theme {
    pub const DARK: Theme = Theme {
        name: "dark",
        title: "\x1b[1;38;5;228;48;5;63m",
        heading: "\x1b[1;38;5;39m",
        emphasis: "\x1b[3m",
        strong: "\x1b[1m",
        strikethrough: "\x1b[9m",
        code: "\x1b[38;5;203;48;5;236m",
        quote: "\x1b[38;5;245m",
        link: "\x1b[4;38;5;30m",
        rule: "\x1b[38;5;240m",
        bullet: "\x1b[38;5;244m",
        syntax_theme: Some(SyntectHighlighter::DARK),
    };

    pub const LIGHT: Theme = Theme {
        name: "light",
        title: "\x1b[1;38;5;228;48;5;63m",
        heading: "\x1b[1;38;5;27m",
        emphasis: "\x1b[3m",
        strong: "\x1b[1m",
        strikethrough: "\x1b[9m",
        code: "\x1b[38;5;203;48;5;254m",
        quote: "\x1b[38;5;242m",
        link: "\x1b[4;38;5;36m",
        rule: "\x1b[38;5;249m",
        bullet: "\x1b[38;5;242m",
        syntax_theme: Some(SyntectHighlighter::LIGHT),
    };

    pub const NOTTY: Theme = Theme {
        name: "notty",
        title: "",
        heading: "",
        emphasis: "",
        strong: "",
        strikethrough: "",
        code: "",
        quote: "",
        link: "",
        rule: "",
        bullet: "",
        syntax_theme: None,
    };

    pub fn named(name: &str) -> Option<Theme> {
        [Self::DARK, Self::LIGHT, Self::NOTTY]
            .into_iter()
            .find(|t| t.name == name)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::DARK
    }
}

/// Left margin applied to every styled line.
const MARGIN: &str = "  ";
const RULE_WIDTH: usize = 40;

/// Styles markdown with a [`Theme`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownStyler {
    theme: Theme,
}

impl MarkdownStyler {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }
}

impl TextStyler for MarkdownStyler {
    fn style(&self, markdown: &str) -> Result<String, CollaboratorError> {
        // Chunks between structural nodes are often only line breaks; those
        // are layout and are kept as they are.
        if markdown.trim().is_empty() {
            return Ok(markdown.chars().filter(|&c| c == '\n').collect());
        }

        let mut w = Writer::new(&self.theme);
        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        for event in Parser::new_ext(markdown, options) {
            w.event(event);
        }
        Ok(w.finish())
    }
}

struct Writer<'t> {
    theme: &'t Theme,
    out: String,
    styles: Vec<&'static str>,
    /// Next number for ordered lists, `None` for bullets.
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    quote_depth: usize,
    in_code_block: bool,
    at_line_start: bool,
}

impl<'t> Writer<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            out: String::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            links: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            at_line_start: true,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.push_style(self.theme.code);
                self.text(&code);
                self.pop_style();
            }
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.newline(),
            Event::Rule => {
                self.blank_line();
                self.push_style(self.theme.rule);
                self.text(&"─".repeat(RULE_WIDTH));
                self.pop_style();
                self.newline();
            }
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Tag::Heading { level, .. } => {
                self.blank_line();
                if level == HeadingLevel::H1 {
                    self.push_style(self.theme.title);
                    self.text(" ");
                } else {
                    self.push_style(self.theme.heading);
                    self.text(&"#".repeat(level as usize));
                    self.text(" ");
                }
            }
            Tag::BlockQuote(_) => {
                self.blank_line();
                self.quote_depth += 1;
                self.push_style(self.theme.quote);
            }
            Tag::CodeBlock(_) => {
                self.blank_line();
                self.in_code_block = true;
                self.push_style(self.theme.code);
            }
            Tag::List(first) => {
                if self.lists.is_empty() {
                    self.blank_line();
                } else {
                    self.newline();
                }
                self.lists.push(first);
            }
            Tag::Item => {
                self.newline();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.text(&"  ".repeat(depth));
                self.push_style(self.theme.bullet);
                self.text(&marker);
                self.pop_style();
            }
            Tag::Emphasis => self.push_style(self.theme.emphasis),
            Tag::Strong => self.push_style(self.theme.strong),
            Tag::Strikethrough => self.push_style(self.theme.strikethrough),
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.push_style(self.theme.link);
            }
            Tag::Image { .. } => self.text("[image: "),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.newline(),
            TagEnd::Heading(level) => {
                if level == HeadingLevel::H1 {
                    self.text(" ");
                }
                self.pop_style();
                self.newline();
            }
            TagEnd::BlockQuote(_) => {
                self.pop_style();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.newline();
            }
            TagEnd::CodeBlock => {
                self.pop_style();
                self.in_code_block = false;
                self.newline();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.newline();
            }
            TagEnd::Item => self.newline(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.links.pop()
                    && !url.is_empty()
                {
                    self.text(&format!(" ({url})"));
                }
            }
            TagEnd::Image => self.text("]"),
            _ => {}
        }
    }

    /// Styles opened at the start of a line are applied by the line prefix,
    /// after the margin.
    fn push_style(&mut self, sgr: &'static str) {
        self.styles.push(sgr);
        if !self.at_line_start {
            self.out.push_str(sgr);
        }
    }

    fn pop_style(&mut self) {
        let Some(sgr) = self.styles.pop() else {
            return;
        };
        if sgr.is_empty() || self.at_line_start {
            return;
        }
        self.out.push_str(RESET);
        for sgr in &self.styles {
            self.out.push_str(sgr);
        }
    }

    /// Writes text, prefixing every new line with the margin and quote bars.
    fn text(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            if line.is_empty() {
                continue;
            }
            if self.at_line_start {
                self.line_prefix();
            }
            self.out.push_str(line);
        }
    }

    fn line_prefix(&mut self) {
        self.out.push_str(MARGIN);
        for _ in 0..self.quote_depth {
            self.out.push_str("│ ");
        }
        if self.in_code_block {
            self.out.push_str("  ");
        }
        for sgr in &self.styles {
            self.out.push_str(sgr);
        }
        self.at_line_start = false;
    }

    /// Ends the current line unless already at the start of one.
    fn newline(&mut self) {
        if self.at_line_start {
            return;
        }
        self.end_line();
    }

    /// Ensures an empty line separates the next block from the previous one.
    fn blank_line(&mut self) {
        self.newline();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.end_line();
        }
    }

    fn end_line(&mut self) {
        // Every row closes its own styles so a frame can be cut into lines.
        if !self.at_line_start && self.styles.iter().any(|s| !s.is_empty()) {
            self.out.push_str(RESET);
        }
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn finish(mut self) -> String {
        self.newline();
        let trimmed = self.out.trim_end_matches('\n').len();
        self.out.truncate(trimmed);
        self.out.push('\n');
        self.out
    }
}
