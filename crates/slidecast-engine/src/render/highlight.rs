use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntaxTheme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

use crate::ansi::RESET;
use crate::render::{CollaboratorError, SyntaxHighlighter};

/// Highlights with syntect's bundled syntaxes and themes, emitting 24-bit
/// colour escapes. Each line ends with a reset so lines can be cut apart.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    /// `None` passes code through untouched.
    theme: Option<SyntaxTheme>,
}

impl SyntectHighlighter {
    pub const DARK: &'static str = "base16-ocean.dark";
    pub const LIGHT: &'static str = "InspiredGitHub";

    pub fn new(theme: Option<&str>) -> Result<Self, CollaboratorError> {
        let theme = match theme {
            Some(name) => {
                let mut themes = ThemeSet::load_defaults();
                let theme = themes
                    .themes
                    .remove(name)
                    .ok_or_else(|| CollaboratorError::UnknownSyntaxTheme(name.to_string()))?;
                Some(theme)
            }
            None => None,
        };
        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        })
    }
}

impl SyntaxHighlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, language: &str) -> Result<String, CollaboratorError> {
        let Some(theme) = &self.theme else {
            return Ok(code.to_string());
        };

        let syntax = self
            .syntaxes
            .find_syntax_by_token(language)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut lines = HighlightLines::new(syntax, theme);

        let mut out = String::with_capacity(code.len() * 4);
        for line in LinesWithEndings::from(code) {
            let ranges = lines
                .highlight_line(line, &self.syntaxes)
                .map_err(|e| CollaboratorError::Highlight(e.to_string()))?;
            let escaped = as_24_bit_terminal_escaped(&ranges, false);
            match escaped.strip_suffix('\n') {
                Some(body) => {
                    out.push_str(body);
                    out.push_str(RESET);
                    out.push('\n');
                }
                None => {
                    out.push_str(&escaped);
                    out.push_str(RESET);
                }
            }
        }
        Ok(out)
    }
}
