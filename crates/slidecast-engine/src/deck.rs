//! Splitting a presentation file into slides.
//!
//! Slides are separated by lines consisting of exactly `----`. A slide may
//! open with a TOML front matter block between two `---` lines:
//!
//! ```text
//! ---
//! transition = "fade"
//! theme = "light"
//! ---
//! # Second slide
//! ```
//!
//! A leading `---` with no closing `---` is a horizontal rule, not front
//! matter. Separators inside fenced code are ignored.

use serde::Deserialize;
use thiserror::Error;

use crate::parsing::kinds::CodeBlockParser;

pub const SLIDE_SEPARATOR: &str = "----";
pub const FRONT_MATTER_DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("slide {slide}: invalid front matter: {source}")]
    FrontMatter {
        slide: usize,
        #[source]
        source: toml::de::Error,
    },
}

/// Per-slide overrides from front matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlideProperties {
    /// Transition used when entering this slide.
    pub transition: Option<String>,
    pub theme: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slide {
    /// Markdown body with front matter removed.
    pub source: String,
    pub properties: SlideProperties,
}

/// Splits `src` into slides. Always yields at least one slide.
pub fn split_deck(src: &str) -> Result<Vec<Slide>, DeckError> {
    let mut slides = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut fence: Option<&[u8; 3]> = None;

    for line in src.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim_start();

        match fence {
            Some(open) if trimmed.as_bytes().starts_with(open) => fence = None,
            Some(_) => {}
            None => {
                if line == SLIDE_SEPARATOR {
                    slides.push(build_slide(slides.len() + 1, &current)?);
                    current.clear();
                    continue;
                }
                fence = [CodeBlockParser::BACKTICKS, CodeBlockParser::TILDES]
                    .into_iter()
                    .find(|f| trimmed.as_bytes().starts_with(*f));
            }
        }
        current.push(line);
    }
    slides.push(build_slide(slides.len() + 1, &current)?);
    Ok(slides)
}

fn build_slide(number: usize, lines: &[&str]) -> Result<Slide, DeckError> {
    let Some((body, end)) = front_matter(lines) else {
        return Ok(Slide {
            source: lines.join("\n"),
            properties: SlideProperties::default(),
        });
    };

    let properties = toml::from_str(&body[..end].join("\n"))
        .map_err(|source| DeckError::FrontMatter { slide: number, source })?;

    Ok(Slide {
        source: body[end + 1..].join("\n"),
        properties,
    })
}

/// The lines after the opening delimiter and the index of the closing one.
fn front_matter<'a>(lines: &'a [&'a str]) -> Option<(&'a [&'a str], usize)> {
    let start = lines.iter().position(|l| !l.trim().is_empty())?;
    if lines[start] != FRONT_MATTER_DELIMITER {
        return None;
    }
    let body = &lines[start + 1..];
    let end = body.iter().position(|l| *l == FRONT_MATTER_DELIMITER)?;
    Some((body, end))
}
