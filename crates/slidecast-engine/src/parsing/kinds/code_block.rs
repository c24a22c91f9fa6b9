use crate::parsing::cursor::Cursor;
use crate::parsing::{BlockParser, ParseContext};
use crate::tree::{CodeBlockNode, LineRange, NodeId, NodeKind};

/// Why an opening fence line was rejected. Never surfaced to callers: the
/// block degrades to literal text and the reason is only logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenceError {
    #[error("input ended inside the fence header")]
    Unterminated,
    #[error("expected a line number before {0:?}")]
    MissingNumber(char),
    #[error("line numbers start with a digit from 1 to 9")]
    LeadingZero,
    #[error("line number is too large")]
    Overflow,
    #[error("range start {start} is greater than its end {end}")]
    StartAfterEnd { start: u32, end: u32 },
    #[error("a range may contain a single '-'")]
    RepeatedDash,
    #[error("unexpected character {0:?} in line ranges")]
    InvalidChar(char),
    #[error("--start-at-line needs a value")]
    MissingStartLine,
    #[error("invalid --start-at-line value {0:?}")]
    InvalidStartLine(String),
}

/// Display flags from the remainder of the opening fence line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFlags {
    pub show_line_numbers: bool,
    pub start_line: u32,
}

impl Default for CodeFlags {
    fn default() -> Self {
        Self {
            show_line_numbers: false,
            start_line: 1,
        }
    }
}

/// Fenced code with optional `{ranges}` and `--flags`:
///
/// ~~~text
/// ```c{1-4} --numbered --start-at-line 10
/// int main(void) {
///   return 0;
/// }
/// ```
/// ~~~
pub struct CodeBlockParser;

impl CodeBlockParser {
    pub const BACKTICKS: &'static [u8; 3] = b"```";
    pub const TILDES: &'static [u8; 3] = b"~~~";
    pub const RANGES_OPEN: u8 = b'{';
    pub const RANGES_CLOSE: u8 = b'}';
    pub const RANGE_SEP: u8 = b',';
    pub const RANGE_DASH: u8 = b'-';
    pub const NUMBERED: &'static str = "--numbered";
    pub const START_AT_LINE: &'static str = "--start-at-line";

    fn fence_for(trigger: u8) -> Option<&'static [u8; 3]> {
        match trigger {
            b'`' => Some(Self::BACKTICKS),
            b'~' => Some(Self::TILDES),
            _ => None,
        }
    }

    /// Parses a whole block; the cursor sits just past the trigger byte.
    fn parse_block(cur: &mut Cursor<'_>) -> Option<CodeBlockNode> {
        let fence = Self::fence_for(cur.prev()?)?;
        if !cur.eat(&fence[1..]) {
            return None;
        }

        cur.take_while(|b| b == b' ');
        let language = cur.take_while(|b| !matches!(b, b' ' | b'\n' | b'\r' | b'{'));
        cur.take_while(|b| b == b' ');

        let header = Self::parse_header(cur);
        let (ranges, flags) = match header {
            Ok(parts) => parts,
            Err(err) => {
                log::debug!("code block header rejected: {err}");
                return None;
            }
        };

        let body_start = cur.pos();
        let body_end = cur.find(fence)?;
        let code = cur.slice(body_start, body_end);
        cur.reset(body_end + fence.len());

        Some(CodeBlockNode {
            language: language.to_string(),
            ranges,
            show_line_numbers: flags.show_line_numbers,
            start_line: flags.start_line,
            code: code.trim_matches(['\n', '\r']).to_string(),
        })
    }

    /// Optional `{ranges}` then flags up to and including the newline.
    fn parse_header(cur: &mut Cursor<'_>) -> Result<(Vec<LineRange>, CodeFlags), FenceError> {
        let ranges = if cur.eat(&[Self::RANGES_OPEN]) {
            Self::parse_ranges(cur)?
        } else {
            Vec::new()
        };

        let rest = cur.take_while(|b| b != b'\n');
        if cur.bump().is_none() {
            return Err(FenceError::Unterminated);
        }
        Ok((ranges, Self::parse_flags(rest)?))
    }

    /// Parses `range (',' range)* '}'` with the opening brace consumed.
    ///
    /// A pending start is held until a separator or the closing brace
    /// resolves the end; a bare number is a one-line range.
    pub fn parse_ranges(cur: &mut Cursor<'_>) -> Result<Vec<LineRange>, FenceError> {
        let mut ranges = Vec::new();
        let mut start: Option<u32> = None;
        let mut num: Option<u32> = None;

        loop {
            let b = cur.bump().ok_or(FenceError::Unterminated)?;
            match b {
                Self::RANGES_CLOSE | Self::RANGE_SEP => {
                    let end = num.take().ok_or(FenceError::MissingNumber(b as char))?;
                    let range = match start.take() {
                        Some(start) if start > end => {
                            return Err(FenceError::StartAfterEnd { start, end });
                        }
                        Some(start) => LineRange::new(start, end),
                        None => LineRange::single(end),
                    };
                    ranges.push(range);
                    if b == Self::RANGES_CLOSE {
                        return Ok(ranges);
                    }
                }
                Self::RANGE_DASH => {
                    if start.is_some() {
                        return Err(FenceError::RepeatedDash);
                    }
                    start = Some(num.take().ok_or(FenceError::MissingNumber('-'))?);
                }
                b'0'..=b'9' => {
                    let digit = u32::from(b - b'0');
                    num = Some(match num {
                        None if digit == 0 => return Err(FenceError::LeadingZero),
                        None => digit,
                        Some(n) => n
                            .checked_mul(10)
                            .and_then(|n| n.checked_add(digit))
                            .ok_or(FenceError::Overflow)?,
                    });
                }
                b' ' => {}
                other => return Err(FenceError::InvalidChar(other as char)),
            }
        }
    }

    /// Whitespace-separated flags; unknown tokens are ignored.
    pub fn parse_flags(line: &str) -> Result<CodeFlags, FenceError> {
        let mut flags = CodeFlags::default();
        let mut tokens = line.split_whitespace();

        while let Some(token) = tokens.next() {
            match token {
                Self::NUMBERED => flags.show_line_numbers = true,
                Self::START_AT_LINE => {
                    let value = tokens.next().ok_or(FenceError::MissingStartLine)?;
                    flags.start_line = value
                        .parse()
                        .map_err(|_| FenceError::InvalidStartLine(value.to_string()))?;
                }
                _ => {}
            }
        }

        Ok(flags)
    }
}

impl BlockParser for CodeBlockParser {
    fn name(&self) -> &'static str {
        "code block"
    }

    fn triggers(&self) -> &'static [u8] {
        b"`~"
    }

    fn parse(&self, cx: &mut ParseContext<'_, '_>) -> Option<NodeId> {
        let block = Self::parse_block(&mut cx.cursor)?;
        Some(cx.alloc(NodeKind::CodeBlock(block)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(input: &str) -> Option<CodeBlockNode> {
        let mut cur = Cursor::new(input);
        cur.bump();
        CodeBlockParser::parse_block(&mut cur)
    }

    fn ranges(input: &str) -> Result<Vec<LineRange>, FenceError> {
        let mut cur = Cursor::new(input);
        cur.bump(); // the opening brace
        CodeBlockParser::parse_ranges(&mut cur)
    }

    fn r(start: u32, end: u32) -> LineRange {
        LineRange::new(start, end)
    }

    #[test]
    fn single_code_block_node() {
        let got = parse(
            "```c{1,3}\n#include <stdio.h>\n\nint main(void) {\n printf('a string');\nreturn 0;\n}\n```",
        );
        assert_eq!(
            got,
            Some(CodeBlockNode {
                language: "c".into(),
                ranges: vec![r(1, 1), r(3, 3)],
                show_line_numbers: false,
                start_line: 1,
                code: "#include <stdio.h>\n\nint main(void) {\n printf('a string');\nreturn 0;\n}"
                    .into(),
            })
        );
    }

    #[test]
    fn line_flags() {
        let got = parse("```c{1,3} --numbered --start-at-line 15\nint x;\n```").unwrap();
        assert!(got.show_line_numbers);
        assert_eq!(got.start_line, 15);
        assert_eq!(got.ranges, vec![r(1, 1), r(3, 3)]);
    }

    #[test]
    fn python_block_with_ranges_and_flags() {
        let got = parse(
            "```python{1,3} --numbered --start-at-line 5\nprint(1)\nprint(2)\nprint(3)\n```",
        );
        assert_eq!(
            got,
            Some(CodeBlockNode {
                language: "python".into(),
                ranges: vec![r(1, 1), r(3, 3)],
                show_line_numbers: true,
                start_line: 5,
                code: "print(1)\nprint(2)\nprint(3)".into(),
            })
        );
    }

    #[test]
    fn ranges_are_optional() {
        let got = parse("```rust\nfn main() {}\n```").unwrap();
        assert_eq!(got.language, "rust");
        assert!(got.ranges.is_empty());
        assert!(!got.show_line_numbers);
    }

    #[test]
    fn language_is_optional() {
        let got = parse("```{2} --numbered\na\nb\n```").unwrap();
        assert_eq!(got.language, "");
        assert_eq!(got.ranges, vec![r(2, 2)]);
        assert!(got.show_line_numbers);
    }

    #[test]
    fn flags_without_ranges() {
        let got = parse("```go --numbered\nx\n```").unwrap();
        assert_eq!(got.language, "go");
        assert!(got.show_line_numbers);
    }

    #[test]
    fn single_backticks_inside_code_are_kept() {
        let got = parse("```sh\necho `date`\n```").unwrap();
        assert_eq!(got.code, "echo `date`");
    }

    #[test]
    fn tilde_fence_closes_only_on_tildes() {
        let got = parse("~~~md\n```inner```\n~~~").unwrap();
        assert_eq!(got.language, "md");
        assert_eq!(got.code, "```inner```");
    }

    #[test]
    fn leading_and_trailing_newlines_are_trimmed() {
        let got = parse("```\n\n\nbody\n\n```").unwrap();
        assert_eq!(got.code, "body");
    }

    #[rstest]
    #[case::two_backticks("``c\nx\n```")]
    #[case::no_closing_fence("```c\nnever closed")]
    #[case::header_without_newline("```c{1}")]
    #[case::bad_range("```c{5-3}\nx\n```")]
    #[case::bad_flag_value("```c --start-at-line ten\nx\n```")]
    #[case::missing_flag_value("```c --start-at-line\nx\n```")]
    fn malformed_blocks_decline(#[case] input: &str) {
        assert_eq!(parse(input), None);
    }

    #[rstest]
    #[case::single_line("{5}", vec![r(5, 5)])]
    #[case::single_range("{1-3}", vec![r(1, 3)])]
    #[case::multiple_lines("{1,3,5}", vec![r(1, 1), r(3, 3), r(5, 5)])]
    #[case::multiple_ranges("{1-3,7-9}", vec![r(1, 3), r(7, 9)])]
    #[case::mixed("{1,3-5,7}", vec![r(1, 1), r(3, 5), r(7, 7)])]
    #[case::with_spaces("{ 1 - 3 , 5 }", vec![r(1, 3), r(5, 5)])]
    #[case::multi_digit("{10-12}", vec![r(10, 12)])]
    #[case::equal_bounds("{4-4}", vec![r(4, 4)])]
    #[case::overlapping("{1-5,3,3}", vec![r(1, 5), r(3, 3), r(3, 3)])]
    fn valid_ranges(#[case] input: &str, #[case] want: Vec<LineRange>) {
        assert_eq!(ranges(input), Ok(want));
    }

    #[rstest]
    #[case::empty("", FenceError::Unterminated)]
    #[case::empty_braces("{}", FenceError::MissingNumber('}'))]
    #[case::start_after_end("{5-3}", FenceError::StartAfterEnd { start: 5, end: 3 })]
    #[case::letters("{abc}", FenceError::InvalidChar('a'))]
    #[case::multiple_range_splits("{1-3-5,5}", FenceError::RepeatedDash)]
    #[case::trailing_dash("{1-3,5-}", FenceError::MissingNumber('}'))]
    #[case::trailing_comma("{1-3,}", FenceError::MissingNumber('}'))]
    #[case::mixed_characters("{1-a3,4}", FenceError::InvalidChar('a'))]
    #[case::leading_zero("{0-3}", FenceError::LeadingZero)]
    #[case::unclosed("{1-3", FenceError::Unterminated)]
    #[case::overflow("{99999999999}", FenceError::Overflow)]
    fn invalid_ranges(#[case] input: &str, #[case] want: FenceError) {
        assert_eq!(ranges(input), Err(want));
    }

    #[test]
    fn numbered_flag_alone_keeps_default_start() {
        assert_eq!(
            CodeBlockParser::parse_flags(" --numbered"),
            Ok(CodeFlags {
                show_line_numbers: true,
                start_line: 1,
            })
        );
    }

    #[test]
    fn start_at_line_consumes_value() {
        assert_eq!(
            CodeBlockParser::parse_flags("--numbered --start-at-line 15"),
            Ok(CodeFlags {
                show_line_numbers: true,
                start_line: 15,
            })
        );
    }

    #[test]
    fn unknown_flags_are_ignored() {
        assert_eq!(
            CodeBlockParser::parse_flags("--wrap whatever --numbered"),
            Ok(CodeFlags {
                show_line_numbers: true,
                start_line: 1,
            })
        );
    }
}
