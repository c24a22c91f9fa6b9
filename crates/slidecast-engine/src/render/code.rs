use crate::ansi;
use crate::render::SyntaxHighlighter;
use crate::tree::CodeBlockNode;

/// Every code line is padded to at least this many columns.
pub const CODE_WIDTH: usize = 78;

const GUTTER_STYLE: &str = "\x1b[38;5;240m";

/// Lays out a code block: optional gutter, emphasis ranges, fixed width.
///
/// Highlighting covers the whole block in one call. Its output is realigned
/// with the source lines; a line with no highlighted counterpart, or outside
/// the emphasis ranges, is shown plain. Tabs are expanded first so the
/// padding counts real columns.
pub fn render_code_block(block: &CodeBlockNode, highlighter: &dyn SyntaxHighlighter) -> String {
    let code = ansi::expand_tabs(&block.code, ansi::TAB_WIDTH);
    let lines: Vec<&str> = code.split('\n').collect();
    let highlighted = highlight_lines(block, &code, lines.len(), highlighter);
    let gutter = block
        .show_line_numbers
        .then(|| gutter_width(block.start_line, lines.len()));

    let mut out = String::new();
    for (i, plain) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }

        let mut line = String::new();
        if let Some(width) = gutter {
            let number = u64::from(block.start_line) + i as u64;
            line.push_str(&line_number(number, width));
        }

        let relative = u32::try_from(i + 1).unwrap_or(u32::MAX);
        let styled = highlighted
            .as_ref()
            .and_then(|h| h.get(i))
            .map(|h| h.trim_end_matches([' ', '\t', '\r', '\n']))
            .filter(|h| !ansi::strip(h).is_empty());
        match styled {
            Some(h) if block.in_range(relative) => line.push_str(h),
            _ => line.push_str(plain),
        }

        let pad = CODE_WIDTH.saturating_sub(ansi::visible_width(&line));
        line.extend(std::iter::repeat_n(' ', pad));
        out.push_str(&line);
    }
    out
}

/// Highlighted lines padded or truncated to `count`, or `None` when the block
/// has no language or the highlighter failed.
fn highlight_lines(
    block: &CodeBlockNode,
    code: &str,
    count: usize,
    highlighter: &dyn SyntaxHighlighter,
) -> Option<Vec<String>> {
    if block.language.is_empty() {
        return None;
    }
    let out = match highlighter.highlight(code, &block.language) {
        Ok(out) => out,
        Err(err) => {
            log::warn!("highlighting {} code failed, showing it plain: {err}", block.language);
            return None;
        }
    };
    let mut lines: Vec<String> = out.split('\n').map(str::to_string).collect();
    lines.resize(count, String::new());
    Some(lines)
}

/// Digits of the largest displayed number plus two.
pub fn gutter_width(start_line: u32, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let last = u64::from(start_line) + count as u64 - 1;
    last.to_string().len() + 2
}

fn line_number(number: u64, width: usize) -> String {
    format!(
        "{GUTTER_STYLE}{number:>pad$}{reset} ",
        pad = width.saturating_sub(1),
        reset = ansi::RESET
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fakes::{BrokenHighlighter, Canned, Shout};
    use crate::tree::LineRange;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn block(language: &str, code: &str) -> CodeBlockNode {
        CodeBlockNode {
            language: language.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    /// Rendered lines with escapes removed and padding trimmed.
    fn plain_lines(out: &str) -> Vec<String> {
        out.split('\n')
            .map(|l| ansi::strip(l).trim_end().to_string())
            .collect()
    }

    #[test]
    fn every_line_is_padded_to_code_width() {
        let out = render_code_block(&block("", "a\nbb"), &Shout);
        for line in out.split('\n') {
            assert_eq!(ansi::visible_width(line), CODE_WIDTH);
        }
    }

    #[test]
    fn long_lines_are_not_cut() {
        let long = "x".repeat(CODE_WIDTH + 10);
        let out = render_code_block(&block("", &long), &Shout);
        assert_eq!(out, long);
    }

    #[test]
    fn no_language_means_no_highlighting() {
        let out = render_code_block(&block("", "let x"), &Shout);
        assert_eq!(plain_lines(&out), vec!["let x"]);
    }

    #[test]
    fn language_highlights_all_lines_without_ranges() {
        let out = render_code_block(&block("rust", "a\nb"), &Shout);
        assert_eq!(plain_lines(&out), vec!["A", "B"]);
    }

    #[test]
    fn out_of_range_lines_stay_plain() {
        let mut cb = block("rust", "a\nb\nc\nd");
        cb.ranges = vec![LineRange::single(1), LineRange::new(3, 4)];
        let out = render_code_block(&cb, &Shout);
        assert_eq!(plain_lines(&out), vec!["A", "b", "C", "D"]);
    }

    #[test]
    fn short_highlight_output_falls_back_to_plain_lines() {
        let out = render_code_block(&block("rust", "a\nb\nc"), &Canned("X"));
        assert_eq!(plain_lines(&out), vec!["X", "b", "c"]);
    }

    #[test]
    fn long_highlight_output_is_truncated() {
        let out = render_code_block(&block("rust", "a"), &Canned("X\nY\nZ"));
        assert_eq!(plain_lines(&out), vec!["X"]);
    }

    #[test]
    fn blank_highlighted_line_uses_source() {
        let out = render_code_block(&block("rust", "a\nb"), &Canned("\x1b[0m\nB"));
        assert_eq!(plain_lines(&out), vec!["a", "B"]);
    }

    #[test]
    fn highlighter_error_renders_plain() {
        let out = render_code_block(&block("rust", "a\nb"), &BrokenHighlighter);
        assert_eq!(plain_lines(&out), vec!["a", "b"]);
    }

    #[test]
    fn numbered_lines_start_at_start_line() {
        let mut cb = block("", "a\nb\nc");
        cb.show_line_numbers = true;
        cb.start_line = 9;
        let out = render_code_block(&cb, &Shout);
        // Largest number is 11: two digits plus two columns of gutter.
        assert_eq!(plain_lines(&out), vec!["  9 a", " 10 b", " 11 c"]);
    }

    #[test]
    fn tab_indented_code_keeps_its_width() {
        let mut cb = block("go", "func main() {\n\tif ok {\n\t\treturn\n\t}\n}");
        cb.show_line_numbers = true;
        let out = render_code_block(&cb, &Shout);

        assert!(!out.contains('\t'));
        for line in out.split('\n') {
            assert_eq!(ansi::visible_width(line), CODE_WIDTH);
        }
        assert_eq!(
            plain_lines(&out),
            vec![
                " 1 FUNC MAIN() {",
                " 2     IF OK {",
                " 3         RETURN",
                " 4     }",
                " 5 }",
            ]
        );
    }

    #[test]
    fn gutter_is_dimmed() {
        let mut cb = block("", "a");
        cb.show_line_numbers = true;
        let out = render_code_block(&cb, &Shout);
        assert!(out.starts_with("\x1b[38;5;240m 1\x1b[0m a"));
    }

    #[rstest]
    #[case(1, 0, 0)]
    #[case(1, 1, 3)]
    #[case(1, 9, 3)]
    #[case(1, 10, 4)]
    #[case(95, 10, 5)]
    #[case(5, 3, 3)]
    fn gutter_widths(#[case] start: u32, #[case] count: usize, #[case] want: usize) {
        assert_eq!(gutter_width(start, count), want);
    }
}
