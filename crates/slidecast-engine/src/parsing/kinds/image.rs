use crate::parsing::{BlockParser, ParseContext};
use crate::tree::{ImageNode, NodeId, NodeKind};

/// `![label|WxH](path)` with the size suffix optional.
pub struct ImageParser;

impl ImageParser {
    pub const BANG: u8 = b'!';
    pub const LABEL_OPEN: u8 = b'[';
    pub const LABEL_CLOSE: u8 = b']';
    pub const SIZE: u8 = b'|';
    pub const SIZE_SEP: u8 = b'x';
    pub const PATH_OPEN: u8 = b'(';
    pub const PATH_CLOSE: u8 = b')';

    /// Parses everything after the `!`.
    fn parse_image(cx: &mut ParseContext<'_, '_>) -> Option<ImageNode> {
        let cur = &mut cx.cursor;
        if !cur.eat(&[Self::LABEL_OPEN]) {
            return None;
        }

        let label = cur.take_while(|b| b != Self::LABEL_CLOSE && b != Self::SIZE);
        let (width, height) = match cur.bump()? {
            Self::SIZE => {
                let width = digits_until(cur, Self::SIZE_SEP)?;
                let height = digits_until(cur, Self::LABEL_CLOSE)?;
                (width, height)
            }
            _ => (0, 0),
        };

        if !cur.eat(&[Self::PATH_OPEN]) {
            return None;
        }
        let path = cur.take_while(|b| b != Self::PATH_CLOSE);
        cur.bump()?;

        Some(ImageNode {
            label: label.to_string(),
            path: path.to_string(),
            width,
            height,
        })
    }
}

/// Reads a decimal number terminated by `end`, consuming the terminator.
/// Anything other than a digit before it fails.
fn digits_until(cur: &mut crate::parsing::cursor::Cursor<'_>, end: u8) -> Option<u32> {
    let digits = cur.take_while(|b| b.is_ascii_digit());
    if cur.bump()? != end {
        return None;
    }
    digits.parse().ok()
}

impl BlockParser for ImageParser {
    fn name(&self) -> &'static str {
        "image"
    }

    fn triggers(&self) -> &'static [u8] {
        &[Self::BANG]
    }

    fn parse(&self, cx: &mut ParseContext<'_, '_>) -> Option<NodeId> {
        let image = Self::parse_image(cx)?;
        Some(cx.alloc(NodeKind::Image(image)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::MarkdownParser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Runs the image parser as if `!` had just been consumed.
    fn parse_after_bang(input: &str) -> Option<ImageNode> {
        let parser = MarkdownParser::new();
        let src = format!("!{input}");
        let mut cx = ParseContext::new(&parser, &src);
        cx.cursor.bump();
        ImageParser::parse_image(&mut cx)
    }

    #[test]
    fn single_image_node() {
        assert_eq!(
            parse_after_bang("[alt text](./image.png)"),
            Some(ImageNode {
                label: "alt text".into(),
                path: "./image.png".into(),
                width: 0,
                height: 0,
            })
        );
    }

    #[test]
    fn image_with_size() {
        assert_eq!(
            parse_after_bang("[alt text|20x10](./image.png)"),
            Some(ImageNode {
                label: "alt text".into(),
                path: "./image.png".into(),
                width: 20,
                height: 10,
            })
        );
    }

    #[test]
    fn zero_size_is_accepted() {
        let img = parse_after_bang("[a|0x0](p.png)").unwrap();
        assert_eq!((img.width, img.height), (0, 0));
    }

    #[test]
    fn consumes_exactly_the_image() {
        let parser = MarkdownParser::new();
        let src = "![a](b.png) tail";
        let mut cx = ParseContext::new(&parser, src);
        cx.cursor.bump();
        assert!(ImageParser.parse(&mut cx).is_some());
        assert_eq!(cx.cursor.slice(cx.cursor.pos(), src.len()), " tail");
    }

    #[rstest]
    #[case::missing_label_bracket("not_an_image(path.png)")]
    #[case::missing_path_paren("[not_an_image(path.png)")]
    #[case::comma_separator("[alt text|20,10](./image.png)")]
    #[case::letter_in_height("[alt text|2x1z](./image.png)")]
    #[case::empty_width("[alt|x10](a.png)")]
    #[case::empty_height("[alt|10x](a.png)")]
    #[case::space_before_path("[alt] (a.png)")]
    #[case::unterminated_label("[alt")]
    #[case::unterminated_path("[alt](a.png")]
    #[case::unterminated_size("[alt|10")]
    fn malformed_images_decline(#[case] input: &str) {
        assert_eq!(parse_after_bang(input), None);
    }
}
