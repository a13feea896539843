//! Plain text for the PDF renderer.
//!
//! The document fonts have no emoji, so text pulled out of the syntax tree is
//! sanitised first: a handful of common symbols become short ASCII tokens and
//! everything else in the emoji blocks is dropped.

use crate::markdown::{Node, NodeKind};
use std::ops::RangeInclusive;

/// Symbols with a readable ASCII stand-in. Each entry is a single code point and no
/// replacement contains a character that appears in this table or in
/// [`EMOJI_RANGES`], so sanitising is idempotent.
const EMOJI_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2705}', "[v]"),
    ('\u{2714}', "[v]"),
    ('\u{2713}', "[v]"),
    ('\u{2611}', "[v]"),
    ('\u{274C}', "[x]"),
    ('\u{2716}', "[x]"),
    ('\u{2717}', "[x]"),
    ('\u{26A0}', "[!]"),
    ('\u{2757}', "[!]"),
    ('\u{2139}', "[i]"),
    ('\u{1F4A1}', "[tip]"),
    ('\u{1F4DD}', "[note]"),
    ('\u{1F4CC}', "[pin]"),
    ('\u{1F680}', "[>]"),
    ('\u{2B50}', "[*]"),
    ('\u{27A1}', "->"),
    ('\u{2B05}', "<-"),
];

/// Code points removed after replacement.
const EMOJI_RANGES: &[RangeInclusive<u32>] = &[
    0x1F000..=0x1FAFF,
    0x2600..=0x27BF,
    0x2B00..=0x2BFF,
    0xFE00..=0xFE0F,
    0x200D..=0x200D,
    0xE0020..=0xE007F,
    0x1F1E6..=0x1F1FF,
];

/// Replace known emoji with ASCII tokens and strip the rest.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some((_, token)) = EMOJI_REPLACEMENTS.iter().find(|(glyph, _)| *glyph == c) {
            out.push_str(token);
        } else if !is_emoji(c) {
            out.push(c);
        }
    }
    out
}

fn is_emoji(c: char) -> bool {
    let code = c as u32;
    EMOJI_RANGES.iter().any(|range| range.contains(&code))
}

/// Flatten a subtree into sanitised plain text.
///
/// Text nodes contribute their content followed by a newline when a soft or hard
/// break follows them; inline code contributes its content; every other node
/// contributes the text of its children.
pub fn extract_text(node: &Node) -> String {
    let mut buf = String::new();
    collect_text(node, &mut buf);
    sanitize(&buf)
}

fn collect_text(node: &Node, buf: &mut String) {
    match &node.kind {
        NodeKind::Text {
            text,
            soft_break,
            hard_break,
        } => {
            buf.push_str(text);
            if *soft_break || *hard_break {
                buf.push('\n');
            }
        }
        NodeKind::InlineCode(code) => buf.push_str(code),
        _ => {
            for child in &node.children {
                collect_text(child, buf);
            }
        }
    }
}

/// Extracted text with leftover strong-emphasis markers removed and surrounding
/// whitespace trimmed.
pub fn formatted_text(node: &Node) -> String {
    extract_text(node)
        .replace("**", "")
        .replace("__", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markdown::parse;

    #[test]
    fn can_replace_and_strip_emoji() {
        assert_eq!(sanitize("done \u{2705} \u{1F600}!"), "done [v] !");
        assert_eq!(sanitize("\u{26A0}\u{FE0F} careful"), "[!] careful");
        assert_eq!(sanitize("flag \u{1F1F3}\u{1F1F4}"), "flag ");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize("a \u{274C} b \u{1F44D}\u{200D}\u{1F3FD} \u{27A1} c \u{00E9}");
        assert_eq!(sanitize(&once), once);
        assert_eq!(once, "a [x] b  -> c \u{00E9}");
    }

    #[test]
    fn nothing_in_the_emoji_ranges_survives() {
        for range in EMOJI_RANGES {
            let text: String = range.clone().filter_map(char::from_u32).collect();
            let clean = sanitize(&text);
            assert!(!clean.chars().any(is_emoji), "{range:x?} left {clean:?}");
            assert_eq!(sanitize(&clean), clean);
        }
    }

    #[test]
    fn every_replacement_is_stable() {
        for (glyph, token) in EMOJI_REPLACEMENTS {
            let once = sanitize(&glyph.to_string());
            assert_eq!(once, *token);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn keeps_plain_text_untouched() {
        let text = "Plain ASCII, Latin-1 \u{00FC}ber, arrows \u{2192} and dashes \u{2014}";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn can_extract_nested_inline_text() {
        let doc = parse("Some **bold and _italic_** with `code`.");
        assert_eq!(
            extract_text(&doc.root.children[0]),
            "Some bold and italic with code."
        );
    }

    #[test]
    fn extraction_keeps_line_breaks() {
        let doc = parse("first\nsecond  \nthird");
        assert_eq!(extract_text(&doc.root.children[0]), "first\nsecond\nthird");
    }

    #[test]
    fn formatted_text_strips_markers_and_whitespace() {
        let doc = parse("  text with \\*\\*literal\\*\\* stars  ");
        assert_eq!(formatted_text(&doc.root.children[0]), "text with literal stars");
    }
}
