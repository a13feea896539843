//! Markdown to PDF rendering.
//!
//! The syntax tree is walked depth-first and every block node is handed to its
//! renderer together with the [`Canvas`]. Renderers draw at the cursor and leave it
//! below what they drew, so the document flows down the page and onto new pages
//! without any renderer having to know what came before it.
//!
//! ## Font and colour state
//!
//! The canvas carries the current font and colours from one call to the next. A
//! renderer that changes them puts back the regular body font and black ink before
//! returning, so the next block starts from a known state:
//!
//! - headings switch to bold at the heading size, then reset to the body font
//! - code blocks switch to the monospaced font and grey fill/border, then reset
//! - blockquotes draw in grey, then reset text and draw colours to black
//! - tables use bold for the header row, then reset to the body font
//!
//! ## Document Metadata
//!
//! Title and author from the configuration are written to the PDF info dictionary,
//! along with the creation date and the generating tool.

mod blockquote;
mod code_block;
mod list;
mod table;

use super::canvas::{Canvas, Colour, PageSetup};
use super::config::{RenderStats, PDF};
use super::fonts::{Family, FontSet, Style};
use super::text::{extract_text, formatted_text};
use crate::error::ConvertError;
use crate::markdown::{self, Document, Node, NodeKind};
use tracing::{debug, info};

/// Body text size in points.
pub const BODY_SIZE: f32 = 11.0;
/// Line height of paragraphs and list items, in millimetres.
pub const LINE_HEIGHT: f32 = 6.0;

const HEADING_SIZES: [f32; 6] = [20.0, 17.0, 14.0, 12.0, 11.0, 10.0];
/// Heading line height as a fraction of its point size.
const HEADING_LINE_FACTOR: f32 = 0.5;
const HEADING_SPACING: f32 = 2.0;
const PARAGRAPH_SPACING: f32 = 3.0;
const RULE_SPACING_ABOVE: f32 = 2.0;
const RULE_SPACING_BELOW: f32 = 4.0;
const RULE_COLOUR: Colour = Colour::grey(180);

impl PDF {
    /// Render Markdown source into a complete PDF document.
    pub fn render(&self, markdown: &str) -> Result<(Vec<u8>, RenderStats), ConvertError> {
        debug!(page_size = %self.page_size, "rendering PDF");
        let fonts = FontSet::load(&self.font_sans, &self.font_mono)?;
        let mut canvas = Canvas::new(PageSetup::from_config(self), fonts);
        canvas.set_info(self.title.clone(), self.author.clone());

        let document = markdown::parse(markdown);
        render(&document, &mut canvas);

        let mut bytes = Vec::new();
        canvas
            .write_to(&mut bytes)
            .map_err(ConvertError::WriteOutput)?;

        let stats = RenderStats {
            page_count: canvas.page_count(),
            bytes: bytes.len(),
        };
        info!(pages = stats.page_count, bytes = stats.bytes, "rendered PDF");
        Ok((bytes, stats))
    }
}

/// Draw a parsed document onto the canvas, starting at its cursor.
pub fn render(document: &Document, canvas: &mut Canvas) {
    debug!(bytes = document.source().len(), "rendering document");
    canvas.set_font(Family::Sans, Style::Regular, BODY_SIZE);
    render_node(&document.root, canvas);
    debug!(pages = canvas.page_count(), "rendered document");
}

fn render_node(node: &Node, canvas: &mut Canvas) {
    match &node.kind {
        NodeKind::Document => render_children(node, canvas),
        NodeKind::Heading(level) => render_heading(node, *level, canvas),
        NodeKind::Paragraph => render_paragraph(node, canvas),
        NodeKind::FencedCodeBlock { info, code } => {
            debug!(language = %info, lines = code.lines().count(), "code block");
            code_block::render(code, canvas)
        }
        NodeKind::CodeBlock { code } => code_block::render(code, canvas),
        NodeKind::ThematicBreak => render_thematic_break(canvas),
        NodeKind::List { ordered } => list::render(node, *ordered, 0, canvas),
        NodeKind::Blockquote => blockquote::render(node, canvas),
        NodeKind::Table => table::render(node, canvas),
        _ => render_children(node, canvas),
    }
}

fn render_children(node: &Node, canvas: &mut Canvas) {
    for child in &node.children {
        render_node(child, canvas);
    }
}

/// Point size for a heading level; levels outside 1-6 use the body size.
pub fn heading_size(level: u8) -> f32 {
    match level {
        1..=6 => HEADING_SIZES[level as usize - 1],
        _ => BODY_SIZE,
    }
}

pub(crate) fn reset_font(canvas: &mut Canvas) {
    canvas.set_font(Family::Sans, Style::Regular, BODY_SIZE);
}

fn render_heading(node: &Node, level: u8, canvas: &mut Canvas) {
    let size = heading_size(level);
    canvas.set_font(Family::Sans, Style::Bold, size);
    canvas.multi_cell(0.0, size * HEADING_LINE_FACTOR, &extract_text(node));
    canvas.ln(HEADING_SPACING);
    reset_font(canvas);
}

fn render_paragraph(node: &Node, canvas: &mut Canvas) {
    let text = formatted_text(node);
    if !text.is_empty() {
        canvas.multi_cell(0.0, LINE_HEIGHT, &text);
    }
    canvas.ln(PARAGRAPH_SPACING);
}

fn render_thematic_break(canvas: &mut Canvas) {
    canvas.ln(RULE_SPACING_ABOVE);
    let y = canvas.y();
    canvas.set_draw_color(RULE_COLOUR);
    canvas.line(canvas.left_margin(), y, canvas.right_edge(), y);
    canvas.set_draw_color(Colour::BLACK);
    canvas.ln(RULE_SPACING_BELOW);
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::sinks::pdf::canvas::Op;

    pub fn render_str(source: &str) -> Canvas {
        let mut canvas = Canvas::new(PageSetup::default(), FontSet::builtin());
        render(&markdown::parse(source), &mut canvas);
        canvas
    }

    /// Every text op as (text, style, size).
    pub fn texts(canvas: &Canvas) -> Vec<(String, Style, f32)> {
        canvas
            .all_ops()
            .filter_map(|op| match op {
                Op::Text {
                    text, style, size, ..
                } => Some((text.clone(), *style, *size)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn can_size_headings() {
        assert_eq!(heading_size(1), 20.0);
        assert_eq!(heading_size(3), 14.0);
        assert_eq!(heading_size(6), 10.0);
        assert_eq!(heading_size(0), BODY_SIZE);
        assert_eq!(heading_size(7), BODY_SIZE);
    }

    #[test]
    fn heading_sizes_strictly_decrease() {
        for level in 1..6 {
            assert!(heading_size(level) > heading_size(level + 1));
        }
        assert!(heading_size(6) > 0.0);
    }

    #[test]
    fn can_render_heading_then_paragraph() {
        let canvas = render_str("# Title\n\nSome **bold** text.");
        assert_eq!(
            texts(&canvas),
            vec![
                ("Title".to_string(), Style::Bold, 20.0),
                ("Some bold text.".to_string(), Style::Regular, BODY_SIZE),
            ]
        );
        assert_eq!(canvas.font(), (Family::Sans, Style::Regular, BODY_SIZE));
        // 10 top margin, 10 heading line, 2 spacing, 6 paragraph line, 3 spacing
        assert!((canvas.y() - 31.0).abs() < 1e-4);
    }

    #[test]
    fn empty_paragraph_only_adds_spacing() {
        let canvas = render_str("\u{1F600}\n");
        assert!(texts(&canvas).is_empty());
        assert!((canvas.y() - 13.0).abs() < 1e-4);
    }

    #[test]
    fn paragraph_breaks_become_lines() {
        let canvas = render_str("first line\nsecond line\n");
        let lines: Vec<String> = texts(&canvas).into_iter().map(|(t, _, _)| t).collect();
        assert_eq!(lines, vec!["first line", "second line"]);
    }

    #[test]
    fn can_render_thematic_break() {
        let canvas = render_str("---\n");
        let line = canvas
            .ops(0)
            .iter()
            .find_map(|op| match op {
                Op::Line { y1, colour, .. } => Some((*y1, *colour)),
                _ => None,
            })
            .expect("a line is drawn");
        assert_eq!(line, (12.0, RULE_COLOUR));
        assert_eq!(canvas.y(), 16.0);
        assert_eq!(canvas.draw_colour(), Colour::BLACK);
    }

    #[test]
    fn documents_paginate() {
        let source = "Paragraph.\n\n".repeat(40);
        let canvas = render_str(&source);
        assert!(canvas.page_count() > 1);
        assert_eq!(texts(&canvas).len(), 40);
    }

    #[test]
    fn can_render_full_document_to_pdf() {
        let source = concat!(
            "# Report\n\nIntro \u{2705}\n\n- one\n- two\n\n```\ncode\n```\n\n",
            "> quote\n\n| A | B |\n|---|---|\n| 1 | 2 |\n"
        );
        let (bytes, stats) = PDF::default().render(source).expect("can render");
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(stats.page_count, 1);
        assert_eq!(stats.bytes, bytes.len());
    }
}
