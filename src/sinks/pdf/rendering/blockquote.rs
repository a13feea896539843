use crate::markdown::{Node, NodeKind};
use crate::sinks::pdf::canvas::{Canvas, CellStyle, Colour, Move};
use crate::sinks::pdf::text::extract_text;

const QUOTE_LINE_HEIGHT: f32 = 6.0;
const QUOTE_INDENT: f32 = 6.0;
const QUOTE_SPACING: f32 = 3.0;
const QUOTE_BORDER: Colour = Colour::grey(200);
const QUOTE_TEXT: Colour = Colour::grey(100);

/// Draw quoted text in grey, indented, with a bar down its left edge.
pub fn render(node: &Node, canvas: &mut Canvas) {
    let text = quote_text(node);
    let x = canvas.left_margin();
    let width = canvas.content_width() - QUOTE_INDENT;

    canvas.set_text_color(QUOTE_TEXT);
    canvas.set_draw_color(QUOTE_BORDER);
    for source_line in text.split('\n') {
        for line in canvas.split_lines(source_line, width) {
            canvas.ensure_space(QUOTE_LINE_HEIGHT);
            let y = canvas.y();
            canvas.line(x, y, x, y + QUOTE_LINE_HEIGHT);
            canvas.set_xy(x + QUOTE_INDENT, y);
            canvas.cell(
                width,
                QUOTE_LINE_HEIGHT,
                &line,
                CellStyle::default(),
                Move::NextLine,
            );
        }
    }

    canvas.set_text_color(Colour::BLACK);
    canvas.set_draw_color(Colour::BLACK);
    canvas.ln(QUOTE_SPACING);
}

/// The quote's blocks, one per line group. Lists and nested quotes contribute
/// one line group per block inside them.
fn quote_text(node: &Node) -> String {
    let mut blocks = Vec::new();
    for child in &node.children {
        collect_blocks(child, &mut blocks);
    }
    let text = if blocks.is_empty() {
        extract_text(node)
    } else {
        blocks.join("\n")
    };
    text.trim_end_matches('\n').to_string()
}

fn collect_blocks(node: &Node, blocks: &mut Vec<String>) {
    match &node.kind {
        NodeKind::List { .. } | NodeKind::ListItem | NodeKind::Blockquote => {
            for child in &node.children {
                collect_blocks(child, blocks);
            }
        }
        NodeKind::FencedCodeBlock { code, .. } | NodeKind::CodeBlock { code } => {
            blocks.push(code.clone())
        }
        _ => blocks.push(extract_text(node)),
    }
}
