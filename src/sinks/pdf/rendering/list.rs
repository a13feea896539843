use super::LINE_HEIGHT;
use crate::markdown::{Node, NodeKind};
use crate::sinks::pdf::canvas::Canvas;
use crate::sinks::pdf::text::formatted_text;

const INDENT: &str = "    ";
const BULLET: &str = "\u{2022} ";
const LIST_SPACING: f32 = 2.0;

/// Draw a list and any lists nested in its items.
///
/// Each item contributes one wrapped line of text: the first paragraph (or the
/// inline text of a tight item) prefixed with its bullet or number, indented by
/// the width of four spaces per nesting level. Ordered lists
/// number their items from 1 regardless of the start number in the source.
pub fn render(node: &Node, ordered: bool, depth: usize, canvas: &mut Canvas) {
    let indent = canvas.text_width(&INDENT.repeat(depth));
    let items = node
        .children
        .iter()
        .filter(|child| child.kind == NodeKind::ListItem);

    for (index, item) in items.enumerate() {
        let bullet = if ordered {
            format!("{}. ", index + 1)
        } else {
            BULLET.to_string()
        };

        let first_block = item
            .children
            .iter()
            .find(|child| matches!(child.kind, NodeKind::Paragraph | NodeKind::TextBlock));
        if let Some(block) = first_block {
            let text = formatted_text(block);
            canvas.set_x(canvas.left_margin() + indent);
            canvas.multi_cell(0.0, LINE_HEIGHT, &format!("{bullet}{text}"));
        }

        for child in &item.children {
            if let NodeKind::List { ordered } = child.kind {
                render(child, ordered, depth + 1, canvas);
            }
        }
    }

    if depth == 0 {
        canvas.ln(LIST_SPACING);
    }
}

#[cfg(test)]
mod test {
    use crate::sinks::pdf::canvas::Op;
    use crate::sinks::pdf::rendering::test::{render_str, texts};

    fn lines(source: &str) -> Vec<String> {
        texts(&render_str(source))
            .into_iter()
            .map(|(text, _, _)| text)
            .collect()
    }

    /// Every text op as (text, x).
    fn positions(source: &str) -> Vec<(String, f32)> {
        render_str(source)
            .all_ops()
            .filter_map(|op| match op {
                Op::Text { text, x, .. } => Some((text.clone(), *x)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn can_render_nested_unordered_list() {
        let items = positions("- A\n  - B\n    - C\n- D\n");
        let texts: Vec<&str> = items.iter().map(|(text, _)| text.as_str()).collect();
        assert_eq!(texts, vec!["\u{2022} A", "\u{2022} B", "\u{2022} C", "\u{2022} D"]);

        let indent = items[1].1 - items[0].1;
        assert!(indent > 0.0);
        assert!((items[2].1 - items[0].1 - 2.0 * indent).abs() < 1e-4);
        assert_eq!(items[3].1, items[0].1);
    }

    #[test]
    fn nested_items_wrap_within_their_indent() {
        let long = "word ".repeat(60);
        let canvas = render_str(&format!("- A\n  - {long}\n"));
        let right_edge = canvas.right_edge();
        for op in canvas.all_ops() {
            if let Op::Text { x, text, .. } = op {
                assert!(x + canvas.text_width(text) <= right_edge + 1e-3);
            }
        }
    }

    #[test]
    fn ordered_lists_count_from_one() {
        assert_eq!(
            lines("3. three\n4. four\n\n- x\n\n1. again\n"),
            vec!["1. three", "2. four", "\u{2022} x", "1. again"]
        );
    }

    #[test]
    fn only_the_first_paragraph_is_used() {
        assert_eq!(
            lines("- first\n\n  second paragraph\n- next\n"),
            vec!["\u{2022} first", "\u{2022} next"]
        );
    }

    #[test]
    fn list_spacing_is_added_once() {
        let canvas = render_str("- a\n  - b\n- c\n");
        // three item lines of 6 plus 2 spacing after the outer list
        assert!((canvas.y() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn task_markers_stay_in_the_text() {
        assert_eq!(
            lines("- [x] done\n- [ ] todo\n"),
            vec!["\u{2022} [x] done", "\u{2022} [ ] todo"]
        );
    }
}
