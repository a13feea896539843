use super::{reset_font, BODY_SIZE};
use crate::markdown::{Node, NodeKind};
use crate::sinks::pdf::canvas::{Canvas, CellStyle, Colour, Move, CELL_MARGIN};
use crate::sinks::pdf::fonts::{Family, Style};
use crate::sinks::pdf::text::extract_text;

const ROW_HEIGHT: f32 = 7.0;
const HEADER_FILL: Colour = Colour::grey(230);
const TABLE_SPACING: f32 = 4.0;
const ELLIPSIS: &str = "...";

/// Collect the text of every cell, header row first.
///
/// Rows are padded with empty cells to the widest row's column count.
pub fn collect_rows(node: &Node) -> Vec<Vec<String>> {
    let mut header = None;
    let mut body = Vec::new();
    for row in &node.children {
        match row.kind {
            NodeKind::TableHeaderRow if header.is_none() => header = Some(row_cells(row)),
            NodeKind::TableHeaderRow | NodeKind::TableRow => body.push(row_cells(row)),
            _ => {}
        }
    }

    let mut rows: Vec<Vec<String>> = header.into_iter().chain(body).collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(columns, String::new());
    }
    rows
}

fn row_cells(row: &Node) -> Vec<String> {
    row.children
        .iter()
        .filter(|cell| cell.kind == NodeKind::TableCell)
        .map(|cell| extract_text(cell).replace('\n', " ").trim().to_string())
        .collect()
}

/// Draw a table as a grid of equal-width bordered cells.
pub fn render(node: &Node, canvas: &mut Canvas) {
    let rows = collect_rows(node);
    let columns = rows.first().map(Vec::len).unwrap_or(0);
    if rows.is_empty() || columns == 0 {
        return;
    }

    let column_width = canvas.content_width() / columns as f32;
    for (index, row) in rows.iter().enumerate() {
        if index == 0 {
            canvas.set_font(Family::Sans, Style::Bold, BODY_SIZE);
            canvas.set_fill_color(HEADER_FILL);
        } else {
            canvas.set_font(Family::Sans, Style::Regular, BODY_SIZE);
            canvas.set_fill_color(Colour::WHITE);
        }
        canvas.ensure_space(ROW_HEIGHT);
        for cell in row {
            let text = fit_to_width(canvas, cell, column_width - 2.0 * CELL_MARGIN);
            canvas.cell(
                column_width,
                ROW_HEIGHT,
                &text,
                CellStyle::boxed(true),
                Move::Right,
            );
        }
        canvas.ln(ROW_HEIGHT);
    }

    reset_font(canvas);
    canvas.set_fill_color(Colour::WHITE);
    canvas.ln(TABLE_SPACING);
}

/// Shorten text that would spill out of its cell, marking the cut with an ellipsis.
fn fit_to_width(canvas: &Canvas, text: &str, width: f32) -> String {
    if canvas.text_width(text) <= width {
        return text.to_string();
    }
    let mut fitted = String::new();
    for c in text.chars() {
        fitted.push(c);
        if canvas.text_width(&format!("{fitted}{ELLIPSIS}")) > width {
            fitted.pop();
            break;
        }
    }
    format!("{}{ELLIPSIS}", fitted.trim_end())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markdown::parse;
    use crate::sinks::pdf::canvas::{Op, Paint};
    use crate::sinks::pdf::rendering::test::{render_str, texts};

    fn cell(text: &str) -> Node {
        let mut cell = Node::new(NodeKind::TableCell, 0..0);
        cell.children.push(Node::new(
            NodeKind::Text {
                text: text.to_string(),
                soft_break: false,
                hard_break: false,
            },
            0..0,
        ));
        cell
    }

    fn row(kind: NodeKind, cells: &[&str]) -> Node {
        let mut row = Node::new(kind, 0..0);
        row.children = cells.iter().map(|text| cell(text)).collect();
        row
    }

    #[test]
    fn header_comes_first_and_rows_are_padded() {
        let mut table = Node::new(NodeKind::Table, 0..0);
        table.children = vec![
            row(NodeKind::TableRow, &["1", "2", "3"]),
            row(NodeKind::TableHeaderRow, &["A", "B"]),
            row(NodeKind::TableRow, &["4"]),
        ];
        assert_eq!(
            collect_rows(&table),
            vec![vec!["A", "B", ""], vec!["1", "2", "3"], vec!["4", "", ""]]
        );
    }

    #[test]
    fn can_collect_parsed_table() {
        let doc = parse("| Name | Qty |\n|------|-----|\n| `a` | **2** |\n");
        assert_eq!(
            collect_rows(&doc.root.children[0]),
            vec![vec!["Name", "Qty"], vec!["a", "2"]]
        );
    }

    #[test]
    fn can_render_table_grid() {
        let canvas = render_str("| A | B |\n|---|---|\n| 1 | 2 |\n");
        assert_eq!(
            texts(&canvas),
            vec![
                ("A".to_string(), Style::Bold, BODY_SIZE),
                ("B".to_string(), Style::Bold, BODY_SIZE),
                ("1".to_string(), Style::Regular, BODY_SIZE),
                ("2".to_string(), Style::Regular, BODY_SIZE),
            ]
        );

        let cells: Vec<(f32, f32, f32, Colour)> = canvas
            .all_ops()
            .filter_map(|op| match op {
                Op::Rect {
                    x,
                    y,
                    w,
                    paint: Paint::FillStroke,
                    fill,
                    ..
                } => Some((*x, *y, *w, *fill)),
                _ => None,
            })
            .collect();
        assert_eq!(
            cells,
            vec![
                (10.0, 10.0, 95.0, HEADER_FILL),
                (105.0, 10.0, 95.0, HEADER_FILL),
                (10.0, 17.0, 95.0, Colour::WHITE),
                (105.0, 17.0, 95.0, Colour::WHITE),
            ]
        );
        assert_eq!(canvas.font(), (Family::Sans, Style::Regular, BODY_SIZE));
        assert!((canvas.y() - 28.0).abs() < 1e-4);
    }

    #[test]
    fn short_rows_render_empty_cells() {
        let canvas = render_str("| H1 | H2 |\n|----|----|\n| a | b |\n| c |\n");
        let cells: Vec<(f32, f32)> = canvas
            .all_ops()
            .filter_map(|op| match op {
                Op::Rect {
                    x,
                    y,
                    paint: Paint::FillStroke,
                    ..
                } => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(
            cells,
            vec![
                (10.0, 10.0),
                (105.0, 10.0),
                (10.0, 17.0),
                (105.0, 17.0),
                (10.0, 24.0),
                (105.0, 24.0),
            ]
        );

        let texts: Vec<String> = texts(&canvas).into_iter().map(|(text, _, _)| text).collect();
        assert_eq!(texts, vec!["H1", "H2", "a", "b", "c"]);
    }

    #[test]
    fn empty_table_draws_nothing() {
        let table = Node::new(NodeKind::Table, 0..0);
        let mut canvas = render_str("");
        render(&table, &mut canvas);
        assert_eq!(canvas.all_ops().count(), 0);
        assert_eq!(canvas.y(), 10.0);
    }

    #[test]
    fn long_cells_are_shortened() {
        let canvas = render_str(&format!(
            "| A | B | C | D | E | F |\n|---|---|---|---|---|---|\n| {} | x | x | x | x | x |\n",
            "long ".repeat(20)
        ));
        let first = texts(&canvas)
            .into_iter()
            .map(|(text, _, _)| text)
            .find(|text| text.starts_with("long"))
            .expect("long cell is drawn");
        assert!(first.ends_with("..."));
        assert!(first.len() < 100);
    }
}
