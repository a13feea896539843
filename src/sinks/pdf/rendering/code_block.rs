use super::reset_font;
use crate::sinks::pdf::canvas::{Canvas, CellStyle, Colour, Move, Paint, CELL_MARGIN};
use crate::sinks::pdf::fonts::{Family, Style};

const CODE_SIZE: f32 = 9.0;
const CODE_LINE_HEIGHT: f32 = 5.0;
/// Vertical padding, split evenly above and below the lines.
const CODE_PADDING: f32 = 4.0;
const CODE_INSET: f32 = 2.0;
const CODE_SPACING: f32 = 3.0;
const CODE_BACKGROUND: Colour = Colour::grey(245);
const CODE_BORDER: Colour = Colour::grey(200);

/// Draw code verbatim in a monospaced font on a shaded, bordered box.
///
/// The box is sized for every line up front. When it doesn't fit on the rest of
/// the page, a new page is started first. A block taller than a page is split
/// into one box per page.
pub fn render(code: &str, canvas: &mut Canvas) {
    let lines: Vec<&str> = code
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let width = canvas.content_width();
    let x = canvas.left_margin();
    // cells inset their text by CELL_MARGIN already
    let text_x = x + CODE_INSET - CELL_MARGIN;
    let text_width = width - 2.0 * (CODE_INSET - CELL_MARGIN);

    canvas.ensure_space(box_height(lines.len()));
    canvas.set_font(Family::Mono, Style::Regular, CODE_SIZE);

    let mut remaining = lines.as_slice();
    loop {
        let top = canvas.y();
        let room = canvas.page_break_trigger() - top - CODE_PADDING;
        let fit = ((room / CODE_LINE_HEIGHT).floor().max(1.0) as usize).min(remaining.len());
        let (segment, rest) = remaining.split_at(fit);
        let height = box_height(segment.len());

        canvas.set_fill_color(CODE_BACKGROUND);
        canvas.set_draw_color(CODE_BORDER);
        canvas.rect(x, top, width, height, Paint::Fill);
        canvas.rect(x, top, width, height, Paint::Stroke);

        canvas.set_y(top + CODE_PADDING / 2.0);
        for line in segment {
            canvas.set_x(text_x);
            canvas.cell(
                text_width,
                CODE_LINE_HEIGHT,
                line,
                CellStyle::default(),
                Move::Below,
            );
        }

        remaining = rest;
        if remaining.is_empty() {
            canvas.set_y(top + height + CODE_SPACING);
            break;
        }
        canvas.add_page();
    }

    reset_font(canvas);
    canvas.set_fill_color(Colour::WHITE);
    canvas.set_draw_color(Colour::BLACK);
}

fn box_height(lines: usize) -> f32 {
    lines as f32 * CODE_LINE_HEIGHT + CODE_PADDING
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sinks::pdf::canvas::Op;
    use crate::sinks::pdf::rendering::test::{render_str, texts};
    use crate::sinks::pdf::rendering::BODY_SIZE;

    #[test]
    fn can_render_code_verbatim() {
        let canvas = render_str("```\nfn main() {\n    **not bold**\n}\n```\n");
        let lines: Vec<(String, Style, f32)> = texts(&canvas);
        assert_eq!(
            lines,
            vec![
                ("fn main() {".to_string(), Style::Regular, CODE_SIZE),
                ("    **not bold**".to_string(), Style::Regular, CODE_SIZE),
                ("}".to_string(), Style::Regular, CODE_SIZE),
            ]
        );
        assert!(canvas.all_ops().all(|op| match op {
            Op::Text { family, .. } => *family == Family::Mono,
            _ => true,
        }));
    }

    #[test]
    fn box_covers_every_line() {
        let canvas = render_str("```\na\nb\nc\n```\n");
        let rects: Vec<(f32, f32, Paint, Colour, Colour)> = canvas
            .ops(0)
            .iter()
            .filter_map(|op| match op {
                Op::Rect {
                    y,
                    h,
                    paint,
                    fill,
                    stroke,
                    ..
                } => Some((*y, *h, *paint, *fill, *stroke)),
                _ => None,
            })
            .collect();
        assert_eq!(
            rects,
            vec![
                (10.0, 19.0, Paint::Fill, CODE_BACKGROUND, CODE_BORDER),
                (10.0, 19.0, Paint::Stroke, CODE_BACKGROUND, CODE_BORDER),
            ]
        );
        // box top + height + spacing
        assert!((canvas.y() - 32.0).abs() < 1e-4);
        assert_eq!(canvas.font(), (Family::Sans, Style::Regular, BODY_SIZE));
        assert_eq!(canvas.draw_colour(), Colour::BLACK);
    }

    #[test]
    fn empty_code_block_is_one_empty_line() {
        let canvas = render_str("```\n```\n");
        assert!(texts(&canvas).is_empty());
        let height = canvas.ops(0).iter().find_map(|op| match op {
            Op::Rect { h, .. } => Some(*h),
            _ => None,
        });
        assert_eq!(height, Some(9.0));
    }

    #[test]
    fn code_is_inset_from_the_box_edge() {
        let canvas = render_str("```\nx\n```\n");
        let text_x = canvas.all_ops().find_map(|op| match op {
            Op::Text { x, .. } => Some(*x),
            _ => None,
        });
        assert_eq!(text_x, Some(canvas.left_margin() + CODE_INSET));
    }

    #[test]
    fn tall_blocks_get_a_box_per_page() {
        let code: Vec<String> = (0..80).map(|n| format!("line {n}")).collect();
        let canvas = render_str(&format!("```\n{}\n```\n", code.join("\n")));
        assert_eq!(canvas.page_count(), 2);

        let trigger = canvas.page_break_trigger();
        let mut lines = 0;
        for page in 0..canvas.page_count() {
            let ops = canvas.ops(page);
            let boxes: Vec<(f32, f32)> = ops
                .iter()
                .filter_map(|op| match op {
                    Op::Rect {
                        y,
                        h,
                        paint: Paint::Fill,
                        ..
                    } => Some((*y, *h)),
                    _ => None,
                })
                .collect();
            assert_eq!(boxes.len(), 1, "page {page} has one box");
            let (top, height) = boxes[0];
            assert!(top + height <= trigger + 1e-3);

            for op in ops {
                if let Op::Text { y, .. } = op {
                    assert!(*y > top && *y < top + height);
                    lines += 1;
                }
            }
        }
        assert_eq!(lines, 80);
    }

    #[test]
    fn indented_code_renders_like_fenced_code() {
        let canvas = render_str("    let x = 1;\n");
        assert_eq!(
            texts(&canvas),
            vec![("let x = 1;".to_string(), Style::Regular, CODE_SIZE)]
        );
    }
}
