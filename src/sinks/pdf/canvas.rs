//! A stateful drawing surface for laying out text on pages.
//!
//! The canvas works the way a typewriter does: there is a cursor (in millimetres,
//! measured from the top-left corner of the page), a current font and a set of
//! colours, and every drawing call happens at the cursor and moves it along. When a
//! cell would run past the bottom margin, a new page is started automatically and
//! drawing continues at the top with the same font and colours.
//!
//! Nothing is written while drawing. Operations are recorded per page and turned
//! into PDF content streams in a single pass by [`Canvas::write_to`], which also
//! lets tests inspect exactly what was drawn where.

use super::config::PDF;
use super::fonts::{Family, FontSet, Style};
use chrono::{Datelike, Local, Timelike};
use flate2::{write::ZlibEncoder, Compression};
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Points per millimetre.
const K: f32 = 72.0 / 25.4;

/// Horizontal padding between a cell's edge and its text, in millimetres.
pub const CELL_MARGIN: f32 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const BLACK: Colour = Colour::grey(0);
    pub const WHITE: Colour = Colour::grey(255);

    pub const fn grey(value: u8) -> Colour {
        Colour {
            r: value,
            g: value,
            b: value,
        }
    }

    fn components(&self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Page dimensions and margins, in millimetres.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    /// Distance from the bottom edge at which a new page is started.
    pub margin_bottom: f32,
}

impl PageSetup {
    pub fn from_config(config: &PDF) -> PageSetup {
        let (width, height) = config.page_size.dimensions_mm();
        PageSetup {
            width,
            height,
            margin_left: config.margin_left_mm,
            margin_top: config.margin_top_mm,
            margin_right: config.margin_right_mm,
            margin_bottom: config.margin_bottom_mm,
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup::from_config(&PDF::default())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct CellStyle {
    pub border: bool,
    pub fill: bool,
}

impl CellStyle {
    pub fn boxed(fill: bool) -> CellStyle {
        CellStyle { border: true, fill }
    }
}

/// Where the cursor goes after a cell is drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Move {
    /// To the right edge of the cell, same line.
    Right,
    /// To the left margin of the next line.
    NextLine,
    /// Directly below the cell, keeping x.
    Below,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Paint {
    Fill,
    Stroke,
    FillStroke,
}

/// A recorded drawing operation. Coordinates are millimetres from the top-left.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Text {
        x: f32,
        /// Baseline.
        y: f32,
        family: Family,
        style: Style,
        size: f32,
        colour: Colour,
        text: String,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        paint: Paint,
        fill: Colour,
        stroke: Colour,
        line_width: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        colour: Colour,
        line_width: f32,
    },
}

pub struct Canvas {
    fonts: FontSet,
    setup: PageSetup,
    pages: Vec<Vec<Op>>,
    x: f32,
    y: f32,
    family: Family,
    style: Style,
    size: f32,
    text_colour: Colour,
    fill_colour: Colour,
    draw_colour: Colour,
    line_width: f32,
    title: Option<String>,
    author: Option<String>,
}

impl Canvas {
    /// Create a canvas with one empty page and the cursor at the top-left margin.
    pub fn new(setup: PageSetup, fonts: FontSet) -> Canvas {
        Canvas {
            fonts,
            setup,
            pages: vec![Vec::new()],
            x: setup.margin_left,
            y: setup.margin_top,
            family: Family::Sans,
            style: Style::Regular,
            size: 11.0,
            text_colour: Colour::BLACK,
            fill_colour: Colour::WHITE,
            draw_colour: Colour::BLACK,
            line_width: 0.2,
            title: None,
            author: None,
        }
    }

    pub fn set_info(&mut self, title: Option<String>, author: Option<String>) {
        self.title = title;
        self.author = author;
    }

    pub fn content_width(&self) -> f32 {
        self.setup.width - self.setup.margin_left - self.setup.margin_right
    }

    pub fn left_margin(&self) -> f32 {
        self.setup.margin_left
    }

    pub fn right_edge(&self) -> f32 {
        self.setup.width - self.setup.margin_right
    }

    pub fn page_break_trigger(&self) -> f32 {
        self.setup.height - self.setup.margin_bottom
    }

    #[cfg(test)]
    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.x = x;
    }

    /// Move to a new line position, returning x to the left margin.
    pub fn set_y(&mut self, y: f32) {
        self.x = self.setup.margin_left;
        self.y = y;
    }

    pub fn set_xy(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    /// Line feed: back to the left margin and down by `h`.
    pub fn ln(&mut self, h: f32) {
        self.x = self.setup.margin_left;
        self.y += h;
    }

    pub fn set_font(&mut self, family: Family, style: Style, size: f32) {
        self.family = family;
        self.style = style;
        self.size = size;
    }

    #[cfg(test)]
    pub fn font(&self) -> (Family, Style, f32) {
        (self.family, self.style, self.size)
    }

    pub fn set_text_color(&mut self, colour: Colour) {
        self.text_colour = colour;
    }

    pub fn set_fill_color(&mut self, colour: Colour) {
        self.fill_colour = colour;
    }

    pub fn set_draw_color(&mut self, colour: Colour) {
        self.draw_colour = colour;
    }

    #[cfg(test)]
    pub fn text_colour(&self) -> Colour {
        self.text_colour
    }

    #[cfg(test)]
    pub fn draw_colour(&self) -> Colour {
        self.draw_colour
    }

    /// Width of text in the current font, in millimetres.
    pub fn text_width(&self, text: &str) -> f32 {
        self.fonts
            .face(self.family, self.style)
            .text_width(text, self.size)
            / K
    }

    pub fn add_page(&mut self) {
        self.pages.push(Vec::new());
        self.x = self.setup.margin_left;
        self.y = self.setup.margin_top;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Operations recorded on a page (zero-based).
    #[cfg(test)]
    pub fn ops(&self, page: usize) -> &[Op] {
        self.pages.get(page).map(Vec::as_slice).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn all_ops(&self) -> impl Iterator<Item = &Op> {
        self.pages.iter().flatten()
    }

    fn at_page_top(&self) -> bool {
        (self.y - self.setup.margin_top).abs() < 1e-3
    }

    /// Start a new page if `h` millimetres don't fit above the page-break trigger.
    pub fn ensure_space(&mut self, h: f32) -> bool {
        if self.y + h > self.page_break_trigger() && !self.at_page_top() {
            let x = self.x;
            self.add_page();
            self.x = x;
            return true;
        }
        false
    }

    fn push(&mut self, op: Op) {
        if let Some(page) = self.pages.last_mut() {
            page.push(op);
        }
    }

    /// Draw a single-line cell at the cursor.
    ///
    /// A width of zero extends the cell to the right margin. Text is left-aligned,
    /// vertically centred and inset by [`CELL_MARGIN`].
    pub fn cell(&mut self, w: f32, h: f32, text: &str, style: CellStyle, next: Move) {
        self.ensure_space(h);
        let w = if w <= 0.0 { self.right_edge() - self.x } else { w };

        let paint = match (style.fill, style.border) {
            (true, true) => Some(Paint::FillStroke),
            (true, false) => Some(Paint::Fill),
            (false, true) => Some(Paint::Stroke),
            (false, false) => None,
        };
        if let Some(paint) = paint {
            self.rect(self.x, self.y, w, h, paint);
        }

        if !text.is_empty() {
            self.push(Op::Text {
                x: self.x + CELL_MARGIN,
                y: self.y + 0.5 * h + 0.3 * self.size / K,
                family: self.family,
                style: self.style,
                size: self.size,
                colour: self.text_colour,
                text: text.to_string(),
            });
        }

        match next {
            Move::Right => self.x += w,
            Move::NextLine => {
                self.x = self.setup.margin_left;
                self.y += h;
            }
            Move::Below => self.y += h,
        }
    }

    /// Draw word-wrapped text as a stack of cells, leaving the cursor at the left
    /// margin below the last line.
    pub fn multi_cell(&mut self, w: f32, h: f32, text: &str) {
        let w = if w <= 0.0 { self.right_edge() - self.x } else { w };
        let start_x = self.x;
        for line in self.split_lines(text, w) {
            self.x = start_x;
            self.cell(w, h, &line, CellStyle::default(), Move::Below);
        }
        self.x = self.setup.margin_left;
    }

    /// Break text into the lines [`Canvas::multi_cell`] would draw for a cell of
    /// width `w`, using the current font.
    ///
    /// Explicit newlines always break. Words wrap at spaces; a word wider than the
    /// cell is split between characters.
    pub fn split_lines(&self, text: &str, w: f32) -> Vec<String> {
        let w = if w <= 0.0 { self.right_edge() - self.x } else { w };
        let max_width = w - 2.0 * CELL_MARGIN;

        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
            self.wrap_paragraph(paragraph, max_width, &mut lines);
        }
        lines
    }

    fn wrap_paragraph(&self, paragraph: &str, max_width: f32, lines: &mut Vec<String>) {
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if self.text_width(&candidate) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut rest = word;
            while !rest.is_empty() && self.text_width(rest) > max_width {
                let split = self.fitting_prefix(rest, max_width);
                lines.push(rest[..split].to_string());
                rest = &rest[split..];
            }
            current = rest.to_string();
        }
        lines.push(current);
    }

    /// Byte length of the longest prefix that fits, but at least one character.
    fn fitting_prefix(&self, text: &str, max_width: f32) -> usize {
        let mut width = 0.0;
        let mut buf = [0u8; 4];
        for (index, c) in text.char_indices() {
            width += self.text_width(c.encode_utf8(&mut buf));
            if width > max_width {
                return if index == 0 { c.len_utf8() } else { index };
            }
        }
        text.len()
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: Paint) {
        self.push(Op::Rect {
            x,
            y,
            w,
            h,
            paint,
            fill: self.fill_colour,
            stroke: self.draw_colour,
            line_width: self.line_width,
        });
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.push(Op::Line {
            x1,
            y1,
            x2,
            y2,
            colour: self.draw_colour,
            line_width: self.line_width,
        });
    }

    /// Serialise every page into a complete PDF document.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut pdf = Pdf::new();
        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let tree_id = alloc.bump();
        let info_id = alloc.bump();
        let fonts = self.fonts.write(&mut pdf, &mut alloc, &self.text_by_face())?;

        let media_box = Rect::new(0.0, 0.0, self.setup.width * K, self.setup.height * K);
        let mut page_ids = Vec::with_capacity(self.pages.len());
        for ops in &self.pages {
            let page_id = alloc.bump();
            let content_id = alloc.bump();
            page_ids.push(page_id);

            let content = deflate(&self.page_content(ops))?;
            pdf.stream(content_id, &content)
                .filter(Filter::FlateDecode);

            let mut page = pdf.page(page_id);
            page.media_box(media_box)
                .parent(tree_id)
                .contents(content_id);
            let mut resources = page.resources();
            let mut font_dict = resources.fonts();
            for &(name, font_ref) in &fonts {
                font_dict.pair(Name(name), font_ref);
            }
        }

        pdf.pages(tree_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);
        pdf.catalog(catalog_id).pages(tree_id);

        let now = Local::now();
        let created = Date::new(now.year() as u16)
            .month(now.month() as u8)
            .day(now.day() as u8)
            .hour(now.hour() as u8)
            .minute(now.minute() as u8)
            .second(now.second() as u8);
        let mut info = pdf.document_info(info_id);
        if let Some(title) = &self.title {
            info.title(TextStr(title));
        }
        if let Some(author) = &self.author {
            info.author(TextStr(author));
        }
        info.creator(TextStr(env!("CARGO_PKG_NAME")));
        info.producer(TextStr(concat!(
            env!("CARGO_PKG_NAME"),
            " ",
            env!("CARGO_PKG_VERSION")
        )));
        info.creation_date(created);
        drop(info);

        out.write_all(&pdf.finish())
    }

    /// All text drawn with each face, for choosing the glyphs to describe.
    fn text_by_face(&self) -> BTreeMap<(Family, Style), String> {
        let mut used: BTreeMap<(Family, Style), String> = BTreeMap::new();
        for op in self.pages.iter().flatten() {
            if let Op::Text {
                family,
                style,
                text,
                ..
            } = op
            {
                used.entry((*family, *style)).or_default().push_str(text);
            }
        }
        used
    }

    fn page_content(&self, ops: &[Op]) -> Vec<u8> {
        let height = self.setup.height;
        let mut content = Content::new();
        for op in ops {
            match op {
                Op::Text {
                    x,
                    y,
                    family,
                    style,
                    size,
                    colour,
                    text,
                } => {
                    let (r, g, b) = colour.components();
                    let bytes = self.fonts.face(*family, *style).encode(text);
                    content.set_fill_rgb(r, g, b);
                    content.begin_text();
                    content.set_font(Name(FontSet::resource_name(*family, *style)), *size);
                    content.next_line(x * K, (height - y) * K);
                    content.show(Str(&bytes));
                    content.end_text();
                }
                Op::Rect {
                    x,
                    y,
                    w,
                    h,
                    paint,
                    fill,
                    stroke,
                    line_width,
                } => {
                    let (fr, fg, fb) = fill.components();
                    let (sr, sg, sb) = stroke.components();
                    content.set_line_width(line_width * K);
                    content.set_fill_rgb(fr, fg, fb);
                    content.set_stroke_rgb(sr, sg, sb);
                    content.rect(x * K, (height - y - h) * K, w * K, h * K);
                    match paint {
                        Paint::Fill => content.fill_nonzero(),
                        Paint::Stroke => content.stroke(),
                        Paint::FillStroke => content.fill_nonzero_and_stroke(),
                    };
                }
                Op::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    colour,
                    line_width,
                } => {
                    let (r, g, b) = colour.components();
                    content.set_line_width(line_width * K);
                    content.set_stroke_rgb(r, g, b);
                    content.move_to(x1 * K, (height - y1) * K);
                    content.line_to(x2 * K, (height - y2) * K);
                    content.stroke();
                }
            }
        }
        content.finish()
    }
}

/// Zlib-compress a stream for `FlateDecode`.
pub(crate) fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod test {
    use super::*;

    /// Courier at 10pt: every character is 6pt wide.
    fn mono_canvas() -> Canvas {
        let mut canvas = Canvas::new(PageSetup::default(), FontSet::builtin());
        canvas.set_font(Family::Mono, Style::Regular, 10.0);
        canvas
    }

    fn chars(n: usize) -> f32 {
        n as f32 * 6.0 / K + 2.0 * CELL_MARGIN + 0.01
    }

    fn texts(canvas: &Canvas, page: usize) -> Vec<&str> {
        canvas
            .ops(page)
            .iter()
            .filter_map(|op| match op {
                Op::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn can_wrap_words_within_width() {
        let canvas = mono_canvas();
        assert_eq!(
            canvas.split_lines("aaaa bbbb cccc", chars(10)),
            vec!["aaaa bbbb", "cccc"]
        );
    }

    #[test]
    fn honours_explicit_newlines() {
        let canvas = mono_canvas();
        assert_eq!(canvas.split_lines("a\nb\r\n\nc", 100.0), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn splits_long_words_between_characters() {
        let canvas = mono_canvas();
        assert_eq!(
            canvas.split_lines("abcdefghij", chars(4)),
            vec!["abcd", "efgh", "ij"]
        );
    }

    #[test]
    fn multi_cell_leaves_cursor_below_at_left_margin() {
        let mut canvas = mono_canvas();
        canvas.set_xy(30.0, 50.0);
        canvas.multi_cell(0.0, 6.0, "one\ntwo");
        assert_eq!(canvas.y(), 62.0);
        assert_eq!(canvas.x(), 10.0);
        assert_eq!(texts(&canvas, 0), vec!["one", "two"]);
    }

    #[test]
    fn cells_move_the_cursor() {
        let mut canvas = mono_canvas();
        canvas.cell(40.0, 7.0, "a", CellStyle::boxed(true), Move::Right);
        assert_eq!((canvas.x(), canvas.y()), (50.0, 10.0));
        canvas.cell(40.0, 7.0, "b", CellStyle::default(), Move::NextLine);
        assert_eq!((canvas.x(), canvas.y()), (10.0, 17.0));
        assert!(matches!(
            canvas.ops(0)[0],
            Op::Rect {
                paint: Paint::FillStroke,
                ..
            }
        ));
    }

    #[test]
    fn starts_a_new_page_past_the_trigger() {
        let mut canvas = mono_canvas();
        canvas.set_text_color(Colour::grey(100));
        canvas.set_y(275.0);
        canvas.cell(0.0, 6.0, "next page", CellStyle::default(), Move::NextLine);

        assert_eq!(canvas.page_count(), 2);
        assert!(canvas.ops(0).is_empty());
        assert_eq!(texts(&canvas, 1), vec!["next page"]);
        assert_eq!(canvas.y(), 16.0);
        match &canvas.ops(1)[0] {
            Op::Text { colour, family, .. } => {
                assert_eq!(*colour, Colour::grey(100));
                assert_eq!(*family, Family::Mono);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn never_breaks_at_the_top_of_a_page() {
        let setup = PageSetup {
            height: 30.0,
            ..PageSetup::default()
        };
        let mut canvas = Canvas::new(setup, FontSet::builtin());
        canvas.cell(0.0, 15.0, "tall", CellStyle::default(), Move::NextLine);
        assert_eq!(canvas.page_count(), 1);
    }

    #[test]
    fn can_write_pdf() {
        let mut canvas = mono_canvas();
        canvas.set_info(Some("Title".to_string()), None);
        canvas.multi_cell(0.0, 6.0, "Hello \u{2192} world");
        canvas.line(10.0, 30.0, 200.0, 30.0);
        canvas.add_page();
        canvas.rect(10.0, 10.0, 50.0, 20.0, Paint::Fill);

        let mut bytes = Vec::new();
        canvas.write_to(&mut bytes).expect("can write PDF");
        assert!(bytes.starts_with(b"%PDF-"));

        let text = String::from_utf8_lossy(&bytes);
        let pages = text.matches("/Type /Page").count() - text.matches("/Type /Pages").count();
        assert_eq!(pages, 2);
        assert!(text.contains("/BaseFont /Courier"));
        assert!(text.contains("/WinAnsiEncoding"));
        // faces that draw nothing are left out
        assert!(!text.contains("/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn embeds_truetype_faces_for_unicode_text() {
        let fonts = FontSet::load("DejaVuSans", "DejaVuSansMono").expect("can load bundled fonts");
        let mut canvas = Canvas::new(PageSetup::default(), fonts);
        canvas.multi_cell(0.0, 6.0, "Привет Ωμέγα");

        let mut bytes = Vec::new();
        canvas.write_to(&mut bytes).expect("can write PDF");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Identity-H"));
        assert!(text.contains("/CIDFontType2"));
        assert!(text.contains("/FontFile2"));
        // ToUnicode entries for П and Ω
        assert!(text.contains("> <041F>"));
        assert!(text.contains("> <03A9>"));
        assert_eq!(text.matches("/Subtype /Type0").count(), 1);
    }
}
