use super::canvas::deflate;
use crate::error::ConvertError;
use owned_ttf_parser::{Face as TrueTypeFace, GlyphId};
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Filter, Name, Pdf, Rect, Ref, Str};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Family {
    Sans,
    Mono,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Style {
    Regular,
    Bold,
}

/// Characters with a sensible ASCII rendering for faces that lack them.
const TRANSLITERATIONS: &[(char, &str)] = &[
    ('\t', "    "),
    ('\u{2192}', "->"),
    ('\u{2190}', "<-"),
    ('\u{2194}', "<->"),
    ('\u{21D2}', "=>"),
    ('\u{21D0}', "<="),
    ('\u{2264}', "<="),
    ('\u{2265}', ">="),
    ('\u{2260}', "!="),
    ('\u{2248}', "~"),
    ('\u{2212}', "-"),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2032}', "'"),
    ('\u{2033}', "\""),
    ('\u{2002}', " "),
    ('\u{2003}', " "),
    ('\u{2009}', " "),
    ('\u{200B}', ""),
    ('\u{221A}', "sqrt"),
    ('\u{221E}', "inf"),
    ('\u{25AA}', "-"),
    ('\u{25CF}', "*"),
    ('\u{25A0}', "#"),
    ('\u{25A1}', "[ ]"),
];

/// A single font face as it will appear in the PDF.
///
/// The standard fonts (Helvetica, Courier) are drawn with the single-byte WinAnsi
/// encoding and are never embedded. TrueType faces are embedded whole and drawn by
/// glyph id (`Identity-H`), so they can show any character the font covers.
pub struct Face {
    base_font: String,
    kind: FaceKind,
}

enum FaceKind {
    /// Widths for WinAnsi codes 32 through 255. Zero marks a missing glyph.
    Standard { widths: Vec<f32> },
    TrueType(Box<TrueType>),
}

struct TrueType {
    data: Vec<u8>,
    glyphs: HashMap<char, u16>,
    /// Advance of every glyph, in 1000ths of the font size.
    advances: Vec<f32>,
    bbox: Rect,
    ascent: f32,
    descent: f32,
    cap_height: f32,
    fixed_pitch: bool,
}

impl TrueType {
    fn glyph(&self, c: char) -> u16 {
        self.glyphs.get(&c).copied().unwrap_or(0)
    }

    fn advance(&self, glyph: u16) -> f32 {
        self.advances.get(glyph as usize).copied().unwrap_or(0.0)
    }
}

impl Face {
    fn standard(base_font: &str, widths: Vec<f32>) -> Face {
        Face {
            base_font: base_font.to_string(),
            kind: FaceKind::Standard { widths },
        }
    }

    fn truetype(data: Vec<u8>, name: &str) -> Result<Face, ConvertError> {
        let face = TrueTypeFace::parse(&data, 0).map_err(|e| ConvertError::Font {
            path: name.to_string(),
            detail: e.to_string(),
        })?;

        let units = face.units_per_em() as f32;
        let scale = |v: f32| v / units * 1000.0;
        let bb = face.global_bounding_box();
        let bbox = Rect::new(
            scale(bb.x_min as f32),
            scale(bb.y_min as f32),
            scale(bb.x_max as f32),
            scale(bb.y_max as f32),
        );

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|code| {
                    let glyph = subtable.glyph_index(code);
                    if let (Some(c), Some(glyph)) = (char::from_u32(code), glyph) {
                        glyphs.entry(c).or_insert(glyph.0);
                    }
                });
            }
        }
        let advances = (0..face.number_of_glyphs())
            .map(|glyph| {
                face.glyph_hor_advance(GlyphId(glyph))
                    .map(|adv| scale(adv as f32))
                    .unwrap_or(0.0)
            })
            .collect();

        let truetype = TrueType {
            glyphs,
            advances,
            bbox,
            ascent: scale(face.ascender() as f32),
            descent: scale(face.descender() as f32),
            cap_height: face
                .capital_height()
                .map(|h| scale(h as f32))
                .unwrap_or(700.0),
            fixed_pitch: face.is_monospaced(),
            data: Vec::new(),
        };

        let base_font: String = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Embedded".to_string())
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        debug!(font = %base_font, glyphs = truetype.glyphs.len(), "loaded TrueType font");

        Ok(Face {
            base_font,
            kind: FaceKind::TrueType(Box::new(TrueType { data, ..truetype })),
        })
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    /// Whether the face has a glyph for `c`.
    pub fn has_char(&self, c: char) -> bool {
        match &self.kind {
            FaceKind::Standard { widths } => char_to_winansi(c)
                .is_some_and(|code| code >= 32 && widths[(code - 32) as usize] > 0.0),
            FaceKind::TrueType(truetype) => truetype.glyphs.contains_key(&c),
        }
    }

    /// Replace characters the face can't draw.
    ///
    /// Missing characters are transliterated when possible and replaced with `?`
    /// otherwise.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c != '\t' && self.has_char(c) {
                out.push(c);
                continue;
            }
            match transliterate(c) {
                Some(replacement) => out.extend(
                    replacement
                        .chars()
                        .map(|r| if self.has_char(r) { r } else { '?' }),
                ),
                None => out.push('?'),
            }
        }
        out
    }

    /// Encode text as the bytes of a PDF string shown with this face: WinAnsi
    /// codes for the standard fonts, big-endian glyph ids for TrueType faces.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let text = self.substitute(text);
        match &self.kind {
            FaceKind::Standard { .. } => text
                .chars()
                .map(|c| char_to_winansi(c).unwrap_or(b'?'))
                .collect(),
            FaceKind::TrueType(truetype) => text
                .chars()
                .flat_map(|c| truetype.glyph(c).to_be_bytes())
                .collect(),
        }
    }

    /// Width of text in points at the given font size.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let text = self.substitute(text);
        let units: f32 = match &self.kind {
            FaceKind::Standard { widths } => text
                .chars()
                .filter_map(char_to_winansi)
                .map(|code| widths.get(code.wrapping_sub(32) as usize).copied().unwrap_or(0.0))
                .sum(),
            FaceKind::TrueType(truetype) => text
                .chars()
                .map(|c| truetype.advance(truetype.glyph(c)))
                .sum(),
        };
        units * size / 1000.0
    }

    /// Write the font objects, covering the glyphs needed to show `used`.
    fn write(&self, pdf: &mut Pdf, font_ref: Ref, alloc: &mut Ref, used: &str) -> io::Result<()> {
        let truetype = match &self.kind {
            FaceKind::Standard { .. } => {
                pdf.type1_font(font_ref)
                    .base_font(Name(self.base_font.as_bytes()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                return Ok(());
            }
            FaceKind::TrueType(truetype) => truetype,
        };

        let cid_ref = alloc.bump();
        let descriptor_ref = alloc.bump();
        let data_ref = alloc.bump();
        let cmap_ref = alloc.bump();

        let compressed = deflate(&truetype.data)?;
        pdf.stream(data_ref, &compressed)
            .filter(Filter::FlateDecode)
            .pair(Name(b"Length1"), truetype.data.len() as i32);

        let mut flags = FontFlags::SYMBOLIC;
        if truetype.fixed_pitch {
            flags |= FontFlags::FIXED_PITCH;
        }
        pdf.font_descriptor(descriptor_ref)
            .name(Name(self.base_font.as_bytes()))
            .flags(flags)
            .bbox(truetype.bbox)
            .italic_angle(0.0)
            .ascent(truetype.ascent)
            .descent(truetype.descent)
            .cap_height(truetype.cap_height)
            .stem_v(80.0)
            .font_file2(data_ref);

        let glyphs: BTreeMap<u16, char> = self
            .substitute(used)
            .chars()
            .map(|c| (truetype.glyph(c), c))
            .collect();

        let system_info = SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        };
        {
            let mut cid = pdf.cid_font(cid_ref);
            cid.subtype(CidFontType::Type2)
                .base_font(Name(self.base_font.as_bytes()))
                .system_info(system_info)
                .font_descriptor(descriptor_ref)
                .default_width(truetype.advance(0).round())
                .cid_to_gid_map_predefined(Name(b"Identity"));
            let mut widths = cid.widths();
            for &glyph in glyphs.keys() {
                widths.consecutive(glyph, [truetype.advance(glyph)]);
            }
        }

        let mut cmap = UnicodeCmap::new(Name(b"Custom"), system_info);
        for (&glyph, &c) in &glyphs {
            cmap.pair(glyph, c);
        }
        pdf.stream(cmap_ref, &cmap.finish());

        pdf.type0_font(font_ref)
            .base_font(Name(self.base_font.as_bytes()))
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_ref)
            .to_unicode(cmap_ref);
        Ok(())
    }
}

/// The four faces a document is drawn with.
pub struct FontSet {
    sans_regular: Face,
    sans_bold: Face,
    mono_regular: Face,
    mono_bold: Face,
}

impl FontSet {
    /// Helvetica and Courier, which every PDF reader provides.
    #[cfg(test)]
    pub fn builtin() -> FontSet {
        let (sans_regular, sans_bold) = standard_family("Helvetica");
        let (mono_regular, mono_bold) = standard_family("Courier");
        FontSet {
            sans_regular,
            sans_bold,
            mono_regular,
            mono_bold,
        }
    }

    /// Load fonts based on font name configuration.
    ///
    /// Supports:
    /// - "DejaVuSans" or "DejaVuSansMono" - bundled fonts with their bold variants
    /// - "Helvetica" or "Courier" - standard fonts with their bold variants
    /// - Path like "./fonts/NotoSans" - loads NotoSans-Regular.ttf (or
    ///   NotoSans.ttf) and NotoSans-Bold.ttf, falling back to regular for bold
    pub fn load(sans: &str, mono: &str) -> Result<FontSet, ConvertError> {
        let (sans_regular, sans_bold) = load_family(sans)?;
        let (mono_regular, mono_bold) = load_family(mono)?;
        debug!(
            sans = sans_regular.base_font(),
            mono = mono_regular.base_font(),
            "loaded fonts"
        );
        Ok(FontSet {
            sans_regular,
            sans_bold,
            mono_regular,
            mono_bold,
        })
    }

    pub fn face(&self, family: Family, style: Style) -> &Face {
        match (family, style) {
            (Family::Sans, Style::Regular) => &self.sans_regular,
            (Family::Sans, Style::Bold) => &self.sans_bold,
            (Family::Mono, Style::Regular) => &self.mono_regular,
            (Family::Mono, Style::Bold) => &self.mono_bold,
        }
    }

    /// Resource name a face is registered under on every page.
    pub fn resource_name(family: Family, style: Style) -> &'static [u8] {
        match (family, style) {
            (Family::Sans, Style::Regular) => b"F1",
            (Family::Sans, Style::Bold) => b"F2",
            (Family::Mono, Style::Regular) => b"F3",
            (Family::Mono, Style::Bold) => b"F4",
        }
    }

    /// Write the faces that show any text, returning their resource names and
    /// references. `used` holds all text drawn with each face.
    pub(crate) fn write(
        &self,
        pdf: &mut Pdf,
        alloc: &mut Ref,
        used: &BTreeMap<(Family, Style), String>,
    ) -> io::Result<Vec<(&'static [u8], Ref)>> {
        let mut refs = Vec::with_capacity(used.len());
        for (&(family, style), text) in used {
            let font_ref = alloc.bump();
            self.face(family, style).write(pdf, font_ref, alloc, text)?;
            refs.push((FontSet::resource_name(family, style), font_ref));
        }
        Ok(refs)
    }
}

fn standard_family(name: &str) -> (Face, Face) {
    match name {
        "Courier" => (
            Face::standard("Courier", courier_widths()),
            Face::standard("Courier-Bold", courier_widths()),
        ),
        _ => (
            Face::standard("Helvetica", helvetica_widths(false)),
            Face::standard("Helvetica-Bold", helvetica_widths(true)),
        ),
    }
}

fn bundled_family(name: &str) -> Result<(Face, Face), ConvertError> {
    let (regular, bold): (&[u8], &[u8]) = match name {
        "DejaVuSansMono" => (
            include_bytes!("../../../assets/fonts/DejaVuSansMono.ttf"),
            include_bytes!("../../../assets/fonts/DejaVuSansMono-Bold.ttf"),
        ),
        _ => (
            include_bytes!("../../../assets/fonts/DejaVuSans.ttf"),
            include_bytes!("../../../assets/fonts/DejaVuSans-Bold.ttf"),
        ),
    };
    Ok((
        Face::truetype(regular.to_vec(), &format!("{name}.ttf"))?,
        Face::truetype(bold.to_vec(), &format!("{name}-Bold.ttf"))?,
    ))
}

fn load_family(name: &str) -> Result<(Face, Face), ConvertError> {
    match name {
        "Helvetica" | "Courier" => Ok(standard_family(name)),
        "DejaVuSans" | "DejaVuSansMono" => bundled_family(name),
        _ => load_from_path(name),
    }
}

fn load_from_path(font_path: &str) -> Result<(Face, Face), ConvertError> {
    let base = PathBuf::from(font_path);

    let regular_path = find_font_file(&base, &["Regular", "regular", ""])?;
    let regular = read_face(&regular_path)?;

    // bold falls back to the regular file
    let bold_path = ["Bold", "bold"]
        .iter()
        .map(|suffix| PathBuf::from(format!("{}-{}.ttf", base.display(), suffix)))
        .find(|path| path.exists())
        .unwrap_or_else(|| {
            warn!(font = %base.display(), "no bold variant found, using regular");
            regular_path.clone()
        });
    let bold = read_face(&bold_path)?;

    Ok((regular, bold))
}

fn read_face(path: &Path) -> Result<Face, ConvertError> {
    let data = std::fs::read(path).map_err(|e| ConvertError::Font {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    Face::truetype(data, &path.display().to_string())
}

fn find_font_file(base: &Path, suffixes: &[&str]) -> Result<PathBuf, ConvertError> {
    // if base path already has .ttf extension, use it directly
    if base
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("ttf"))
    {
        if base.exists() {
            return Ok(base.to_path_buf());
        }
        return Err(ConvertError::Font {
            path: base.display().to_string(),
            detail: "file not found".to_string(),
        });
    }

    let candidates: Vec<PathBuf> = suffixes
        .iter()
        .map(|suffix| {
            if suffix.is_empty() {
                PathBuf::from(format!("{}.ttf", base.display()))
            } else {
                PathBuf::from(format!("{}-{}.ttf", base.display(), suffix))
            }
        })
        .collect();
    if let Some(path) = candidates.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let tried: Vec<String> = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    Err(ConvertError::Font {
        path: base.display().to_string(),
        detail: format!(
            "could not find font file, tried: {}. \
             Use \"DejaVuSans\" or \"DejaVuSansMono\" for the bundled fonts",
            tried.join(", ")
        ),
    })
}

fn transliterate(c: char) -> Option<&'static str> {
    TRANSLITERATIONS
        .iter()
        .find(|(glyph, _)| *glyph == c)
        .map(|(_, replacement)| *replacement)
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their code point.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

fn char_to_winansi(c: char) -> Option<u8> {
    match c as u32 {
        0x0020..=0x007E => Some(c as u8),
        0x00A0..=0x00FF => Some(c as u8),
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Helvetica widths at 1000 units/em for WinAnsi codes 32..=255.
///
/// ASCII comes from the standard font metrics; the upper half uses the width of
/// the closest ASCII shape.
fn helvetica_widths(bold: bool) -> Vec<f32> {
    const REGULAR: [u16; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
        556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
        722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722,
        667, 944, 667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556,
        556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500,
        500, 334, 260, 334, 584,
    ];
    const BOLD: [u16; 95] = [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
        556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722,
        722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722,
        667, 944, 667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611,
        611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556,
        500, 389, 280, 389, 584,
    ];
    let ascii = if bold { &BOLD } else { &REGULAR };

    (32u8..=255u8)
        .map(|code| match code {
            32..=126 => ascii[(code - 32) as usize] as f32,
            0x85 | 0x89 | 0x97 => 1000.0,
            0x95 => 350.0,
            0x91 | 0x92 | 0x82 if bold => 278.0,
            0x91 | 0x92 | 0x82 => 222.0,
            0x93 | 0x94 | 0x84 => ascii[(b'"' - 32) as usize] as f32,
            0x8B | 0x9B => 333.0,
            0xA0 => 278.0,
            0xB7 => 278.0,
            0xD7 => 584.0,
            _ => ascii[(b'a' - 32) as usize] as f32,
        })
        .collect()
}

/// Courier is monospaced: every glyph is 600 units wide.
fn courier_widths() -> Vec<f32> {
    vec![600.0; 224]
}
