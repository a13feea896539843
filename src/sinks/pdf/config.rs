use serde::{Deserialize, Serialize};
use std::fmt;

/// Paper sizes, in millimetres.
#[derive(Copy, Clone, PartialEq, Serialize, Deserialize, Debug)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Custom {
                width_mm,
                height_mm,
            } => write!(f, "{width_mm}x{height_mm}mm"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

impl PageSize {
    pub fn name(&self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::Letter => "Letter",
            PageSize::Legal => "Legal",
            PageSize::Custom { .. } => "Custom",
        }
    }

    /// Width and height in millimetres.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match *self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
            PageSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }
}

/// PDF output configuration.
///
/// The bottom margin doubles as the automatic page-break trigger: a cell that would
/// extend past `page height - margin_bottom_mm` starts a new page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PDF {
    #[serde(default = "default_page_size")]
    pub page_size: PageSize,
    #[serde(default = "default_margin")]
    pub margin_left_mm: f32,
    #[serde(default = "default_margin")]
    pub margin_top_mm: f32,
    #[serde(default = "default_margin")]
    pub margin_right_mm: f32,
    #[serde(default = "default_margin_bottom")]
    pub margin_bottom_mm: f32,
    /// "DejaVuSans" (bundled), "Helvetica" (standard, WinAnsi only) or a path
    /// prefix to TrueType files (`{prefix}-Regular.ttf`, ...)
    #[serde(default = "default_font_sans")]
    pub font_sans: String,
    /// "DejaVuSansMono", "Courier" or a path prefix, used for code blocks
    #[serde(default = "default_font_mono")]
    pub font_mono: String,
    /// Document title written to the PDF info dictionary
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

fn default_page_size() -> PageSize {
    PageSize::A4
}
fn default_margin() -> f32 {
    10.0
}
fn default_margin_bottom() -> f32 {
    20.0
}
fn default_font_sans() -> String {
    "DejaVuSans".to_string()
}
fn default_font_mono() -> String {
    "DejaVuSansMono".to_string()
}

impl Default for PDF {
    fn default() -> Self {
        PDF {
            page_size: default_page_size(),
            margin_left_mm: default_margin(),
            margin_top_mm: default_margin(),
            margin_right_mm: default_margin(),
            margin_bottom_mm: default_margin_bottom(),
            font_sans: default_font_sans(),
            font_mono: default_font_mono(),
            title: None,
            author: None,
        }
    }
}

/// Statistics from rendering a PDF, used for user feedback.
pub struct RenderStats {
    pub page_count: usize,
    pub bytes: usize,
}
