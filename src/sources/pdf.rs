use crate::error::ConvertError;
use pdf_extract::{output_doc_page, Document, PlainTextOutput};
use tracing::{debug, warn};

/// Text of a single PDF page, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Text extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Pages in the document, including any that were skipped.
    pub page_count: usize,
    pub pages: Vec<PageText>,
}

/// Extract the plain text of every page.
///
/// A document that can't be opened is an error; a page whose content can't be
/// interpreted is skipped.
pub fn page_texts(bytes: &[u8]) -> Result<ExtractedText, ConvertError> {
    let doc = Document::load_mem(bytes).map_err(|e| ConvertError::Parse {
        format: "PDF",
        detail: e.to_string(),
    })?;

    let page_numbers = doc.get_pages();
    let mut pages = Vec::new();
    for &number in page_numbers.keys() {
        let mut text = String::new();
        let result = {
            let mut output = PlainTextOutput::new(&mut text);
            output_doc_page(&doc, &mut output, number)
        };
        match result {
            Ok(()) => pages.push(PageText { number, text }),
            Err(e) => warn!(page = number, "skipping page: {e}"),
        }
    }
    debug!(
        pages = pages.len(),
        total = page_numbers.len(),
        "extracted PDF text"
    );
    Ok(ExtractedText {
        page_count: page_numbers.len(),
        pages,
    })
}

/// Lay out page texts as Markdown: a `## Page N` heading per page and a rule
/// between pages.
pub fn pages_to_markdown(pages: &[PageText]) -> String {
    let mut out = String::new();
    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            out.push_str("\n\n---\n\n");
        }
        out.push_str(&format!("## Page {}\n\n{}\n", page.number, page.text));
    }
    out
}
