//! The conversions mdtool offers, behind one interface.
//!
//! Each [`Converter`] reads its whole input, converts it, and writes the result to
//! the output in one go. What it learned along the way (page counts, titles, sizes)
//! comes back in a [`ConvertReport`] for the caller to show.

use crate::error::ConvertError;
use crate::sinks::pdf::PDF;
use crate::sources::web::{self, Web};
use crate::sources::{html, pdf};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use tracing::debug;

/// Input, output and options for one conversion.
pub struct ConvertRequest<'a> {
    pub input: &'a mut dyn Read,
    pub output: &'a mut dyn Write,
    /// Converter-specific options, such as `url` for web pages.
    pub options: BTreeMap<String, String>,
}

impl<'a> ConvertRequest<'a> {
    pub fn new(input: &'a mut dyn Read, output: &'a mut dyn Write) -> ConvertRequest<'a> {
        ConvertRequest {
            input,
            output,
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<String>) -> ConvertRequest<'a> {
        self.options.insert(key.to_string(), value.into());
        self
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, ConvertError> {
        let mut bytes = Vec::new();
        self.input
            .read_to_end(&mut bytes)
            .map_err(ConvertError::ReadInput)?;
        Ok(bytes)
    }

    fn read_string(&mut self) -> Result<String, ConvertError> {
        let mut text = String::new();
        self.input
            .read_to_string(&mut text)
            .map_err(ConvertError::ReadInput)?;
        Ok(text)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ConvertError> {
        self.output
            .write_all(bytes)
            .and_then(|_| self.output.flush())
            .map_err(ConvertError::WriteOutput)
    }
}

/// What a conversion produced, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    pub converter: &'static str,
    pub metadata: BTreeMap<String, String>,
}

impl ConvertReport {
    fn new(converter: &'static str) -> ConvertReport {
        let mut metadata = BTreeMap::new();
        metadata.insert("converter".to_string(), converter.to_string());
        ConvertReport {
            converter,
            metadata,
        }
    }

    fn with(mut self, key: &str, value: impl ToString) -> ConvertReport {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

pub trait Converter {
    fn name(&self) -> &'static str;
    /// Input and output format names.
    fn formats(&self) -> (&'static str, &'static str);
    fn convert(&self, request: ConvertRequest<'_>) -> Result<ConvertReport, ConvertError>;
}

pub struct HtmlToMarkdown;

impl Converter for HtmlToMarkdown {
    fn name(&self) -> &'static str {
        "html2md"
    }

    fn formats(&self) -> (&'static str, &'static str) {
        ("html", "markdown")
    }

    fn convert(&self, mut request: ConvertRequest<'_>) -> Result<ConvertReport, ConvertError> {
        let source = request.read_string()?;
        let markdown = html::to_markdown(&source);
        request.write(markdown.as_bytes())?;
        Ok(ConvertReport::new(self.name()).with("bytes", markdown.len()))
    }
}

pub struct PdfToMarkdown;

impl Converter for PdfToMarkdown {
    fn name(&self) -> &'static str {
        "pdf2md"
    }

    fn formats(&self) -> (&'static str, &'static str) {
        ("pdf", "markdown")
    }

    fn convert(&self, mut request: ConvertRequest<'_>) -> Result<ConvertReport, ConvertError> {
        let bytes = request.read_bytes()?;
        let extracted = pdf::page_texts(&bytes)?;
        let markdown = pdf::pages_to_markdown(&extracted.pages);
        request.write(markdown.as_bytes())?;
        Ok(ConvertReport::new(self.name())
            .with("pages", extracted.page_count)
            .with("bytes", markdown.len()))
    }
}

pub struct MarkdownToPdf {
    pub config: PDF,
}

impl Converter for MarkdownToPdf {
    fn name(&self) -> &'static str {
        "md2pdf"
    }

    fn formats(&self) -> (&'static str, &'static str) {
        ("markdown", "pdf")
    }

    fn convert(&self, mut request: ConvertRequest<'_>) -> Result<ConvertReport, ConvertError> {
        let bytes = request.read_bytes()?;
        let source = String::from_utf8_lossy(&bytes);
        debug!(bytes = bytes.len(), "read markdown");

        let (document, stats) = self.config.render(&source)?;
        request.write(&document)?;

        let mut report = ConvertReport::new(self.name())
            .with("pages", stats.page_count)
            .with("bytes", stats.bytes);
        if let Some(title) = &self.config.title {
            report = report.with("title", title);
        }
        Ok(report)
    }
}

pub struct WebToMarkdown {
    pub config: Web,
}

impl Converter for WebToMarkdown {
    fn name(&self) -> &'static str {
        "web2md"
    }

    fn formats(&self) -> (&'static str, &'static str) {
        ("url", "markdown")
    }

    fn convert(&self, mut request: ConvertRequest<'_>) -> Result<ConvertReport, ConvertError> {
        let url = web::validate_url(request.options.get("url").map(String::as_str))?;
        let page = self.config.fetch(&url)?;
        let article = web::extract_article(&page);
        let body = html::to_markdown(&article.content);
        let markdown = web::article_markdown(&article, url.as_str(), &body);
        request.write(markdown.as_bytes())?;

        let mut report = ConvertReport::new(self.name())
            .with("title", &article.title)
            .with("url", url.as_str());
        if let Some(byline) = &article.byline {
            report = report.with("byline", byline);
        }
        Ok(report)
    }
}
