use thiserror::Error;

/// Everything that can go wrong while converting a document.
///
/// Rendering Markdown to PDF cannot fail on its own; errors come from the edges
/// (reading input, writing output, loading fonts, fetching pages, extracting text).
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read input")]
    ReadInput(#[source] std::io::Error),

    #[error("failed to write output")]
    WriteOutput(#[source] std::io::Error),

    #[error("failed to parse {format}: {detail}")]
    Parse { format: &'static str, detail: String },

    #[error("URL is required")]
    MissingUrl,

    #[error("invalid URL {url:?}: only http and https URLs are supported")]
    InvalidUrl { url: String },

    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("response exceeds the limit of {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("font {path}: {detail}")]
    Font { path: String, detail: String },
}
