//! Web page fetching and main-content extraction.
//!
//! Pages are fetched with a blocking HTTP client, bounded by a timeout and a
//! maximum body size. The article is then picked out of the page the way reader
//! modes do it: prefer the markup's own hints (`<article>`, `<main>`,
//! `role="main"`), otherwise take the block holding the most paragraph text.

use crate::error::ConvertError;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP settings for fetching pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Web {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Responses of this size or larger are rejected
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_response_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl Default for Web {
    fn default() -> Self {
        Web {
            timeout_secs: default_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

/// The readable part of a web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub byline: Option<String>,
    /// HTML of the main content element.
    pub content: String,
}

/// Check that a URL is present and uses http or https.
pub fn validate_url(url: Option<&str>) -> Result<Url, ConvertError> {
    let url = url.map(str::trim).filter(|url| !url.is_empty());
    let Some(url) = url else {
        return Err(ConvertError::MissingUrl);
    };
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed),
        _ => Err(ConvertError::InvalidUrl {
            url: url.to_string(),
        }),
    }
}

impl Web {
    /// Fetch a page body as text.
    pub fn fetch(&self, url: &Url) -> Result<String, ConvertError> {
        let fetch_error = |source| ConvertError::Fetch {
            url: url.to_string(),
            source,
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(fetch_error)?;

        info!(%url, "fetching page");
        let response = client.get(url.clone()).send().map_err(fetch_error)?;
        if response.status() != StatusCode::OK {
            return Err(ConvertError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut body = Vec::new();
        response
            .take(self.max_response_bytes)
            .read_to_end(&mut body)
            .map_err(ConvertError::ReadInput)?;
        check_size(body.len(), self.max_response_bytes)?;
        debug!(bytes = body.len(), "received page");

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// A body that filled the whole read limit may have been cut short.
fn check_size(len: usize, limit: u64) -> Result<(), ConvertError> {
    if len as u64 >= limit {
        return Err(ConvertError::ResponseTooLarge { limit });
    }
    Ok(())
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("can parse static selector")
}

fn first_element<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    document.select(&selector(css)).next()
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    first_element(document, css)
        .and_then(|meta| meta.attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// Pick the title, byline and main content out of a page.
pub fn extract_article(html: &str) -> Article {
    let document = Html::parse_document(html);

    let title = meta_content(&document, "meta[property=\"og:title\"]")
        .or_else(|| first_element(&document, "title").and_then(element_text))
        .or_else(|| first_element(&document, "h1").and_then(element_text))
        .unwrap_or_default();

    let byline = meta_content(&document, "meta[name=\"author\"]").or_else(|| {
        first_element(&document, "[rel=\"author\"], .byline, .author").and_then(element_text)
    });

    let content = ["article", "main", "[role=\"main\"]"]
        .iter()
        .find_map(|css| first_element(&document, css))
        .or_else(|| densest_block(&document))
        .or_else(|| first_element(&document, "body"))
        .map(|element| element.inner_html())
        .unwrap_or_else(|| html.to_string());

    Article {
        title,
        byline,
        content,
    }
}

/// The block whose direct paragraph children hold the most text.
fn densest_block(document: &Html) -> Option<ElementRef<'_>> {
    document
        .select(&selector("div, section, td"))
        .map(|element| (paragraph_text_len(element), element))
        .filter(|(len, _)| *len > 0)
        .max_by_key(|(len, _)| *len)
        .map(|(_, element)| element)
}

fn paragraph_text_len(element: ElementRef<'_>) -> usize {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "p")
        .map(|p| p.text().map(str::len).sum::<usize>())
        .sum()
}

/// Prefix converted article Markdown with its title, byline and source.
pub fn article_markdown(article: &Article, url: &str, body: &str) -> String {
    let title = if article.title.is_empty() {
        url
    } else {
        article.title.as_str()
    };
    let mut out = format!("# {title}\n\n");
    if let Some(byline) = &article.byline {
        out.push_str(&format!("*By {byline}*\n\n"));
    }
    out.push_str(&format!("*Source: [{url}]({url})*\n\n---\n\n"));
    out.push_str(body);
    out
}
