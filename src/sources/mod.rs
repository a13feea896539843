//! Readers that turn other formats into Markdown.

pub mod html;
pub mod pdf;
pub mod web;
