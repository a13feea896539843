use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts an HTML file (or stdin) to Markdown
    #[clap(name = "html2md")]
    HtmlToMarkdown {
        /// HTML file to read, stdin when omitted
        input: Option<PathBuf>,
        /// Markdown file to write, stdout when omitted
        output: Option<PathBuf>,
    },
    /// Fetches a web page and converts its main content to Markdown
    #[clap(name = "web2md")]
    WebToMarkdown {
        /// http or https URL of the page
        url: String,
        /// Markdown file to write, stdout when omitted
        output: Option<PathBuf>,
    },
    /// Extracts the text of a PDF as Markdown, one section per page
    #[clap(name = "pdf2md")]
    PdfToMarkdown {
        input: PathBuf,
        /// Markdown file to write, stdout when omitted
        output: Option<PathBuf>,
    },
    /// Renders a Markdown file to PDF
    #[clap(name = "md2pdf")]
    MarkdownToPdf {
        input: PathBuf,
        /// PDF file to write, defaults to the input path with `.pdf` appended
        output: Option<PathBuf>,
    },
    /// Generates an mdtool.toml config file with the default settings
    Config {
        /// Overwrite an existing config file
        #[clap(long)]
        force: bool,
    },
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    /// Config file to use instead of ./mdtool.toml
    #[clap(long, global = true, env = "MDTOOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log more details (-v for info, -vv for debug); RUST_LOG overrides this
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}
