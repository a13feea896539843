use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use cli::{Cli, Commands};
use config::Configuration;
use convert::{
    ConvertReport, ConvertRequest, Converter, HtmlToMarkdown, MarkdownToPdf, PdfToMarkdown,
    WebToMarkdown,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod convert;
mod error;
mod markdown;
mod sinks;
mod sources;

fn main() -> ExitCode {
    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", console::style("Error").red());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn try_main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let load_config = || Configuration::load(cli.config.as_deref());

    match cli.command {
        Commands::Config { force } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE));
            config::run(&path, force)?;
        }
        Commands::HtmlToMarkdown { input, output } => {
            let mut reader = open_input(input.as_deref())?;
            let mut writer = open_output(output.as_deref())?;
            let request = ConvertRequest::new(reader.as_mut(), writer.as_mut());
            let report = run_converter(&HtmlToMarkdown, request)?;
            if let Some(output) = &output {
                let input = input
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "stdin".to_string());
                report_success(&input, output, &report);
            }
        }
        Commands::WebToMarkdown { url, output } => {
            let config = load_config()?.web;
            let mut reader = io::empty();
            let mut writer = open_output(output.as_deref())?;
            let request =
                ConvertRequest::new(&mut reader, writer.as_mut()).with_option("url", url.as_str());
            let report = run_converter(&WebToMarkdown { config }, request)?;
            if let Some(output) = &output {
                report_success(&url, output, &report);
            }
        }
        Commands::PdfToMarkdown { input, output } => {
            let mut reader = open_input(Some(input.as_path()))?;
            let mut writer = open_output(output.as_deref())?;
            let request = ConvertRequest::new(reader.as_mut(), writer.as_mut());
            let report = run_converter(&PdfToMarkdown, request)?;
            if let Some(output) = &output {
                report_success(&input.display().to_string(), output, &report);
            }
        }
        Commands::MarkdownToPdf { input, output } => {
            let output =
                output.unwrap_or_else(|| PathBuf::from(format!("{}.pdf", input.display())));
            let config = load_config()?.pdf;
            let mut reader = open_input(Some(input.as_path()))?;
            let mut writer = open_output(Some(output.as_path()))?;
            let request = ConvertRequest::new(reader.as_mut(), writer.as_mut());
            let report = run_converter(&MarkdownToPdf { config }, request)?;
            report_success(&input.display().to_string(), &output, &report);
        }
    }

    Ok(())
}

/// Open a file for reading, or stdin when no path is given.
fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Create a file for writing, or stdout when no path is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn run_converter(converter: &dyn Converter, request: ConvertRequest<'_>) -> Result<ConvertReport> {
    let (from, to) = converter.formats();
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("can parse progress style"),
    );
    progress.set_message(format!("Converting {from} to {to}..."));
    progress.enable_steady_tick(Duration::from_millis(100));

    let result = converter.convert(request);
    progress.finish_and_clear();
    let report = result
        .with_context(|| format!("Failed to convert {from} to {to} ({})", converter.name()))?;
    debug!(converter = report.converter, "conversion finished");
    Ok(report)
}

fn report_success(input: &str, output: &Path, report: &ConvertReport) {
    eprintln!(
        "{} Successfully converted {} to {}",
        console::style("\u{2713}").green(),
        input,
        output.display()
    );
    if let Some(title) = report.get("title").filter(|title| !title.is_empty()) {
        eprintln!("  Title: {title}");
    }
    if let Some(byline) = report.get("byline") {
        eprintln!("  By:    {byline}");
    }
    if let Some(pages) = report.get("pages") {
        eprintln!("  Pages: {pages}");
    }
    if let Some(bytes) = report.get("bytes").and_then(|b| b.parse::<u64>().ok()) {
        let size = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
        eprintln!("  Size:  {size:.1}");
    }
}
