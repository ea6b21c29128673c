//! epub2md - Convert EPUB ebooks to Markdown

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use epub2md::convert::DEFAULT_OUTPUT_DIR;
use epub2md::{ConvertOptions, Metadata, TocNode, convert_all, read_epub};

#[derive(Parser)]
#[command(name = "epub2md")]
#[command(version, about = "Convert EPUB ebooks to Markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub2md book.epub                  Write markdown_output/<Title>/<Title>.md
    epub2md -o notes a.epub b.epub     Convert several books into notes/
    epub2md --toc book.epub            Print metadata and table of contents as JSON")]
struct Cli {
    /// EPUB files to convert
    #[arg(value_name = "EPUB", required = true)]
    inputs: Vec<PathBuf>,

    /// Root directory for converted books
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Print each book's metadata and table of contents instead of converting
    #[arg(long)]
    toc: bool,

    /// Log per-chapter and per-image details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.toc {
        for path in &cli.inputs {
            if let Err(e) = show_toc(path) {
                error!(path = %path.display(), "{e}");
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Err(e) = fs::create_dir_all(&cli.output_dir) {
        error!(dir = %cli.output_dir.display(), "Cannot create output directory: {e}");
        return ExitCode::FAILURE;
    }
    let shown = cli
        .output_dir
        .canonicalize()
        .unwrap_or_else(|_| cli.output_dir.clone());
    info!(dir = %shown.display(), books = cli.inputs.len(), "Starting conversion");

    let options = ConvertOptions::new().with_output_dir(&cli.output_dir);
    let summary = convert_all(&cli.inputs, &options);

    for report in &summary.converted {
        println!("{} -> {}", report.title, report.markdown_path.display());
    }
    println!(
        "Converted {} of {} book(s), {} failed",
        summary.converted.len(),
        summary.total(),
        summary.failed.len()
    );

    ExitCode::SUCCESS
}

#[derive(Serialize)]
struct TocDump<'a> {
    path: &'a Path,
    metadata: &'a Metadata,
    toc: &'a [TocNode],
}

fn show_toc(path: &Path) -> Result<(), String> {
    let book = read_epub(path).map_err(|e| e.to_string())?;
    let dump = TocDump {
        path,
        metadata: &book.metadata,
        toc: &book.toc,
    };
    let json = serde_json::to_string_pretty(&dump).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
