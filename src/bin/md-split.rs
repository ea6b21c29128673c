//! md-split - Split a Markdown file into one file per heading

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use epub2md::{SplitOptions, split_file};

#[derive(Parser)]
#[command(name = "md-split")]
#[command(version, about = "Split a Markdown file at a heading level", long_about = None)]
#[command(after_help = "EXAMPLES:
    md-split Book.md                   One file per ## heading in Book_split_level_2/
    md-split -l 3 --relevel Book.md    Split at ###, each file starting at #")]
struct Cli {
    /// Markdown file to split
    #[arg(value_name = "MARKDOWN_FILE")]
    file: PathBuf,

    /// Heading level to split at (2 splits at "## ")
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=6))]
    level: u8,

    /// Re-level headings so each file starts at level 1
    #[arg(long)]
    relevel: bool,

    /// Drop each file's top heading and re-level the rest
    #[arg(long)]
    strip_top_heading: bool,

    /// Directory to create the split folder in
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_parent: PathBuf,

    /// Log every file written
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = SplitOptions::new()
        .with_level(usize::from(cli.level))
        .with_relevel(cli.relevel)
        .with_strip_top_heading(cli.strip_top_heading)
        .with_output_parent(cli.output_parent);

    match split_file(&cli.file, &options) {
        Ok(report) => {
            info!(
                files = report.files.len(),
                dir = %report.output_dir.display(),
                "Split complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(path = %cli.file.display(), "{e}");
            ExitCode::FAILURE
        }
    }
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
