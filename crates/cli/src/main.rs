use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use legible_core::{OutputFormat, ParseOptions, Readability, check_availability};
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status when no readable content was found.
const EXIT_REJECTED: u8 = 2;

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Html,
    Text,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Html => OutputFormat::Html,
            Format::Text => OutputFormat::Text,
        }
    }
}

/// Extract the readable article from an HTML document
#[derive(Parser, Debug)]
#[command(name = "legible")]
#[command(version)]
#[command(about = "Extract the readable article from an HTML document", long_about = None)]
struct Args {
    /// HTML file, or "-" for stdin
    #[arg(value_name = "INPUT", required_unless_present = "completions")]
    input: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json, value_name = "FORMAT")]
    format: Format,

    /// Base URL used to resolve relative links
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Minimum character count of an accepted article
    #[arg(long, default_value = "500", value_name = "NUM")]
    char_threshold: usize,

    /// Number of top candidates to track
    #[arg(long, default_value = "5", value_name = "NUM")]
    nb_top_candidates: usize,

    /// Maximum number of elements to parse (0 = unlimited)
    #[arg(long, default_value = "0", value_name = "NUM")]
    max_elems: usize,

    /// Keep class attributes in the output
    #[arg(long)]
    keep_classes: bool,

    /// Ignore JSON-LD metadata
    #[arg(long)]
    disable_json_ld: bool,

    /// Strip scripts, event handlers and javascript: URLs before parsing
    #[arg(long)]
    sanitize: bool,

    /// Only check whether the document is worth extracting
    #[arg(long)]
    check: bool,

    /// Print progress and debug logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

impl Args {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions::builder()
            .debug(self.verbose)
            .char_threshold(self.char_threshold)
            .nb_top_candidates(self.nb_top_candidates)
            .max_elems_to_parse(self.max_elems)
            .keep_classes(self.keep_classes)
            .disable_json_ld(self.disable_json_ld)
            .sanitize(self.sanitize)
            .build()
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "legible=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read file: {}", input))
    }
}

fn write_output(output: Option<&PathBuf>, mut content: String, verbose: bool) -> anyhow::Result<()> {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            if verbose {
                echo::print_success(&format!("Output written to {}", path.display().bright_white()));
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let Some(input) = args.input.as_deref() else {
        return Ok(ExitCode::SUCCESS);
    };
    let total = if args.check { 2 } else { 3 };

    if args.verbose {
        echo::print_banner();
        echo::print_step(1, total, &format!("Reading {}", if input == "-" { "stdin" } else { input }));
    }
    let started = Instant::now();
    let html = read_input(input)?;
    if args.verbose {
        eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(html.len()).bright_white());
    }

    if args.check {
        let availability = check_availability(html.as_str());
        if args.verbose {
            echo::print_step(2, total, "Checking reader availability");
            echo::print_timing("Check", started.elapsed());
        }
        write_output(args.output.as_ref(), availability.to_string(), args.verbose)?;
        return Ok(ExitCode::SUCCESS);
    }

    let options = args.parse_options();
    debug!(target: "legible", ?options, "parse options");
    if args.verbose {
        echo::print_step(2, total, "Extracting article");
    }

    let article = Readability::with_options(options)
        .parse(html.as_str(), args.base_url.as_deref())
        .context("Failed to extract article")?;
    let Some(article) = article else {
        echo::print_error("No readable content found");
        return Ok(ExitCode::from(EXIT_REJECTED));
    };

    if args.verbose {
        echo::print_timing("Extraction", started.elapsed());
        echo::print_article_details(&article);
        echo::print_step(3, total, &format!("Writing {:?}", args.format));
    }

    let output = article
        .to_format(args.format.into())
        .context("Failed to serialize article")?;
    write_output(args.output.as_ref(), output, args.verbose)?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "legible", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            echo::print_error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
