//! CLI binary for marksheet-parser.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ParseConfig`, runs the parse and writes CSV or JSON.
//!
//! Exit codes: `0` records written, `1` the file could not be processed,
//! `2` the file was readable but no records matched the semester template.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use marksheet_parser::{
    clean_text, extract_text, parse_pdf, parse_text_file, to_csv, write_atomic, GapSeparator,
    PageSelection, ParseConfig, ParseMode, ParseProgressCallback, ParseReport, ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXIT_NO_RECORDS: i32 = 2;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while the PDF opens, a page bar during text
/// extraction, then a spinner again while blocks are parsed.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
    /// Print one line per skipped block as it happens.
    log_skips: bool,
}

impl CliProgressCallback {
    fn new(log_skips: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
            log_skips,
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
        self.bar.reset_eta();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl ParseProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_extracted(&self, page_num: usize, _total_pages: usize, runs: usize) {
        self.bar.set_message(format!("page {page_num}: {runs} runs"));
        self.bar.inc(1);
    }

    fn on_parse_start(&self, blocks: usize) {
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Parsing");
        self.bar.set_message(format!("{blocks} blocks"));
    }

    fn on_block_skipped(&self, index: usize, reason: &str) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        if self.log_skips {
            self.bar.println(format!(
                "  {} block {:>4}  {}",
                yellow("–"),
                index,
                dim(reason)
            ));
        }
    }

    fn on_parse_complete(&self, records: usize, apparent_blocks: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::Relaxed);
        let mark = if records == 0 {
            red("✘")
        } else if skipped > 0 {
            cyan("⚠")
        } else {
            green("✔")
        };
        eprintln!(
            "{} {}/{} blocks parsed{}",
            mark,
            bold(&records.to_string()),
            apparent_blocks,
            if skipped > 0 {
                format!("  ({} skipped)", yellow(&skipped.to_string()))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Semester V gazette to stdout
  marksheet2csv --semester 5 gazette.pdf

  # Write a CSV file (atomic: temp file + rename)
  marksheet2csv -s III gazette.pdf -o sem3.csv

  # Identity and outcome only, first ten pages
  marksheet2csv -s VI --summary --pages 1-10 gazette.pdf

  # Download from a URL and emit JSON with skip reasons
  marksheet2csv -s II --json https://example.edu/results/fe-sem2.pdf

  # See what the grammar sees when nothing matches
  marksheet2csv -s IV --dump-text gazette.pdf | less

  # Re-parse text captured earlier with --dump-text
  marksheet2csv -s IV --text gazette.txt -o sem4.csv

SEMESTERS:
  I, II      pipe-separated subject columns
  III, IV    "Marks … Grade …" runs with optional SUBJECTS: legends
  V, VI      paper-code rows at fixed line offsets

EXIT CODES:
  0  records written
  1  the file could not be processed
  2  the file was readable but no records matched the template

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH        Path to the pdfium shared library
  MARKSHEET_SEMESTER     Default for --semester
  MARKSHEET_PASSWORD     Default for --password
  RUST_LOG               Overrides the log filter (e.g. marksheet_parser=debug)
"#;

#[derive(Parser, Debug)]
#[command(
    name = "marksheet2csv",
    version,
    about = "Extract student records from University of Mumbai result gazettes",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Gazette PDF: a local path or an http(s) URL. With --text, a text file.
    input: String,

    /// Semester template to apply: 1-6, I-VI or sem3.
    #[arg(short, long, env = "MARKSHEET_SEMESTER")]
    semester: String,

    /// Write output to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the full report as JSON instead of CSV.
    #[arg(long)]
    json: bool,

    /// Extract identity and outcome only.
    #[arg(long)]
    summary: bool,

    /// Pages to read: all, 5, 3-7 or 1,4,9.
    #[arg(long, default_value = "all")]
    pages: String,

    /// Password for encrypted PDFs.
    #[arg(long, env = "MARKSHEET_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Insert a tab instead of a space at horizontal gaps.
    #[arg(long)]
    tab_gaps: bool,

    /// Vertical tolerance for grouping runs into a line, in page units.
    #[arg(long)]
    line_tolerance: Option<f32>,

    /// Minimum horizontal gap that produces a separator, in page units.
    #[arg(long)]
    gap_threshold: Option<f32>,

    /// Treat INPUT as already-reflowed text (no pdfium needed).
    #[arg(long)]
    text: bool,

    /// Print the cleaned document text and exit.
    #[arg(long)]
    dump_text: bool,

    /// List every skipped block and its reason on stderr.
    #[arg(long)]
    report_skipped: bool,

    /// Abort the whole parse after this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Download timeout for URL inputs, in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    download_timeout: u64,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.dump_text;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    // Config errors surface here, before any file is opened.
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new(cli.report_skipped) as Arc<dyn ParseProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Dump-text mode ───────────────────────────────────────────────────
    if cli.dump_text {
        let raw = read_text(&cli, &config).await?;
        write_output(&cli, clean_text(&raw, &config)).await?;
        return Ok(());
    }

    // ── Parse ────────────────────────────────────────────────────────────
    let report = if cli.text {
        parse_text_file(&cli.input, &config)
            .await
            .with_context(|| format!("Could not process {}", cli.input))?
    } else {
        parse_pdf(&cli.input, &config)
            .await
            .with_context(|| format!("Could not process {}", cli.input))?
    };

    if cli.report_skipped && !show_progress {
        print_skipped(&report);
    }

    let rendered = if cli.json {
        serde_json::to_string_pretty(&report).context("Failed to serialise report")?
    } else {
        to_csv(&report).context("Failed to render CSV")?
    };
    write_output(&cli, rendered).await?;

    if !cli.quiet {
        if let Some(ref path) = cli.output {
            eprintln!(
                "{}  {}  →  {}",
                dim(&format!("{}ms", report_duration_ms(&report))),
                report.summary_line(),
                bold(&path.display().to_string())
            );
        } else if !show_progress {
            eprintln!("{}", report.summary_line());
        }
    }

    if report.is_empty() {
        std::process::exit(EXIT_NO_RECORDS);
    }
    Ok(())
}

/// Map CLI args to `ParseConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ParseConfig> {
    let pages: PageSelection = cli.pages.parse().context("Invalid --pages")?;

    let mut builder = ParseConfig::builder_for(&cli.semester)
        .context("Invalid --semester")?
        .mode(if cli.summary {
            ParseMode::Summary
        } else {
            ParseMode::Full
        })
        .pages(pages)
        .download_timeout_secs(cli.download_timeout);

    if cli.tab_gaps {
        builder = builder.gap_separator(GapSeparator::Tab);
    }
    if let Some(t) = cli.line_tolerance {
        builder = builder.line_tolerance(t);
    }
    if let Some(g) = cli.gap_threshold {
        builder = builder.gap_threshold(g);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.parse_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Document text before noise stripping: the file itself with `--text`,
/// otherwise the reflowed PDF text layer.
async fn read_text(cli: &Cli, config: &ParseConfig) -> Result<String> {
    if cli.text {
        tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read text from {}", cli.input))
    } else {
        extract_text(&cli.input, config)
            .await
            .with_context(|| format!("Could not process {}", cli.input))
    }
}

async fn write_output(cli: &Cli, mut body: String) -> Result<()> {
    if !body.ends_with('\n') {
        body.push('\n');
    }
    match cli.output {
        Some(ref path) => write_atomic(path, body.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(body.as_bytes())
                .context("Failed to write to stdout")
        }
    }
}

fn print_skipped(report: &ParseReport) {
    for block in &report.skipped {
        eprintln!(
            "  {} block {:>4}  seat {:<10}  {}",
            yellow("–"),
            block.index,
            block.seat_hint.as_deref().unwrap_or("?"),
            dim(&block.reason.to_string())
        );
    }
}

fn report_duration_ms(report: &ParseReport) -> u64 {
    report.stats.extraction_duration_ms + report.stats.parse_duration_ms
}
