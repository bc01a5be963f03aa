//! mta-toc CLI
//!
//! Table-of-contents outlines for rendered pages, plus replay and scroll
//! simulation of the active-section tracker.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mta_toc_core::{
    format_output, format_page, page_from_document, scan_headings, scan_page, ActiveSectionTracker,
    ObserverOptions, OutputFormat, PageOutline, ReplayObserver, RootMargin, ScanConfig,
    ScrollObserver, TocScanner,
};
use serde_json::json;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Table-of-contents extraction and active-section simulation
#[derive(Parser)]
#[command(name = "mta-toc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Table-of-contents outlines and active-section tracking for rendered pages")]
#[command(long_about = r#"
mta-toc: Table of Contents for Rendered Pages

Scans rendered HTML pages for section headings inside the content container
and builds a two-level table of contents: every major heading (h2) owns the
minor headings (h3) that follow it. Minor headings that appear before any
major heading are dropped. Uses Tree-sitter, so malformed markup still yields
its headings.

The active-section tracker can be driven from recorded visibility batches
(track) or from a simulated scroll through the page (scroll).

Output formats:
  - JSON (default) - Structured JSON for programmatic use
  - YAML - Human-readable YAML format
  - ANSI - Colorful terminal output
  - HTML - <nav> markup with nested lists
  - Summary - Plain text

Examples:
  mta-toc site/                                  # Scan every page under site/
  mta-toc --format ansi                          # Colorful terminal output
  mta-toc page post.html --active two-pointers   # Page ToC with highlighted row
  mta-toc track post.html --events batches.json  # Replay recorded batches
  mta-toc scroll post.html --positions 0,400,800 # Simulate scrolling
"#)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to scan (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json, global = true)]
    pub format: OutputFormatArg,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Content container tag; headings outside it are ignored
    #[arg(long, default_value = "main", global = true)]
    pub content: String,

    /// Scan the whole document instead of the content container
    #[arg(long, global = true)]
    pub no_content: bool,

    /// Tag of major headings
    #[arg(long, default_value = "h2", global = true)]
    pub major: String,

    /// Tag of minor headings
    #[arg(long, default_value = "h3", global = true)]
    pub minor: String,

    /// Generate ids for headings that have none instead of skipping them
    #[arg(long, global = true)]
    pub assign_ids: bool,

    /// Ignore patterns (can be specified multiple times)
    #[arg(long, action = clap::ArgAction::Append, global = true)]
    pub ignore: Vec<String>,

    /// Number of threads for parallel processing (default: auto)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory of rendered pages
    Scan {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Table of contents for a single page
    Page {
        /// Path to page
        path: PathBuf,

        /// Heading id to highlight
        #[arg(long)]
        active: Option<String>,
    },

    /// Replay recorded visibility batches through the tracker
    Track {
        /// Path to page
        path: PathBuf,

        /// JSON array of batches, each an array of {"id", "is_visible"}
        #[arg(short, long)]
        events: PathBuf,
    },

    /// Simulate scrolling through a page
    Scroll {
        /// Path to page
        path: PathBuf,

        /// Scroll positions in pixels, comma separated
        #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        positions: Vec<f64>,

        /// Height of the visible window in pixels
        #[arg(long, default_value_t = 800.0)]
        viewport_height: f64,

        /// Pixels per source line when laying out headings
        #[arg(long, default_value_t = 24.0)]
        line_height: f64,

        /// Margin around the root, CSS shorthand in px
        #[arg(long, default_value = "500px")]
        root_margin: String,

        /// Selector of the observation root; falls back to the viewport
        #[arg(long, default_value = "iframe")]
        root: String,
    },
}

/// Output format argument
#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Ansi,
    Html,
    Summary,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Ansi => OutputFormat::Ansi,
            OutputFormatArg::Html => OutputFormat::Html,
            OutputFormatArg::Summary => OutputFormat::Summary,
        }
    }
}

/// One step of a simulated session
struct Step {
    /// Scroll position, for scroll sessions
    position: Option<f64>,
    /// Id published to the listener during this step
    published: Option<String>,
    active: Option<String>,
    visible: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match &args.command {
        Some(Commands::Scan { path }) => run_scan(path, &args),
        Some(Commands::Page { path, active }) => run_page(path, active.as_deref(), &args),
        Some(Commands::Track { path, events }) => run_track(path, events, &args),
        Some(Commands::Scroll {
            path,
            positions,
            viewport_height,
            line_height,
            root_margin,
            root,
        }) => {
            let margin = RootMargin::parse(root_margin).context("Invalid --root-margin")?;
            let options = ObserverOptions::default()
                .with_root(Some(root.clone()))
                .with_root_margin(margin);
            run_scroll(path, positions, *viewport_height, *line_height, options, &args)
        }
        None => run_scan(&args.path, &args),
    }
}

/// Log to stderr; RUST_LOG overrides the level chosen by --verbose
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build common configuration from args
fn build_config(path: &Path, args: &Args) -> ScanConfig {
    let content = if args.no_content {
        None
    } else {
        Some(args.content.clone())
    };

    let mut config = ScanConfig::new(path.to_path_buf())
        .with_content_tag(content)
        .with_heading_tags(&args.major, &args.minor)
        .with_assign_missing_ids(args.assign_ids)
        .with_ignore_patterns(args.ignore.clone());

    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    config
}

fn spinner(args: &Args, message: &'static str) -> Option<ProgressBar> {
    if !(args.verbose && atty::is(atty::Stream::Stderr)) {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Some(pb)
}

fn run_scan(path: &Path, args: &Args) -> Result<()> {
    let config = build_config(path, args);

    let spinner = spinner(args, "Scanning site...");

    let scanner = TocScanner::new(config).context("Failed to create scanner")?;
    let result = scanner.scan().context("Failed to scan directory")?;

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Scanned {} pages in {}ms",
            result.stats.total_pages, result.metadata.scan_duration_ms
        ));
    }

    let output = format_output(&result, args.format.clone().into())?;
    write_output(&output, args.output.as_deref())
}

fn run_page(path: &Path, active: Option<&str>, args: &Args) -> Result<()> {
    let config = build_config(path, args);
    let page = scan_page(path, &config)
        .with_context(|| format!("Failed to scan page {}", path.display()))?;

    if let Some(id) = active {
        if !page.headings.iter().any(|h| h.id == id) {
            tracing::warn!(id, "Active id is not a heading on this page");
        }
    }

    let output = format_page(&page, args.format.clone().into(), active)?;
    write_output(&output, args.output.as_deref())
}

fn run_track(path: &Path, events: &Path, args: &Args) -> Result<()> {
    let config = build_config(path, args);
    let page = scan_page(path, &config)
        .with_context(|| format!("Failed to scan page {}", path.display()))?;

    let recorded = fs::read_to_string(events)
        .with_context(|| format!("Failed to read events {}", events.display()))?;
    let observer = ReplayObserver::from_json(&recorded).context("Failed to parse events")?;

    let (published, listener) = recorder();
    let mut tracker = ActiveSectionTracker::activate(
        &observer,
        &page.headings,
        &ObserverOptions::default(),
        listener,
    );

    let mut steps = Vec::new();
    loop {
        let before = published.borrow().len();
        if !observer.step() {
            break;
        }
        steps.push(Step {
            position: None,
            published: published.borrow().get(before).cloned(),
            active: tracker.active_id(),
            visible: tracker.visible_ids(),
        });
    }
    tracker.teardown();

    let output = format_session(&page, &steps, args.format.clone().into())?;
    write_output(&output, args.output.as_deref())
}

fn run_scroll(
    path: &Path,
    positions: &[f64],
    viewport_height: f64,
    line_height: f64,
    options: ObserverOptions,
    args: &Args,
) -> Result<()> {
    let config = build_config(path, args);
    let (page, options) = load_scroll_page(path, &config, &options)?;

    let viewport = ScrollObserver::from_headings(&page.headings, line_height, viewport_height);
    tracing::debug!(
        document_height = viewport.document_height(),
        viewport_height,
        "Laid out page"
    );

    let (published, listener) = recorder();
    let mut tracker =
        ActiveSectionTracker::activate(&viewport, &page.headings, &options, listener);

    let steps: Vec<Step> = positions
        .iter()
        .map(|&top| {
            let before = published.borrow().len();
            viewport.scroll_to(top);
            Step {
                position: Some(viewport.scroll_top()),
                published: published.borrow().get(before).cloned(),
                active: tracker.active_id(),
                visible: tracker.visible_ids(),
            }
        })
        .collect();
    tracker.teardown();

    let output = format_session(&page, &steps, args.format.clone().into())?;
    write_output(&output, args.output.as_deref())
}

/// Scan a page once, resolving the observation root against its elements
fn load_scroll_page(
    path: &Path,
    config: &ScanConfig,
    options: &ObserverOptions,
) -> Result<(PageOutline, ObserverOptions)> {
    config.validate().context("Invalid heading configuration")?;

    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read page {}", path.display()))?;
    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let document = scan_headings(&source, config).context("Failed to scan page")?;
    let options = options.resolved(|s| document.matches(s));
    Ok((page_from_document(document, path, absolute), options))
}

/// Listener that records every published id
fn recorder() -> (Rc<RefCell<Vec<String>>>, impl FnMut(&str) + 'static) {
    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&published);
    (published, move |id: &str| sink.borrow_mut().push(id.to_string()))
}

fn format_session(page: &PageOutline, steps: &[Step], format: OutputFormat) -> Result<String> {
    let last_active = steps.last().and_then(|s| s.active.as_deref());

    let value = json!({
        "path": page.path,
        "steps": steps
            .iter()
            .enumerate()
            .map(|(i, step)| json!({
                "step": i + 1,
                "position": step.position,
                "published": step.published,
                "active_id": step.active,
                "visible": step.visible,
            }))
            .collect::<Vec<_>>(),
    });

    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&value)?,
        OutputFormat::Html => format_page(page, OutputFormat::Html, last_active)?,
        OutputFormat::Ansi => format!(
            "{}\n{}",
            format_steps(steps),
            format_page(page, OutputFormat::Ansi, last_active)?
        ),
        OutputFormat::Summary => format_steps(steps),
    };

    Ok(output)
}

fn format_steps(steps: &[Step]) -> String {
    let mut output = String::new();

    for (i, step) in steps.iter().enumerate() {
        let input = match step.position {
            Some(top) => format!("scroll {top}px"),
            None => format!("batch {}", i + 1),
        };
        let marker = if step.published.is_some() { "->" } else { "  " };
        output.push_str(&format!(
            "{:>4}  {:<16} {} {}  [{}]\n",
            i + 1,
            input,
            marker,
            step.active.as_deref().unwrap_or("-"),
            step.visible.join(", ")
        ));
    }

    output
}

fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, output).context("Failed to write output file")?;
    } else {
        println!("{}", output);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: &str = "<iframe></iframe>\n<main>\n<h3 id=\"pre\">Pre</h3>\n<h2 id=\"a\">A</h2>\n</main>\n";

    fn write_page(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("post.html");
        fs::write(&path, PAGE).unwrap();
        path
    }

    #[test]
    fn test_identical_heading_flags_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_page(&dir);
        let args = Args::parse_from([
            "mta-toc", "--major", "h2", "--minor", "h2", "scroll", "post.html", "--positions", "0",
        ]);
        let config = build_config(&path, &args);

        let result = load_scroll_page(&path, &config, &ObserverOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_scroll_page_scanned_once_with_resolved_root() {
        let dir = TempDir::new().unwrap();
        let path = write_page(&dir);
        let args = Args::parse_from(["mta-toc", "scroll", "post.html", "--positions", "0,400"]);
        let config = build_config(&path, &args);

        let (page, options) = load_scroll_page(&path, &config, &ObserverOptions::default()).unwrap();
        assert_eq!(page.headings.len(), 2);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.orphans_dropped, 1);
        assert_eq!(options.root.as_deref(), Some("iframe"));

        let missing = ObserverOptions::default().with_root(Some("aside".to_string()));
        let (_, options) = load_scroll_page(&path, &config, &missing).unwrap();
        assert!(options.root.is_none());
    }
}
