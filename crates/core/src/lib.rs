//! mta_toc_core - Core library for table-of-contents extraction and tracking
//!
//! This crate scans rendered pages for section headings, builds the two-level
//! table of contents (major headings owning their minor headings), and tracks
//! which heading is active as visibility reports arrive from a viewport.
//!
//! # Features
//!
//! - **Resilient Scanning**: Uses Tree-sitter's HTML grammar, so malformed
//!   markup still yields its headings.
//! - **Outline Building**: A pure, single-pass builder that drops minor
//!   headings with no preceding major heading.
//! - **Active-Section Tracking**: Batched visibility updates select the
//!   earliest visible heading in document order.
//! - **Explicit Subscriptions**: Observation is released through a handle,
//!   on teardown or drop.
//! - **Multiple Output Formats**: JSON, YAML, ANSI, HTML and plain text.
//!
//! # Example
//!
//! ```rust,no_run
//! use mta_toc_core::{
//!     scan_headings, build_outline, ActiveSectionTracker, ObserverOptions, ScanConfig,
//!     ScrollObserver,
//! };
//!
//! let html = std::fs::read_to_string("post.html").unwrap();
//! let document = scan_headings(&html, &ScanConfig::default()).unwrap();
//! let outline = build_outline(&document.headings);
//! println!("{} sections", outline.len());
//!
//! let viewport = ScrollObserver::from_headings(&document.headings, 24.0, 800.0);
//! let options = ObserverOptions::default().resolved(|s| document.matches(s));
//! let mut tracker = ActiveSectionTracker::activate(&viewport, &document.headings, &options, |id| {
//!     println!("active: {id}");
//! });
//! viewport.scroll_to(1200.0);
//! tracker.teardown();
//! ```

pub mod config;
pub mod engine;
pub mod models;
pub mod observer;
pub mod outline;
pub mod output;
pub mod scan;
pub mod tracker;

// Re-exports for convenience
pub use config::{ConfigError, ObserverOptions, RootMargin, ScanConfig};
pub use engine::{outline_page, page_from_document, scan_page, EngineError, TocScanner};
pub use models::{
    HeadingLevel, HeadingNode, OutlineChild, OutlineEntry, PageOutline, ScanMetadata, ScanStats,
    SiteOutline,
};
pub use observer::{
    BatchCallback, ElementBox, ObservationRoot, ReplayObserver, ScrollObserver, Subscription,
    VisibilityChange, VisibilityObserver,
};
pub use outline::{build_outline, count_orphans, flatten_outline};
pub use output::{format_output, format_page, FormatError, OutputFormat};
pub use scan::{scan_headings, HeadingScanner, ScanError, ScannedDocument};
pub use tracker::{ActiveSectionTracker, TrackerState};
