//! Site scanning engine
//!
//! This module walks a site directory, scans every rendered page for
//! headings, and builds each page's table of contents.

use crate::config::{IgnoreFilter, ScanConfig};
use crate::models::{PageOutline, ScanMetadata, ScanStats, SiteOutline};
use crate::outline::{build_outline, count_orphans};
use crate::scan::{HeadingScanner, ScanError, ScannedDocument};
use rayon::prelude::*;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Scan error: {0}")]
    ScanError(#[from] ScanError),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

thread_local! {
    // tree-sitter parsers are reused per worker thread
    static SCANNER: RefCell<Option<HeadingScanner>> = const { RefCell::new(None) };
}

/// Build a page outline from already-read source
pub fn outline_page(
    source: &str,
    path: &Path,
    absolute_path: PathBuf,
    config: &ScanConfig,
) -> Result<PageOutline, ScanError> {
    let document = SCANNER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(HeadingScanner::new()?);
        }
        match slot.as_mut() {
            Some(scanner) => scanner.scan(source, config),
            None => Err(ScanError::InitError("scanner unavailable".to_string())),
        }
    })?;

    Ok(page_from_document(document, path, absolute_path))
}

/// Build a page outline from an already-scanned document
pub fn page_from_document(
    document: ScannedDocument,
    path: &Path,
    absolute_path: PathBuf,
) -> PageOutline {
    let entries = build_outline(&document.headings);
    let orphans_dropped = count_orphans(&document.headings);
    if orphans_dropped > 0 {
        tracing::debug!(
            path = %path.display(),
            orphans = orphans_dropped,
            "Dropped minor headings without a preceding major heading"
        );
    }

    PageOutline {
        path: path.to_path_buf(),
        absolute_path,
        total_lines: document.total_lines,
        headings: document.headings,
        entries,
        orphans_dropped,
        headings_without_id: document.headings_without_id,
    }
}

/// Main site scanner
pub struct TocScanner {
    config: ScanConfig,
    ignore_filter: IgnoreFilter,
}

impl TocScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let ignore_filter = IgnoreFilter::new(&config)?;
        Ok(Self {
            config,
            ignore_filter,
        })
    }

    /// Scan the configured directory and return every page's outline
    pub fn scan(&self) -> Result<SiteOutline, EngineError> {
        let start = Instant::now();

        let page_files = self.find_pages()?;
        tracing::debug!(pages = page_files.len(), root = %self.config.root.display(), "Found pages");

        let mut pages: Vec<PageOutline> = if self.config.threads == 1 {
            page_files
                .iter()
                .filter_map(|path| self.scan_one(path))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .map_err(|e| EngineError::ThreadPoolError(e.to_string()))?;

            pool.install(|| {
                page_files
                    .par_iter()
                    .filter_map(|path| self.scan_one(path))
                    .collect()
            })
        };
        pages.sort_by(|a, b| a.path.cmp(&b.path));

        let stats = ScanStats::from_pages(&pages);

        let duration = start.elapsed();
        let page_count = pages.len();
        let metadata = ScanMetadata {
            scan_duration_ms: duration.as_millis() as u64,
            pages_per_second: if duration.as_secs_f64() > 0.0 {
                page_count as f64 / duration.as_secs_f64()
            } else {
                page_count as f64
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(SiteOutline {
            root: self.config.root.clone(),
            pages,
            stats,
            metadata,
        })
    }

    /// Find all pages matching the configuration
    fn find_pages(&self) -> Result<Vec<PathBuf>, EngineError> {
        let mut pages = Vec::new();

        let walker = WalkDir::new(&self.config.root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_entry(|e| {
                // The root itself is never filtered out
                if e.depth() > 0 && e.file_type().is_dir() {
                    return !self.ignore_filter.should_ignore(e.path(), true);
                }
                true
            });

        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            if self.ignore_filter.should_ignore(path, false) || !self.ignore_filter.is_page(path) {
                continue;
            }

            if let Ok(metadata) = entry.metadata() {
                if metadata.len() as usize > self.config.max_file_size {
                    tracing::debug!(path = %path.display(), size = metadata.len(), "Skipping oversized page");
                    continue;
                }
            }

            pages.push(path.to_path_buf());
        }

        Ok(pages)
    }

    /// Scan one page, logging and skipping unreadable ones
    fn scan_one(&self, path: &Path) -> Option<PageOutline> {
        let source = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable page");
                return None;
            }
        };

        let absolute_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let relative_path = path.strip_prefix(&self.config.root).unwrap_or(path);

        match outline_page(&source, relative_path, absolute_path, &self.config) {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to scan page");
                None
            }
        }
    }
}

/// Scan a single page and return its outline
pub fn scan_page(path: &Path, config: &ScanConfig) -> Result<PageOutline, EngineError> {
    config.validate()?;
    let source = fs::read_to_string(path)?;
    let absolute_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    Ok(outline_page(&source, path, absolute_path, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const POST: &str = r#"<html><body>
<main>
  <h3 id="preface">Preface</h3>
  <h2 id="intro">Introduction</h2>
  <h3 id="idea">Idea</h3>
  <h2 id="problems">Problems</h2>
</main>
</body></html>
"#;

    fn create_test_site() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();

        let mut post = fs::File::create(root.join("post.html")).unwrap();
        write!(post, "{POST}").unwrap();

        fs::create_dir(root.join("blog")).unwrap();
        fs::write(
            root.join("blog").join("other.htm"),
            "<main><h2 id=\"only\">Only</h2></main>",
        )
        .unwrap();

        fs::write(root.join("notes.txt"), "<h2 id=\"x\">not a page</h2>").unwrap();

        fs::create_dir(root.join("node_modules")).unwrap();
        fs::write(
            root.join("node_modules").join("dep.html"),
            "<main><h2 id=\"dep\">Dep</h2></main>",
        )
        .unwrap();

        (dir, root)
    }

    #[test]
    fn test_scan_site() {
        let (_dir, root) = create_test_site();
        let scanner = TocScanner::new(ScanConfig::new(root)).unwrap();
        let result = scanner.scan().unwrap();

        assert_eq!(result.stats.total_pages, 2);
        assert_eq!(result.pages[0].path, PathBuf::from("blog/other.htm"));
        assert_eq!(result.pages[1].path, PathBuf::from("post.html"));
        assert_eq!(result.stats.major_entries, 3);
        assert_eq!(result.stats.minor_entries, 1);
        assert_eq!(result.stats.pages_with_warnings, 1);
    }

    #[test]
    fn test_scan_single_page() {
        let (_dir, root) = create_test_site();
        let page = scan_page(&root.join("post.html"), &ScanConfig::default()).unwrap();

        assert_eq!(page.headings.len(), 4);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].children.len(), 1);
        assert_eq!(page.orphans_dropped, 1);
    }

    #[test]
    fn test_single_threaded_scan_matches() {
        let (_dir, root) = create_test_site();
        let scanner = TocScanner::new(ScanConfig::new(root).with_threads(1)).unwrap();
        assert_eq!(scanner.scan().unwrap().stats.total_pages, 2);
    }

    #[test]
    fn test_custom_ignore_pattern() {
        let (_dir, root) = create_test_site();
        let config = ScanConfig::new(root).with_ignore_patterns(vec!["**/blog/**".to_string()]);
        let result = TocScanner::new(config).unwrap().scan().unwrap();

        assert_eq!(result.stats.total_pages, 1);
    }

    #[test]
    fn test_page_from_document() {
        let document = crate::scan::scan_headings(POST, &ScanConfig::default()).unwrap();
        let page = page_from_document(document, Path::new("post.html"), PathBuf::from("/site/post.html"));

        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.orphans_dropped, 1);
        assert_eq!(page.total_lines, POST.lines().count());
    }

    #[test]
    fn test_identical_heading_tags_rejected() {
        let (_dir, root) = create_test_site();
        let config = ScanConfig::default().with_heading_tags("h2", "h2");
        let result = scan_page(&root.join("post.html"), &config);

        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_missing_page_is_io_error() {
        let result = scan_page(Path::new("/definitely/not/here.html"), &ScanConfig::default());
        assert!(matches!(result, Err(EngineError::IoError(_))));
    }
}
