//! Data models for table-of-contents extraction
//!
//! This module defines the core data structures used throughout the toc tool,
//! including scanned headings, the two-level outline, and site-wide results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Heading rank within a page
///
/// Pages use exactly two heading ranks for their table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingLevel {
    Major,
    Minor,
}

impl HeadingLevel {
    /// Determine level from a tag name, given the configured major/minor tags
    pub fn from_tag(tag: &str, major_tag: &str, minor_tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case(major_tag) {
            Some(HeadingLevel::Major)
        } else if tag.eq_ignore_ascii_case(minor_tag) {
            Some(HeadingLevel::Minor)
        } else {
            None
        }
    }
}

/// A section heading found in rendered content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingNode {
    /// Anchor id of the heading element
    pub id: String,

    /// Display text
    pub title: String,

    /// Heading rank
    pub level: HeadingLevel,

    /// Line of the start tag (1-indexed)
    #[serde(default)]
    pub line: usize,
}

impl HeadingNode {
    /// Create a new heading node
    pub fn new(id: impl Into<String>, title: impl Into<String>, level: HeadingLevel) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            level,
            line: 0,
        }
    }

    pub fn major(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, HeadingLevel::Major)
    }

    pub fn minor(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, HeadingLevel::Minor)
    }

    /// Set the source line (builder pattern)
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn is_major(&self) -> bool {
        self.level == HeadingLevel::Major
    }
}

/// A minor entry nested under a major outline entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineChild {
    pub id: String,
    pub title: String,
}

/// A major entry of the table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Anchor id of the major heading
    pub id: String,

    /// Display text of the major heading
    pub title: String,

    /// Minor headings owned by this entry, in document order
    #[serde(default)]
    pub children: Vec<OutlineChild>,
}

impl OutlineEntry {
    /// Create an entry with no children
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            children: Vec::new(),
        }
    }

    /// Number of rendered rows (the entry plus its children)
    pub fn total_entries(&self) -> usize {
        1 + self.children.len()
    }
}

/// Table of contents for a single rendered page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOutline {
    /// Path to the page, relative to the scan root
    pub path: PathBuf,

    /// Absolute path to the page
    pub absolute_path: PathBuf,

    /// Total number of lines in the page
    pub total_lines: usize,

    /// Headings in document order
    pub headings: Vec<HeadingNode>,

    /// Nested outline built from `headings`
    pub entries: Vec<OutlineEntry>,

    /// Minor headings dropped for lack of a preceding major heading
    #[serde(default)]
    pub orphans_dropped: usize,

    /// Heading elements skipped because they carried no id
    #[serde(default)]
    pub headings_without_id: usize,
}

impl PageOutline {
    /// Total rendered ToC rows
    pub fn total_entries(&self) -> usize {
        self.entries.iter().map(|e| e.total_entries()).sum()
    }

    /// Whether any heading was dropped or skipped
    pub fn has_warnings(&self) -> bool {
        self.orphans_dropped > 0 || self.headings_without_id > 0
    }
}

/// Site-wide scan result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteOutline {
    /// Site root directory
    pub root: PathBuf,

    /// All scanned pages
    pub pages: Vec<PageOutline>,

    /// Summary statistics
    pub stats: ScanStats,

    /// Scan metadata
    pub metadata: ScanMetadata,
}

/// Summary statistics for a scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Total pages scanned
    pub total_pages: usize,

    /// Total headings across all pages
    pub total_headings: usize,

    /// Total major outline entries
    pub major_entries: usize,

    /// Total minor outline entries
    pub minor_entries: usize,

    /// Pages with dropped or skipped headings
    pub pages_with_warnings: usize,
}

impl ScanStats {
    /// Compute statistics from scanned pages
    pub fn from_pages(pages: &[PageOutline]) -> Self {
        Self {
            total_pages: pages.len(),
            total_headings: pages.iter().map(|p| p.headings.len()).sum(),
            major_entries: pages.iter().map(|p| p.entries.len()).sum(),
            minor_entries: pages
                .iter()
                .flat_map(|p| &p.entries)
                .map(|e| e.children.len())
                .sum(),
            pages_with_warnings: pages.iter().filter(|p| p.has_warnings()).count(),
        }
    }
}

/// Metadata about the scan operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// Duration of scan in milliseconds
    pub scan_duration_ms: u64,

    /// Pages processed per second
    pub pages_per_second: f64,

    /// ISO timestamp of scan
    pub timestamp: String,

    /// Tool version
    pub tool_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_tag() {
        assert_eq!(HeadingLevel::from_tag("H2", "h2", "h3"), Some(HeadingLevel::Major));
        assert_eq!(HeadingLevel::from_tag("h3", "h2", "h3"), Some(HeadingLevel::Minor));
        assert_eq!(HeadingLevel::from_tag("h4", "h2", "h3"), None);
    }

    #[test]
    fn test_stats_from_pages() {
        let mut entry = OutlineEntry::new("a", "A");
        entry.children.push(OutlineChild {
            id: "a1".to_string(),
            title: "A1".to_string(),
        });
        let page = PageOutline {
            path: PathBuf::from("post.html"),
            absolute_path: PathBuf::from("/site/post.html"),
            total_lines: 40,
            headings: vec![HeadingNode::major("a", "A"), HeadingNode::minor("a1", "A1")],
            entries: vec![entry],
            orphans_dropped: 1,
            headings_without_id: 0,
        };

        let stats = ScanStats::from_pages(&[page]);
        assert_eq!(stats.total_pages, 1);
        assert_eq!(stats.total_headings, 2);
        assert_eq!(stats.major_entries, 1);
        assert_eq!(stats.minor_entries, 1);
        assert_eq!(stats.pages_with_warnings, 1);
    }

    #[test]
    fn test_heading_serializes_level_snake_case() {
        let json = serde_json::to_string(&HeadingNode::minor("x", "X")).unwrap();
        assert!(json.contains("\"level\":\"minor\""));
    }
}
