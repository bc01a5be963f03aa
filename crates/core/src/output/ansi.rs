//! ANSI colored output formatter
//!
//! This module provides colorful terminal output for tables of contents.

use crate::models::{OutlineEntry, PageOutline, SiteOutline};

// ANSI escape codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";
const BRIGHT_RED: &str = "\x1b[91m";
const BRIGHT_YELLOW: &str = "\x1b[93m";
const BRIGHT_WHITE: &str = "\x1b[97m";

// Background colors
const BG_BLUE: &str = "\x1b[44m";

/// Marker drawn before the active row
const ACTIVE_MARKER: &str = "\u{25b8}";

/// Format site outline data as ANSI colored text
pub fn format_ansi(data: &SiteOutline) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{}{}  Table of Contents Scan Results  {}\n\n",
        BOLD, BG_BLUE, RESET
    ));

    output.push_str(&format!("{}Root:{} {}\n\n", BOLD, RESET, data.root.display()));

    output.push_str(&format!(
        "{}Pages:{} {}  {}Headings:{} {}  {}Entries:{} {}/{}\n\n",
        BOLD,
        RESET,
        data.stats.total_pages,
        BOLD,
        RESET,
        data.stats.total_headings,
        BOLD,
        RESET,
        data.stats.major_entries,
        data.stats.minor_entries
    ));

    for page in &data.pages {
        output.push_str(&format_page_ansi(page, None));
    }

    output.push_str(&format!(
        "\n{}Scan completed in {}ms ({:.2} pages/sec){}\n",
        DIM, data.metadata.scan_duration_ms, data.metadata.pages_per_second, RESET
    ));

    output
}

/// Format a single page's table of contents, highlighting `active`
pub fn format_page_ansi(page: &PageOutline, active: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{}{}{}{} {}({} headings){}\n",
        BOLD,
        BRIGHT_YELLOW,
        page.path.display(),
        RESET,
        DIM,
        page.headings.len(),
        RESET
    ));

    if page.orphans_dropped > 0 {
        output.push_str(&format!(
            "   {}! {} orphaned minor heading(s) dropped{}\n",
            BRIGHT_RED, page.orphans_dropped, RESET
        ));
    }
    if page.headings_without_id > 0 {
        output.push_str(&format!(
            "   {}! {} heading(s) without id skipped{}\n",
            BRIGHT_RED, page.headings_without_id, RESET
        ));
    }

    for entry in &page.entries {
        output.push_str(&format_entry_ansi(entry, active));
    }

    output.push('\n');
    output
}

/// Format a major entry and its children
fn format_entry_ansi(entry: &OutlineEntry, active: Option<&str>) -> String {
    let mut output = row(&entry.id, &entry.title, 1, BRIGHT_WHITE, active);
    for child in &entry.children {
        output.push_str(&row(&child.id, &child.title, 2, WHITE, active));
    }
    output
}

fn row(id: &str, title: &str, indent: usize, color: &str, active: Option<&str>) -> String {
    let indent_str = "   ".repeat(indent);
    if Some(id) == active {
        format!(
            "{}{}{}{} {}{} {}#{}{}\n",
            indent_str, BOLD, CYAN, ACTIVE_MARKER, title, RESET, DIM, id, RESET
        )
    } else {
        format!(
            "{}  {}{}{} {}#{}{}\n",
            indent_str, color, title, RESET, DIM, id, RESET
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn test_format_ansi_basic() {
        let output = format_ansi(&fixtures::site());
        assert!(output.contains("Table of Contents"));
        assert!(output.contains("post.html"));
        assert!(output.contains("Introduction"));
        assert!(!output.contains(ACTIVE_MARKER));
    }

    #[test]
    fn test_active_row_highlighted() {
        let output = format_page_ansi(&fixtures::page(), Some("problems"));
        let active_line = output
            .lines()
            .find(|l| l.contains(ACTIVE_MARKER))
            .unwrap();
        assert!(active_line.contains("Problems"));
        assert_eq!(output.matches(ACTIVE_MARKER).count(), 1);
    }
}
