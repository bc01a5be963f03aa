//! Output formatting module
//!
//! This module provides formatters for JSON, YAML, ANSI, HTML and plain-text
//! output of site and page outlines. Page formatters take the active heading
//! id so the rendered table of contents can highlight it.

pub mod ansi;
pub mod html;
mod json;
mod yaml;

pub use ansi::{format_ansi, format_page_ansi};
pub use html::{format_html, render_toc_html};
pub use json::format_json;
pub use yaml::format_yaml;

use crate::models::{PageOutline, SiteOutline};
use serde::Serialize;
use thiserror::Error;

/// Output format errors
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON format
    #[default]
    Json,
    /// YAML format
    Yaml,
    /// ANSI colored text
    Ansi,
    /// Table-of-contents markup
    Html,
    /// Plain text summary
    Summary,
}

/// A page outline together with its active heading
#[derive(Debug, Serialize)]
pub struct ActivePage<'a> {
    #[serde(flatten)]
    pub page: &'a PageOutline,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_id: Option<&'a str>,
}

/// Format site outline data in the specified format
pub fn format_output(data: &SiteOutline, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => format_json(data),
        OutputFormat::Yaml => format_yaml(data),
        OutputFormat::Ansi => Ok(format_ansi(data)),
        OutputFormat::Html => Ok(format_html(data)),
        OutputFormat::Summary => Ok(format_summary(data)),
    }
}

/// Format a single page, highlighting `active` where the format allows
pub fn format_page(
    page: &PageOutline,
    format: OutputFormat,
    active: Option<&str>,
) -> Result<String, FormatError> {
    let view = ActivePage {
        page,
        active_id: active,
    };
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&view).map_err(FormatError::from),
        OutputFormat::Yaml => serde_yaml::to_string(&view).map_err(FormatError::from),
        OutputFormat::Ansi => Ok(format_page_ansi(page, active)),
        OutputFormat::Html => Ok(render_toc_html(&page.entries, active)),
        OutputFormat::Summary => Ok(format_page_summary(page, active)),
    }
}

/// Format as plain text summary
fn format_summary(data: &SiteOutline) -> String {
    let mut output = String::new();

    output.push_str("Table of Contents Scan Results\n");
    output.push_str("==============================\n\n");
    output.push_str(&format!("Root: {}\n", data.root.display()));
    output.push_str(&format!("Total Pages: {}\n", data.stats.total_pages));
    output.push_str(&format!("Total Headings: {}\n", data.stats.total_headings));
    output.push_str(&format!(
        "Outline Entries: {} major, {} minor\n",
        data.stats.major_entries, data.stats.minor_entries
    ));

    if data.stats.pages_with_warnings > 0 {
        output.push_str(&format!(
            "\nPages with dropped or skipped headings: {}\n",
            data.stats.pages_with_warnings
        ));
    }

    output.push_str(&format!("\nScan Duration: {}ms\n", data.metadata.scan_duration_ms));
    output.push_str(&format!(
        "Processing Speed: {:.2} pages/sec\n",
        data.metadata.pages_per_second
    ));

    output
}

/// Format a page as an indented plain-text outline
fn format_page_summary(page: &PageOutline, active: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str(&format!("Page: {}\n", page.path.display()));
    output.push_str(&format!("Headings: {}\n", page.headings.len()));
    if page.orphans_dropped > 0 {
        output.push_str(&format!("Orphaned minor headings: {}\n", page.orphans_dropped));
    }
    if page.headings_without_id > 0 {
        output.push_str(&format!("Headings without id: {}\n", page.headings_without_id));
    }

    output.push_str("\nOutline:\n");
    let marker = |id: &str| if Some(id) == active { "*" } else { " " };
    for entry in &page.entries {
        output.push_str(&format!("{} {} (#{})\n", marker(&entry.id), entry.title, entry.id));
        for child in &entry.children {
            output.push_str(&format!("{}   {} (#{})\n", marker(&child.id), child.title, child.id));
        }
    }

    output
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_json_carries_active_id() {
        let page = fixtures::page();
        let json = format_page(&page, OutputFormat::Json, Some("idea")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["active_id"], "idea");
        assert_eq!(value["entries"][0]["children"][0]["id"], "idea");

        let json = format_page(&page, OutputFormat::Json, None).unwrap();
        assert!(!json.contains("active_id"));
    }

    #[test]
    fn test_page_summary_marks_active() {
        let page = fixtures::page();
        let text = format_page(&page, OutputFormat::Summary, Some("problems")).unwrap();

        assert!(text.contains("* Problems (#problems)"));
        assert!(text.contains("    Idea <core> (#idea)"));
    }

    #[test]
    fn test_site_summary() {
        let text = format_output(&fixtures::site(), OutputFormat::Summary).unwrap();
        assert!(text.contains("Total Pages: 1"));
        assert!(text.contains("2 major, 1 minor"));
    }
}
