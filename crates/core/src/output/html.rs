//! Table-of-contents markup
//!
//! Renders the outline as a `<nav>` with nested lists. Each row links to its
//! heading's anchor, and the row of the active heading carries
//! `class="active"`.

use crate::models::{OutlineEntry, SiteOutline};
use quick_xml::escape::escape;

fn list_item(id: &str, title: &str, active: Option<&str>) -> String {
    let class = if Some(id) == active { " class=\"active\"" } else { "" };
    format!(
        "<li{}><a href=\"#{}\">{}</a>",
        class,
        escape(id),
        escape(title)
    )
}

/// Render a page's outline as navigation markup
pub fn render_toc_html(entries: &[OutlineEntry], active: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str("<nav aria-label=\"Table of contents\">\n");
    output.push_str("  <span>TABLE OF CONTENTS</span>\n");
    output.push_str("  <ul>\n");

    for entry in entries {
        output.push_str("    ");
        output.push_str(&list_item(&entry.id, &entry.title, active));

        if entry.children.is_empty() {
            output.push_str("</li>\n");
            continue;
        }

        output.push_str("\n      <ul>\n");
        for child in &entry.children {
            output.push_str("        ");
            output.push_str(&list_item(&child.id, &child.title, active));
            output.push_str("</li>\n");
        }
        output.push_str("      </ul>\n    </li>\n");
    }

    output.push_str("  </ul>\n");
    output.push_str("</nav>\n");
    output
}

/// Render every page's navigation, each preceded by a path comment
pub fn format_html(data: &SiteOutline) -> String {
    data.pages
        .iter()
        .map(|page| {
            format!(
                "<!-- {} -->\n{}",
                escape(&page.path.display().to_string()),
                render_toc_html(&page.entries, None)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn test_render_nested_lists() {
        let html = render_toc_html(&fixtures::page().entries, None);

        assert!(html.starts_with("<nav aria-label=\"Table of contents\">"));
        assert!(html.contains("<li><a href=\"#intro\">Introduction</a>\n      <ul>"));
        assert!(html.contains("<li><a href=\"#idea\">Idea &lt;core&gt;</a></li>"));
        assert!(html.contains("<li><a href=\"#problems\">Problems</a></li>"));
        assert_eq!(html.matches("<ul>").count(), 2);
        assert!(!html.contains("class=\"active\""));
    }

    #[test]
    fn test_active_row_marked() {
        let html = render_toc_html(&fixtures::page().entries, Some("idea"));

        assert!(html.contains("<li class=\"active\"><a href=\"#idea\">"));
        assert_eq!(html.matches("class=\"active\"").count(), 1);
    }

    #[test]
    fn test_markup_in_ids_and_titles_escaped() {
        let entries = vec![OutlineEntry::new("a\"b", "Tom & \"Jerry\"")];
        let html = render_toc_html(&entries, None);

        assert!(html.contains("<a href=\"#a&quot;b\">Tom &amp; &quot;Jerry&quot;</a>"));
    }

    #[test]
    fn test_empty_outline() {
        let html = render_toc_html(&[], None);
        assert!(html.contains("<ul>\n  </ul>"));
    }

    #[test]
    fn test_site_html_has_page_comments() {
        let html = format_html(&fixtures::site());
        assert!(html.starts_with("<!-- post.html -->\n<nav"));
    }
}
