//! Heading scan over rendered HTML
//!
//! This module uses Tree-sitter to locate major and minor heading elements in a
//! rendered page, in document order. Parsing is error tolerant: malformed
//! markup still yields every heading the parser can recover.

mod text;

pub use text::{collapse_whitespace, decode_entities};

use crate::config::ScanConfig;
use crate::models::{HeadingLevel, HeadingNode};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

/// Heading scan errors
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to initialize parser: {0}")]
    InitError(String),

    #[error("Failed to parse document: {0}")]
    ParseError(String),
}

/// Result of scanning one document
#[derive(Debug, Clone, Default)]
pub struct ScannedDocument {
    /// Headings in document order
    pub headings: Vec<HeadingNode>,

    /// Heading elements skipped because they carried no id
    pub headings_without_id: usize,

    /// Whether the configured content container was present
    pub has_content_container: bool,

    /// Total lines in the document
    pub total_lines: usize,

    /// Lowercased tag names present in the document
    tags: BTreeSet<String>,

    /// Element ids present in the document
    ids: BTreeSet<String>,

    /// `(tag, id)` of every element carrying an id
    tagged_ids: BTreeSet<(String, String)>,
}

impl ScannedDocument {
    /// Check whether an element matching a simple selector exists
    ///
    /// Supports `tag`, `#id` and `tag#id`.
    pub fn matches(&self, selector: &str) -> bool {
        let selector = selector.trim();
        match selector.split_once('#') {
            Some(("", id)) => self.ids.contains(id),
            Some((tag, id)) => self
                .tagged_ids
                .contains(&(tag.to_ascii_lowercase(), id.to_string())),
            None => self.tags.contains(&selector.to_ascii_lowercase()),
        }
    }
}

/// A heading element seen during the walk, before container filtering
struct Candidate {
    id: Option<String>,
    title: String,
    level: HeadingLevel,
    line: usize,
    in_content: bool,
}

/// Tree-sitter backed heading scanner
pub struct HeadingScanner {
    parser: Parser,
}

impl HeadingScanner {
    /// Create a new scanner
    pub fn new() -> Result<Self, ScanError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_html::LANGUAGE.into())
            .map_err(|e| ScanError::InitError(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse source into a tree
    fn parse_tree(&mut self, source: &str) -> Result<Tree, ScanError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| ScanError::ParseError("Failed to parse source".to_string()))
    }

    /// Scan a document for headings
    pub fn scan(&mut self, source: &str, config: &ScanConfig) -> Result<ScannedDocument, ScanError> {
        let tree = self.parse_tree(source)?;
        let mut walk = Walk {
            source: source.as_bytes(),
            config,
            candidates: Vec::new(),
            tags: BTreeSet::new(),
            ids: BTreeSet::new(),
            tagged_ids: BTreeSet::new(),
        };
        walk.visit(&tree.root_node(), false);

        let Walk {
            candidates,
            tags,
            ids,
            tagged_ids,
            ..
        } = walk;

        let has_content_container = config
            .content_tag
            .as_ref()
            .map(|tag| tags.contains(tag))
            .unwrap_or(false);

        if config.content_tag.is_some() && !has_content_container {
            tracing::debug!(
                container = config.content_tag.as_deref().unwrap_or_default(),
                "Content container not found, scanning whole document"
            );
        }

        let restrict = has_content_container;
        let mut taken: HashSet<String> = ids.iter().cloned().collect();
        let mut headings = Vec::new();
        let mut headings_without_id = 0;

        for candidate in candidates {
            if restrict && !candidate.in_content {
                continue;
            }

            let id = match candidate.id {
                Some(id) => id,
                None if config.assign_missing_ids => {
                    let id = unique_slug(&candidate.title, &taken);
                    taken.insert(id.clone());
                    id
                }
                None => {
                    tracing::debug!(
                        line = candidate.line,
                        title = %candidate.title,
                        "Skipping heading without id"
                    );
                    headings_without_id += 1;
                    continue;
                }
            };

            headings.push(HeadingNode {
                id,
                title: candidate.title,
                level: candidate.level,
                line: candidate.line,
            });
        }

        Ok(ScannedDocument {
            headings,
            headings_without_id,
            has_content_container,
            total_lines: source.lines().count(),
            tags,
            ids,
            tagged_ids,
        })
    }
}

/// Scan a document with a fresh scanner
pub fn scan_headings(source: &str, config: &ScanConfig) -> Result<ScannedDocument, ScanError> {
    HeadingScanner::new()?.scan(source, config)
}

/// Depth-first walk state
struct Walk<'a> {
    source: &'a [u8],
    config: &'a ScanConfig,
    candidates: Vec<Candidate>,
    tags: BTreeSet<String>,
    ids: BTreeSet<String>,
    tagged_ids: BTreeSet<(String, String)>,
}

impl Walk<'_> {
    fn visit(&mut self, node: &Node, in_content: bool) {
        let mut in_content = in_content;

        if node.kind() == "element" {
            if let Some(tag) = self.tag_name(node) {
                let id = self.attribute(node, "id").filter(|id| !id.is_empty());
                if let Some(ref id) = id {
                    self.ids.insert(id.clone());
                    self.tagged_ids.insert((tag.clone(), id.clone()));
                }

                if let Some(level) =
                    HeadingLevel::from_tag(&tag, &self.config.major_tag, &self.config.minor_tag)
                {
                    let title = self.text_content(node);
                    self.candidates.push(Candidate {
                        id,
                        title,
                        level,
                        line: node.start_position().row + 1,
                        in_content,
                    });
                }

                if self.config.content_tag.as_deref() == Some(tag.as_str()) {
                    in_content = true;
                }
                self.tags.insert(tag);
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(&child, in_content);
        }
    }

    /// Opening tag of an element
    fn open_tag<'t>(&self, element: &Node<'t>) -> Option<Node<'t>> {
        let mut cursor = element.walk();
        let tag = element
            .children(&mut cursor)
            .find(|c| c.kind() == "start_tag" || c.kind() == "self_closing_tag");
        tag
    }

    fn tag_name(&self, element: &Node) -> Option<String> {
        let open = self.open_tag(element)?;
        let mut cursor = open.walk();
        let name = open
            .children(&mut cursor)
            .find(|c| c.kind() == "tag_name")?
            .utf8_text(self.source)
            .ok()?
            .to_ascii_lowercase();
        Some(name)
    }

    fn attribute(&self, element: &Node, wanted: &str) -> Option<String> {
        let open = self.open_tag(element)?;
        let mut cursor = open.walk();
        for attr in open.children(&mut cursor) {
            if attr.kind() != "attribute" {
                continue;
            }

            let mut attr_cursor = attr.walk();
            let parts: Vec<Node> = attr.children(&mut attr_cursor).collect();
            let Some(name) = parts.iter().find(|p| p.kind() == "attribute_name") else {
                continue;
            };
            if !name
                .utf8_text(self.source)
                .map(|n| n.eq_ignore_ascii_case(wanted))
                .unwrap_or(false)
            {
                continue;
            }

            let value = parts.iter().find_map(|p| match p.kind() {
                "attribute_value" => p.utf8_text(self.source).ok().map(str::to_string),
                "quoted_attribute_value" => {
                    let mut value_cursor = p.walk();
                    let inner = p
                        .children(&mut value_cursor)
                        .find(|v| v.kind() == "attribute_value")
                        .and_then(|v| v.utf8_text(self.source).ok())
                        .map(str::to_string);
                    // `id=""` has no inner value node
                    Some(inner.unwrap_or_default())
                }
                _ => None,
            });

            return Some(decode_entities(value.unwrap_or_default().trim()));
        }
        None
    }

    /// Rendered text of an element, like the DOM's `innerText`
    fn text_content(&self, element: &Node) -> String {
        let mut pieces = Vec::new();
        self.collect_text(element, &mut pieces);

        let mut title = String::new();
        let mut prev_end: Option<usize> = None;
        for piece in &pieces {
            if let Some(end) = prev_end {
                if self.whitespace_between(end, piece.start_byte()) {
                    title.push(' ');
                }
            }
            if let Ok(raw) = piece.utf8_text(self.source) {
                title.push_str(&decode_entities(raw));
            }
            prev_end = Some(piece.end_byte());
        }

        collapse_whitespace(&title)
    }

    fn collect_text<'t>(&self, node: &Node<'t>, pieces: &mut Vec<Node<'t>>) {
        match node.kind() {
            "text" | "entity" => pieces.push(*node),
            "script_element" | "style_element" | "comment" | "start_tag" | "end_tag"
            | "self_closing_tag" => {}
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.collect_text(&child, pieces);
                }
            }
        }
    }

    /// Whether rendered whitespace separates two text runs
    fn whitespace_between(&self, end: usize, start: usize) -> bool {
        let gap = &self.source[end.min(start)..start];
        let leading = gap.first().map(u8::is_ascii_whitespace).unwrap_or(false);
        let trailing = gap.last().map(u8::is_ascii_whitespace).unwrap_or(false);
        leading || trailing
    }
}

/// Slugify a title into an id not yet present in `taken`
fn unique_slug(title: &str, taken: &HashSet<String>) -> String {
    let mut base = slug::slugify(title);
    if base.is_empty() {
        base = "section".to_string();
    }
    if !taken.contains(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObserverOptions;
    use crate::observer::ObservationRoot;

    const POST: &str = r#"<!DOCTYPE html>
<html>
<body>
  <nav><h2 id="nav-title">Site</h2></nav>
  <iframe src="about:blank"></iframe>
  <main>
    <h1 id="title">Binary Search</h1>
    <h2 id="intro">Introduction</h2>
    <p>Some text.</p>
    <h3 id="idea">The <code>mid</code> point</h3>
    <h3 id="cost">Cost &amp; Complexity</h3>
    <h2 id="problems">Practice Problems</h2>
  </main>
</body>
</html>
"#;

    fn ids(doc: &ScannedDocument) -> Vec<&str> {
        doc.headings.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_scan_headings_in_content_order() {
        let doc = scan_headings(POST, &ScanConfig::default()).unwrap();

        assert!(doc.has_content_container);
        assert_eq!(ids(&doc), vec!["intro", "idea", "cost", "problems"]);
        assert_eq!(doc.headings[0].level, HeadingLevel::Major);
        assert_eq!(doc.headings[1].level, HeadingLevel::Minor);
        assert_eq!(doc.headings[0].line, 8);
    }

    #[test]
    fn test_titles_are_rendered_text() {
        let doc = scan_headings(POST, &ScanConfig::default()).unwrap();

        assert_eq!(doc.headings[1].title, "The mid point");
        assert_eq!(doc.headings[2].title, "Cost & Complexity");
    }

    #[test]
    fn test_whole_document_without_container() {
        let config = ScanConfig::default().with_content_tag(Some("article".to_string()));
        let doc = scan_headings(POST, &config).unwrap();

        assert!(!doc.has_content_container);
        assert_eq!(doc.headings.first().map(|h| h.id.as_str()), Some("nav-title"));
        assert_eq!(doc.headings.len(), 5);
    }

    #[test]
    fn test_headings_without_id_skipped() {
        let source = "<main><h2>No anchor</h2><h2 id=\"a\">A</h2><h3 id=\"\">Empty</h3></main>";
        let doc = scan_headings(source, &ScanConfig::default()).unwrap();

        assert_eq!(ids(&doc), vec!["a"]);
        assert_eq!(doc.headings_without_id, 2);
    }

    #[test]
    fn test_assign_missing_ids() {
        let source = "<main><h2 id=\"intro\">A</h2><h2>Intro</h2><h3>Intro</h3><h3>!!</h3></main>";
        let config = ScanConfig::default().with_assign_missing_ids(true);
        let doc = scan_headings(source, &config).unwrap();

        assert_eq!(ids(&doc), vec!["intro", "intro-1", "intro-2", "section"]);
        assert_eq!(doc.headings_without_id, 0);
    }

    #[test]
    fn test_selector_matching() {
        let doc = scan_headings(POST, &ScanConfig::default()).unwrap();

        assert!(doc.matches("iframe"));
        assert!(doc.matches("IFRAME"));
        assert!(doc.matches("#intro"));
        assert!(doc.matches("h2#problems"));
        assert!(!doc.matches("#missing"));
        assert!(!doc.matches("aside"));
    }

    #[test]
    fn test_tag_and_id_must_be_same_element() {
        let source = "<div id=\"content\"></div><iframe></iframe><main><h2 id=\"a\">A</h2></main>";
        let doc = scan_headings(source, &ScanConfig::default()).unwrap();

        assert!(doc.matches("iframe"));
        assert!(doc.matches("#content"));
        assert!(doc.matches("div#content"));
        assert!(!doc.matches("iframe#content"));

        let options = ObserverOptions::default().with_root(Some("iframe#content".to_string()));
        assert_eq!(options.resolve_root(|s| doc.matches(s)), ObservationRoot::Viewport);
    }

    #[test]
    fn test_html5_entities_in_titles() {
        let source = "<main><h2 id=\"a\">Runs in &Theta;(n &middot; log n) &mdash; &pi;</h2></main>";
        let doc = scan_headings(source, &ScanConfig::default()).unwrap();

        assert_eq!(doc.headings[0].title, "Runs in Θ(n · log n) — π");
    }

    #[test]
    fn test_malformed_markup_still_scans() {
        let source = "<main><h2 id='a'>A<h3 id=b>B</h3><div><h2 id=\"c\">C";
        let doc = scan_headings(source, &ScanConfig::default()).unwrap();

        assert!(doc.headings.iter().any(|h| h.id == "b"));
    }

    #[test]
    fn test_unique_slug() {
        let taken: HashSet<String> = ["setup".to_string(), "setup-1".to_string()].into();
        assert_eq!(unique_slug("Setup", &taken), "setup-2");
        assert_eq!(unique_slug("Two Pointers", &taken), "two-pointers");
    }
}
