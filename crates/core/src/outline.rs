//! Outline builder
//!
//! Turns the flat, document-ordered heading list into the two-level table of
//! contents: every major heading opens an entry, every minor heading attaches
//! to the most recent entry. Minor headings seen before any major heading have
//! no owner and are dropped.

use crate::models::{HeadingLevel, HeadingNode, OutlineChild, OutlineEntry};

/// Build the nested outline from headings in document order
pub fn build_outline(headings: &[HeadingNode]) -> Vec<OutlineEntry> {
    let mut entries: Vec<OutlineEntry> = Vec::new();

    for heading in headings {
        match heading.level {
            HeadingLevel::Major => {
                entries.push(OutlineEntry::new(heading.id.clone(), heading.title.clone()));
            }
            HeadingLevel::Minor => {
                if let Some(parent) = entries.last_mut() {
                    parent.children.push(OutlineChild {
                        id: heading.id.clone(),
                        title: heading.title.clone(),
                    });
                }
            }
        }
    }

    entries
}

/// Number of minor headings that precede the first major heading
pub fn count_orphans(headings: &[HeadingNode]) -> usize {
    headings
        .iter()
        .take_while(|h| h.level == HeadingLevel::Minor)
        .count()
}

/// Ids in rendered order: each major entry followed by its children
pub fn flatten_outline(entries: &[OutlineEntry]) -> Vec<&str> {
    entries
        .iter()
        .flat_map(|e| {
            std::iter::once(e.id.as_str()).chain(e.children.iter().map(|c| c.id.as_str()))
        })
        .collect()
}
