//! Text normalization for heading titles

use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Decode HTML character references, numeric and named
///
/// Text with a reference that does not resolve is returned unchanged.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    match unescape_with(input, resolve_html5_entity) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::trace!(text = input, error = %e, "Keeping undecodable text");
            input.to_string()
        }
    }
}

/// Collapse runs of whitespace (including non-breaking spaces) to single spaces
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
