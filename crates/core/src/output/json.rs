//! JSON output formatter

use crate::models::SiteOutline;
use crate::output::FormatError;

/// Format site outline data as pretty-printed JSON
pub fn format_json(data: &SiteOutline) -> Result<String, FormatError> {
    serde_json::to_string_pretty(data).map_err(FormatError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn test_format_json() {
        let json = format_json(&fixtures::site()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["stats"]["total_pages"], 1);
        assert_eq!(value["pages"][0]["headings"][1]["level"], "minor");
        assert_eq!(value["pages"][0]["entries"][1]["id"], "problems");
    }
}
