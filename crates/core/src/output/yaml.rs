//! YAML output formatter

use crate::models::SiteOutline;
use crate::output::FormatError;

/// Format site outline data as YAML
pub fn format_yaml(data: &SiteOutline) -> Result<String, FormatError> {
    serde_yaml::to_string(data).map_err(FormatError::from)
}
