use serde::{Deserialize, Serialize};

/// Stable message codes. External code matches on these strings.
pub mod codes {
    pub const MISSING_ANALYTICS_VENDOR_OR_CONFIG: &str = "missing_analytics_vendor_or_config";
    pub const INVALID_ANALYTICS_CONFIG_JSON: &str = "invalid_analytics_config_json";
    pub const DUPLICATE_ANALYTICS_ENTRY: &str = "duplicate_analytics_entry";
    pub const INVALID_THEME_SUPPORT: &str = "invalid_theme_support";
    pub const INVALID_READER_THEME: &str = "invalid_reader_theme";
    pub const INVALID_OPTION_VALUE: &str = "invalid_option_value";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A non-fatal validation outcome shown to the site administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub code: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}
