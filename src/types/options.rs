use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Storage key under which the whole options blob is persisted.
pub const OPTION_NAME: &str = "amp-options";

/// Version of the plugin that owns the options schema.
pub const PLUGIN_VERSION: &str = "2.0.0";

/// Reader theme sentinel meaning "the built-in legacy templates".
pub const LEGACY_READER_THEME: &str = "legacy";

/// Names of the fields inside the options blob.
pub mod names {
    pub const THEME_SUPPORT: &str = "theme_support";
    pub const SUPPORTED_POST_TYPES: &str = "supported_post_types";
    pub const ANALYTICS: &str = "analytics";
    pub const ALL_TEMPLATES_SUPPORTED: &str = "all_templates_supported";
    pub const SUPPORTED_TEMPLATES: &str = "supported_templates";
    pub const SUPPRESSED_PLUGINS: &str = "suppressed_plugins";
    pub const VERSION: &str = "version";
    pub const MOBILE_REDIRECT: &str = "mobile_redirect";
    pub const READER_THEME: &str = "reader_theme";
    pub const PLUGIN_CONFIGURED: &str = "plugin_configured";
}

/// Post types enabled when nothing has been stored yet.
pub const DEFAULT_POST_TYPES: [&str; 2] = ["post", "page"];

/// Template condition that is always part of a selective template list.
pub const SINGULAR_TEMPLATE: &str = "is_singular";

/// Output mode of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
    /// Single AMP version of every page.
    Standard,
    /// Paired AMP/non-AMP pages rendered with the active theme.
    Transitional,
    /// Paired pages where AMP uses a separate reader theme.
    Reader,
}

impl TemplateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateMode::Standard => "standard",
            TemplateMode::Transitional => "transitional",
            TemplateMode::Reader => "reader",
        }
    }
}

impl fmt::Display for TemplateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(TemplateMode::Standard),
            "transitional" => Ok(TemplateMode::Transitional),
            "reader" => Ok(TemplateMode::Reader),
            other => Err(format!("unrecognized template mode '{}'", other)),
        }
    }
}

/// One analytics vendor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEntry {
    #[serde(rename = "type")]
    pub vendor: String,
    /// Vendor config as a JSON document string.
    pub config: String,
}

/// Metadata recorded when a plugin's output is suppressed on AMP pages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuppressedPlugin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_version: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// The canonical, typed options value.
///
/// Field order matches the persisted blob. Keys the schema does not know
/// about are kept in `extra` so that they survive a read-modify-write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub theme_support: TemplateMode,
    pub supported_post_types: IndexSet<String>,
    pub analytics: IndexMap<String, AnalyticsEntry>,
    pub all_templates_supported: bool,
    pub supported_templates: IndexSet<String>,
    pub suppressed_plugins: IndexMap<String, SuppressedPlugin>,
    pub version: String,
    pub mobile_redirect: bool,
    pub reader_theme: String,
    pub plugin_configured: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            theme_support: TemplateMode::Reader,
            supported_post_types: DEFAULT_POST_TYPES.iter().map(|s| s.to_string()).collect(),
            analytics: IndexMap::new(),
            all_templates_supported: true,
            supported_templates: IndexSet::from([SINGULAR_TEMPLATE.to_string()]),
            suppressed_plugins: IndexMap::new(),
            version: PLUGIN_VERSION.to_string(),
            mobile_redirect: false,
            reader_theme: LEGACY_READER_THEME.to_string(),
            plugin_configured: false,
            extra: Map::new(),
        }
    }
}

impl Options {
    /// Serializes into the persisted blob shape.
    pub fn to_blob(&self) -> Value {
        // Every field is a plain string/bool/map, so this cannot fail.
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Looks up a single field (or extension key) by name.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.to_blob() {
            Value::Object(mut map) => map.remove(name),
            _ => None,
        }
    }
}
