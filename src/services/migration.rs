//! Options schema migration.
//!
//! A raw persisted blob (possibly absent, partial, or written by an older
//! plugin version) is brought to the current schema by a fixed list of pure
//! steps, then normalized into a typed [`Options`] value with every default
//! filled in. Every step is idempotent, so `migrate` applied to its own
//! output yields the same value.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::debug;

use crate::services::environment::SiteEnvironment;
use crate::services::version;
use crate::types::notice::{codes, ValidationMessage};
use crate::types::options::{
    names, AnalyticsEntry, Options, SuppressedPlugin, TemplateMode, DEFAULT_POST_TYPES,
    LEGACY_READER_THEME, SINGULAR_TEMPLATE,
};
use crate::types::theme::{TemplatesSupported, ThemeSupportArgs};

/// Snapshot of the site signals a migration depends on.
///
/// Two equal snapshots produce identical migration results for the same blob.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationContext {
    pub plugin_version: String,
    pub active_theme: String,
    pub declared_support: Option<ThemeSupportArgs>,
    pub active_theme_is_core: bool,
    pub registered_post_types: IndexSet<String>,
    /// Registered post types that declare AMP support themselves.
    pub amp_post_types: IndexSet<String>,
    pub template_conditions: IndexSet<String>,
}

impl MigrationContext {
    /// Reads the current state of the site.
    pub fn capture(site: &dyn SiteEnvironment, plugin_version: &str) -> Self {
        let active_theme = site.active_theme_slug();
        let registered_post_types = site.registered_post_types();
        let amp_post_types = registered_post_types
            .iter()
            .filter(|p| site.post_type_declares_amp_support(p))
            .cloned()
            .collect();

        Self {
            plugin_version: plugin_version.to_string(),
            active_theme_is_core: site.is_core_bundled_theme(&active_theme),
            declared_support: site.declared_amp_support(),
            active_theme,
            registered_post_types,
            amp_post_types,
            template_conditions: site.registered_template_conditions(),
        }
    }

    /// The mode a blob without a usable `theme_support` value starts from.
    pub fn default_mode(&self) -> TemplateMode {
        match &self.declared_support {
            Some(args) => args.implied_mode(),
            None if self.active_theme_is_core => TemplateMode::Transitional,
            None => TemplateMode::Reader,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepGate {
    Always,
    /// Only when the blob was written by an older plugin version, or never.
    Upgrade,
}

struct MigrationStep {
    name: &'static str,
    gate: StepGate,
    apply: fn(&mut Map<String, Value>, &MigrationContext),
}

const STEPS: [MigrationStep; 4] = [
    MigrationStep {
        name: "legacy_theme_support",
        gate: StepGate::Always,
        apply: translate_legacy_theme_support,
    },
    MigrationStep {
        name: "post_type_support",
        gate: StepGate::Upgrade,
        apply: union_declared_post_types,
    },
    MigrationStep {
        name: "theme_templates_supported",
        gate: StepGate::Upgrade,
        apply: apply_declared_templates,
    },
    MigrationStep {
        name: "plugin_configured",
        gate: StepGate::Always,
        apply: default_plugin_configured,
    },
];

/// Migrates a raw blob and normalizes it into the canonical options value.
pub fn migrate(blob: Option<&Value>, ctx: &MigrationContext) -> Options {
    migrate_with_notes(blob, ctx).0
}

/// Like [`migrate`], also returning notes about values that had to be coerced.
pub fn migrate_with_notes(
    blob: Option<&Value>,
    ctx: &MigrationContext,
) -> (Options, Vec<ValidationMessage>) {
    let mut map = match blob {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    let upgrading = match map.get(names::VERSION).and_then(scalar_string) {
        Some(stored) => version::is_older(&stored, &ctx.plugin_version),
        None => true,
    };

    for step in STEPS.iter() {
        if step.gate == StepGate::Upgrade && !upgrading {
            continue;
        }
        debug!(step = step.name, "applying options migration step");
        (step.apply)(&mut map, ctx);
    }

    normalize(map, ctx)
}

fn translate_legacy_theme_support(map: &mut Map<String, Value>, ctx: &MigrationContext) {
    let legacy = match map.get(names::THEME_SUPPORT).and_then(Value::as_str) {
        Some(value) => value.to_string(),
        None => return,
    };

    let mode = match legacy.as_str() {
        "native" => TemplateMode::Standard,
        "paired" => TemplateMode::Transitional,
        "disabled" => match ctx.declared_support.as_ref().and_then(|a| a.paired) {
            Some(true) => TemplateMode::Transitional,
            _ => TemplateMode::Reader,
        },
        _ => return,
    };

    debug!(from = %legacy, to = %mode, "translated legacy theme support flag");
    map.insert(names::THEME_SUPPORT.to_string(), Value::from(mode.as_str()));
}

fn union_declared_post_types(map: &mut Map<String, Value>, ctx: &MigrationContext) {
    if ctx.amp_post_types.is_empty() {
        return;
    }
    let mut post_types = stored_post_types(map);
    post_types.extend(ctx.amp_post_types.iter().cloned());
    map.insert(names::SUPPORTED_POST_TYPES.to_string(), list_value(&post_types));
}

fn apply_declared_templates(map: &mut Map<String, Value>, ctx: &MigrationContext) {
    let templates_supported = match ctx
        .declared_support
        .as_ref()
        .and_then(|args| args.templates_supported.as_ref())
    {
        Some(t) => t,
        None => return,
    };

    match templates_supported {
        t if t.is_all() => {
            map.insert(names::ALL_TEMPLATES_SUPPORTED.to_string(), Value::Bool(true));
            let mut post_types = stored_post_types(map);
            post_types.extend(ctx.registered_post_types.iter().cloned());
            map.insert(names::SUPPORTED_POST_TYPES.to_string(), list_value(&post_types));
        }
        TemplatesSupported::Conditions(conditions) => {
            map.insert(names::ALL_TEMPLATES_SUPPORTED.to_string(), Value::Bool(false));
            let mut templates = stored_templates(map);
            templates.insert(SINGULAR_TEMPLATE.to_string());
            for (condition, supported) in conditions {
                if *supported {
                    templates.insert(condition.clone());
                } else if condition != SINGULAR_TEMPLATE {
                    templates.shift_remove(condition);
                }
            }
            map.insert(names::SUPPORTED_TEMPLATES.to_string(), list_value(&templates));
        }
        TemplatesSupported::Keyword(_) => {}
    }
}

fn default_plugin_configured(map: &mut Map<String, Value>, ctx: &MigrationContext) {
    if map.contains_key(names::PLUGIN_CONFIGURED) {
        return;
    }
    // A stored version from before this release means a prior install.
    let prior_install = map
        .get(names::VERSION)
        .and_then(scalar_string)
        .filter(|v| !v.is_empty())
        .map(|v| version::is_older(&v, &ctx.plugin_version))
        .unwrap_or(false);
    map.insert(
        names::PLUGIN_CONFIGURED.to_string(),
        Value::Bool(prior_install),
    );
}

fn normalize(
    mut map: Map<String, Value>,
    ctx: &MigrationContext,
) -> (Options, Vec<ValidationMessage>) {
    let mut notes = Vec::new();
    let defaults = Options::default();

    let theme_support = match map.remove(names::THEME_SUPPORT) {
        None | Some(Value::Null) => ctx.default_mode(),
        Some(value) => match value.as_str().map(str::parse::<TemplateMode>) {
            Some(Ok(mode)) => mode,
            _ => {
                let fallback = ctx
                    .declared_support
                    .as_ref()
                    .map(ThemeSupportArgs::implied_mode)
                    .unwrap_or(TemplateMode::Reader);
                notes.push(ValidationMessage::warning(
                    codes::INVALID_THEME_SUPPORT,
                    format!(
                        "Unrecognized template mode {}; using {}.",
                        value, fallback
                    ),
                ));
                fallback
            }
        },
    };

    let supported_post_types = map
        .remove(names::SUPPORTED_POST_TYPES)
        .map(|v| string_list(&v))
        .unwrap_or(defaults.supported_post_types);

    let supported_templates = map
        .remove(names::SUPPORTED_TEMPLATES)
        .map(|v| string_list(&v))
        .unwrap_or(defaults.supported_templates);

    let analytics = map
        .remove(names::ANALYTICS)
        .map(|v| analytics_entries(&v))
        .unwrap_or_default();

    let suppressed_plugins = map
        .remove(names::SUPPRESSED_PLUGINS)
        .map(|v| suppressed_entries(&v))
        .unwrap_or_default();

    let all_templates_supported = map
        .remove(names::ALL_TEMPLATES_SUPPORTED)
        .and_then(|v| coerce_bool(&v))
        .unwrap_or(defaults.all_templates_supported);

    let mobile_redirect = map
        .remove(names::MOBILE_REDIRECT)
        .and_then(|v| coerce_bool(&v))
        .unwrap_or(defaults.mobile_redirect);

    let plugin_configured = map
        .remove(names::PLUGIN_CONFIGURED)
        .and_then(|v| coerce_bool(&v))
        .unwrap_or(defaults.plugin_configured);

    let version = map
        .remove(names::VERSION)
        .and_then(|v| scalar_string(&v))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| ctx.plugin_version.clone());

    let reader_theme = map
        .remove(names::READER_THEME)
        .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| LEGACY_READER_THEME.to_string());

    let options = Options {
        theme_support,
        supported_post_types,
        analytics,
        all_templates_supported,
        supported_templates,
        suppressed_plugins,
        version,
        mobile_redirect,
        reader_theme,
        plugin_configured,
        // Only unknown keys remain at this point.
        extra: map,
    };
    (options, notes)
}

fn stored_post_types(map: &Map<String, Value>) -> IndexSet<String> {
    map.get(names::SUPPORTED_POST_TYPES)
        .map(string_list)
        .unwrap_or_else(|| DEFAULT_POST_TYPES.iter().map(|s| s.to_string()).collect())
}

fn stored_templates(map: &Map<String, Value>) -> IndexSet<String> {
    map.get(names::SUPPORTED_TEMPLATES)
        .map(string_list)
        .unwrap_or_else(|| IndexSet::from([SINGULAR_TEMPLATE.to_string()]))
}

fn list_value(items: &IndexSet<String>) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

/// Reads a list of strings from an array, or from the values of an object.
/// Non-string members are skipped.
pub(crate) fn string_list(value: &Value) -> IndexSet<String> {
    let members: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };
    members
        .into_iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Interprets loosely typed boolean input.
pub(crate) fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "" | "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        Value::Null => Some(false),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn analytics_entries(value: &Value) -> IndexMap<String, AnalyticsEntry> {
    let map = match value {
        Value::Object(map) => map,
        _ => return IndexMap::new(),
    };
    map.iter()
        .filter_map(|(id, entry)| {
            let vendor = entry.get("type")?.as_str()?.to_string();
            let config = entry.get("config")?.as_str()?.to_string();
            Some((id.clone(), AnalyticsEntry { vendor, config }))
        })
        .collect()
}

fn suppressed_entries(value: &Value) -> IndexMap<String, SuppressedPlugin> {
    let map = match value {
        Value::Object(map) => map,
        _ => return IndexMap::new(),
    };
    map.iter()
        .filter_map(|(slug, meta)| {
            serde_json::from_value::<SuppressedPlugin>(meta.clone())
                .ok()
                .map(|m| (slug.clone(), m))
        })
        .collect()
}
