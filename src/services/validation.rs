//! Validation of incoming option updates.
//!
//! An update is a loosely typed JSON object coming from a settings screen.
//! Each recognized field is validated on its own. A rejected field keeps its
//! current value and records a [`ValidationMessage`]; the remaining fields of
//! the same update still apply. Nothing here fails hard.

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexSet;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::services::analytics;
use crate::services::migration::{coerce_bool, string_list, MigrationContext};
use crate::types::notice::{codes, ValidationMessage};
use crate::types::options::{names, AnalyticsEntry, Options, SuppressedPlugin, TemplateMode};

/// Placeholder id the settings screen sends for a not-yet-saved analytics entry.
pub const NEW_ENTRY_ID: &str = "__new__";

/// Applies `partial` on top of `current`, returning the updated options.
///
/// `version` in the input is ignored; the caller stamps it on write.
pub fn apply_update(
    current: &Options,
    partial: &Map<String, Value>,
    ctx: &MigrationContext,
    messages: &mut Vec<ValidationMessage>,
) -> Options {
    let mut next = current.clone();

    for (name, value) in partial {
        match name.as_str() {
            names::THEME_SUPPORT => match value.as_str().map(str::parse::<TemplateMode>) {
                Some(Ok(mode)) => next.theme_support = mode,
                _ => {
                    warn!(value = %value, "rejected theme support value");
                    messages.push(ValidationMessage::warning(
                        codes::INVALID_THEME_SUPPORT,
                        format!("Unrecognized template mode {}.", value),
                    ));
                }
            },
            names::SUPPORTED_POST_TYPES => {
                match registered_subset(value, &ctx.registered_post_types) {
                    Some(post_types) => next.supported_post_types = post_types,
                    None => messages.push(invalid_value(name)),
                }
            }
            names::SUPPORTED_TEMPLATES => {
                match registered_subset(value, &ctx.template_conditions) {
                    Some(templates) => next.supported_templates = templates,
                    None => messages.push(invalid_value(name)),
                }
            }
            names::ALL_TEMPLATES_SUPPORTED => {
                apply_bool(&mut next.all_templates_supported, name, value, messages)
            }
            names::MOBILE_REDIRECT => apply_bool(&mut next.mobile_redirect, name, value, messages),
            names::PLUGIN_CONFIGURED => {
                apply_bool(&mut next.plugin_configured, name, value, messages)
            }
            names::READER_THEME => match value.as_str().map(str::trim) {
                Some(slug) if !slug.is_empty() => next.reader_theme = slug.to_string(),
                _ => messages.push(ValidationMessage::warning(
                    codes::INVALID_READER_THEME,
                    "Reader theme must be a theme slug.",
                )),
            },
            names::ANALYTICS => match value.as_object() {
                Some(entries) => apply_analytics(&mut next, entries, messages),
                None => messages.push(invalid_value(name)),
            },
            names::SUPPRESSED_PLUGINS => match value.as_object() {
                Some(entries) => apply_suppressed_plugins(&mut next, entries, messages),
                None => messages.push(invalid_value(name)),
            },
            names::VERSION => {}
            _ => {
                if value.is_null() {
                    next.extra.remove(name);
                } else {
                    next.extra.insert(name.clone(), value.clone());
                }
            }
        }
    }

    next
}

fn invalid_value(name: &str) -> ValidationMessage {
    ValidationMessage::warning(
        codes::INVALID_OPTION_VALUE,
        format!("Invalid value for option {}.", name),
    )
}

fn apply_bool(target: &mut bool, name: &str, value: &Value, messages: &mut Vec<ValidationMessage>) {
    match coerce_bool(value) {
        Some(b) => *target = b,
        None => messages.push(invalid_value(name)),
    }
}

/// Keeps only registered members. Unknown members are dropped without a message.
fn registered_subset(value: &Value, registered: &IndexSet<String>) -> Option<IndexSet<String>> {
    if !value.is_array() && !value.is_object() {
        return None;
    }
    Some(
        string_list(value)
            .into_iter()
            .filter(|item| registered.contains(item))
            .collect(),
    )
}

fn apply_analytics(
    options: &mut Options,
    entries: &Map<String, Value>,
    messages: &mut Vec<ValidationMessage>,
) {
    for (key, data) in entries {
        let fields = data.as_object();
        let field_str = |field: &str| {
            fields
                .and_then(|o| o.get(field))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let vendor = field_str("type")
            .map(|v| analytics::sanitize_vendor(&v))
            .unwrap_or_default();
        let config = field_str("config")
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        let delete = fields
            .and_then(|o| o.get("delete"))
            .and_then(coerce_bool)
            .unwrap_or(false);

        // An explicit id only addresses an entry that already exists.
        let existing_id = field_str("id")
            .map(|id| analytics::sanitize_id(&id))
            .filter(|id| id != NEW_ENTRY_ID && options.analytics.contains_key(id));

        if delete {
            let target = existing_id
                .or_else(|| options.analytics.contains_key(key).then(|| key.clone()))
                .or_else(|| {
                    (!vendor.is_empty() && !config.is_empty())
                        .then(|| analytics::fingerprint(&vendor, &config))
                });
            match target {
                Some(id) => {
                    if options.analytics.shift_remove(&id).is_some() {
                        debug!(id = %id, "removed analytics entry");
                    }
                }
                None => messages.push(ValidationMessage::error(
                    codes::MISSING_ANALYTICS_VENDOR_OR_CONFIG,
                    "Missing vendor type or config.",
                )),
            }
            continue;
        }

        if vendor.is_empty() || config.is_empty() {
            messages.push(ValidationMessage::error(
                codes::MISSING_ANALYTICS_VENDOR_OR_CONFIG,
                "Missing vendor type or config.",
            ));
            continue;
        }

        if !analytics::is_valid_config(&config) {
            messages.push(ValidationMessage::error(
                codes::INVALID_ANALYTICS_CONFIG_JSON,
                "Invalid analytics config JSON.",
            ));
            continue;
        }

        let is_new = existing_id.is_none();
        let id = existing_id.unwrap_or_else(|| analytics::fingerprint(&vendor, &config));

        let duplicate = (is_new && options.analytics.contains_key(&id))
            || options
                .analytics
                .iter()
                .any(|(other, e)| *other != id && e.vendor == vendor && e.config == config);
        if duplicate {
            messages.push(ValidationMessage::error(
                codes::DUPLICATE_ANALYTICS_ENTRY,
                "Duplicate analytics entry found.",
            ));
            continue;
        }

        debug!(id = %id, vendor = %vendor, "storing analytics entry");
        options.analytics.insert(id, AnalyticsEntry { vendor, config });
    }
}

fn apply_suppressed_plugins(
    options: &mut Options,
    entries: &Map<String, Value>,
    messages: &mut Vec<ValidationMessage>,
) {
    for (slug, value) in entries {
        let slug = slug.trim();
        if slug.is_empty() {
            continue;
        }

        if value.is_object() {
            match serde_json::from_value::<SuppressedPlugin>(value.clone()) {
                Ok(meta) => {
                    options.suppressed_plugins.insert(slug.to_string(), meta);
                }
                Err(_) => messages.push(invalid_value(names::SUPPRESSED_PLUGINS)),
            }
            continue;
        }

        match coerce_bool(value) {
            Some(true) => {
                options
                    .suppressed_plugins
                    .entry(slug.to_string())
                    .or_insert_with(|| SuppressedPlugin {
                        timestamp: now_ts(),
                        ..SuppressedPlugin::default()
                    });
            }
            Some(false) => {
                options.suppressed_plugins.shift_remove(slug);
            }
            None => messages.push(invalid_value(names::SUPPRESSED_PLUGINS)),
        }
    }
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
