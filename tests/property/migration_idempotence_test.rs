//! Property-based tests for options migration.
//!
//! Migrating any stored blob and then migrating the result again must give
//! the same canonical options, whatever the site looks like.

use amp_options::services::environment::ManifestSite;
use amp_options::services::migration::{migrate, MigrationContext};
use amp_options::types::options::PLUGIN_VERSION;
use amp_options::types::theme::{TemplatesSupported, ThemeSupportArgs};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// --- Arbitrary strategies for loosely typed blob fields ---

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-5i32..5).prop_map(|n| json!(n)),
        "[a-z_ ]{0,8}".prop_map(Value::String),
    ]
}

fn arb_string_list(pool: &'static [&'static str]) -> impl Strategy<Value = Value> {
    prop::collection::vec(prop::sample::select(pool), 0..5)
        .prop_map(|items| json!(items))
}

const POST_TYPES: &[&str] = &["post", "page", "attachment", "book", "unregistered"];
const CONDITIONS: &[&str] = &["is_singular", "is_404", "is_search", "is_date", "is_bogus"];

fn arb_theme_support() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::sample::select(vec![
            "reader", "standard", "transitional", "native", "paired", "disabled", "amp-only",
        ])
        .prop_map(|s| json!(s)),
        arb_scalar(),
    ]
}

fn arb_analytics() -> impl Strategy<Value = Value> {
    let entry = prop_oneof![
        ("[a-z]{1,6}", prop::sample::select(vec!["{}", "{\"a\":1}", "BAD"]))
            .prop_map(|(vendor, config)| json!({"type": vendor, "config": config})),
        arb_scalar(),
    ];
    prop_oneof![
        prop::collection::btree_map("[a-f0-9]{12}", entry, 0..3)
            .prop_map(|m| json!(m)),
        arb_scalar(),
    ]
}

fn arb_suppressed() -> impl Strategy<Value = Value> {
    let meta = prop_oneof![
        (0i64..2_000_000_000, prop::option::of("[a-z]{1,6}"))
            .prop_map(|(timestamp, username)| json!({"timestamp": timestamp, "username": username})),
        arb_scalar(),
    ];
    prop::collection::btree_map("[a-z-]{1,8}", meta, 0..3).prop_map(|m| json!(m))
}

fn arb_version() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::sample::select(vec!["", "0.7", "1.0.0", "1.5.5", "2.0.0-beta1", PLUGIN_VERSION, "3.1"])
            .prop_map(|s| json!(s)),
        arb_scalar(),
    ]
}

fn arb_blob() -> impl Strategy<Value = Value> {
    let known = (
        prop::option::of(arb_theme_support()),
        prop::option::of(prop_oneof![arb_string_list(POST_TYPES), arb_scalar()]),
        prop::option::of(arb_analytics()),
        prop::option::of(arb_scalar()),
        prop::option::of(prop_oneof![arb_string_list(CONDITIONS), arb_scalar()]),
        prop::option::of(arb_suppressed()),
        prop::option::of(arb_version()),
        prop::option::of(arb_scalar()),
        prop::option::of(arb_scalar()),
        prop::option::of(arb_scalar()),
    );
    let unknown = prop::collection::btree_map("[a-z]{3,8}_x", arb_scalar(), 0..3);

    (known, unknown).prop_map(|(fields, unknown)| {
        let (theme, post_types, analytics, all, templates, suppressed, version, mobile, reader, configured) =
            fields;
        let mut map = Map::new();
        let pairs = [
            ("theme_support", theme),
            ("supported_post_types", post_types),
            ("analytics", analytics),
            ("all_templates_supported", all),
            ("supported_templates", templates),
            ("suppressed_plugins", suppressed),
            ("version", version),
            ("mobile_redirect", mobile),
            ("reader_theme", reader),
            ("plugin_configured", configured),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                map.insert(name.to_string(), value);
            }
        }
        map.extend(unknown);
        Value::Object(map)
    })
}

fn arb_declaration() -> impl Strategy<Value = Option<ThemeSupportArgs>> {
    let templates = prop_oneof![
        Just(None),
        Just(Some(TemplatesSupported::all())),
        prop::collection::vec((prop::sample::select(CONDITIONS), any::<bool>()), 0..4)
            .prop_map(|c| Some(TemplatesSupported::conditions(c))),
    ];
    prop::option::of(
        (
            prop::option::of(any::<bool>()),
            prop::option::of(Just("amp".to_string())),
            templates,
        )
            .prop_map(|(paired, template_dir, templates_supported)| ThemeSupportArgs {
                paired,
                template_dir,
                templates_supported,
            }),
    )
}

fn arb_context() -> impl Strategy<Value = MigrationContext> {
    (
        prop::sample::select(vec!["twentytwenty", "custom-theme"]),
        arb_declaration(),
        any::<bool>(),
    )
        .prop_map(|(theme, declaration, book_supports_amp)| {
            let site = ManifestSite::with_theme(theme);
            site.set_theme_support(declaration);
            site.register_post_type("book", book_supports_amp);
            MigrationContext::capture(&site, PLUGIN_VERSION)
        })
}

// --- Properties ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Migration is idempotent on its own output.
    #[test]
    fn prop_migration_is_idempotent(blob in arb_blob(), ctx in arb_context()) {
        let once = migrate(Some(&blob), &ctx);
        let twice = migrate(Some(&once.to_blob()), &ctx);
        prop_assert_eq!(once, twice);
    }

    /// An absent blob and an empty object migrate identically.
    #[test]
    fn prop_absent_and_empty_blob_agree(ctx in arb_context()) {
        prop_assert_eq!(migrate(None, &ctx), migrate(Some(&json!({})), &ctx));
    }

    /// Migration output always carries the current plugin version or the stored one.
    #[test]
    fn prop_version_never_empty(blob in arb_blob(), ctx in arb_context()) {
        let options = migrate(Some(&blob), &ctx);
        prop_assert!(!options.version.is_empty());
    }

    /// Keys the schema does not know are carried through unchanged.
    #[test]
    fn prop_unknown_keys_survive(blob in arb_blob(), ctx in arb_context()) {
        let options = migrate(Some(&blob), &ctx);
        if let Value::Object(map) = &blob {
            for (key, value) in map.iter().filter(|(k, _)| k.ends_with("_x")) {
                prop_assert_eq!(options.extra.get(key), Some(value));
            }
        }
    }
}
