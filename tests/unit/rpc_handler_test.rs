//! Unit tests for the RPC handler: every JSON-RPC method dispatched by `handle_method`.
//!
//! These go through the same code path as the `amp-options-rpc` binary, backed
//! by a temporary on-disk SQLite database.

use std::sync::Mutex;
use serde_json::json;
use tempfile::TempDir;

use amp_options::app::App;
use amp_options::rpc_handler::handle_method;
use amp_options::services::environment::SiteManifest;

/// Create a fresh App backed by a temp directory DB.
fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let db_path = tmp.path().join("test.db");
    let manifest = SiteManifest {
        active_theme: "twentytwenty".to_string(),
        themes: vec!["twentytwenty".to_string(), "twentynineteen".to_string()],
        ..SiteManifest::default()
    };
    let app = App::new(db_path.to_str().unwrap(), manifest).expect("Failed to init App");
    (Mutex::new(app), tmp)
}

// ─── Ping ───

#[test]
fn test_ping() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "ping", &json!({})).unwrap();
    assert_eq!(res, json!({"pong": true}));
}

// ─── Unknown method ───

#[test]
fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({}));
    assert!(res.is_err());
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Options ───

#[test]
fn test_options_get_returns_full_value() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "options.get", &json!({})).unwrap();
    assert_eq!(res["theme_support"], "transitional");
    assert_eq!(res["supported_post_types"], json!(["post", "page"]));
    assert_eq!(res["reader_theme"], "legacy");
}

#[test]
fn test_options_get_option_with_default() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "options.get_option", &json!({"name": "mobile_redirect"})).unwrap();
    assert_eq!(res, json!(false));

    let res = handle_method(&app, "options.get_option", &json!({"name": "nope", "default": 3})).unwrap();
    assert_eq!(res, json!(3));

    assert!(handle_method(&app, "options.get_option", &json!({})).is_err());
}

#[test]
fn test_options_update_reports_changes_and_messages() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "options.update", &json!({
        "options": {"mobile_redirect": true, "theme_support": "bogus"}
    })).unwrap();
    assert_eq!(res["changed"], true);
    let messages = res["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["code"], "invalid_theme_support");
    assert_eq!(messages[0]["severity"], "warning");

    let res = handle_method(&app, "options.get_option", &json!({"name": "mobile_redirect"})).unwrap();
    assert_eq!(res, json!(true));

    assert!(handle_method(&app, "options.update", &json!({"options": 5})).is_err());
}

#[test]
fn test_options_update_option_and_reset() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "options.update_option", &json!({
        "name": "reader_theme", "value": "twentysixteen"
    })).unwrap();
    assert_eq!(res["changed"], true);

    let res = handle_method(&app, "options.reset", &json!({})).unwrap();
    assert_eq!(res["ok"], true);
    let res = handle_method(&app, "options.get_option", &json!({"name": "reader_theme"})).unwrap();
    assert_eq!(res, json!("legacy"));
}

#[test]
fn test_options_messages_drains() {
    let (app, _tmp) = setup();
    {
        let a = app.lock().unwrap();
        amp_options::services::options_store::OptionsStoreTrait::update_option(
            &a.options,
            "analytics",
            json!({"bad": []}),
        );
    }
    let res = handle_method(&app, "options.messages", &json!({})).unwrap();
    assert_eq!(res.as_array().unwrap().len(), 1);
    let res = handle_method(&app, "options.messages", &json!({})).unwrap();
    assert!(res.as_array().unwrap().is_empty());
}

// ─── Site ───

#[test]
fn test_site_get() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "site.get", &json!({})).unwrap();
    assert_eq!(res["active_theme"], "twentytwenty");
}

#[test]
fn test_site_switch_theme_recomputes_mode() {
    let (app, _tmp) = setup();
    handle_method(&app, "options.update", &json!({
        "options": {"theme_support": "reader", "reader_theme": "twentynineteen"}
    })).unwrap();

    let res = handle_method(&app, "site.switch_theme", &json!({"slug": "twentynineteen"})).unwrap();
    assert_eq!(res["ok"], true);
    assert_eq!(res["theme_support"], "transitional");

    let res = handle_method(&app, "site.switch_theme", &json!({"slug": "twentytwenty"})).unwrap();
    assert_eq!(res["theme_support"], "reader");
}

#[test]
fn test_site_switch_theme_unknown() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "site.switch_theme", &json!({"slug": "twentyten"}));
    assert!(res.unwrap_err().contains("Unknown theme"));
}
