//! RPC method handler for the options JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested independently.

use std::sync::Mutex;

use crate::app::App;
use crate::services::options_store::OptionsStoreTrait;

use serde_json::{json, Value};

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Options ───
        "options.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(a.options.get_options()).map_err(|e| e.to_string())
        }
        "options.get_option" => {
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let default = params.get("default").cloned().unwrap_or(Value::Bool(false));
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(a.options.get_option_or(name, default))
        }
        "options.update" => {
            let partial = params
                .get("options")
                .and_then(|v| v.as_object())
                .ok_or("missing options")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let changed = a.options.update_options(partial);
            Ok(json!({"changed": changed, "messages": a.options.take_messages()}))
        }
        "options.update_option" => {
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let changed = a.options.update_option(name, value);
            Ok(json!({"changed": changed, "messages": a.options.take_messages()}))
        }
        "options.reset" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(json!({"ok": a.options.reset()}))
        }
        "options.messages" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            Ok(json!(a.options.take_messages()))
        }

        // ─── Site ───
        "site.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(a.site.snapshot()).map_err(|e| e.to_string())
        }
        "site.switch_theme" => {
            let slug = params.get("slug").and_then(|v| v.as_str()).ok_or("missing slug")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            a.site.switch_theme(slug).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "theme_support": a.options.get_option("theme_support")}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
