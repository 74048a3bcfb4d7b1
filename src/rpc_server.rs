//! Options RPC server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"options.update", "params":{"options":{"mobile_redirect":true}}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Environment:
//! - `AMP_OPTIONS_DATA_DIR`: directory holding `amp-options.db` (defaults to the executable's directory)
//! - `AMP_OPTIONS_SITE`: path to a JSON site manifest
//! - `AMP_OPTIONS_LOG`: tracing filter, e.g. `amp_options=debug` (logs go to stderr)

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use amp_options::app::App;
use amp_options::rpc_handler::handle_method;
use amp_options::services::environment::SiteManifest;

use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn setup_tracing() {
    let filter = EnvFilter::try_from_env("AMP_OPTIONS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("amp_options=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn db_path() -> PathBuf {
    if let Ok(dir) = std::env::var("AMP_OPTIONS_DATA_DIR") {
        PathBuf::from(dir).join("amp-options.db")
    } else if let Ok(exe) = std::env::current_exe() {
        exe.parent().unwrap_or(Path::new(".")).join("amp-options.db")
    } else {
        PathBuf::from("amp-options.db")
    }
}

fn load_manifest() -> Result<SiteManifest, String> {
    match std::env::var("AMP_OPTIONS_SITE") {
        Ok(path) => SiteManifest::load(&path).map_err(|e| e.to_string()),
        Err(_) => Ok(SiteManifest::default()),
    }
}

fn respond(out: &mut impl Write, response: &Value) -> io::Result<()> {
    writeln!(out, "{}", response)?;
    out.flush()
}

fn main() -> ExitCode {
    setup_tracing();

    let manifest = match load_manifest() {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "failed to load site manifest");
            return ExitCode::FAILURE;
        }
    };
    let path = db_path();
    let app = match App::new(&path.to_string_lossy(), manifest) {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            error!(error = %e, path = %path.display(), "failed to open options database");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %path.display(), "options rpc server ready");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if respond(&mut out, &json!({"event":"ready","version":env!("CARGO_PKG_VERSION")})).is_err() {
        return ExitCode::FAILURE;
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(req) => {
                let id = req.get("id").cloned().unwrap_or(Value::Null);
                let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                let params = req.get("params").cloned().unwrap_or(json!({}));
                match handle_method(&app, method, &params) {
                    Ok(val) => json!({"id": id, "result": val}),
                    Err(err) => json!({"id": id, "error": err}),
                }
            }
            Err(e) => json!({"id": null, "error": format!("parse error: {}", e)}),
        };

        if respond(&mut out, &response).is_err() {
            break;
        }
    }

    ExitCode::SUCCESS
}
