//! Analytics entry identity.
//!
//! Entries are keyed by a short fingerprint of their vendor type and config
//! so that the same vendor configuration can never be stored twice.

/// Length of an entry fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 12;

/// Derives the entry id for a vendor type and config string.
///
/// The id is the first twelve lowercase hex digits of `md5(type ++ config)`.
pub fn fingerprint(vendor: &str, config: &str) -> String {
    let digest = format!("{:x}", md5::compute(format!("{}{}", vendor, config)));
    digest[..FINGERPRINT_LEN].to_string()
}

/// Strips everything but `[A-Za-z0-9_-]` from a vendor type.
pub fn sanitize_vendor(vendor: &str) -> String {
    vendor
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Normalizes a caller-supplied entry id the way post slugs are normalized:
/// lowercase, keeping only `[a-z0-9_-]`.
pub fn sanitize_id(id: &str) -> String {
    id.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Returns true if `config` parses as a JSON document.
pub fn is_valid_config(config: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(config).is_ok()
}
