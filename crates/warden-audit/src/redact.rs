//! Redaction of sensitive payload material
//!
//! Applied to argument/result payloads before digesting, so neither the log
//! nor the hashes it chains ever depend on secret values. Two heuristics:
//! key names that look secret-bearing, and value shapes that look like
//! encoded credentials (long base64-ish runs, JWT triplets).

use once_cell::sync::Lazy;
use regex::Regex;

use warden_workspace::ContentHash;

use crate::error::AuditError;

/// Replacement string for redacted values
pub const REDACTED: &str = "[REDACTED]";

/// Key-name fragments that mark a field as secret-bearing
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "secret",
    "token",
    "password",
    "passwd",
    "api_key",
    "apikey",
    "authorization",
    "credential",
    "private_key",
];

/// Long base64-ish runs (64+ chars of base64 alphabet)
static BASE64ISH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=_-]{64,}$").expect("base64 pattern"));

/// JWT-shaped triplets (`eyJ…`.`…`.`…`)
static JWT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*$").expect("jwt pattern")
});

fn key_is_sensitive(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

fn value_is_sensitive(value: &str) -> bool {
    JWT_RE.is_match(value) || BASE64ISH_RE.is_match(value)
}

/// Redact a JSON value in place
///
/// Walks objects and arrays; replaces values under secret-shaped keys and
/// string values with credential shapes.
pub fn redact_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key_is_sensitive(key) {
                    *child = serde_json::Value::String(REDACTED.to_string());
                } else {
                    redact_value(child);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                redact_value(item);
            }
        }
        serde_json::Value::String(s) => {
            if value_is_sensitive(s) {
                *s = REDACTED.to_string();
            }
        }
        _ => {}
    }
}

/// Digest a payload after redacting a copy of it
///
/// # Errors
/// Returns an encoding error if the redacted value cannot be serialized.
pub fn digest_redacted(value: &serde_json::Value) -> Result<ContentHash, AuditError> {
    let mut redacted = value.clone();
    redact_value(&mut redacted);
    Ok(ContentHash::compute_serializable(&redacted)?)
}
