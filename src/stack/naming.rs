//! Resource naming rules
//!
//! Some provider resources cap the length of their names. Derived names
//! (`tm<app><region>`, `ssh-probe-<region>`) can overflow those caps for
//! long region identifiers, so they go through [`bounded`], which shortens
//! deterministically instead of failing.

use sha2::{Digest, Sha256};

/// Length cap for traffic manager endpoint names
pub const TRAFFIC_ENDPOINT_NAME_MAX: usize = 16;

/// Length cap for load balancer probe names
pub const PROBE_NAME_MAX: usize = 16;

/// Length cap for storage account names
pub const STORAGE_ACCOUNT_NAME_MAX: usize = 24;

/// Hex characters of the digest appended to shortened names
const SUFFIX_LEN: usize = 4;

/// Fit `name` into `max` characters.
///
/// Names that already fit are returned unchanged. Longer names keep their
/// leading characters and end with a short digest of the full name, so two
/// names sharing a long prefix (`eastus` / `eastus2`) stay distinct.
pub fn bounded(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }

    if max <= SUFFIX_LEN {
        return name.chars().take(max).collect();
    }

    let digest = Sha256::digest(name.as_bytes());
    let suffix: String = digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(SUFFIX_LEN)
        .collect();

    let prefix: String = name.chars().take(max - SUFFIX_LEN).collect();
    format!("{prefix}{suffix}")
}

/// Storage account names: lowercase alphanumerics only, at most 24 characters
pub fn storage_account_name(parts: &[&str]) -> String {
    let raw: String = parts
        .iter()
        .flat_map(|p| p.chars())
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    bounded(&raw, STORAGE_ACCOUNT_NAME_MAX)
}
