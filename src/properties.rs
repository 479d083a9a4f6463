//! Versioned key/value properties carried in TXT records.
//!
//! A TXT record is a list of `key=value` strings. If the first string is
//! `txtvers=N`, the remaining entries of that record belong to version `N`;
//! otherwise they belong to [DEFAULT_PROPERTY_VERSION].

use std::collections::{BTreeMap, HashMap};

/// The version assumed for records which don't start with `txtvers`.
pub const DEFAULT_PROPERTY_VERSION: i64 = 1;

const VERSION_KEY: &str = "txtvers";

/// Property maps, keyed by version.
pub type VersionedProperties = BTreeMap<i64, HashMap<String, String>>;

/// Parses the strings of one TXT record into `properties`.
///
/// Entries without an `=`, or with an empty key, are skipped. Entries already
/// present in `properties` are overwritten by later ones with the same
/// version and key.
pub fn parse_txt<S: AsRef<str>>(properties: &mut VersionedProperties, strings: &[S]) {
    let mut version = DEFAULT_PROPERTY_VERSION;

    for (i, entry) in strings.iter().enumerate() {
        let Some((key, value)) = entry.as_ref().split_once('=') else {
            continue;
        };
        if key.is_empty() {
            continue;
        }

        if i == 0 && key == VERSION_KEY {
            if let Some(v) = parse_int_literal(value) {
                version = v;
                continue;
            }
        }

        properties
            .entry(version)
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}

/// Parses an integer with an optional sign and `0x`, `0o`, `0b` or leading
/// `0` (octal) prefix.
fn parse_int_literal(s: &str) -> Option<i64> {
    let (negative, unsigned) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (8, oct)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };

    // from_str_radix would accept a second sign
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }

    let magnitude = i128::from(u64::from_str_radix(digits, radix).ok()?);
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}
