//! Conversion between DNS presentation-format names and label sequences.
//!
//! Names in presentation format are dot-separated and dot-terminated, with
//! a backslash escaping the character that follows it. Only backslash, dot
//! and space are escaped when encoding, matching the form DNS-SD servers use
//! for instance names.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Name ends with an unterminated escape: {0:?}")]
    TrailingEscape(String),
}

/// Splits a presentation-format name into its labels.
///
/// If `max_labels` is non-zero, scanning stops once `max_labels - 1` labels
/// have been produced, and whatever text remains (without its trailing dot)
/// becomes the final label verbatim. This lets a caller peel a description
/// off the front of an instance name without caring how the rest of the name
/// was escaped.
pub fn decode(name: &str, max_labels: usize) -> Result<Vec<String>, Error> {
    let mut out = Vec::new();
    let mut label = String::new();
    let mut escaped = false;

    for (i, c) in name.char_indices() {
        if escaped {
            label.push(c);
            escaped = false;
            continue;
        }

        match c {
            '\\' => escaped = true,
            '.' => {
                out.push(std::mem::take(&mut label));
                if max_labels > 0 && out.len() == max_labels - 1 {
                    let rest = &name[i + 1..];
                    let rest = rest.strip_suffix('.').unwrap_or(rest);
                    if !rest.is_empty() {
                        out.push(rest.to_string());
                    }
                    return Ok(out);
                }
            }
            c => label.push(c),
        }
    }

    if escaped {
        return Err(Error::TrailingEscape(name.to_string()));
    }

    // Relative names have no terminating dot for their last label
    if !label.is_empty() {
        out.push(label);
    }
    Ok(out)
}

/// Joins labels into a dot-terminated presentation-format name.
///
/// Every label but the last has backslash, dot and space escaped. The last
/// label is the domain, which is already in presentation format.
pub fn encode<S: AsRef<str>>(labels: &[S]) -> String {
    let mut out = String::new();
    let last = labels.len().saturating_sub(1);
    for (i, label) in labels.iter().enumerate() {
        let label = label.as_ref();
        if i < last {
            escape_into(&mut out, label);
        } else {
            out.push_str(label);
        }
        out.push('.');
    }
    out
}

/// Appends `label` to `out`, escaping the characters that would otherwise
/// be read as separators or escapes.
pub(crate) fn escape_into(out: &mut String, label: &str) {
    for c in label.chars() {
        if matches!(c, '\\' | '.' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
}
