// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${NAME}` expansion.
//!
//! Only the braced form is recognized. A run of `N` dollars before a valid
//! `{NAME}` yields `N / 2` literal dollars followed by the value when `N` is
//! odd. When `N` is even the reference is left unexpanded, so `$${NAME}`
//! becomes `${NAME}`. Anything else,
//! including a malformed `${...}`, is copied through unchanged.

/// Expand `${NAME}` references in `text` using `lookup`.
///
/// Names that `lookup` does not know expand to the empty string.
pub fn interpolate<F, V>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<V>,
    V: AsRef<str>,
{
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(text.len());
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'$' {
            let next = text[pos..].find('$').map_or(text.len(), |n| pos + n);
            result.push_str(&text[pos..next]);
            pos = next;
            continue;
        }

        let run_start = pos;
        while pos < bytes.len() && bytes[pos] == b'$' {
            pos += 1;
        }
        let dollars = pos - run_start;

        let Some(name) = braced_name(&text[pos..]) else {
            result.push_str(&text[run_start..pos]);
            continue;
        };
        result.extend(std::iter::repeat_n('$', dollars / 2));
        if dollars % 2 == 1 {
            if let Some(value) = lookup(name) {
                result.push_str(value.as_ref());
            }
        } else {
            // The last dollar of the run starts the literal reference
            result.push('{');
            result.push_str(name);
            result.push('}');
        }
        pos += name.len() + 2;
    }

    result
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Name inside a leading `{NAME}`, if `rest` starts with one.
fn braced_name(rest: &str) -> Option<&str> {
    let inner = rest.strip_prefix('{')?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    is_valid_name(name).then_some(name)
}

#[cfg(test)]
#[path = "interpolate_tests.rs"]
mod tests;
