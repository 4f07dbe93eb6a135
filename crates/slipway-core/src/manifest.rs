//! Surgical version rewrite for `package.json`.
//!
//! Only the bytes of the top-level `"version"` value change; formatting,
//! key order, and every other byte of the manifest are preserved. A
//! round-trip through a JSON serializer would lose the author's formatting,
//! so the key is located with a small scanner instead.

use crate::error::{Result, SlipwayError};
use semver::Version;
use std::path::Path;

pub const PACKAGE_JSON: &str = "package.json";

/// Set the top-level `version` field of `<worktree>/package.json`.
pub fn set_package_version(worktree: &Path, version: &Version) -> Result<()> {
    let path = worktree.join(PACKAGE_JSON);
    let content = std::fs::read_to_string(&path)?;

    let updated = replace_top_level_string(&content, "version", &version.to_string())
        .ok_or_else(|| SlipwayError::VersionKeyNotFound(PACKAGE_JSON.to_string()))?;

    // The edit is positional; make sure the result is still valid JSON
    // before it replaces the manifest.
    serde_json::from_str::<serde_json::Value>(&updated)?;

    std::fs::write(&path, updated)?;
    Ok(())
}

/// Replace the string value of `key` at nesting depth 1 (the document's top
/// level object), returning `None` when the key is absent or its value is
/// not a string.
fn replace_top_level_string(input: &str, key: &str, new_value: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let (content, after) = scan_string(input, i)?;
                if depth == 1 && content == key {
                    let mut j = after;
                    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j] == b':' {
                        j += 1;
                        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                            j += 1;
                        }
                        if j >= bytes.len() || bytes[j] != b'"' {
                            return None;
                        }
                        let (_, value_end) = scan_string(input, j)?;
                        let mut out = String::with_capacity(input.len() + new_value.len());
                        out.push_str(&input[..j]);
                        out.push('"');
                        out.push_str(new_value);
                        out.push('"');
                        out.push_str(&input[value_end..]);
                        return Some(out);
                    }
                    // Matched a string *value* that merely equals the key name.
                }
                i = after;
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Scan the JSON string starting at the opening quote `start`. Returns the
/// unescaped-length-agnostic raw content slice and the index just past the
/// closing quote.
fn scan_string(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some((&input[start + 1..i], i + 1)),
            _ => i += 1,
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
