//! Surgical version rewrite for OpenAPI spec documents.
//!
//! The scalar under `info.version` is replaced in place. Mapping order,
//! comments, quoting style, and every unrelated byte survive the edit, so
//! the document is rewritten line by line rather than through a YAML
//! round-trip (which drops comments).

use crate::error::{Result, SlipwayError};
use semver::Version;
use std::path::Path;

/// Set `info.version` in the spec file at `path`.
/// Fails when `info` or `info.version` is absent.
pub fn set_info_version(path: &Path, version: &Version) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let updated = rewrite_info_version(&content, &version.to_string())?;
    // The edit is positional; check the document still parses before it
    // replaces the spec.
    serde_yaml::from_str::<serde_yaml::Value>(&updated)?;
    std::fs::write(path, updated)?;
    Ok(())
}

fn rewrite_info_version(input: &str, new_version: &str) -> Result<String> {
    // split_inclusive keeps line terminators so untouched lines round-trip
    // byte-for-byte, including a missing trailing newline.
    let lines: Vec<&str> = input.split_inclusive('\n').collect();

    let info_at = lines
        .iter()
        .position(|line| is_top_level_key(line, "info"))
        .ok_or_else(|| SlipwayError::VersionKeyNotFound("info".to_string()))?;

    // Indent of the first real line inside the info block defines the
    // block's item level.
    let mut item_indent: Option<usize> = None;
    for (offset, line) in lines[info_at + 1..].iter().enumerate() {
        let i = info_at + 1 + offset;
        let stripped = line.trim_end_matches(['\n', '\r']);
        if stripped.trim().is_empty() || stripped.trim_start().starts_with('#') {
            continue;
        }
        let indent = stripped.len() - stripped.trim_start().len();
        match item_indent {
            None => {
                if indent == 0 {
                    break; // info: has no nested mapping
                }
                item_indent = Some(indent);
            }
            Some(level) if indent < level => break, // left the info block
            Some(level) if indent > level => continue, // nested under a sibling
            _ => {}
        }
        let level = item_indent.unwrap_or(0);
        let indent_here = stripped.len() - stripped.trim_start().len();
        if indent_here == level {
            if let Some(rest) = key_value_rest(stripped, level, "version") {
                let rewritten = rewrite_scalar_line(&stripped[..stripped.len() - rest.len()], rest, new_version);
                let mut out = String::with_capacity(input.len() + new_version.len());
                out.push_str(&lines[..i].concat());
                out.push_str(&rewritten);
                if line.ends_with("\r\n") {
                    out.push_str("\r\n");
                } else if line.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&lines[i + 1..].concat());
                return Ok(out);
            }
        }
    }

    Err(SlipwayError::VersionKeyNotFound("info.version".to_string()))
}

/// `key:` at column zero, optionally followed by a comment.
fn is_top_level_key(line: &str, key: &str) -> bool {
    let stripped = line.trim_end_matches(['\n', '\r']);
    if let Some(rest) = stripped.strip_prefix(key) {
        if let Some(rest) = rest.strip_prefix(':') {
            let rest = rest.trim_start();
            return rest.is_empty() || rest.starts_with('#');
        }
    }
    false
}

/// If `line` is `<indent>key: …`, return the remainder after the colon and
/// any whitespace run following it.
fn key_value_rest<'a>(line: &'a str, indent: usize, key: &str) -> Option<&'a str> {
    let body = &line[indent..];
    let rest = body.strip_prefix(key)?.strip_prefix(':')?;
    Some(rest.trim_start_matches(' '))
}

/// Rebuild the line with a new scalar, keeping the original quoting style
/// and any trailing comment.
fn rewrite_scalar_line(prefix: &str, rest: &str, new_version: &str) -> String {
    let (quote, suffix) = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let closing = rest[1..].find(q).map(|p| p + 2).unwrap_or(rest.len());
            (Some(q), &rest[closing..])
        }
        _ => {
            let end = rest.find(" #").unwrap_or(rest.len());
            (None, &rest[end..])
        }
    };
    match quote {
        Some(q) => format!("{prefix}{q}{new_version}{q}{suffix}"),
        None => format!("{prefix}{new_version}{suffix}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
