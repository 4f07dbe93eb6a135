//! Deterministic `KEY=value` env-file writer.

use crate::error::{Result, SlipwayError};
use crate::io;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Write `env_vars` to `<dir>/<file_name>` with mode 0644, replacing any
/// existing file.
///
/// Keys are emitted in ascending lexicographic order so repeated writes are
/// byte-identical. An empty map is not an error: nothing is written and a
/// warning is logged, matching the documented controller behavior.
pub fn write(dir: &Path, file_name: &str, env_vars: &BTreeMap<String, Value>) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Err(SlipwayError::InvalidConfiguration(
            "env file directory is empty".to_string(),
        ));
    }
    if file_name.is_empty() {
        return Err(SlipwayError::InvalidConfiguration(
            "env file name is empty".to_string(),
        ));
    }
    if env_vars.is_empty() {
        warn!(dir = %dir.display(), "env vars empty, skipping env file write");
        return Ok(());
    }
    if !io::is_dir(dir) {
        return Err(SlipwayError::InvalidConfiguration(format!(
            "env file directory does not exist: {}",
            dir.display()
        )));
    }

    let mut content = String::new();
    for (key, value) in env_vars {
        content.push_str(key);
        content.push('=');
        content.push_str(&render(value));
        content.push('\n');
    }

    write_file(&dir.join(file_name), content.as_bytes())
}

#[cfg(unix)]
fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)?;
    file.write_all(content)?;
    // mode() only applies when the file is created; an overwrite keeps the
    // old permissions unless they are reset.
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    std::fs::write(path, content)?;
    Ok(())
}

/// Strings render bare (no JSON quotes); everything else renders as its
/// JSON form.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
