//! Build-context tarball construction.

use crate::Result;
use std::path::Path;

/// Tar the directory tree at `dir` into an in-memory build context.
///
/// Entries are files only, named relative to `dir`; directory entries are
/// not emitted, matching what the build engine expects from a context
/// stream.
pub fn build_context_tar(dir: &Path) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    append_dir(&mut builder, dir, dir)?;
    builder.finish()?;
    Ok(builder.into_inner()?)
}

fn append_dir(builder: &mut tar::Builder<Vec<u8>>, root: &Path, dir: &Path) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            append_dir(builder, root, &path)?;
        } else {
            let rel = path.strip_prefix(root).expect("entry under root");
            builder.append_path_with_name(&path, rel)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry_names(data: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(data);
        archive
            .entries()
            .unwrap()
            .map(|e| {
                e.unwrap()
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn paths_are_relative_and_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch").unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::write(dir.path().join("src/nested/app.js"), "x").unwrap();

        let data = build_context_tar(dir.path()).unwrap();
        let names = entry_names(&data);

        assert!(names.contains(&"Dockerfile".to_string()));
        assert!(names.contains(&"src/nested/app.js".to_string()));
        assert!(
            names.iter().all(|n| !n.ends_with('/')),
            "no directory entries expected, got {names:?}"
        );
    }

    #[test]
    fn file_content_round_trips() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "payload").unwrap();

        let data = build_context_tar(dir.path()).unwrap();
        let mut archive = tar::Archive::new(&data[..]);
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut entry, &mut content).unwrap();
        assert_eq!(content, "payload");
    }

    #[test]
    fn empty_directory_yields_empty_archive() {
        let dir = TempDir::new().unwrap();
        let data = build_context_tar(dir.path()).unwrap();
        assert!(entry_names(&data).is_empty());
    }
}
