// src/boundary/shadow.rs

//! Shadow copies: load from a private copy so a deployment can overwrite the
//! application directory while the old version is still running.

use std::fs;
use std::io;
use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

/// Copy `source` recursively into a fresh temporary directory. The copy is
/// removed when the returned [`TempDir`] is dropped.
pub fn shadow_copy(source: &Path, name: &str) -> io::Result<TempDir> {
    let prefix = format!("appvisor-{}-", sanitize(name));
    let dir = tempfile::Builder::new().prefix(&prefix).tempdir()?;
    copy_tree(source, dir.path())?;
    debug!(source = ?source, copy = ?dir.path(), "shadow copy created");
    Ok(dir)
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
        // Symlinks and special files are not carried over.
    }
    Ok(())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
